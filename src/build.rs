//! Exports the [`build_site`] function which stitches together the high-level
//! steps of a build: collecting issues from the archive directory
//! ([`crate::collection`]), injecting the listing into the archive page
//! ([`crate::inject`]), and rendering the feed ([`crate::feed`]) and sitemap
//! ([`crate::sitemap`]).
//!
//! Every requested output is rendered in memory before anything is written,
//! so a fatal error (unlistable archive directory, unreadable issue or
//! template) leaves all existing outputs untouched.

use crate::collection::{Collector, Error as CollectError};
use crate::config::Config;
use crate::extract::{Error as ExtractorError, Extractor};
use crate::feed::{write_feed, Error as FeedError, FeedConfig};
use crate::inject::{inject, Error as InjectError, Injection};
use crate::issue::IssueRecord;
use crate::sitemap::build_sitemap;
use crate::write::{write_atomic, Error as WriteError};
use chrono::NaiveDate;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// The outputs a build can produce.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Target {
    /// The archive page, regenerated from its template.
    Archive,

    /// The RSS feed.
    Feed,

    /// The sitemap.
    Sitemap,
}

impl Target {
    pub const ALL: [Target; 3] = [Target::Archive, Target::Feed, Target::Sitemap];
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            Target::Archive => "archive page",
            Target::Feed => "feed",
            Target::Sitemap => "sitemap",
        })
    }
}

/// A rendered output waiting to be written.
struct Output {
    target: Target,
    path: PathBuf,
    contents: Vec<u8>,
    entries: usize,
}

/// Builds the requested `targets` from a [`Config`]. `today` is the date used
/// where an issue has no publish date of its own (sitemap `lastmod`).
pub fn build_site(config: &Config, targets: &[Target], today: NaiveDate) -> Result<()> {
    let extractor = Extractor::new(config.title_suffix.as_deref(), &config.excerpt_selector)?;

    // The archive directory is read once; the listing is the full collection
    // minus the latest-issue pointer, in the same order.
    let all = Collector::new(&extractor, None).collect(&config.archive_directory)?;
    let listing: Vec<&IssueRecord> = all
        .iter()
        .filter(|record| record.file_name() != config.latest_issue)
        .collect();

    let wants = |target| targets.contains(&target);
    let mut outputs = Vec::with_capacity(targets.len());
    for target in Target::ALL.iter().copied().filter(|t| wants(*t)) {
        outputs.push(match target {
            Target::Archive => render_archive(config, &listing)?,
            Target::Feed => match config.feed_includes_latest {
                true => render_feed(config, &all)?,
                false => render_feed(config, listing.iter().copied())?,
            },
            Target::Sitemap => Output {
                target,
                path: config.sitemap_output.clone(),
                contents: build_sitemap(&config.base_url, &all, today)
                    .map_err(Error::Sitemap)?
                    .into_bytes(),
                entries: all.len() + 1,
            },
        });
    }

    for output in outputs {
        create_parent(&output.path)?;
        write_atomic(&output.path, &output.contents)?;
        info!(
            path = %output.path.display(),
            entries = output.entries,
            "generated {}",
            output.target
        );
    }
    Ok(())
}

fn render_archive(config: &Config, listing: &[&IssueRecord]) -> Result<Output> {
    let template = std::fs::read_to_string(&config.archive_template).map_err(|err| {
        Error::ReadTemplate {
            path: config.archive_template.clone(),
            err,
        }
    })?;
    let document = match inject(&template, listing.iter().copied())? {
        Injection::Replaced(document) => document,
        Injection::PlaceholderMissing(document) => {
            warn!(
                template = %config.archive_template.display(),
                "no archive placeholder found; output is the unmodified template"
            );
            document
        }
    };
    Ok(Output {
        target: Target::Archive,
        path: config.archive_output.clone(),
        contents: document.into_bytes(),
        entries: listing.len(),
    })
}

fn render_feed<'a, I>(config: &Config, records: I) -> Result<Output>
where
    I: IntoIterator<Item = &'a IssueRecord>,
{
    let feed_config = FeedConfig {
        title: &config.title,
        description: &config.description,
        base_url: &config.base_url,
        limit: config.feed_limit,
    };
    let records: Vec<&IssueRecord> = records.into_iter().take(config.feed_limit).collect();
    let mut contents = Vec::new();
    write_feed(&feed_config, records.iter().copied(), &mut contents)?;
    Ok(Output {
        target: Target::Feed,
        path: config.feed_output.clone(),
        contents,
        entries: records.len(),
    })
}

fn create_parent(path: &Path) -> Result<()> {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => {
            std::fs::create_dir_all(dir).map_err(|err| Error::CreateDirectory {
                path: dir.to_owned(),
                err,
            })
        }
        _ => Ok(()),
    }
}

type Result<T> = std::result::Result<T, Error>;

/// The error type for building a site. Every variant is fatal: the build
/// stops and nothing further is written.
#[derive(Debug)]
pub enum Error {
    /// Returned when the configured excerpt selector is invalid.
    Extractor(ExtractorError),

    /// Returned when the archive directory or an issue can't be read.
    Collect(CollectError),

    /// Returned for I/O problems while reading the archive template.
    ReadTemplate { path: PathBuf, err: std::io::Error },

    /// Returned when the archive listing can't be serialized.
    Inject(InjectError),

    /// Returned for errors rendering the feed.
    Feed(FeedError),

    /// Returned when a sitemap URL can't be resolved against the base URL.
    Sitemap(url::ParseError),

    /// Returned for I/O problems while creating output directories.
    CreateDirectory { path: PathBuf, err: std::io::Error },

    /// Returned for errors writing an output file.
    Write(WriteError),
}

impl fmt::Display for Error {
    /// Implements [`fmt::Display`] for [`Error`]. Only this level's message
    /// is shown; the cause is available from [`std::error::Error::source`].
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Extractor(err) => err.fmt(f),
            Error::Collect(err) => err.fmt(f),
            Error::ReadTemplate { path, err: _ } => {
                write!(f, "Reading template file '{}'", path.display())
            }
            Error::Inject(err) => err.fmt(f),
            Error::Feed(_) => f.write_str("Rendering feed"),
            Error::Sitemap(_) => f.write_str("Rendering sitemap"),
            Error::CreateDirectory { path, err: _ } => {
                write!(f, "Creating directory '{}'", path.display())
            }
            Error::Write(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for Error {
    /// Implements [`std::error::Error`] for [`Error`]. Variants that display
    /// as their inner error pass through that error's source, so no message
    /// appears twice in the chain.
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Extractor(err) => std::error::Error::source(err),
            Error::Collect(err) => std::error::Error::source(err),
            Error::ReadTemplate { path: _, err } => Some(err),
            Error::Inject(err) => std::error::Error::source(err),
            Error::Feed(err) => Some(err),
            Error::Sitemap(err) => Some(err),
            Error::CreateDirectory { path: _, err } => Some(err),
            Error::Write(err) => std::error::Error::source(err),
        }
    }
}

impl From<ExtractorError> for Error {
    /// Converts [`ExtractorError`]s into [`Error`]. This allows us to use the
    /// `?` operator.
    fn from(err: ExtractorError) -> Error {
        Error::Extractor(err)
    }
}

impl From<CollectError> for Error {
    /// Converts [`CollectError`]s into [`Error`]. This allows us to use the
    /// `?` operator.
    fn from(err: CollectError) -> Error {
        Error::Collect(err)
    }
}

impl From<InjectError> for Error {
    /// Converts [`InjectError`]s into [`Error`]. This allows us to use the
    /// `?` operator.
    fn from(err: InjectError) -> Error {
        Error::Inject(err)
    }
}

impl From<FeedError> for Error {
    /// Converts [`FeedError`]s into [`Error`]. This allows us to use the `?`
    /// operator.
    fn from(err: FeedError) -> Error {
        Error::Feed(err)
    }
}

impl From<WriteError> for Error {
    /// Converts [`WriteError`]s into [`Error`]. This allows us to use the `?`
    /// operator.
    fn from(err: WriteError) -> Error {
        Error::Write(err)
    }
}
