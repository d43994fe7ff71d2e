//! Defines the [`Collector`], which turns a directory of issue documents into
//! a list of [`IssueRecord`]s sorted newest first.

use std::cmp::Reverse;
use std::fmt;
use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;

use crate::extract::Extractor;
use crate::issue::IssueRecord;

/// Extension of the files treated as issue documents.
pub const HTML_EXTENSION: &str = ".html";

/// Collects [`IssueRecord`]s from an archive directory.
pub struct Collector<'a> {
    /// The extractor applied to each issue document.
    extractor: &'a Extractor,

    /// The name of a file to leave out of the collection, typically the
    /// latest-issue pointer.
    exclude: Option<&'a str>,
}

impl<'a> Collector<'a> {
    /// Constructs a new collector. See fields on [`Collector`] for argument
    /// descriptions.
    pub fn new(extractor: &'a Extractor, exclude: Option<&'a str>) -> Collector<'a> {
        Collector { extractor, exclude }
    }

    /// Searches `archive_directory` (non-recursively) for issue documents
    /// (extension = `.html`), extracts one [`IssueRecord`] from each, and
    /// returns them sorted by publish date, most recent first. See
    /// [`sort_newest_first`] for the ordering of undated issues.
    ///
    /// Fails if the directory can't be listed or one of the issue files can't
    /// be read; no partial collection is returned.
    pub fn collect(&self, archive_directory: &Path) -> Result<Vec<IssueRecord>> {
        let mut records = Vec::new();
        for result in WalkDir::new(archive_directory)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = result.map_err(|err| Error::ListDirectory {
                path: archive_directory.to_owned(),
                err,
            })?;
            let file_name = entry.file_name().to_string_lossy();
            // Symlinked issues count as files; dangling links are skipped.
            if !file_name.ends_with(HTML_EXTENSION) || !entry.path().is_file() {
                continue;
            }
            if self.exclude == Some(&*file_name) {
                debug!(file = %file_name, "skipping excluded issue");
                continue;
            }

            let bytes = std::fs::read(entry.path()).map_err(|err| Error::ReadIssue {
                path: entry.path().to_owned(),
                err,
            })?;
            records.push(
                self.extractor
                    .extract(&file_name, &String::from_utf8_lossy(&bytes)),
            );
        }

        sort_newest_first(&mut records);
        Ok(records)
    }
}

/// Sorts records by publish date, most recent first. Undated records go
/// after every dated record. The sort is stable, so records with equal dates
/// (and undated records among themselves) keep their relative order.
pub fn sort_newest_first(records: &mut [IssueRecord]) {
    records.sort_by_key(|record| Reverse(record.publish_date()));
}

/// Represents the result of collecting issues.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents a fatal problem collecting issues.
#[derive(Debug)]
pub enum Error {
    /// Returned when the archive directory is missing or can't be listed.
    ListDirectory { path: PathBuf, err: walkdir::Error },

    /// Returned when an issue document can't be read.
    ReadIssue { path: PathBuf, err: std::io::Error },
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::ListDirectory { path, err: _ } => {
                write!(f, "Listing archive directory '{}'", path.display())
            }
            Error::ReadIssue { path, err: _ } => {
                write!(f, "Reading issue '{}'", path.display())
            }
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            // walkdir's message already includes its I/O error.
            Error::ListDirectory { path: _, err } => match err.io_error() {
                Some(io) => Some(io),
                None => Some(err),
            },
            Error::ReadIssue { path: _, err } => Some(err),
        }
    }
}
