//! Loads the project configuration (`gazette.yaml`).

use crate::extract::DEFAULT_EXCERPT_SELECTOR;
use crate::feed::DEFAULT_FEED_LIMIT;
use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::fs::File;
use std::path::{Path, PathBuf};
use url::Url;

/// The name of the project file searched for by [`Config::from_directory`].
pub const PROJECT_FILE: &str = "gazette.yaml";

#[derive(Deserialize)]
struct FeedLimit(usize);
impl Default for FeedLimit {
    fn default() -> Self {
        FeedLimit(DEFAULT_FEED_LIMIT)
    }
}

#[derive(Deserialize)]
struct IncludeLatest(bool);
impl Default for IncludeLatest {
    fn default() -> Self {
        IncludeLatest(true)
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct Project {
    pub base_url: Url,
    pub title: String,
    pub description: String,

    #[serde(default)]
    pub archive_directory: Option<PathBuf>,
    #[serde(default)]
    pub archive_template: Option<PathBuf>,
    #[serde(default)]
    pub archive_output: Option<PathBuf>,
    #[serde(default)]
    pub feed_output: Option<PathBuf>,
    #[serde(default)]
    pub sitemap_output: Option<PathBuf>,
    #[serde(default)]
    pub latest_issue: Option<String>,
    #[serde(default)]
    pub title_suffix: Option<String>,
    #[serde(default)]
    pub excerpt_selector: Option<String>,
    #[serde(default)]
    pub feed_limit: FeedLimit,
    #[serde(default)]
    pub feed_includes_latest: IncludeLatest,
}

/// Fully resolved configuration. All paths are absolute or relative to the
/// working directory (i.e., already joined onto the project root).
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// The public root of the site. Always ends in a slash.
    pub base_url: Url,
    pub title: String,
    pub description: String,
    pub archive_directory: PathBuf,
    pub archive_template: PathBuf,
    pub archive_output: PathBuf,
    pub feed_output: PathBuf,
    pub sitemap_output: PathBuf,

    /// File name of the latest-issue pointer inside `archive_directory`.
    pub latest_issue: String,
    pub title_suffix: Option<String>,
    pub excerpt_selector: String,
    pub feed_limit: usize,
    pub feed_includes_latest: bool,
}

impl Config {
    /// Searches `dir` and then each of its ancestors for a `gazette.yaml` and
    /// loads the first one found.
    pub fn from_directory(dir: &Path) -> Result<Config> {
        let path = dir.join(PROJECT_FILE);
        if path.exists() {
            Config::from_project_file(&path)
                .with_context(|| format!("Loading configuration `{}`", path.display()))
        } else {
            match dir.parent() {
                Some(parent) => Config::from_directory(parent),
                None => Err(anyhow!(
                    "Could not find `{}` in any parent directory",
                    PROJECT_FILE
                )),
            }
        }
    }

    pub fn from_project_file(path: &Path) -> Result<Config> {
        let file = File::open(path)
            .map_err(|e| anyhow!("Opening project file `{}`: {}", path.display(), e))?;
        let project: Project = serde_yaml::from_reader(file)?;
        match path.parent() {
            None => Err(anyhow!(
                "Can't get parent directory for provided project file path '{:?}'",
                path
            )),
            Some(project_root) => Ok(Config::from_project(project, project_root)),
        }
    }

    fn from_project(project: Project, project_root: &Path) -> Config {
        let resolve = |path: Option<PathBuf>, default: &str| {
            project_root.join(path.unwrap_or_else(|| PathBuf::from(default)))
        };
        let archive_template = resolve(project.archive_template, "newsletter_archive.html");
        Config {
            base_url: with_trailing_slash(project.base_url),
            title: project.title,
            description: project.description,
            archive_directory: resolve(project.archive_directory, "archive"),
            archive_output: match project.archive_output {
                Some(path) => project_root.join(path),
                None => archive_template.clone(),
            },
            archive_template,
            feed_output: resolve(project.feed_output, "feed.xml"),
            sitemap_output: resolve(project.sitemap_output, "sitemap.xml"),
            latest_issue: project
                .latest_issue
                .unwrap_or_else(|| String::from("latest.html")),
            title_suffix: project.title_suffix,
            excerpt_selector: project
                .excerpt_selector
                .unwrap_or_else(|| String::from(DEFAULT_EXCERPT_SELECTOR)),
            feed_limit: project.feed_limit.0,
            feed_includes_latest: project.feed_includes_latest.0,
        }
    }
}

// NOTE: without a trailing slash, [`Url::join`] treats the last path segment
// as a file name and replaces it, so `https://example.org/news` joined with
// `archive/x.html` would lose `news`.
fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}
