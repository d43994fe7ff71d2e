//! Defines the [`Extractor`], which scrapes an [`IssueRecord`] out of a
//! single issue document. Extraction never fails: every field that is missing
//! or malformed degrades to one of the sentinels in [`crate::issue`].

use std::fmt;

use chrono::{DateTime, Utc};
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};

use crate::issue::{parse_publish_date, IssueRecord, NO_EXCERPT, UNTITLED};

/// Name of the `<meta>` element carrying an issue's publish date.
pub const PUBLISH_DATE_META: &str = "publish-date";

/// Default selector for the excerpt element.
pub const DEFAULT_EXCERPT_SELECTOR: &str = ".excerpt";

/// Number of characters kept from the first paragraph when an issue has no
/// excerpt element and a feed description is needed.
const FALLBACK_DESCRIPTION_CHARS: usize = 150;

/// Scrapes [`IssueRecord`]s out of issue documents.
pub struct Extractor {
    /// Known site-name suffix to strip from titles (e.g., ` | Berlin Daily`).
    title_suffix: Option<String>,
    title: Selector,
    publish_date: Selector,
    excerpt: Selector,
    paragraph: Selector,
}

impl Extractor {
    /// Constructs a new extractor. Fails only if `excerpt_selector` isn't a
    /// valid CSS selector.
    pub fn new(title_suffix: Option<&str>, excerpt_selector: &str) -> Result<Extractor> {
        Ok(Extractor {
            title_suffix: title_suffix
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_owned),
            title: selector("title")?,
            publish_date: selector(&format!("meta[name=\"{}\"]", PUBLISH_DATE_META))?,
            excerpt: selector(excerpt_selector)?,
            paragraph: selector("p")?,
        })
    }

    /// Extracts the metadata from an issue's `html` source. `file_name` is the
    /// name of the issue file inside the archive directory and is used to
    /// build the record's link.
    pub fn extract(&self, file_name: &str, html: &str) -> IssueRecord {
        let document = Html::parse_document(html);

        let title = self.title(&document).unwrap_or_else(|| {
            warn!(file = file_name, "no title; using `{}`", UNTITLED);
            UNTITLED.to_owned()
        });

        let publish_date = self.publish_date(&document, file_name);

        let excerpt_element = document.select(&self.excerpt).next();
        let excerpt = excerpt_element
            .map(|el| text_of(&el))
            .filter(|text| !text.is_empty())
            .unwrap_or_else(|| {
                warn!(file = file_name, "no excerpt; using `{}`", NO_EXCERPT);
                NO_EXCERPT.to_owned()
            });
        let excerpt_html = excerpt_element
            .map(|el| el.inner_html().trim().to_owned())
            .filter(|markup| !markup.is_empty())
            .or_else(|| self.first_paragraph_summary(&document))
            .unwrap_or_else(|| NO_EXCERPT.to_owned());

        debug!(file = file_name, title = %title, "extracted issue");
        IssueRecord::new(title, publish_date, excerpt, excerpt_html, file_name)
    }

    fn title(&self, document: &Html) -> Option<String> {
        let title = text_of(&document.select(&self.title).next()?);
        let title = match &self.title_suffix {
            Some(suffix) => match title.strip_suffix(suffix.as_str()) {
                Some(stripped) => stripped.trim_end().to_owned(),
                None => title,
            },
            None => title,
        };
        match title.is_empty() {
            true => None,
            false => Some(title),
        }
    }

    fn publish_date(&self, document: &Html, file_name: &str) -> Option<DateTime<Utc>> {
        let content = match document
            .select(&self.publish_date)
            .next()
            .and_then(|el| el.value().attr("content"))
        {
            Some(content) => content,
            None => {
                warn!(file = file_name, "no `{}` meta tag", PUBLISH_DATE_META);
                return None;
            }
        };
        let date = parse_publish_date(content);
        if date.is_none() {
            warn!(file = file_name, value = content, "unparsable publish date");
        }
        date
    }

    // Older issues have no excerpt element, so the feed falls back to the
    // start of the first paragraph.
    fn first_paragraph_summary(&self, document: &Html) -> Option<String> {
        let text = text_of(&document.select(&self.paragraph).next()?);
        if text.is_empty() {
            return None;
        }
        let mut summary: String = text.chars().take(FALLBACK_DESCRIPTION_CHARS).collect();
        summary.push_str("...");
        Some(summary)
    }
}

/// Concatenates an element's text nodes, then collapses runs of whitespace
/// (hand wrapped lines, indentation) into single spaces.
fn text_of(element: &ElementRef) -> String {
    element
        .text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn selector(s: &str) -> Result<Selector> {
    Selector::parse(s).map_err(|e| Error::InvalidSelector {
        selector: s.to_owned(),
        message: e.to_string(),
    })
}

/// Represents the result of constructing an [`Extractor`].
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error constructing an [`Extractor`].
#[derive(Debug)]
pub enum Error {
    /// Returned when a configured selector can't be parsed.
    InvalidSelector { selector: String, message: String },
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::InvalidSelector { selector, message } => {
                write!(f, "invalid selector `{}`: {}", selector, message)
            }
        }
    }
}

impl std::error::Error for Error {}
