//! Defines the [`IssueRecord`] type, the normalized metadata for a single
//! newsletter issue, along with the date parsing and formatting rules shared
//! by the archive page, the feed, and the sitemap.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Utc};

/// Title used when an issue has no usable `<title>` element.
pub const UNTITLED: &str = "Untitled Newsletter";

/// Display date used when an issue has no usable publish date.
pub const NO_DATE: &str = "No Date";

/// Month/year tag (and year) used when an issue has no usable publish date.
pub const NOT_AVAILABLE: &str = "N/A";

/// Excerpt used when an issue has no excerpt element.
pub const NO_EXCERPT: &str = "No excerpt available.";

/// The metadata scraped from one issue document. Records are built once by
/// [`crate::extract::Extractor`] and are read-only afterwards; collections
/// reorder them but never change them.
#[derive(Clone, Debug, PartialEq)]
pub struct IssueRecord {
    title: String,
    publish_date: Option<DateTime<Utc>>,
    excerpt: String,
    excerpt_html: String,
    file_name: String,
    link: String,
}

impl IssueRecord {
    /// Constructs a record. `link` is derived from `file_name` as
    /// `archive/{file_name}`.
    pub fn new(
        title: String,
        publish_date: Option<DateTime<Utc>>,
        excerpt: String,
        excerpt_html: String,
        file_name: &str,
    ) -> IssueRecord {
        IssueRecord {
            title,
            publish_date,
            excerpt,
            excerpt_html,
            file_name: file_name.to_owned(),
            link: format!("{}/{}", ARCHIVE_PATH, file_name),
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn publish_date(&self) -> Option<DateTime<Utc>> {
        self.publish_date
    }

    /// The plain-text excerpt shown on the archive page.
    pub fn excerpt(&self) -> &str {
        &self.excerpt
    }

    /// The excerpt with its markup preserved, used as the feed description.
    pub fn excerpt_html(&self) -> &str {
        &self.excerpt_html
    }

    /// The name of the source file inside the archive directory.
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// The site-relative link to the published issue.
    pub fn link(&self) -> &str {
        &self.link
    }

    /// Long-form date, e.g. `March 15, 2024`, or [`NO_DATE`].
    pub fn display_date(&self) -> String {
        self.format_date("%B %-d, %Y", NO_DATE)
    }

    /// Short month and year, e.g. `Mar 2024`, or [`NOT_AVAILABLE`].
    pub fn month_year_tag(&self) -> String {
        self.format_date("%b %Y", NOT_AVAILABLE)
    }

    /// Four-digit year, or [`NOT_AVAILABLE`].
    pub fn year(&self) -> String {
        self.format_date("%Y", NOT_AVAILABLE)
    }

    fn format_date(&self, fmt: &str, sentinel: &str) -> String {
        match self.publish_date {
            Some(date) => date.format(fmt).to_string(),
            None => sentinel.to_owned(),
        }
    }
}

/// The URL path segment under which issues are published.
pub const ARCHIVE_PATH: &str = "archive";

/// Parses a publish-date string as written by hand in an issue's
/// `<meta name="publish-date">` tag. Values without a time of day are taken
/// as midnight UTC; values without an offset are taken as UTC. Returns `None`
/// for anything that can't be understood.
pub fn parse_publish_date(input: &str) -> Option<DateTime<Utc>> {
    const DATE_TIME_FORMATS: &[&str] = &[
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
    ];
    const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%B %d, %Y", "%b %d, %Y", "%d %B %Y"];

    let input = input.trim();
    if input.is_empty() {
        return None;
    }

    if let Ok(date) = DateTime::parse_from_rfc3339(input) {
        return Some(to_utc(date));
    }
    if let Ok(date) = DateTime::parse_from_rfc2822(input) {
        return Some(to_utc(date));
    }
    for fmt in DATE_TIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(input, fmt) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(input, fmt) {
            return date
                .and_hms_opt(0, 0, 0)
                .map(|naive| Utc.from_utc_datetime(&naive));
        }
    }
    None
}

fn to_utc(date: DateTime<FixedOffset>) -> DateTime<Utc> {
    date.with_timezone(&Utc)
}
