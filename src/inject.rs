//! Support for injecting the archive listing into the archive page template.
//!
//! The template carries a single placeholder of the form
//!
//! ```js
//! const newsletters = []; /* NEWSLETTER_DATA_PLACEHOLDER */
//! ```
//!
//! which is replaced by the same assignment bound to the serialized
//! collection. The marker comment is kept in the output, so a page that was
//! already generated can itself serve as the template for the next run: the
//! old listing is replaced rather than duplicated.

use std::fmt;
use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::issue::IssueRecord;

/// The variable the archive page reads its listing from.
pub const DATA_VARIABLE: &str = "newsletters";

/// The comment marking the placeholder assignment.
pub const PLACEHOLDER_MARKER: &str = "/* NEWSLETTER_DATA_PLACEHOLDER */";

static MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/\*\s*NEWSLETTER_DATA_PLACEHOLDER\s*\*/").unwrap());

static ASSIGNMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"const\s+newsletters\s*=\s*\[").unwrap());

static CLOSING: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\]\s*;\s*\z").unwrap());

/// One entry of the archive listing as the archive page's script sees it.
#[derive(Serialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveEntry<'a> {
    pub title: &'a str,
    pub date: String,
    pub month_year: String,
    pub year: String,
    pub excerpt: &'a str,
    pub href: &'a str,
}

impl<'a> From<&'a IssueRecord> for ArchiveEntry<'a> {
    /// Converts an [`IssueRecord`] into the shape rendered by the archive
    /// page.
    fn from(record: &'a IssueRecord) -> ArchiveEntry<'a> {
        ArchiveEntry {
            title: record.title(),
            date: record.display_date(),
            month_year: record.month_year_tag(),
            year: record.year(),
            excerpt: record.excerpt(),
            href: record.link(),
        }
    }
}

/// The outcome of an injection.
#[derive(Debug, PartialEq)]
pub enum Injection {
    /// The placeholder was found and replaced.
    Replaced(String),

    /// The template had no placeholder; the contained document is the
    /// template, unchanged.
    PlaceholderMissing(String),
}

impl Injection {
    /// Returns the output document regardless of the outcome.
    pub fn into_document(self) -> String {
        match self {
            Injection::Replaced(document) => document,
            Injection::PlaceholderMissing(document) => document,
        }
    }
}

/// Substitutes `records` into the first placeholder in `template`. Only the
/// placeholder span is touched; the rest of the template is copied through
/// byte for byte.
pub fn inject<'a, I>(template: &str, records: I) -> Result<Injection>
where
    I: IntoIterator<Item = &'a IssueRecord>,
{
    let span = match find_placeholder(template) {
        Some(span) => span,
        None => return Ok(Injection::PlaceholderMissing(template.to_owned())),
    };
    let assignment = format!(
        "const {} = {}; {}",
        DATA_VARIABLE,
        to_data_literal(records)?,
        PLACEHOLDER_MARKER
    );
    let mut document = String::with_capacity(template.len() + assignment.len());
    document.push_str(&template[..span.start]);
    document.push_str(&assignment);
    document.push_str(&template[span.end..]);
    Ok(Injection::Replaced(document))
}

/// Locates the first placeholder: a marker comment immediately preceded by
/// `const newsletters = [...];`. The assignment is the closest one before the
/// marker, so an unrelated `const newsletters = [...]` earlier in the page
/// (e.g., in a comment) is never swallowed into the span.
fn find_placeholder(template: &str) -> Option<Range<usize>> {
    MARKER.find_iter(template).find_map(|marker| {
        let head = &template[..marker.start()];
        let start = ASSIGNMENT.find_iter(head).last()?.start();
        if CLOSING.is_match(&head[start..]) {
            Some(start..marker.end())
        } else {
            None
        }
    })
}

/// Serializes `records` as a pretty-printed JSON array (4-space indent) that
/// is safe to embed in an inline `<script>`: `<` is escaped so no record can
/// close the script element, `*/` is escaped so no record can end (or forge)
/// the placeholder's marker comment, and `=` is escaped so no record can forge
/// the placeholder's assignment. None of these occur in JSON syntax outside of
/// strings.
pub fn to_data_literal<'a, I>(records: I) -> Result<String>
where
    I: IntoIterator<Item = &'a IssueRecord>,
{
    let entries: Vec<ArchiveEntry> = records.into_iter().map(ArchiveEntry::from).collect();

    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    entries.serialize(&mut serializer)?;

    // serde_json only ever produces valid UTF-8.
    let json = String::from_utf8_lossy(&buf);
    Ok(json
        .replace('<', "\\u003c")
        .replace('=', "\\u003d")
        .replace("*/", "*\\/"))
}

/// Represents the result of an injection.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents a problem serializing the archive listing.
#[derive(Debug)]
pub enum Error {
    /// Returned when the listing can't be serialized.
    Serialize(serde_json::Error),
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Serialize(_) => f.write_str("Serializing archive listing"),
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Serialize(err) => Some(err),
        }
    }
}

impl From<serde_json::Error> for Error {
    /// Converts a [`serde_json::Error`] into an [`Error`]. This allows us to
    /// use the `?` operator when serializing.
    fn from(err: serde_json::Error) -> Error {
        Error::Serialize(err)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::issue::parse_publish_date;

    const TEMPLATE: &str = r#"<html>
<body>
<ul id="list"></ul>
<script>
    const newsletters = [];   /* NEWSLETTER_DATA_PLACEHOLDER */
    render(newsletters);
</script>
</body>
</html>
"#;

    fn record(title: &str, date: Option<&str>, excerpt: &str) -> IssueRecord {
        IssueRecord::new(
            title.to_owned(),
            date.and_then(parse_publish_date),
            excerpt.to_owned(),
            excerpt.to_owned(),
            &format!("{}.html", title.to_lowercase()),
        )
    }

    fn records() -> Vec<IssueRecord> {
        vec![
            record("B", Some("2024-03-15"), "Second"),
            record("A", None, "First"),
        ]
    }

    fn listing(document: &str) -> serde_json::Value {
        let start = document.find("const newsletters = ").unwrap() + "const newsletters = ".len();
        let end = document.find(PLACEHOLDER_MARKER).unwrap();
        let literal = document[start..end].trim_end().trim_end_matches(';');
        serde_json::from_str(literal).unwrap()
    }

    #[test]
    fn test_inject_replaces_placeholder() -> Result<()> {
        let document = match inject(TEMPLATE, &records())? {
            Injection::Replaced(document) => document,
            other => panic!("unexpected {:?}", other),
        };

        assert!(document.starts_with("<html>\n<body>\n<ul id=\"list\"></ul>\n<script>\n    const newsletters = [\n    {\n        \"title\": \"B\",\n"));
        assert!(document.ends_with("    render(newsletters);\n</script>\n</body>\n</html>\n"));
        assert_eq!(1, document.matches(PLACEHOLDER_MARKER).count());

        let value = listing(&document);
        assert_eq!(
            serde_json::json!([
                {
                    "title": "B",
                    "date": "March 15, 2024",
                    "monthYear": "Mar 2024",
                    "year": "2024",
                    "excerpt": "Second",
                    "href": "archive/b.html",
                },
                {
                    "title": "A",
                    "date": "No Date",
                    "monthYear": "N/A",
                    "year": "N/A",
                    "excerpt": "First",
                    "href": "archive/a.html",
                },
            ]),
            value
        );
        Ok(())
    }

    #[test]
    fn test_inject_is_idempotent() -> Result<()> {
        let once = inject(TEMPLATE, &records())?.into_document();
        let twice = inject(&once, &records())?.into_document();
        assert_eq!(once, twice);
        Ok(())
    }

    #[test]
    fn test_inject_refreshes_previous_output() -> Result<()> {
        let old = inject(TEMPLATE, &records()[1..])?.into_document();
        let new = inject(&old, &records())?.into_document();
        assert_eq!(inject(TEMPLATE, &records())?.into_document(), new);
        assert_eq!(2, listing(&new).as_array().unwrap().len());
        Ok(())
    }

    #[test]
    fn test_inject_without_placeholder() -> Result<()> {
        let template = "<script>const newsletters = [];</script>";
        assert_eq!(
            Injection::PlaceholderMissing(template.to_owned()),
            inject(template, &records())?
        );
        Ok(())
    }

    #[test]
    fn test_inject_only_first_placeholder() -> Result<()> {
        let template = format!("{}\n{}", TEMPLATE, TEMPLATE);
        let document = inject(&template, &records())?.into_document();
        assert_eq!(1, document.matches("const newsletters = [];").count());
        Ok(())
    }

    #[test]
    fn test_inject_tolerates_line_breaks() -> Result<()> {
        let template = "const   newsletters =\n  [\n  ]\n;\n/*NEWSLETTER_DATA_PLACEHOLDER*/";
        assert!(matches!(
            inject(template, &records())?,
            Injection::Replaced(_)
        ));
        Ok(())
    }

    #[test]
    fn test_inject_keeps_earlier_assignment() -> Result<()> {
        let decoy = "<script>\n// const newsletters = [legacy]; kept\nfunction render(list) {}\n</script>\n";
        let template = format!("{}{}", decoy, TEMPLATE);
        let document = match inject(&template, &records())? {
            Injection::Replaced(document) => document,
            other => panic!("unexpected {:?}", other),
        };

        assert!(document.starts_with(decoy));
        assert_eq!(
            inject(TEMPLATE, &records())?.into_document(),
            document[decoy.len()..]
        );
        assert_eq!(2, listing(&document[decoy.len()..]).as_array().unwrap().len());
        Ok(())
    }

    #[test]
    fn test_inject_skips_marker_without_assignment() -> Result<()> {
        let template = format!("<!-- {} -->\n{}", PLACEHOLDER_MARKER, TEMPLATE);
        let document = inject(&template, &records())?.into_document();
        assert!(document.starts_with(&format!("<!-- {} -->\n<html>", PLACEHOLDER_MARKER)));
        assert!(!document.contains("const newsletters = [];"));
        Ok(())
    }

    #[test]
    fn test_inject_empty_collection() -> Result<()> {
        let document = inject(TEMPLATE, std::iter::empty())?.into_document();
        assert!(document.contains("const newsletters = []; /* NEWSLETTER_DATA_PLACEHOLDER */"));
        Ok(())
    }

    #[test]
    fn test_data_literal_cannot_escape_script() -> Result<()> {
        let hostile = record(
            "X",
            None,
            "</script><script>alert(1)</script> ]; const newsletters = [1]; /* NEWSLETTER_DATA_PLACEHOLDER */",
        );
        let literal = to_data_literal(std::iter::once(&hostile))?;
        assert!(!literal.contains("</script>"));
        assert!(!literal.contains("*/"));
        assert!(!literal.contains("newsletters ="));

        let document = inject(TEMPLATE, std::iter::once(&hostile))?.into_document();
        let again = inject(&document, std::iter::once(&hostile))?.into_document();
        assert_eq!(document, again);
        assert_eq!(
            hostile.excerpt(),
            listing(&document)[0]["excerpt"].as_str().unwrap()
        );
        Ok(())
    }
}
