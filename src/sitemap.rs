//! Sitemap generation.
//!
//! Lists the site root and every issue for search engine indexing:
//!
//! ```xml
//! <?xml version="1.0" encoding="UTF-8"?>
//! <urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
//!   <url>
//!     <loc>https://example.com/</loc>
//!     <lastmod>2025-01-01</lastmod>
//!     <priority>1.0</priority>
//!   </url>
//! </urlset>
//! ```

use std::borrow::Cow;

use chrono::NaiveDate;
use url::Url;

use crate::issue::IssueRecord;

const SITEMAP_NS: &str = "http://www.sitemaps.org/schemas/sitemap/0.9";

const ROOT_PRIORITY: &str = "1.0";
const ISSUE_PRIORITY: &str = "0.8";

struct UrlEntry {
    loc: Url,
    lastmod: NaiveDate,
    priority: &'static str,
}

/// Builds the sitemap for `records` rooted at `base_url`. `today` is used as
/// the `lastmod` of the site root and of any undated issue.
pub fn build_sitemap(
    base_url: &Url,
    records: &[IssueRecord],
    today: NaiveDate,
) -> Result<String, url::ParseError> {
    let mut urls = Vec::with_capacity(records.len() + 1);
    urls.push(UrlEntry {
        loc: base_url.clone(),
        lastmod: today,
        priority: ROOT_PRIORITY,
    });
    for record in records {
        urls.push(UrlEntry {
            loc: base_url.join(record.link())?,
            lastmod: record
                .publish_date()
                .map(|date| date.date_naive())
                .unwrap_or(today),
            priority: ISSUE_PRIORITY,
        });
    }
    Ok(into_xml(urls))
}

fn into_xml(urls: Vec<UrlEntry>) -> String {
    let mut xml = String::with_capacity(256 * (urls.len() + 1));

    xml.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    xml.push_str("<urlset xmlns=\"");
    xml.push_str(SITEMAP_NS);
    xml.push_str("\">\n");

    for entry in urls {
        xml.push_str("  <url>\n    <loc>");
        xml.push_str(&escape_xml(entry.loc.as_str()));
        xml.push_str("</loc>\n    <lastmod>");
        xml.push_str(&entry.lastmod.format("%Y-%m-%d").to_string());
        xml.push_str("</lastmod>\n    <priority>");
        xml.push_str(entry.priority);
        xml.push_str("</priority>\n  </url>\n");
    }

    xml.push_str("</urlset>\n");
    xml
}

/// Escape special XML characters.
fn escape_xml(s: &str) -> Cow<'_, str> {
    if !s.contains(['&', '<', '>', '"', '\'']) {
        return Cow::Borrowed(s);
    }

    Cow::Owned(
        s.replace('&', "&amp;")
            .replace('<', "&lt;")
            .replace('>', "&gt;")
            .replace('"', "&quot;")
            .replace('\'', "&apos;"),
    )
}
