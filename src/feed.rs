//! Support for creating an RSS 2.0 feed from a list of issues.

use std::fmt;
use std::io::Write;

use chrono::{DateTime, Utc};
use rss::{Channel, ChannelBuilder, GuidBuilder, Item, ItemBuilder};
use url::Url;

use crate::issue::IssueRecord;

/// The default maximum number of items in a feed.
pub const DEFAULT_FEED_LIMIT: usize = 50;

/// Bundled configuration for creating a feed.
pub struct FeedConfig<'a> {
    pub title: &'a str,
    pub description: &'a str,

    /// The public root of the site, with a trailing slash. Item links are
    /// resolved against it.
    pub base_url: &'a Url,

    /// The maximum number of items; only the first `limit` records are used.
    pub limit: usize,
}

/// Creates a feed from some configuration ([`FeedConfig`]) and a list of
/// [`IssueRecord`]s (expected newest first) and writes the result to a
/// [`std::io::Write`].
pub fn write_feed<'a, I, W>(config: &FeedConfig, records: I, w: W) -> Result<()>
where
    I: IntoIterator<Item = &'a IssueRecord>,
    W: Write,
{
    feed(config, records)?.write_to(w)?;
    Ok(())
}

fn feed<'a, I>(config: &FeedConfig, records: I) -> Result<Channel>
where
    I: IntoIterator<Item = &'a IssueRecord>,
{
    Ok(ChannelBuilder::default()
        .title(config.title)
        .link(config.base_url.as_str())
        .description(config.description)
        .items(feed_items(config, records)?)
        .build())
}

fn feed_items<'a, I>(config: &FeedConfig, records: I) -> Result<Vec<Item>>
where
    I: IntoIterator<Item = &'a IssueRecord>,
{
    records
        .into_iter()
        .take(config.limit)
        .map(|record| {
            let link = config.base_url.join(record.link())?.to_string();
            Ok(ItemBuilder::default()
                .title(Some(record.title().to_owned()))
                .link(Some(link.clone()))
                .description(Some(record.excerpt_html().to_owned()))
                .pub_date(record.publish_date().map(rfc1123))
                .guid(Some(GuidBuilder::default().permalink(true).value(link).build()))
                .build())
        })
        .collect()
}

/// Formats a date the way HTTP and most feed readers expect, e.g.
/// `Fri, 15 Mar 2024 00:00:00 GMT`.
fn rfc1123(date: DateTime<Utc>) -> String {
    date.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

type Result<T> = std::result::Result<T, Error>;

/// Represents a problem creating a feed. Variants include I/O, RSS, and URL
/// issues.
#[derive(Debug)]
pub enum Error {
    /// Returned when there is a generic I/O error.
    Io(std::io::Error),

    /// Returned when there is an RSS-related error.
    Rss(rss::Error),

    /// Returned when an issue's link can't be resolved against the base URL.
    UrlParse(url::ParseError),
}

impl fmt::Display for Error {
    /// Implements [`fmt::Display`] for [`Error`].
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Io(err) => err.fmt(f),
            Error::Rss(err) => err.fmt(f),
            Error::UrlParse(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for Error {
    /// Implements [`std::error::Error`] for [`Error`]. Every variant displays
    /// as its inner error, so the inner error's source is passed through.
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => std::error::Error::source(err),
            Error::Rss(err) => std::error::Error::source(err),
            Error::UrlParse(err) => std::error::Error::source(err),
        }
    }
}

impl From<std::io::Error> for Error {
    /// Converts [`std::io::Error`]s into [`Error`]. This allows us to use the
    /// `?` operator in fallible feed operations.
    fn from(err: std::io::Error) -> Error {
        Error::Io(err)
    }
}

impl From<rss::Error> for Error {
    /// Converts [`rss::Error`]s into [`Error`]. This allows us to use the `?`
    /// operator in fallible feed operations.
    fn from(err: rss::Error) -> Error {
        Error::Rss(err)
    }
}

impl From<url::ParseError> for Error {
    /// Converts [`url::ParseError`]s into [`Error`]. This allows us to use the
    /// `?` operator when resolving item links.
    fn from(err: url::ParseError) -> Error {
        Error::UrlParse(err)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::issue::parse_publish_date;

    fn record(file_name: &str, date: Option<&str>) -> IssueRecord {
        IssueRecord::new(
            format!("Issue {}", file_name),
            date.and_then(parse_publish_date),
            "plain".to_owned(),
            r#"Read <a href="https://example.com">more</a> & enjoy"#.to_owned(),
            file_name,
        )
    }

    fn render(records: &[IssueRecord], limit: usize) -> std::result::Result<Channel, Box<dyn std::error::Error>> {
        let base_url = Url::parse("https://newsletter.example.org/")?;
        let config = FeedConfig {
            title: "Berlin Daily",
            description: "Your daily dose of Berlin news.",
            base_url: &base_url,
            limit,
        };
        let mut buf = Vec::new();
        write_feed(&config, records, &mut buf)?;
        Ok(Channel::read_from(&buf[..])?)
    }

    #[test]
    fn test_feed_items() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let channel = render(
            &[record("b.html", Some("2024-03-15")), record("a.html", None)],
            DEFAULT_FEED_LIMIT,
        )?;

        assert_eq!("Berlin Daily", channel.title());
        assert_eq!("https://newsletter.example.org/", channel.link());
        assert_eq!(2, channel.items().len());

        let item = &channel.items()[0];
        assert_eq!(Some("Issue b.html"), item.title());
        assert_eq!(Some("https://newsletter.example.org/archive/b.html"), item.link());
        assert_eq!(
            Some(r#"Read <a href="https://example.com">more</a> & enjoy"#),
            item.description()
        );
        assert_eq!(Some("Fri, 15 Mar 2024 00:00:00 GMT"), item.pub_date());
        let guid = item.guid().unwrap();
        assert_eq!("https://newsletter.example.org/archive/b.html", guid.value());
        assert!(guid.is_permalink());

        assert_eq!(None, channel.items()[1].pub_date());
        Ok(())
    }

    #[test]
    fn test_feed_is_bounded() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let records: Vec<IssueRecord> = (0..120)
            .map(|i| record(&format!("{:03}.html", i), Some("2024-01-01")))
            .collect();

        let channel = render(&records, DEFAULT_FEED_LIMIT)?;
        assert_eq!(DEFAULT_FEED_LIMIT, channel.items().len());
        assert_eq!(Some("Issue 000.html"), channel.items()[0].title());

        assert_eq!(3, render(&records, 3)?.items().len());
        assert_eq!(0, render(&[], DEFAULT_FEED_LIMIT)?.items().len());
        Ok(())
    }

    #[test]
    fn test_feed_link_is_percent_encoded() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let channel = render(&[record("my issue.html", None)], DEFAULT_FEED_LIMIT)?;
        assert_eq!(
            Some("https://newsletter.example.org/archive/my%20issue.html"),
            channel.items()[0].link()
        );
        Ok(())
    }
}
