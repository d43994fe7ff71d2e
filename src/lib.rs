//! The library code for the `gazette` newsletter archive builder. A build can
//! be broken down into three steps:
//!
//! 1. Collecting issues from the archive directory ([`crate::collection`]),
//!    which lists the issue documents and scrapes an
//!    [`crate::issue::IssueRecord`] out of each ([`crate::extract`]).
//! 2. Rendering the outputs from the collected records: the archive page
//!    ([`crate::inject`]), the RSS feed ([`crate::feed`]), and the sitemap
//!    ([`crate::sitemap`]).
//! 3. Writing the outputs to disk ([`crate::write`]).
//!
//! Scraping is forgiving: a sparse or malformed issue still yields a record,
//! with sentinel values standing in for whatever is missing. Everything else
//! is strict: if the archive directory, an issue, or the archive template
//! can't be read, the build stops before any output is written.

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]

pub mod build;
pub mod collection;
pub mod config;
pub mod extract;
pub mod feed;
pub mod inject;
pub mod issue;
pub mod sitemap;
pub mod write;
