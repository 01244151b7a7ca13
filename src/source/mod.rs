//! Data source abstraction layer.
//!
//! This module defines the [`DataSource`] trait and the common [`Candidate`]
//! type. Concrete sources live in sub-modules: [`rss`] for syndication
//! feeds, [`forum`] for the forum JSON listings and [`scraper`] for the
//! optional external command-line scraper.
//!
//! ## For contributors: adding a new source
//!
//! 1. Create a new file in this directory (e.g. `atom.rs`).
//! 2. Define a struct and implement [`DataSource`] for it.
//! 3. Add `mod atom;` below and re-export your struct in the `pub use` block.
//! 4. Construct it in `config.rs` (`Config::sources`).
//!
//! The poll loop, de-duplication and formatting are source-agnostic.

mod candidate;
pub mod forum;
pub mod rss;
pub mod scraper;

pub use candidate::{Candidate, ItemMeta, SourceKind};
pub use forum::ForumSource;
pub use self::rss::RssSource;
pub use scraper::ScraperSource;

use std::time::Duration;

use reqwest::blocking::Client;

use crate::error::Result;
use crate::filter::KeywordFilter;

/// Only the newest entries of each feed or board are considered.
pub const NEWEST_LIMIT: usize = 5;

/// Timeout applied to every outbound HTTP request.
pub const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Trait that every data source must implement.
///
/// The poll loop calls [`fetch()`](DataSource::fetch) once per cycle,
/// sources one after another. An `Err` is logged by the loop and counted
/// as zero items from this source for the cycle; sibling sources still run.
pub trait DataSource: Send {
    /// Human-readable label used in log lines.
    fn name(&self) -> &str;

    fn kind(&self) -> SourceKind;

    /// Fetch this cycle's candidates.
    ///
    /// Sources that match on content apply `keywords` (and any threshold of
    /// their own) before returning; items that fail are dropped here and
    /// never reach the dedup store.
    fn fetch(&self, keywords: &KeywordFilter) -> Result<Vec<Candidate>>;
}

/// Build the blocking HTTP client used by sources and the notifier.
pub fn http_client(user_agent: Option<&str>) -> Result<Client> {
    let mut builder = Client::builder().timeout(HTTP_TIMEOUT);
    if let Some(ua) = user_agent {
        builder = builder.user_agent(ua);
    }
    Ok(builder.build()?)
}
