//! RSS feed source implementation.
//!
//! Fetches an RSS 2.0 channel over HTTP with the [`rss`] crate, keeps the
//! newest [`NEWEST_LIMIT`] entries and passes on those whose title or
//! description mentions a keyword.

use log::debug;
use reqwest::blocking::Client;

use super::{Candidate, DataSource, ItemMeta, SourceKind, NEWEST_LIMIT};
use crate::error::{RelayError, Result};
use crate::filter::KeywordFilter;

/// Label used when a channel has no title of its own.
const DEFAULT_FEED_TITLE: &str = "News";

/// An RSS feed data source.
pub struct RssSource {
    /// The feed URL to poll.
    pub url: String,
    client: Client,
}

impl RssSource {
    /// Create a new RSS source.
    ///
    /// * `url`: full URL of the RSS feed (e.g. `https://decrypt.co/feed`).
    /// * `client`: shared blocking client; its timeout bounds the fetch.
    pub fn new(url: impl Into<String>, client: Client) -> Self {
        Self {
            url: url.into(),
            client,
        }
    }

    /// Turn an already-fetched [`rss::Channel`] into keyword-matching
    /// [`Candidate`]s.
    ///
    /// This is a pure function (no I/O) so that tests can exercise the
    /// parsing and filtering without hitting the network.
    pub fn parse_channel(channel: &rss::Channel, keywords: &KeywordFilter) -> Vec<Candidate> {
        let feed_title = match channel.title().trim() {
            "" => DEFAULT_FEED_TITLE.to_string(),
            title => title.to_string(),
        };

        channel
            .items()
            .iter()
            .take(NEWEST_LIMIT)
            .filter_map(|item| {
                let title = item.title().unwrap_or_default();
                let description = item.description().unwrap_or_default();
                if !keywords.matches_parts(title, description) {
                    return None;
                }

                let link = item.link().unwrap_or_default().to_string();
                // Prefer <link>, fall back to <guid>, then the title.
                let id = Some(link.as_str())
                    .filter(|l| !l.is_empty())
                    .map(String::from)
                    .or_else(|| item.guid().map(|g| g.value().to_string()))
                    .unwrap_or_else(|| title.to_string());

                Some(Candidate {
                    id,
                    title: title.to_string(),
                    body: description.to_string(),
                    link,
                    meta: ItemMeta::Feed {
                        feed_title: feed_title.clone(),
                        published: item.pub_date().map(String::from),
                    },
                })
            })
            .collect()
    }
}

impl DataSource for RssSource {
    fn name(&self) -> &str {
        &self.url
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Feed
    }

    fn fetch(&self, keywords: &KeywordFilter) -> Result<Vec<Candidate>> {
        let response = self.client.get(&self.url).send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(RelayError::Status {
                status,
                body: response.text().unwrap_or_default(),
            });
        }

        let body = response.bytes()?;
        let channel = rss::Channel::read_from(body.as_ref())?;
        debug!("{}: {} entries in channel", self.url, channel.items().len());
        Ok(Self::parse_channel(&channel, keywords))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
