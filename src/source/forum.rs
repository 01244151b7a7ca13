//! Forum board source (Reddit-style `new.json` listings).
//!
//! The listing is shaped `{ data: { children: [ { data: {...post} } ] } }`.
//! Only the newest [`NEWEST_LIMIT`] posts are looked at, and a post must
//! both mention a keyword and have a score above [`MIN_SCORE`].

use chrono::DateTime;
use log::debug;
use reqwest::blocking::Client;
use serde::Deserialize;

use super::{Candidate, DataSource, ItemMeta, SourceKind, NEWEST_LIMIT};
use crate::error::{RelayError, Result};
use crate::filter::KeywordFilter;

/// Posts need strictly more than this many points.
pub const MIN_SCORE: i64 = 5;

/// Sent with every listing request; the forum API throttles anonymous agents.
pub const USER_AGENT: &str = "rust:alert-relay:v0.1.0 (keyword alert relay)";

/// Prefix for post permalinks, which the API returns host-relative.
const PERMALINK_BASE: &str = "https://reddit.com";

#[derive(Debug, Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Debug, Deserialize)]
struct ListingData {
    #[serde(default)]
    children: Vec<Child>,
}

#[derive(Debug, Deserialize)]
struct Child {
    data: Post,
}

#[derive(Debug, Deserialize)]
struct Post {
    #[serde(default)]
    id: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    selftext: String,
    #[serde(default)]
    permalink: String,
    #[serde(default)]
    score: i64,
    #[serde(default)]
    created_utc: f64,
}

pub struct ForumSource {
    /// Board name, e.g. `"defi"`.
    pub forum: String,
    pub url: String,
    client: Client,
}

impl ForumSource {
    pub fn new(forum: impl Into<String>, url: impl Into<String>, client: Client) -> Self {
        Self {
            forum: forum.into(),
            url: url.into(),
            client,
        }
    }

    /// Source for `<base>/r/<forum>/new.json?limit=10`.
    pub fn board(base: &str, forum: &str, client: Client) -> Self {
        let url = format!("{}/r/{forum}/new.json?limit=10", base.trim_end_matches('/'));
        Self::new(forum, url, client)
    }

    /// Parse a listing body into candidates that pass the keyword filter and
    /// score threshold.
    pub fn parse_listing(
        body: &[u8],
        forum: &str,
        keywords: &KeywordFilter,
    ) -> Result<Vec<Candidate>> {
        let listing: Listing = serde_json::from_slice(body)?;

        let items = listing
            .data
            .children
            .into_iter()
            .take(NEWEST_LIMIT)
            .map(|child| child.data)
            .filter(|post| post.score > MIN_SCORE)
            .filter(|post| keywords.matches_parts(&post.title, &post.selftext))
            .map(|post| Candidate {
                link: format!("{PERMALINK_BASE}{}", post.permalink),
                id: post.id,
                title: post.title,
                body: post.selftext,
                meta: ItemMeta::Forum {
                    forum: forum.to_string(),
                    score: post.score,
                    created: DateTime::from_timestamp(post.created_utc as i64, 0),
                },
            })
            .collect();

        Ok(items)
    }
}

impl DataSource for ForumSource {
    fn name(&self) -> &str {
        &self.forum
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Forum
    }

    fn fetch(&self, keywords: &KeywordFilter) -> Result<Vec<Candidate>> {
        let response = self.client.get(&self.url).send()?;
        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(RelayError::Status {
                status,
                body: response.text().unwrap_or_default(),
            });
        }

        let body = response.bytes()?;
        let items = Self::parse_listing(&body, &self.forum, keywords)?;
        debug!("r/{}: {} matching posts", self.forum, items.len());
        Ok(items)
    }
}
