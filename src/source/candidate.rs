//! The item type shared by every source.
//!
//! `Candidate` is one piece of content fetched during a poll cycle, before
//! the de-duplication decision. Each source converts its native format into
//! this struct; the kind-specific fields live in [`ItemMeta`] so that the
//! formatter can pick the right layout without knowing where the item came
//! from.
//!
//! ## For contributors
//!
//! Adding a source kind means adding a [`SourceKind`] variant, a matching
//! [`ItemMeta`] variant and a layout in `format.rs`. The poll loop and the
//! dedup store need no changes.

use std::fmt;

use chrono::{DateTime, Utc};

/// Category of origin. Partitions dedup state and selects the alert layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    Feed,
    Forum,
    External,
}

impl SourceKind {
    /// Maximum body length (in characters) before the formatter truncates.
    ///
    /// External posts are short already and are never cut.
    pub fn snippet_limit(self) -> Option<usize> {
        match self {
            SourceKind::Feed => Some(200),
            SourceKind::Forum => Some(150),
            SourceKind::External => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SourceKind::Feed => "news",
            SourceKind::Forum => "reddit",
            SourceKind::External => "twitter",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind-specific metadata carried alongside the common fields.
#[derive(Debug, Clone, PartialEq)]
pub enum ItemMeta {
    Feed {
        /// Channel title of the feed, e.g. "Cointelegraph.com News".
        feed_title: String,
        /// Raw publish date string as found in the feed.
        published: Option<String>,
    },
    Forum {
        /// Board name without the `r/` prefix.
        forum: String,
        score: i64,
        created: Option<DateTime<Utc>>,
    },
    External {
        author: String,
    },
}

/// A single fetched item, normalised from any source.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    /// Dedup key, stable for the lifetime of the process.
    ///
    /// Feeds use the entry link (falling back to guid), the forum uses the
    /// post id and the scraper uses the platform id.
    pub id: String,

    pub title: String,

    /// Description, self-text or post content. Untruncated.
    pub body: String,

    pub link: String,

    pub meta: ItemMeta,
}

impl Candidate {
    pub fn kind(&self) -> SourceKind {
        match self.meta {
            ItemMeta::Feed { .. } => SourceKind::Feed,
            ItemMeta::Forum { .. } => SourceKind::Forum,
            ItemMeta::External { .. } => SourceKind::External,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
