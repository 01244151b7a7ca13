//! Error types shared by every stage of the relay.
//!
//! Fetch and delivery failures are ordinary values: each source returns a
//! [`Result`] and the poll loop turns an `Err` into "zero items from this
//! source" instead of aborting the cycle.

use std::time::Duration;

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, RelayError>;

#[derive(Debug, Error)]
pub enum RelayError {
    /// A required environment variable is unset or blank.
    #[error("{0} not found; set it in the environment or a .env file")]
    MissingVar(&'static str),

    /// Any other invalid configuration value.
    #[error("configuration error: {0}")]
    Config(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The remote answered, but not with a success status.
    #[error("unexpected HTTP status {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("feed parse error: {0}")]
    Feed(#[from] rss::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The external scraper exited unsuccessfully or produced bad output.
    #[error("scraper error: {0}")]
    Scraper(String),

    #[error("timed out after {0:?}")]
    Timeout(Duration),
}

impl RelayError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn scraper(message: impl Into<String>) -> Self {
        Self::Scraper(message.into())
    }
}
