//! Startup configuration.
//!
//! Credentials and deployment knobs come from the environment (optionally
//! via a `.env` file). The keyword and source lists are compiled in.

use std::env;
use std::fmt;

use log::debug;

use crate::error::{RelayError, Result};
use crate::notify::DEFAULT_API_BASE;
use crate::source::forum::USER_AGENT;
use crate::source::scraper::{ScraperCommand, SCRAPER_TIMEOUT};
use crate::source::{http_client, DataSource, ForumSource, RssSource, ScraperSource};

/// Mining-related search terms.
pub const KEYWORDS: [&str; 7] = [
    "new mining app",
    "testnet mining",
    "depin crypto",
    "mobile mining",
    "airdrop mining",
    "crypto testnet",
    "mining opportunities",
];

/// Crypto news RSS feeds.
pub const FEED_URLS: [&str; 5] = [
    "https://cointelegraph.com/rss",
    "https://coindesk.com/arc/outboundfeeds/rss/",
    "https://cryptonews.com/news/feed/",
    "https://decrypt.co/feed",
    "https://www.coinbureau.com/feed/",
];

pub const FORUM_BASE: &str = "https://www.reddit.com";

pub const FORUM_BOARDS: [&str; 5] = [
    "CryptoCurrency",
    "defi",
    "CryptoMoonShots",
    "altcoin",
    "ethereum",
];

/// Only the first few keywords are handed to the external scraper; each
/// run can take up to its full timeout.
pub const SCRAPER_TERMS: usize = 2;

pub const DEFAULT_PORT: u16 = 10000;

pub const DEFAULT_SCRAPER: &str = "snscrape";

/// Which source families a run polls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceSelection {
    pub feeds: bool,
    pub forums: bool,
    pub scraper: bool,
}

impl Default for SourceSelection {
    fn default() -> Self {
        Self {
            feeds: true,
            forums: true,
            scraper: false,
        }
    }
}

#[derive(Clone)]
pub struct Config {
    pub bot_token: String,
    pub chat_id: String,
    pub api_base: String,
    /// Liveness endpoint port; only bound when the endpoint is enabled.
    pub port: u16,
    pub scraper: ScraperCommand,
    pub keywords: Vec<String>,
    pub feed_urls: Vec<String>,
    pub forum_base: String,
    pub forum_boards: Vec<String>,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("bot_token", &"<redacted>")
            .field("chat_id", &self.chat_id)
            .field("api_base", &self.api_base)
            .field("port", &self.port)
            .field("scraper", &self.scraper)
            .finish_non_exhaustive()
    }
}

impl Config {
    /// Load `.env` (if present) and read the process environment.
    pub fn load() -> Result<Self> {
        if let Ok(path) = dotenv::dotenv() {
            debug!("loaded environment from {}", path.display());
        }
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from any variable lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let bot_token = var("BOT_TOKEN").ok_or(RelayError::MissingVar("BOT_TOKEN"))?;
        let chat_id = var("CHAT_ID").ok_or(RelayError::MissingVar("CHAT_ID"))?;

        let port = match var("PORT") {
            Some(p) => p
                .parse::<u16>()
                .map_err(|e| RelayError::config(format!("invalid PORT {p:?}: {e}")))?,
            None => DEFAULT_PORT,
        };

        let scraper = var("SCRAPER_BIN")
            .and_then(|line| ScraperCommand::parse(&line))
            .or_else(|| ScraperCommand::parse(DEFAULT_SCRAPER))
            .ok_or_else(|| RelayError::config("empty scraper command"))?;

        Ok(Self {
            bot_token,
            chat_id,
            api_base: var("BOT_API_BASE").unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
            port,
            scraper,
            keywords: KEYWORDS.iter().map(|k| k.to_string()).collect(),
            feed_urls: FEED_URLS.iter().map(|u| u.to_string()).collect(),
            forum_base: FORUM_BASE.to_string(),
            forum_boards: FORUM_BOARDS.iter().map(|b| b.to_string()).collect(),
        })
    }

    /// Construct the enabled sources in polling order: feeds, forums, scraper.
    pub fn sources(&self, selection: SourceSelection) -> Result<Vec<Box<dyn DataSource>>> {
        let mut sources: Vec<Box<dyn DataSource>> = Vec::new();

        if selection.feeds {
            let client = http_client(None)?;
            for url in &self.feed_urls {
                sources.push(Box::new(RssSource::new(url, client.clone())));
            }
        }

        if selection.forums {
            let client = http_client(Some(USER_AGENT))?;
            for board in &self.forum_boards {
                sources.push(Box::new(ForumSource::board(
                    &self.forum_base,
                    board,
                    client.clone(),
                )));
            }
        }

        if selection.scraper {
            for term in self.keywords.iter().take(SCRAPER_TERMS) {
                sources.push(Box::new(ScraperSource::new(
                    self.scraper.clone(),
                    term,
                    SCRAPER_TIMEOUT,
                )));
            }
        }

        Ok(sources)
    }
}
