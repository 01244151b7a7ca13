//! alert-relay polls news feeds and forum boards for keyword matches and
//! relays them to a chat through a bot API.
//!
//! ## Architecture overview
//!
//! ```text
//! ┌───────────┐ Candidate ┌──────────┐  new?  ┌──────────┐ HTML ┌───────────┐
//! │ source/*  │ ────────► │ poll.rs  │ ─────► │format.rs │ ───► │ notify.rs │
//! │ (fetch)   │           │ (loop)   │ dedup  └──────────┘      │ (bot API) │
//! └───────────┘           └──────────┘                          └───────────┘
//!      ▲ keywords              ▲ stop
//! ┌───────────┐           ┌──────────┐         ┌───────────┐
//! │ filter.rs │           │signal.rs │         │ health.rs │ (own thread)
//! └───────────┘           └──────────┘         └───────────┘
//! ```
//!
//! * **`source/`**: the `DataSource` trait plus feed, forum and scraper sources.
//! * **`poll`**: owns the loop state and runs fetch → dedup → notify cycles.
//! * **`main`**: loads configuration, checks the bot, then hands over to `poll`.

mod config;
mod dedup;
mod error;
mod filter;
mod format;
mod health;
mod notify;
mod poll;
mod signal;
mod source;
#[cfg(test)]
mod testutil;

use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use log::{error, info};

use config::{Config, SourceSelection};
use filter::KeywordFilter;
use notify::{Notifier, TelegramNotifier};
use poll::{Poller, RunMode, Timing};

/// Keyword alert relay for crypto news and forums
#[derive(Parser, Debug)]
#[command(name = "alert-relay", version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Run a single cycle and exit
    #[arg(long)]
    once: bool,

    /// Seconds between cycles (default: 600, or 300 with --forum-only)
    #[arg(long)]
    interval: Option<u64>,

    /// Seconds to wait after a failed cycle
    #[arg(long, default_value_t = poll::RECOVERY_INTERVAL.as_secs())]
    retry: u64,

    /// Poll only the forum boards
    #[arg(long)]
    forum_only: bool,

    /// Also run the external scraper for the first search terms
    #[arg(long)]
    scraper: bool,

    /// Serve a liveness endpoint on $PORT
    #[arg(long)]
    health: bool,
}

impl Cli {
    fn selection(&self) -> SourceSelection {
        SourceSelection {
            feeds: !self.forum_only,
            forums: true,
            scraper: self.scraper && !self.forum_only,
        }
    }

    fn timing(&self) -> Timing {
        let default_interval = if self.forum_only {
            poll::SINGLE_SOURCE_INTERVAL
        } else {
            poll::MULTI_SOURCE_INTERVAL
        };
        Timing {
            interval: self
                .interval
                .map(Duration::from_secs)
                .unwrap_or(default_interval),
            recovery: Duration::from_secs(self.retry),
            ..Timing::default()
        }
    }
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Send the startup message once, without retry. An error means the
/// monitor must not start.
fn connectivity_check(notifier: &dyn Notifier, keywords: &[String]) -> Result<()> {
    info!("testing bot connectivity");
    notifier
        .send(&format::connectivity_message(keywords))
        .context("connectivity check failed")?;
    info!("bot test message sent");
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    // -- starting: configuration -------------------------------------------
    let config = Config::load().context("failed to load configuration")?;
    info!("bot configured with CHAT_ID: {}", config.chat_id);

    if cli.health {
        let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, config.port));
        health::spawn(addr).with_context(|| format!("failed to bind health endpoint on {addr}"))?;
    }

    let notifier = TelegramNotifier::new(
        source::http_client(None)?,
        &config.api_base,
        &config.bot_token,
        &config.chat_id,
    );

    // -- testing: one connectivity check, no retry ---------------------------
    if let Err(e) = connectivity_check(&notifier, &config.keywords) {
        error!("bot test failed; not starting the monitor: {e:#}");
        return Err(e);
    }

    // -- running -------------------------------------------------------------
    let sources = config.sources(cli.selection())?;
    let stop = signal::install();
    let mut poller = Poller::new(
        sources,
        KeywordFilter::new(&config.keywords),
        Box::new(notifier),
        cli.timing(),
    );

    let mode = if cli.once { RunMode::Once } else { RunMode::Forever };
    if !poller.run(&stop, mode) && mode == RunMode::Once {
        bail!("poll cycle failed");
    }
    Ok(())
}
