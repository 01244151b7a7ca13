//! External scraper source.
//!
//! The social platform has no stable public API, so this source shells out
//! to a third-party command-line scraper (snscrape by default) once per
//! search term and reads its newline-delimited JSON output. The process is
//! started with structured arguments; no shell ever sees the search term.
//!
//! Everything about this source is best-effort: a missing binary, a
//! non-zero exit, a timeout or a single malformed line all turn into an
//! error for that term, which the poll loop logs and moves past.

use std::process::Stdio;
use std::time::Duration;

use log::debug;
use serde::Deserialize;
use tokio::process::Command;

use super::{Candidate, DataSource, ItemMeta, SourceKind};
use crate::error::{RelayError, Result};
use crate::filter::KeywordFilter;

/// Hard limit on one scraper run.
pub const SCRAPER_TIMEOUT: Duration = Duration::from_secs(20);

/// Results requested per search term.
pub const MAX_RESULTS: u32 = 3;

/// Program plus any fixed leading arguments, e.g. `python3 -m snscrape`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScraperCommand {
    pub program: String,
    pub leading_args: Vec<String>,
}

impl ScraperCommand {
    /// Split a command line on whitespace. Returns `None` for a blank string.
    pub fn parse(line: &str) -> Option<Self> {
        let mut parts = line.split_whitespace().map(String::from);
        let program = parts.next()?;
        Some(Self {
            program,
            leading_args: parts.collect(),
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PostId {
    Number(u64),
    Text(String),
}

impl PostId {
    fn into_string(self) -> String {
        match self {
            PostId::Number(n) => n.to_string(),
            PostId::Text(s) => s,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ScrapedUser {
    username: String,
}

#[derive(Debug, Deserialize)]
struct ScrapedPost {
    id: PostId,
    user: ScrapedUser,
    #[serde(default)]
    content: String,
    #[serde(default)]
    url: String,
}

pub struct ScraperSource {
    command: ScraperCommand,
    /// Search term passed as a single argument.
    pub term: String,
    timeout: Duration,
}

impl ScraperSource {
    pub fn new(command: ScraperCommand, term: impl Into<String>, timeout: Duration) -> Self {
        Self {
            command,
            term: term.into(),
            timeout,
        }
    }

    /// Arguments following the leading ones: output format, limits, query.
    pub fn search_args(&self) -> Vec<String> {
        vec![
            "--jsonl".into(),
            "--max-results".into(),
            MAX_RESULTS.to_string(),
            "--retry".into(),
            "1".into(),
            "twitter-search".into(),
            self.term.clone(),
        ]
    }

    /// Parse newline-delimited JSON. Any malformed line fails the whole run.
    pub fn parse_output(stdout: &str) -> Result<Vec<Candidate>> {
        stdout
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(|line| {
                let post: ScrapedPost = serde_json::from_str(line)?;
                Ok(Candidate {
                    id: post.id.into_string(),
                    title: format!("@{}", post.user.username),
                    body: post.content,
                    link: post.url,
                    meta: ItemMeta::External {
                        author: post.user.username,
                    },
                })
            })
            .collect()
    }

    /// Run the scraper to completion on a throwaway current-thread runtime.
    ///
    /// The timeout covers the whole run, reading stdout included, so a
    /// descendant that keeps the pipe open cannot stall the caller. The
    /// child is killed when the output future is dropped.
    fn run(&self) -> Result<String> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;

        let output = runtime.block_on(async {
            let mut command = Command::new(&self.command.program);
            command
                .args(&self.command.leading_args)
                .args(self.search_args())
                .stdin(Stdio::null())
                .stdout(Stdio::piped())
                .stderr(Stdio::null())
                .kill_on_drop(true);
            tokio::time::timeout(self.timeout, command.output()).await
        });
        let output = output.map_err(|_| RelayError::Timeout(self.timeout))??;

        if !output.status.success() {
            return Err(RelayError::scraper(format!(
                "`{}` exited with {}",
                self.command.program, output.status
            )));
        }
        String::from_utf8(output.stdout)
            .map_err(|e| RelayError::scraper(format!("stdout is not UTF-8: {e}")))
    }
}

impl DataSource for ScraperSource {
    fn name(&self) -> &str {
        &self.term
    }

    fn kind(&self) -> SourceKind {
        SourceKind::External
    }

    /// The search term is the filter; results are not matched again.
    fn fetch(&self, _keywords: &KeywordFilter) -> Result<Vec<Candidate>> {
        let stdout = self.run()?;
        let items = Self::parse_output(&stdout)?;
        debug!("scraper '{}': {} posts", self.term, items.len());
        Ok(items)
    }
}
