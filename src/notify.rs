//! Outbound delivery through the chat bot API.
//!
//! A [`Notifier`] turns one formatted HTML body into one API request. The
//! poll loop never retries: a failed delivery is logged and the alert is
//! dropped.

use log::{error, info};
use reqwest::blocking::Client;

use crate::error::{RelayError, Result};

/// Default host of the bot messaging API.
pub const DEFAULT_API_BASE: &str = "https://api.telegram.org";

/// Anything that can deliver a formatted message to the configured chat.
pub trait Notifier {
    fn send(&self, text: &str) -> Result<()>;
}

/// Sends through `POST <api_base>/bot<token>/sendMessage`.
pub struct TelegramNotifier {
    client: Client,
    api_base: String,
    bot_token: String,
    chat_id: String,
}

impl TelegramNotifier {
    pub fn new(
        client: Client,
        api_base: impl Into<String>,
        bot_token: impl Into<String>,
        chat_id: impl Into<String>,
    ) -> Self {
        Self {
            client,
            api_base: api_base.into(),
            bot_token: bot_token.into(),
            chat_id: chat_id.into(),
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/bot{}/sendMessage",
            self.api_base.trim_end_matches('/'),
            self.bot_token
        )
    }
}

impl Notifier for TelegramNotifier {
    fn send(&self, text: &str) -> Result<()> {
        let resp = self
            .client
            .post(self.endpoint())
            .form(&[
                ("chat_id", self.chat_id.as_str()),
                ("text", text),
                ("parse_mode", "HTML"),
                ("disable_web_page_preview", "true"),
            ])
            .send()?;

        let status = resp.status();
        if !status.is_success() {
            return Err(RelayError::Status {
                status,
                body: resp.text().unwrap_or_default(),
            });
        }
        Ok(())
    }
}

/// Send `text`, logging the outcome. Returns whether it was delivered.
pub fn deliver(notifier: &dyn Notifier, text: &str) -> bool {
    match notifier.send(text) {
        Ok(()) => {
            info!("message sent");
            true
        }
        Err(e) => {
            error!("failed to send message: {e}");
            false
        }
    }
}
