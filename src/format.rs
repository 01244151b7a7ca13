//! Alert message formatting.
//!
//! Messages are sent with HTML parse mode, so every field that came from a
//! source (title, body, link, labels) is escaped before it is embedded.

use chrono::DateTime;

use crate::source::{Candidate, ItemMeta};

/// Appended to bodies that were cut at their kind's snippet limit.
pub const ELLIPSIS: &str = "...";

/// Escape `&`, `<`, `>`, `"` and `'` for HTML text and attribute values.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

/// Keep the first `limit` characters, adding [`ELLIPSIS`] if anything was cut.
pub fn truncate(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((idx, _)) => format!("{}{ELLIPSIS}", &text[..idx]),
        None => text.to_string(),
    }
}

/// Render a feed date as `YYYY-MM-DD HH:MM` when it parses as RFC 2822,
/// otherwise pass it through untouched.
fn display_date(raw: &str) -> String {
    DateTime::parse_from_rfc2822(raw)
        .map(|d| d.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|_| raw.to_string())
}

fn snippet(item: &Candidate) -> String {
    let body = match item.kind().snippet_limit() {
        Some(limit) => truncate(&item.body, limit),
        None => item.body.clone(),
    };
    escape_html(&body)
}

/// Build the HTML message for one candidate.
pub fn format_alert(item: &Candidate) -> String {
    let title = escape_html(&item.title);
    let body = snippet(item);
    let link = escape_html(&item.link);

    match &item.meta {
        ItemMeta::Feed {
            feed_title,
            published,
        } => {
            let date = published.as_deref().map(display_date).unwrap_or_default();
            format!(
                "📰 <b>Crypto News Alert</b>\n\n\
                 <b>{title}</b>\n\n\
                 {body}\n\n\
                 📅 {date}\n\
                 🔗 <a href='{link}'>Read More</a>\n\
                 📡 Source: {source}",
                date = escape_html(&date),
                source = escape_html(feed_title),
            )
        }
        ItemMeta::Forum {
            forum,
            score,
            created,
        } => {
            let mut msg = format!(
                "🔴 <b>Reddit Alert - r/{}</b>\n\n<b>{title}</b>\n\n",
                escape_html(forum)
            );
            if !body.is_empty() {
                msg.push_str(&body);
                msg.push_str("\n\n");
            }
            let date = created
                .map(|c| c.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_default();
            msg.push_str(&format!(
                "👍 Score: {score} | 📅 {date}\n🔗 <a href='{link}'>View Post</a>"
            ));
            msg
        }
        ItemMeta::External { author } => format!(
            "🔔 <b>Twitter Alert</b>\n\n\
             <b>@{author}</b>\n\n\
             {body}\n\n\
             🔗 <a href='{link}'>View Tweet</a>",
            author = escape_html(author),
        ),
    }
}

/// Sent once at startup to prove the bot can reach the chat.
pub fn connectivity_message(keywords: &[String]) -> String {
    let topics: String = keywords
        .iter()
        .map(|k| format!("• {}\n", escape_html(k)))
        .collect();
    format!(
        "🤖 <b>Multi-Source Crypto Bot Test!</b>\n\n\
         ✅ <b>Your bot is now monitoring:</b>\n\
         📰 News feeds (CoinTelegraph, CoinDesk, etc.)\n\
         🔴 Reddit (r/CryptoCurrency, r/defi, etc.)\n\
         🐦 Twitter (when available)\n\n\
         🎯 <b>Searching for:</b>\n\
         {topics}\n\
         If you received this, your multi-source setup is working! 🚀"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn feed_item(title: &str, body: &str) -> Candidate {
        Candidate {
            id: "https://example.com/a".into(),
            title: title.into(),
            body: body.into(),
            link: "https://example.com/a".into(),
            meta: ItemMeta::Feed {
                feed_title: "Decrypt".into(),
                published: Some("Mon, 01 Jan 2024 09:30:00 +0000".into()),
            },
        }
    }

    fn forum_item(body: &str) -> Candidate {
        Candidate {
            id: "p1".into(),
            title: "Airdrop mining".into(),
            body: body.into(),
            link: "https://reddit.com/r/defi/comments/p1/".into(),
            meta: ItemMeta::Forum {
                forum: "defi".into(),
                score: 17,
                created: Some(Utc.with_ymd_and_hms(2024, 3, 2, 14, 5, 0).unwrap()),
            },
        }
    }

    #[test]
    fn escape_covers_markup_characters() {
        assert_eq!(
            escape_html(r#"<script>alert("x") & 'y'</script>"#),
            "&lt;script&gt;alert(&quot;x&quot;) &amp; &#x27;y&#x27;&lt;/script&gt;"
        );
    }

    #[test]
    fn truncate_long_body() {
        let body = "a".repeat(260);
        let out = truncate(&body, 200);
        assert_eq!(out, format!("{}{ELLIPSIS}", "a".repeat(200)));
    }

    #[test]
    fn truncate_leaves_short_body_alone() {
        let body = "b".repeat(100);
        assert_eq!(truncate(&body, 200), body);
        assert_eq!(truncate(&"c".repeat(200), 200), "c".repeat(200));
    }

    #[test]
    fn truncate_counts_characters_not_bytes() {
        assert_eq!(truncate("héllo wörld", 5), "héllo...");
    }

    #[test]
    fn feed_alert_layout() {
        let msg = format_alert(&feed_item("New DePIN mobile mining app launches", "Short"));

        assert!(msg.starts_with("📰 <b>Crypto News Alert</b>"));
        assert!(msg.contains("<b>New DePIN mobile mining app launches</b>"));
        assert!(msg.contains("📅 2024-01-01 09:30"));
        assert!(msg.contains("<a href='https://example.com/a'>Read More</a>"));
        assert!(msg.ends_with("📡 Source: Decrypt"));
    }

    #[test]
    fn feed_body_truncated_at_200() {
        let body = "x".repeat(260);
        let msg = format_alert(&feed_item("t", &body));
        assert!(msg.contains(&format!("{}...\n", "x".repeat(200))));
        assert!(!msg.contains(&"x".repeat(201)));
    }

    #[test]
    fn title_markup_is_escaped() {
        let msg = format_alert(&feed_item("<script>alert(1)</script>", ""));
        assert!(msg.contains("&lt;script&gt;"));
        assert!(!msg.contains("<script>"));
    }

    #[test]
    fn unparseable_feed_date_passes_through() {
        let mut item = feed_item("t", "b");
        item.meta = ItemMeta::Feed {
            feed_title: "F".into(),
            published: Some("yesterday-ish".into()),
        };
        assert!(format_alert(&item).contains("📅 yesterday-ish"));
    }

    #[test]
    fn forum_alert_layout() {
        let msg = format_alert(&forum_item("some self text"));

        assert!(msg.starts_with("🔴 <b>Reddit Alert - r/defi</b>"));
        assert!(msg.contains("some self text\n\n"));
        assert!(msg.contains("👍 Score: 17 | 📅 2024-03-02 14:05"));
        assert!(msg.ends_with("<a href='https://reddit.com/r/defi/comments/p1/'>View Post</a>"));
    }

    #[test]
    fn forum_alert_skips_empty_self_text() {
        let msg = format_alert(&forum_item(""));
        assert!(msg.contains("<b>Airdrop mining</b>\n\n👍 Score"));
    }

    #[test]
    fn forum_body_truncated_at_150() {
        let msg = format_alert(&forum_item(&"y".repeat(151)));
        assert!(msg.contains(&format!("{}...", "y".repeat(150))));
    }

    #[test]
    fn external_alert_layout() {
        let item = Candidate {
            id: "9".into(),
            title: "@miner".into(),
            body: "gm <testnet>".into(),
            link: "https://x.com/miner/status/9".into(),
            meta: ItemMeta::External {
                author: "miner".into(),
            },
        };
        let msg = format_alert(&item);

        assert!(msg.starts_with("🔔 <b>Twitter Alert</b>"));
        assert!(msg.contains("<b>@miner</b>"));
        assert!(msg.contains("gm &lt;testnet&gt;"));
        assert!(msg.ends_with("View Tweet</a>"));
    }

    #[test]
    fn link_quotes_cannot_break_the_attribute() {
        let mut item = feed_item("t", "b");
        item.link = "https://example.com/?q='><b>".into();
        let msg = format_alert(&item);
        assert!(msg.contains("href='https://example.com/?q=&#x27;&gt;&lt;b&gt;'"));
    }

    #[test]
    fn connectivity_message_lists_topics() {
        let msg = connectivity_message(&["testnet mining".to_string(), "a<b".to_string()]);
        assert!(msg.contains("• testnet mining\n"));
        assert!(msg.contains("• a&lt;b\n"));
    }
}
