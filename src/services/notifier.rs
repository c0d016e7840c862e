// src/services/notifier.rs

//! Operator notifications.
//!
//! Reports are rendered as Telegram HTML and delivered in order, split into
//! chunks no longer than the chat limit.

use std::collections::BTreeMap;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use unicode_segmentation::UnicodeSegmentation;

use crate::error::{AppError, Result};
use crate::models::{Category, NotifierConfig};
use crate::utils::http;

/// Telegram's message length limit, in UTF-16 code units.
pub const DEFAULT_CHUNK_LIMIT: usize = 4096;

pub const NEW_TITLE: &str = "🚀 Latest Tor Bridges";
pub const DUPLICATE_TITLE: &str = "Duplicate Bridges Found";
pub const MALFORMED_TITLE: &str = "Malformed Bridges Found";
pub const FETCH_FAILED_MESSAGE: &str =
    "❌ <b>Failed to fetch any bridges.</b>\nPlease check logs or try again later.";

const API_TIMEOUT_SECS: u64 = 30;

/// Destination for operator messages.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver a single chunk that already fits the limit.
    async fn send(&self, chunk: &str) -> Result<()>;

    /// Maximum chunk length in UTF-16 code units.
    fn chunk_limit(&self) -> usize {
        DEFAULT_CHUNK_LIMIT
    }

    /// Split `text` into chunks and deliver them sequentially.
    ///
    /// Stops at the first failed chunk.
    async fn notify(&self, text: &str) -> Result<()> {
        for chunk in split_message(text, self.chunk_limit()) {
            self.send(&chunk).await?;
        }
        Ok(())
    }

    /// Report that no source produced any line.
    async fn notify_failure(&self) -> Result<()> {
        self.notify(FETCH_FAILED_MESSAGE).await
    }
}

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'a str,
}

/// Notifier posting to a chat through the Telegram Bot API.
pub struct TelegramNotifier {
    client: Client,
    endpoint: String,
    chat_id: String,
    parse_mode: String,
    chunk_limit: usize,
}

impl TelegramNotifier {
    /// Build a notifier; the bot token and chat ID must be configured.
    pub fn from_config(config: &NotifierConfig) -> Result<Self> {
        let token = config.bot_token.as_deref().ok_or_else(|| {
            AppError::config("Telegram bot token missing (set TELEGRAM_BOT_TOKEN)")
        })?;
        let chat_id = config.chat_id.clone().ok_or_else(|| {
            AppError::config("Telegram chat ID missing (set TELEGRAM_CHAT_ID)")
        })?;

        Ok(Self {
            client: http::create_api_client(API_TIMEOUT_SECS)?,
            endpoint: format!(
                "{}/bot{}/sendMessage",
                config.api_base.trim_end_matches('/'),
                token
            ),
            chat_id,
            parse_mode: config.parse_mode.clone(),
            chunk_limit: config.chunk_limit,
        })
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, chunk: &str) -> Result<()> {
        let body = SendMessage {
            chat_id: &self.chat_id,
            text: chunk,
            parse_mode: &self.parse_mode,
        };

        let response = self.client.post(&self.endpoint).json(&body).send().await?;
        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(AppError::notify(format!("HTTP {}: {}", status, detail)));
        }
        Ok(())
    }

    fn chunk_limit(&self) -> usize {
        self.chunk_limit
    }
}

/// Notifier that only writes messages to the log.
#[derive(Debug, Clone)]
pub struct LogNotifier {
    chunk_limit: usize,
}

impl LogNotifier {
    pub fn new(chunk_limit: usize) -> Self {
        Self { chunk_limit }
    }
}

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, chunk: &str) -> Result<()> {
        log::info!("[dry-run] message:\n{}", chunk);
        Ok(())
    }

    fn chunk_limit(&self) -> usize {
        self.chunk_limit
    }
}

/// Escape text for Telegram's HTML parse mode.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

fn push_lines(message: &mut String, lines: &[String]) {
    for line in lines {
        message.push_str("<code>");
        message.push_str(&escape_html(line));
        message.push_str("</code>\n\n");
    }
}

/// Render lines grouped under category headings.
///
/// Returns `None` when every group is empty.
pub fn render_grouped(title: &str, groups: &BTreeMap<Category, Vec<String>>) -> Option<String> {
    if groups.values().all(Vec::is_empty) {
        return None;
    }

    let mut message = format!("<b>{}:</b>\n\n", title);
    for (category, lines) in groups.iter().filter(|(_, lines)| !lines.is_empty()) {
        message.push_str(&format!("<b>{}:</b>\n", category.label()));
        push_lines(&mut message, lines);
    }
    Some(message)
}

/// Render the malformed lines. Returns `None` when there are none.
pub fn render_malformed(lines: &[String]) -> Option<String> {
    if lines.is_empty() {
        return None;
    }

    let mut message = format!("<b>{}:</b>\n\n", MALFORMED_TITLE);
    push_lines(&mut message, lines);
    Some(message)
}

fn utf16_len(s: &str) -> usize {
    s.chars().map(char::len_utf16).sum()
}

/// Split a message into ordered chunks of at most `limit` UTF-16 code units.
///
/// Chunks break after a newline where possible and never inside a grapheme
/// cluster, so a single grapheme longer than `limit` is kept whole.
/// Whitespace-only chunks are dropped.
pub fn split_message(text: &str, limit: usize) -> Vec<String> {
    let limit = limit.max(1);
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    let mut flush = |current: &mut String, current_len: &mut usize| {
        if !current.trim().is_empty() {
            chunks.push(std::mem::take(current));
        }
        current.clear();
        *current_len = 0;
    };

    for line in text.split_inclusive('\n') {
        let line_len = utf16_len(line);
        if current_len + line_len <= limit {
            current.push_str(line);
            current_len += line_len;
            continue;
        }

        flush(&mut current, &mut current_len);
        if line_len <= limit {
            current.push_str(line);
            current_len = line_len;
            continue;
        }

        for grapheme in line.graphemes(true) {
            let len = utf16_len(grapheme);
            if current_len + len > limit {
                flush(&mut current, &mut current_len);
            }
            current.push_str(grapheme);
            current_len += len;
        }
    }
    flush(&mut current, &mut current_len);

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn telegram_config(server: &MockServer) -> NotifierConfig {
        NotifierConfig {
            api_base: server.base_url(),
            chat_id: Some("42".to_string()),
            bot_token: Some("123:abc".to_string()),
            ..NotifierConfig::default()
        }
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html("url=https://a.example/?x=1&y=<2>"),
            "url=https://a.example/?x=1&amp;y=&lt;2&gt;"
        );
    }

    #[test]
    fn test_render_grouped() {
        let mut groups = BTreeMap::new();
        groups.insert(Category::WEBTUNNEL_IPV4, vec!["w1".to_string()]);
        groups.insert(Category::OBFS4_IPV4, vec!["o1".to_string(), "o2".to_string()]);
        groups.insert(Category::OBFS4_IPV6, Vec::new());

        let message = render_grouped(NEW_TITLE, &groups).unwrap();
        assert_eq!(
            message,
            "<b>🚀 Latest Tor Bridges:</b>\n\n\
             <b>OBFS4 IPV4:</b>\n<code>o1</code>\n\n<code>o2</code>\n\n\
             <b>WEBTUNNEL IPV4:</b>\n<code>w1</code>\n\n"
        );
    }

    #[test]
    fn test_render_empty_groups() {
        let mut groups = BTreeMap::new();
        assert!(render_grouped(DUPLICATE_TITLE, &groups).is_none());
        groups.insert(Category::OBFS4_IPV4, Vec::new());
        assert!(render_grouped(DUPLICATE_TITLE, &groups).is_none());
        assert!(render_malformed(&[]).is_none());
    }

    #[test]
    fn test_render_malformed_escapes() {
        let message = render_malformed(&["<junk>".to_string()]).unwrap();
        assert_eq!(
            message,
            "<b>Malformed Bridges Found:</b>\n\n<code>&lt;junk&gt;</code>\n\n"
        );
    }

    #[test]
    fn test_split_short_message() {
        assert_eq!(split_message("hello", 4096), vec!["hello".to_string()]);
        assert!(split_message("", 4096).is_empty());
    }

    #[test]
    fn test_split_prefers_line_breaks() {
        let chunks = split_message("aaaa\nbbbb\ncccc\n", 10);
        assert_eq!(chunks, vec!["aaaa\nbbbb\n".to_string(), "cccc\n".to_string()]);
    }

    #[test]
    fn test_split_respects_limit_and_order() {
        let text: String = (0..500).map(|i| format!("<code>line {i}</code>\n\n")).collect();
        let chunks = split_message(&text, 256);

        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|c| utf16_len(c) <= 256));
        assert_eq!(chunks.concat().replace("\n", ""), text.replace("\n", ""));
    }

    #[test]
    fn test_split_long_line_keeps_graphemes() {
        // 'e' + combining acute is one grapheme of two code units
        let line = "e\u{301}".repeat(5);
        let chunks = split_message(&line, 3);

        assert_eq!(chunks.len(), 5);
        assert!(chunks.iter().all(|c| c == "e\u{301}"));
    }

    #[test]
    fn test_split_counts_utf16_units() {
        // each emoji is two UTF-16 code units
        let chunks = split_message(&"🚀".repeat(4), 4);
        assert_eq!(chunks, vec!["🚀🚀".to_string(), "🚀🚀".to_string()]);
    }

    #[test]
    fn test_telegram_requires_credentials() {
        let config = NotifierConfig::default();
        assert!(matches!(
            TelegramNotifier::from_config(&config),
            Err(AppError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_telegram_sends_message() {
        let server = MockServer::start_async().await;
        let send = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/bot123:abc/sendMessage")
                    .json_body(serde_json::json!({
                        "chat_id": "42",
                        "text": "hello",
                        "parse_mode": "HTML"
                    }));
                then.status(200)
                    .json_body(serde_json::json!({ "ok": true, "result": {} }));
            })
            .await;

        let notifier = TelegramNotifier::from_config(&telegram_config(&server)).unwrap();
        notifier.notify("hello").await.unwrap();

        send.assert_async().await;
    }

    #[tokio::test]
    async fn test_telegram_sends_each_chunk() {
        let server = MockServer::start_async().await;
        let send = server
            .mock_async(|when, then| {
                when.method(POST).path("/bot123:abc/sendMessage");
                then.status(200).json_body(serde_json::json!({ "ok": true }));
            })
            .await;

        let config = NotifierConfig {
            chunk_limit: 8,
            ..telegram_config(&server)
        };
        let notifier = TelegramNotifier::from_config(&config).unwrap();
        notifier.notify("aaaaaa\nbbbbbb\ncccccc\n").await.unwrap();

        send.assert_calls_async(3).await;
    }

    #[tokio::test]
    async fn test_telegram_error_status() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/bot123:abc/sendMessage");
                then.status(400).json_body(serde_json::json!({
                    "ok": false,
                    "description": "Bad Request: chat not found"
                }));
            })
            .await;

        let notifier = TelegramNotifier::from_config(&telegram_config(&server)).unwrap();
        let err = notifier.notify_failure().await.unwrap_err();

        assert!(matches!(err, AppError::Notify(_)));
        assert!(err.to_string().contains("chat not found"));
    }
}
