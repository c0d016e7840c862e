// src/services/source.rs

//! Bridge line sources.
//!
//! A source turns a locator into candidate bridge lines. The HTTP source reads
//! the bridge distribution pages: it prefers the dedicated line elements and
//! falls back to a regex scan of the page text when the markup changes.

use std::collections::HashSet;
use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use scraper::{Html, Selector};

use crate::error::{AppError, Result};
use crate::models::{FetchConfig, SourceConfig};
use crate::utils::http;

static FALLBACK_PATTERNS: LazyLock<[Regex; 2]> = LazyLock::new(|| {
    [
        Regex::new(r"obfs4 \S+:\d+ \w+ cert=\S+ iat-mode=\d").expect("obfs4 fallback is valid"),
        Regex::new(r"webtunnel \S+:\d+ \w+ url=\S+ ver=\S+").expect("webtunnel fallback is valid"),
    ]
});

/// Provider of raw candidate bridge lines.
#[async_trait]
pub trait BridgeSource: Send + Sync {
    /// Fetch candidate lines from a single locator.
    async fn fetch(&self, source: &SourceConfig) -> Result<Vec<String>>;

    /// Fetch every locator in order, skipping the ones that fail.
    ///
    /// An empty result means nothing could be fetched at all.
    async fn fetch_all(&self, sources: &[SourceConfig]) -> Vec<String> {
        let mut lines = Vec::new();
        for source in sources {
            match self.fetch(source).await {
                Ok(found) => {
                    log::info!("Fetched {} line(s) from {}", found.len(), source.name);
                    lines.extend(found);
                }
                Err(e) => log::error!("Failed to fetch {} ({}): {}", source.name, source.url, e),
            }
        }
        lines
    }
}

/// Bridge source backed by the public distribution website.
pub struct HttpBridgeSource {
    client: Client,
    line_selector: Selector,
}

impl HttpBridgeSource {
    /// Create a new HTTP source with the given fetch settings.
    pub fn new(config: &FetchConfig) -> Result<Self> {
        Ok(Self {
            client: http::create_async_client(config)?,
            line_selector: parse_selector(&config.line_selector)?,
        })
    }
}

#[async_trait]
impl BridgeSource for HttpBridgeSource {
    async fn fetch(&self, source: &SourceConfig) -> Result<Vec<String>> {
        let response = self.client.get(&source.url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(AppError::fetch(&source.name, format!("HTTP {}", status)));
        }

        let html = response.text().await?;
        let document = Html::parse_document(&html);
        let lines = extract_bridge_lines(&document, &self.line_selector);
        if lines.is_empty() {
            log::warn!("No bridge lines found at {}", source.url);
        }
        Ok(lines)
    }
}

/// Extract candidate lines from a bridge page, de-duplicated in page order.
pub fn extract_bridge_lines(document: &Html, line_selector: &Selector) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut lines = Vec::new();

    for element in document.select(line_selector) {
        let text: String = element.text().collect();
        for line in text.lines() {
            push_unique(&mut seen, &mut lines, line.trim());
        }
    }

    if lines.is_empty() {
        log::debug!("No line elements found, falling back to text search");
        let text: String = document.root_element().text().collect();
        for pattern in FALLBACK_PATTERNS.iter() {
            for found in pattern.find_iter(&text) {
                push_unique(&mut seen, &mut lines, found.as_str());
            }
        }
    }

    lines
}

fn push_unique(seen: &mut HashSet<String>, lines: &mut Vec<String>, line: &str) {
    if !line.is_empty() && seen.insert(line.to_string()) {
        lines.push(line.to_string());
    }
}

fn parse_selector(s: &str) -> Result<Selector> {
    Selector::parse(s).map_err(|e| AppError::selector(s, format!("{e:?}")))
}
