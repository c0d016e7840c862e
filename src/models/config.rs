//! Application configuration structures.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{AppError, Result};

/// Environment variable holding the Telegram bot token.
pub const ENV_BOT_TOKEN: &str = "TELEGRAM_BOT_TOKEN";
/// Environment variable holding the destination chat ID.
pub const ENV_CHAT_ID: &str = "TELEGRAM_CHAT_ID";
/// Environment variable overriding the store directory.
pub const ENV_STORE_DIR: &str = "BRIDGEWATCH_STORE_DIR";

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Pages that advertise bridge lines
    #[serde(default = "defaults::sources")]
    pub sources: Vec<SourceConfig>,

    /// HTTP fetch settings
    #[serde(default)]
    pub fetch: FetchConfig,

    /// Where category stores live
    #[serde(default)]
    pub storage: StorageConfig,

    /// Telegram delivery settings
    #[serde(default)]
    pub notifier: NotifierConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Apply overrides from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_env_with(|key| std::env::var(key).ok());
    }

    /// Apply overrides using the given variable lookup.
    ///
    /// Empty values are ignored.
    pub fn apply_env_with<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(token) = get(ENV_BOT_TOKEN) {
            self.notifier.bot_token = Some(token);
        }
        if let Some(chat_id) = get(ENV_CHAT_ID) {
            self.notifier.chat_id = Some(chat_id);
        }
        if let Some(dir) = get(ENV_STORE_DIR) {
            self.storage.dir = PathBuf::from(dir);
        }
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.sources.is_empty() {
            return Err(AppError::validation("No sources defined"));
        }
        for source in &self.sources {
            if source.name.trim().is_empty() {
                return Err(AppError::validation("sources[].name is empty"));
            }
            Url::parse(&source.url).map_err(|e| {
                AppError::validation(format!("source '{}' has invalid url: {}", source.name, e))
            })?;
        }
        if self.fetch.user_agent.trim().is_empty() {
            return Err(AppError::validation("fetch.user_agent is empty"));
        }
        if self.fetch.timeout_secs == 0 {
            return Err(AppError::validation("fetch.timeout_secs must be > 0"));
        }
        if self.fetch.line_selector.trim().is_empty() {
            return Err(AppError::validation("fetch.line_selector is empty"));
        }
        if self.notifier.chunk_limit == 0 {
            return Err(AppError::validation("notifier.chunk_limit must be > 0"));
        }
        Url::parse(&self.notifier.api_base).map_err(|e| {
            AppError::validation(format!("notifier.api_base is invalid: {}", e))
        })?;
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sources: defaults::sources(),
            fetch: FetchConfig::default(),
            storage: StorageConfig::default(),
            notifier: NotifierConfig::default(),
        }
    }
}

/// One page advertising bridge lines.
///
/// The name is only used in logs; categories come from the lines themselves.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SourceConfig {
    pub name: String,
    pub url: String,
}

/// HTTP fetch settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Accept-Language header for HTTP requests
    #[serde(default = "defaults::accept_language")]
    pub accept_language: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// CSS selector for elements holding bridge lines
    #[serde(default = "defaults::line_selector")]
    pub line_selector: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            accept_language: defaults::accept_language(),
            timeout_secs: defaults::timeout(),
            line_selector: defaults::line_selector(),
        }
    }
}

/// Store location settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding one `<category>.json` per category
    #[serde(default = "defaults::store_dir")]
    pub dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            dir: defaults::store_dir(),
        }
    }
}

/// Telegram delivery settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifierConfig {
    /// Bot API base URL
    #[serde(default = "defaults::api_base")]
    pub api_base: String,

    /// Destination chat
    #[serde(default)]
    pub chat_id: Option<String>,

    /// Bot credential; never written back out
    #[serde(default, skip_serializing)]
    pub bot_token: Option<String>,

    /// Telegram parse mode for messages
    #[serde(default = "defaults::parse_mode")]
    pub parse_mode: String,

    /// Maximum message length in UTF-16 code units
    #[serde(default = "defaults::chunk_limit")]
    pub chunk_limit: usize,

    /// Pause after the new-bridges message in milliseconds
    #[serde(default = "defaults::pacing_delay")]
    pub pacing_delay_ms: u64,
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            api_base: defaults::api_base(),
            chat_id: None,
            bot_token: None,
            parse_mode: defaults::parse_mode(),
            chunk_limit: defaults::chunk_limit(),
            pacing_delay_ms: defaults::pacing_delay(),
        }
    }
}

mod defaults {
    use std::path::PathBuf;

    use super::SourceConfig;

    const BRIDGES_URL: &str = "https://bridges.torproject.org/bridges";

    pub fn sources() -> Vec<SourceConfig> {
        [
            ("obfs4_ipv4", "transport=obfs4"),
            ("obfs4_ipv6", "transport=obfs4&ipv6=yes"),
            ("webtunnel_ipv4", "transport=webtunnel"),
            ("webtunnel_ipv6", "transport=webtunnel&ipv6=yes"),
        ]
        .into_iter()
        .map(|(name, query)| SourceConfig {
            name: name.to_string(),
            url: format!("{BRIDGES_URL}?{query}"),
        })
        .collect()
    }

    // Fetch defaults
    pub fn user_agent() -> String {
        "Mozilla/5.0 (X11; Linux x86_64; rv:128.0) Gecko/20100101 Firefox/128.0".into()
    }
    pub fn accept_language() -> String {
        "en-US,en;q=0.5".into()
    }
    pub fn timeout() -> u64 {
        30
    }
    pub fn line_selector() -> String {
        "pre.bridge-line".into()
    }

    // Storage defaults
    pub fn store_dir() -> PathBuf {
        PathBuf::from("config")
    }

    // Notifier defaults
    pub fn api_base() -> String {
        "https://api.telegram.org".into()
    }
    pub fn parse_mode() -> String {
        "HTML".into()
    }
    pub fn chunk_limit() -> usize {
        4096
    }
    pub fn pacing_delay() -> u64 {
        1000
    }
}
