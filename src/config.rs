// src/config.rs

//! Configuration loading utilities.
//!
//! Combines the optional TOML file with environment overrides.

use std::path::Path;

use crate::error::{AppError, Result};
use crate::models::Config;

/// Load configuration from a TOML file, then apply environment overrides.
///
/// Falls back to defaults if the file cannot be loaded.
pub fn load_config(path: &Path) -> Config {
    let mut config = Config::load_or_default(path);
    config.apply_env();
    config
}

/// Load configuration and validate it.
pub fn load_validated(path: &Path) -> Result<Config> {
    let config = load_config(path);
    config
        .validate()
        .map_err(|e| AppError::config(format!("Invalid configuration: {e}")))?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_uses_defaults() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(&tmp.path().join("absent.toml"));
        assert_eq!(config.sources.len(), 4);
    }

    #[test]
    fn test_loads_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("bridgewatch.toml");
        std::fs::write(
            &path,
            r#"
            [[sources]]
            name = "mirror"
            url = "https://mirror.example/bridges?transport=obfs4"

            [fetch]
            timeout_secs = 5
            "#,
        )
        .unwrap();

        let config = load_validated(&path).unwrap();
        assert_eq!(config.sources.len(), 1);
        assert_eq!(config.sources[0].name, "mirror");
        assert_eq!(config.fetch.timeout_secs, 5);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("bridgewatch.toml");
        std::fs::write(&path, "[fetch]\ntimeout_secs = 0\n").unwrap();

        assert!(matches!(load_validated(&path), Err(AppError::Config(_))));
    }
}
