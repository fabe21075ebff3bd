//! Runtime configuration

use crate::error::{FxError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_PRIMARY_URL: &str = "https://api.exchangerate-api.com/v4/latest";
pub const DEFAULT_FALLBACK_URL: &str = "https://api.fxratesapi.com/latest";

/// Configuration for the rate pipeline. Every field has a default, so a
/// config file only needs the keys it overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FxConfig {
    /// Primary provider, queried as `{primary_url}/{base}`
    pub primary_url: String,
    /// Fallback provider, queried as `{fallback_url}?base={base}`
    pub fallback_url: String,
    /// Per-provider request timeout
    pub timeout_ms: u64,
    /// How long a fetched snapshot is served without refetching
    pub cache_ttl_secs: u64,
    /// Age after which rates are reported as stale
    pub stale_after_secs: u64,
    /// Directory for persisted rates and preferences.
    /// Defaults to the platform config directory.
    pub data_dir: Option<PathBuf>,
}

impl Default for FxConfig {
    fn default() -> Self {
        Self {
            primary_url: DEFAULT_PRIMARY_URL.to_string(),
            fallback_url: DEFAULT_FALLBACK_URL.to_string(),
            timeout_ms: 5_000,
            cache_ttl_secs: 30 * 60,
            stale_after_secs: 60 * 60,
            data_dir: None,
        }
    }
}

impl FxConfig {
    /// Load a JSON config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: FxConfig = serde_json::from_str(&content)
            .map_err(|e| FxError::Config(format!("{}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.timeout_ms == 0 {
            return Err(FxError::Config("timeout_ms must be positive".to_string()));
        }
        if self.primary_url.is_empty() || self.fallback_url.is_empty() {
            return Err(FxError::Config("provider URLs must not be empty".to_string()));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn cache_ttl_ms(&self) -> u64 {
        self.cache_ttl_secs.saturating_mul(1_000)
    }

    pub fn stale_after_ms(&self) -> u64 {
        self.stale_after_secs.saturating_mul(1_000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = FxConfig::default();
        assert_eq!(config.timeout(), Duration::from_secs(5));
        assert_eq!(config.cache_ttl_ms(), 1_800_000);
        assert_eq!(config.stale_after_ms(), 3_600_000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_partial_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"timeout_ms": 250, "data_dir": "/tmp/fx"}}"#).unwrap();

        let config = FxConfig::load(file.path()).unwrap();
        assert_eq!(config.timeout_ms, 250);
        assert_eq!(config.data_dir, Some(PathBuf::from("/tmp/fx")));
        assert_eq!(config.primary_url, DEFAULT_PRIMARY_URL);
    }

    #[test]
    fn test_load_rejects_zero_timeout() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"timeout_ms": 0}}"#).unwrap();

        assert!(matches!(FxConfig::load(file.path()), Err(FxError::Config(_))));
    }

    #[test]
    fn test_huge_windows_saturate() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"cache_ttl_secs": 18446744073709551615, "stale_after_secs": 18446744073709552}}"#
        )
        .unwrap();

        let config = FxConfig::load(file.path()).unwrap();
        assert_eq!(config.cache_ttl_ms(), u64::MAX);
        assert_eq!(config.stale_after_ms(), u64::MAX);
    }

    #[test]
    fn test_load_malformed() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();

        assert!(matches!(FxConfig::load(file.path()), Err(FxError::Config(_))));
    }
}
