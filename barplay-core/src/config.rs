//! Replay configuration, loadable from TOML.
//!
//! Every field has a default, so an empty file (or no file) is valid:
//!
//! ```toml
//! take_profit_pips = 30.0
//! stop_loss_pips = 20.0
//! autoplay_interval_ms = 500
//! preview_rows = 20
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::data::ingest::{IngestOptions, DEFAULT_PREVIEW_ROWS};
use crate::engine::TpSlConfig;
use crate::replay::DEFAULT_INTERVAL_MS;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Session settings supplied by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplayConfig {
    /// Auto-close in profit at this many pips; 0 disables.
    pub take_profit_pips: f64,
    /// Auto-close in loss at this many pips; 0 disables.
    pub stop_loss_pips: f64,
    pub autoplay_interval_ms: u64,
    pub preview_rows: usize,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            take_profit_pips: 0.0,
            stop_loss_pips: 0.0,
            autoplay_interval_ms: DEFAULT_INTERVAL_MS,
            preview_rows: DEFAULT_PREVIEW_ROWS,
        }
    }
}

impl ReplayConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: ReplayConfig = toml::from_str(content)?;
        config.validated()
    }

    /// Read, parse and validate a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Check ranges and normalize threshold signs.
    pub fn validated(mut self) -> Result<Self, ConfigError> {
        for (name, value) in [
            ("take_profit_pips", self.take_profit_pips),
            ("stop_loss_pips", self.stop_loss_pips),
        ] {
            if !value.is_finite() {
                return Err(ConfigError::Invalid(format!("{name} must be finite, got {value}")));
            }
        }
        if self.autoplay_interval_ms == 0 {
            return Err(ConfigError::Invalid("autoplay_interval_ms must be > 0".into()));
        }
        self.take_profit_pips = self.take_profit_pips.abs();
        self.stop_loss_pips = self.stop_loss_pips.abs();
        Ok(self)
    }

    pub fn tp_sl(&self) -> TpSlConfig {
        TpSlConfig::new(self.take_profit_pips, self.stop_loss_pips)
    }

    pub fn autoplay_interval(&self) -> Duration {
        Duration::from_millis(self.autoplay_interval_ms)
    }

    pub fn ingest_options(&self) -> IngestOptions {
        IngestOptions {
            preview_rows: self.preview_rows,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let config = ReplayConfig::from_toml_str("").unwrap();
        assert_eq!(config, ReplayConfig::default());
        assert_eq!(config.autoplay_interval(), Duration::from_millis(2000));
        assert!(config.tp_sl().is_disabled());
    }

    #[test]
    fn partial_document_overrides_fields() {
        let config = ReplayConfig::from_toml_str("take_profit_pips = 30.0\nautoplay_interval_ms = 250\n").unwrap();
        assert_eq!(config.take_profit_pips, 30.0);
        assert_eq!(config.stop_loss_pips, 0.0);
        assert_eq!(config.autoplay_interval_ms, 250);
        assert_eq!(config.preview_rows, 20);
    }

    #[test]
    fn negative_thresholds_normalized() {
        let config = ReplayConfig::from_toml_str("stop_loss_pips = -20.0").unwrap();
        assert_eq!(config.stop_loss_pips, 20.0);
        assert_eq!(config.tp_sl().stop_loss(), Some(20.0));
    }

    #[test]
    fn zero_interval_rejected() {
        let err = ReplayConfig::from_toml_str("autoplay_interval_ms = 0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn non_finite_threshold_rejected() {
        let err = ReplayConfig::from_toml_str("take_profit_pips = inf").unwrap_err();
        assert!(err.to_string().contains("take_profit_pips"));
    }

    #[test]
    fn malformed_toml_rejected() {
        assert!(matches!(
            ReplayConfig::from_toml_str("take_profit_pips = \"lots\""),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn load_reports_missing_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("replay.toml");
        assert!(matches!(ReplayConfig::load(&path), Err(ConfigError::Read { .. })));

        std::fs::write(&path, "preview_rows = 5\n").unwrap();
        assert_eq!(ReplayConfig::load(&path).unwrap().preview_rows, 5);
    }
}
