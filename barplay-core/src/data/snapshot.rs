//! On-disk persistence for datasets and trade ledgers.
//!
//! Both documents are pretty JSON carrying a `schema_version`. Documents
//! written by a newer version are rejected on load.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::ingest::Dataset;
use crate::domain::TradeLedger;

/// Current schema version for persisted documents.
pub const SCHEMA_VERSION: u32 = 1;

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("snapshot I/O failed for {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("snapshot JSON is malformed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unsupported schema version {found} (max supported: {SCHEMA_VERSION})")]
    UnsupportedVersion { found: u32 },

    #[error("dataset fingerprint mismatch: stored {stored}, computed {computed}")]
    FingerprintMismatch { stored: String, computed: String },
}

/// A saved dataset, restorable into a fresh session.
///
/// Only the bars and their ingestion report are kept. Cursor, position and
/// ledger always start clean after a restore.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSnapshot {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub saved_at: DateTime<Utc>,
    pub dataset: Dataset,
}

impl SessionSnapshot {
    pub fn new(dataset: Dataset) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            saved_at: Utc::now(),
            dataset,
        }
    }

    pub fn to_json(&self) -> Result<String, SnapshotError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse and validate a snapshot document.
    pub fn from_json(json: &str) -> Result<Self, SnapshotError> {
        let snapshot: SessionSnapshot = serde_json::from_str(json)?;
        check_version(snapshot.schema_version)?;
        if !snapshot.dataset.verify() {
            return Err(SnapshotError::FingerprintMismatch {
                stored: snapshot.dataset.fingerprint.clone(),
                computed: super::ingest::fingerprint(&snapshot.dataset.bars),
            });
        }
        Ok(snapshot)
    }

    pub fn save(&self, path: &Path) -> Result<(), SnapshotError> {
        write_file(path, &self.to_json()?)
    }

    pub fn load(path: &Path) -> Result<Self, SnapshotError> {
        Self::from_json(&read_file(path)?)
    }
}

/// A saved trade ledger, for statistics outside a live session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerFile {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    /// Fingerprint of the dataset the trades were made on, if known.
    #[serde(default)]
    pub dataset_fingerprint: Option<String>,
    pub trades: TradeLedger,
}

impl LedgerFile {
    pub fn new(trades: TradeLedger, dataset_fingerprint: Option<String>) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            dataset_fingerprint,
            trades,
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), SnapshotError> {
        write_file(path, &serde_json::to_string_pretty(self)?)
    }

    pub fn load(path: &Path) -> Result<Self, SnapshotError> {
        let file: LedgerFile = serde_json::from_str(&read_file(path)?)?;
        check_version(file.schema_version)?;
        Ok(file)
    }
}

fn check_version(found: u32) -> Result<(), SnapshotError> {
    if found > SCHEMA_VERSION {
        return Err(SnapshotError::UnsupportedVersion { found });
    }
    Ok(())
}

fn read_file(path: &Path) -> Result<String, SnapshotError> {
    std::fs::read_to_string(path).map_err(|source| SnapshotError::Io {
        path: path.display().to_string(),
        source,
    })
}

fn write_file(path: &Path, contents: &str) -> Result<(), SnapshotError> {
    let io_err = |source| SnapshotError::Io {
        path: path.display().to_string(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(io_err)?;
    }
    std::fs::write(path, contents).map_err(io_err)
}
