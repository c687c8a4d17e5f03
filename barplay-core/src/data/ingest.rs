//! Ingestion: delimited text or raw rows → [`Dataset`] with a report for the caller.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::delimiter::Delimiter;
use super::normalize::{ColumnMap, Normalizer};
use super::table::RawTable;
use crate::domain::{BarSequence, MAX_BARS};

/// Default number of raw rows echoed back in [`IngestReport::preview`].
pub const DEFAULT_PREVIEW_ROWS: usize = 20;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("payload has no non-blank lines")]
    EmptyPayload,

    #[error("no usable data: {total_rows} data rows, none with parseable prices")]
    NoUsableData { total_rows: usize },

    #[error("failed to read delimited text: {0}")]
    Read(#[from] csv::Error),
}

/// Options controlling what ingestion reports back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestOptions {
    pub preview_rows: usize,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            preview_rows: DEFAULT_PREVIEW_ROWS,
        }
    }
}

/// What ingestion saw, computed from the raw rows rather than the bars.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestReport {
    pub header: Vec<String>,
    /// Data rows in the payload before the [`MAX_BARS`] cap.
    pub total_rows: usize,
    /// Data rows left after the cap.
    pub retained_rows: usize,
    /// Retained rows dropped for unparseable prices.
    pub dropped_rows: usize,
    pub delimiter: Delimiter,
    /// First retained raw rows, for display.
    pub preview: Vec<Vec<String>>,
}

/// A normalized bar sequence plus provenance. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub bars: BarSequence,
    pub report: IngestReport,
    /// BLAKE3 over labels and OHLCV values.
    pub fingerprint: String,
}

impl Dataset {
    pub fn new(bars: BarSequence, report: IngestReport) -> Self {
        let fingerprint = fingerprint(&bars);
        Self {
            bars,
            report,
            fingerprint,
        }
    }

    /// True if the stored fingerprint matches the bars.
    pub fn verify(&self) -> bool {
        fingerprint(&self.bars) == self.fingerprint
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }
}

/// Parse and normalize a delimited text payload with the local time zone.
pub fn ingest_text(text: &str, opts: &IngestOptions) -> Result<Dataset, IngestError> {
    ingest_table(RawTable::parse(text)?, &Normalizer::new(), opts)
}

/// Normalize an already-split table.
///
/// Returns [`IngestError::NoUsableData`] when no row survives, so callers can
/// tell "nothing to replay" apart from a successful load.
pub fn ingest_table<Tz: chrono::TimeZone>(
    table: RawTable,
    normalizer: &Normalizer<Tz>,
    opts: &IngestOptions,
) -> Result<Dataset, IngestError> {
    let RawTable {
        header,
        mut rows,
        delimiter,
    } = table;
    let total_rows = rows.len();
    if total_rows > MAX_BARS {
        rows.drain(..total_rows - MAX_BARS);
    }

    let columns = ColumnMap::resolve(&header);
    if !columns.has_prices() {
        tracing::warn!(?header, "header lacks one of open/high/low/close; every row will drop");
    }
    let bars = normalizer.normalize_with(&columns, &rows);
    if bars.is_empty() {
        return Err(IngestError::NoUsableData { total_rows });
    }

    let report = IngestReport {
        total_rows,
        retained_rows: rows.len(),
        dropped_rows: rows.len() - bars.len(),
        delimiter,
        preview: rows.iter().take(opts.preview_rows).cloned().collect(),
        header,
    };
    tracing::info!(
        bars = bars.len(),
        total_rows,
        dropped = report.dropped_rows,
        delimiter = report.delimiter.label(),
        "ingested price data"
    );
    Ok(Dataset::new(bars, report))
}

/// Deterministic BLAKE3 hash over every bar in order.
pub fn fingerprint(bars: &BarSequence) -> String {
    let mut hasher = blake3::Hasher::new();
    for bar in bars {
        hasher.update(bar.label.as_bytes());
        hasher.update(&bar.timestamp.unwrap_or(i64::MIN).to_le_bytes());
        hasher.update(&bar.open.to_le_bytes());
        hasher.update(&bar.high.to_le_bytes());
        hasher.update(&bar.low.to_le_bytes());
        hasher.update(&bar.close.to_le_bytes());
        hasher.update(&bar.volume.to_le_bytes());
    }
    hasher.finalize().to_hex().to_string()
}
