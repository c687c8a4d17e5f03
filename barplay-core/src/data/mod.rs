//! Data ingestion, persistence and sharing

pub mod delimiter;
pub mod ingest;
pub mod normalize;
pub mod snapshot;
pub mod store;
pub mod table;

pub use delimiter::Delimiter;
pub use ingest::{ingest_table, ingest_text, Dataset, IngestError, IngestOptions, IngestReport};
pub use normalize::{normalize, ColumnMap, Normalizer};
pub use snapshot::{LedgerFile, SessionSnapshot, SnapshotError};
pub use store::DatasetStore;
pub use table::RawTable;
