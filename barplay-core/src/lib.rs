//! Barplay Core: bar replay and single-position trade simulation.
//!
//! This crate contains everything below the user interface:
//! - Domain types (bars, positions, trades, the trade ledger)
//! - Ingestion of delimited OHLCV text into a capped, canonical bar sequence
//! - Replay cursor and timed autoplay with stale-tick protection
//! - Trade engine with automatic take-profit / stop-loss exits
//! - Replay session tying cursor, playback and trades to one dataset
//! - Pips-based performance statistics and ledger export
//! - Config loading, snapshot persistence and a shared dataset store

pub mod config;
pub mod data;
pub mod domain;
pub mod engine;
pub mod export;
pub mod metrics;
pub mod replay;

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: types handed across threads are Send + Sync.
    ///
    /// The CLI moves ticks and datasets between threads; if any of these
    /// stops being thread-safe the build breaks here first.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        require_send::<domain::PriceBar>();
        require_sync::<domain::PriceBar>();
        require_send::<domain::BarSequence>();
        require_sync::<domain::BarSequence>();
        require_send::<domain::Trade>();
        require_sync::<domain::Trade>();
        require_send::<domain::TradeLedger>();
        require_sync::<domain::TradeLedger>();

        require_send::<data::Dataset>();
        require_sync::<data::Dataset>();
        require_send::<data::DatasetStore>();
        require_sync::<data::DatasetStore>();

        require_send::<replay::Tick>();
        require_send::<replay::AutoplayTimer>();
        require_send::<engine::ReplaySession>();
        require_sync::<engine::ReplaySession>();
        require_send::<metrics::PerformanceStats>();
    }

    #[test]
    fn send_sync_compiles() {
        assert_send_sync();
    }
}
