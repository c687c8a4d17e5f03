//! ReplaySession: one user's replay over one dataset.
//!
//! The session is the single owner of the cursor, playback state, trade
//! engine and thresholds. Every cursor movement, from any source, is followed
//! by a take-profit / stop-loss evaluation against the new current bar.
//! Loading a dataset throws all of that state away.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use super::trade_engine::{TpSlConfig, TradeEngine, TradeError};
use crate::config::ReplayConfig;
use crate::data::{Dataset, SessionSnapshot};
use crate::domain::{Position, PositionState, PriceBar, Side, Trade, TradeLedger};
use crate::metrics::PerformanceStats;
use crate::replay::{Playback, ReplayCursor, Tick};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReplayError {
    #[error("no bars loaded")]
    NoData,
}

/// Result of moving the cursor.
#[derive(Debug, Clone, PartialEq)]
pub struct Advance {
    /// Cursor index after the move; `None` when no bars are loaded.
    pub index: Option<usize>,
    /// Trade closed by take-profit / stop-loss on the new bar, if any.
    pub auto_closed: Option<Trade>,
}

/// What an autoplay tick did.
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// Stale or unexpected tick; nothing changed.
    Ignored,
    /// Cursor moved forward one bar.
    Advanced(Advance),
    /// Cursor is on the last bar; playback has stopped.
    Finished(Advance),
}

#[derive(Debug, Clone, Default)]
pub struct ReplaySession {
    dataset: Option<Arc<Dataset>>,
    cursor: ReplayCursor,
    engine: TradeEngine,
    playback: Playback,
    tp_sl: TpSlConfig,
}

impl ReplaySession {
    pub fn new(config: &ReplayConfig) -> Self {
        Self {
            dataset: None,
            cursor: ReplayCursor::default(),
            engine: TradeEngine::new(),
            playback: Playback::new(config.autoplay_interval()),
            tp_sl: config.tp_sl(),
        }
    }

    // ── Data ──

    /// Replace the bars. Cursor goes to 0, playback stops, position and
    /// ledger are cleared, whatever state the session was in.
    pub fn replace_dataset(&mut self, dataset: Arc<Dataset>) {
        self.playback.invalidate();
        self.cursor.rebind(dataset.len());
        self.engine.reset();
        tracing::info!(bars = dataset.len(), fingerprint = %dataset.fingerprint, "session loaded dataset");
        self.dataset = Some(dataset);
    }

    /// Load the dataset stored in a snapshot.
    pub fn restore(&mut self, snapshot: SessionSnapshot) {
        self.replace_dataset(Arc::new(snapshot.dataset));
    }

    /// Snapshot of the loaded dataset, for the caller to persist.
    pub fn snapshot(&self) -> Option<SessionSnapshot> {
        self.dataset
            .as_deref()
            .map(|dataset| SessionSnapshot::new(dataset.clone()))
    }

    pub fn dataset(&self) -> Option<&Arc<Dataset>> {
        self.dataset.as_ref()
    }

    pub fn bars(&self) -> &[PriceBar] {
        self.dataset.as_deref().map(|d| d.bars.as_slice()).unwrap_or(&[])
    }

    // ── Cursor ──

    pub fn current_index(&self) -> Option<usize> {
        self.cursor.current_index()
    }

    pub fn current_bar(&self) -> Option<&PriceBar> {
        self.current_index().and_then(|i| self.bars().get(i))
    }

    pub fn progress_pct(&self) -> f64 {
        self.cursor.progress_pct()
    }

    pub fn is_at_end(&self) -> bool {
        self.cursor.is_at_end()
    }

    /// Move by `delta` bars, clamped, then apply take-profit / stop-loss.
    pub fn step_by(&mut self, delta: i64) -> Advance {
        let index = self.cursor.step_by(delta);
        self.advanced(index)
    }

    /// Jump to `index`, clamped, then apply take-profit / stop-loss.
    pub fn seek(&mut self, index: i64) -> Advance {
        let index = self.cursor.seek(index);
        self.advanced(index)
    }

    /// Stop playback and go back to the first bar. Position and ledger stay.
    pub fn rewind(&mut self) -> Advance {
        self.playback.pause();
        self.cursor.reset();
        let index = self.cursor.current_index();
        self.advanced(index)
    }

    // ── Playback ──

    pub fn playback(&self) -> &Playback {
        &self.playback
    }

    /// Start or stop autoplay. Returns whether it is now playing.
    pub fn toggle_play(&mut self) -> Result<bool, ReplayError> {
        if self.cursor.is_empty() {
            return Err(ReplayError::NoData);
        }
        let playing = self.playback.toggle();
        tracing::debug!(playing, generation = self.playback.generation(), "playback toggled");
        Ok(playing)
    }

    pub fn pause(&mut self) {
        self.playback.pause();
    }

    /// Change the autoplay interval; the cursor is untouched.
    pub fn set_interval(&mut self, interval: Duration) {
        self.playback.set_interval(interval);
    }

    /// Handle one autoplay tick. Ticks from an older playback generation, or
    /// arriving while paused, are ignored. Reaching the last bar stops playback.
    pub fn on_tick(&mut self, tick: Tick) -> TickOutcome {
        if !self.playback.accepts(tick) {
            return TickOutcome::Ignored;
        }
        let advance = self.step_by(1);
        if self.cursor.is_at_end() {
            self.playback.pause();
            tracing::debug!(index = ?advance.index, "autoplay reached the last bar");
            TickOutcome::Finished(advance)
        } else {
            TickOutcome::Advanced(advance)
        }
    }

    // ── Trading ──

    pub fn tp_sl(&self) -> &TpSlConfig {
        &self.tp_sl
    }

    /// Replace the thresholds and apply them to the current bar right away.
    pub fn set_tp_sl(&mut self, tp_sl: TpSlConfig) -> Option<Trade> {
        self.tp_sl = tp_sl;
        self.evaluate()
    }

    pub fn set_take_profit(&mut self, pips: f64) -> Option<Trade> {
        self.set_tp_sl(TpSlConfig::new(pips, self.tp_sl.stop_loss_pips))
    }

    pub fn set_stop_loss(&mut self, pips: f64) -> Option<Trade> {
        self.set_tp_sl(TpSlConfig::new(self.tp_sl.take_profit_pips, pips))
    }

    /// Open a position at the current bar's close.
    pub fn open_position(&mut self, side: Side) -> Result<Position, TradeError> {
        let index = self.cursor.current_index().ok_or(TradeError::NoCurrentBar)?;
        let dataset = self.dataset.as_ref().ok_or(TradeError::NoCurrentBar)?;
        let bar = dataset.bars.get(index).ok_or(TradeError::NoCurrentBar)?;
        self.engine.open(side, bar, index)
    }

    /// Close the open position at the current bar's close.
    pub fn close_position(&mut self) -> Result<Trade, TradeError> {
        if !self.engine.position().is_open() {
            tracing::warn!("close rejected: no open position");
            return Err(TradeError::NoOpenPosition);
        }
        let index = self.cursor.current_index().ok_or(TradeError::NoCurrentBar)?;
        let dataset = self.dataset.as_ref().ok_or(TradeError::NoCurrentBar)?;
        let bar = dataset.bars.get(index).ok_or(TradeError::NoCurrentBar)?;
        self.engine.close(bar, index).cloned()
    }

    pub fn position(&self) -> &PositionState {
        self.engine.position()
    }

    /// Provisional pips at the current bar, or `None` when flat.
    pub fn unrealized_pips(&self) -> Option<f64> {
        self.engine.unrealized_pips(self.current_bar()?)
    }

    pub fn ledger(&self) -> &TradeLedger {
        self.engine.ledger()
    }

    pub fn stats(&self) -> PerformanceStats {
        PerformanceStats::compute(self.ledger().as_slice())
    }

    fn advanced(&mut self, index: Option<usize>) -> Advance {
        Advance {
            index,
            auto_closed: self.evaluate(),
        }
    }

    fn evaluate(&mut self) -> Option<Trade> {
        let index = self.cursor.current_index()?;
        let dataset = self.dataset.as_ref()?;
        let bar = dataset.bars.get(index)?;
        self.engine.evaluate(bar, index, &self.tp_sl).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{ingest_table, IngestOptions, Normalizer, RawTable};
    use crate::domain::CloseReason;
    use chrono::Utc;

    fn dataset(closes: &[f64]) -> Arc<Dataset> {
        let mut text = String::from("Date,Time,Open,High,Low,Close\n");
        for (i, c) in closes.iter().enumerate() {
            text.push_str(&format!("2024.01.02,10:{:02},{c},{c},{c},{c}\n", i % 60));
        }
        let table = RawTable::parse(&text).unwrap();
        Arc::new(
            ingest_table(table, &Normalizer::with_timezone(Utc), &IngestOptions::default()).unwrap(),
        )
    }

    fn session(closes: &[f64]) -> ReplaySession {
        let mut s = ReplaySession::new(&ReplayConfig::default());
        s.replace_dataset(dataset(closes));
        s
    }

    #[test]
    fn empty_session_rejects_everything() {
        let mut s = ReplaySession::new(&ReplayConfig::default());
        assert_eq!(s.current_index(), None);
        assert_eq!(s.step_by(1).index, None);
        assert_eq!(s.toggle_play(), Err(ReplayError::NoData));
        assert_eq!(s.open_position(Side::Long), Err(TradeError::NoCurrentBar));
        assert_eq!(s.close_position(), Err(TradeError::NoOpenPosition));
        assert_eq!(s.unrealized_pips(), None);
        assert_eq!(s.progress_pct(), 0.0);
        assert!(s.snapshot().is_none());
    }

    #[test]
    fn entry_uses_current_close() {
        let mut s = session(&[100.0, 101.0, 102.0]);
        s.step_by(1);
        let pos = s.open_position(Side::Long).unwrap();
        assert_eq!(pos.entry_price, 101.0);
        assert_eq!(pos.entry_index, 1);
        assert_eq!(pos.entry_label, "2024.01.02 10:01");

        s.step_by(1);
        assert!((s.unrealized_pips().unwrap() - 10.0).abs() < 1e-9);
        let trade = s.close_position().unwrap();
        assert_eq!(trade.exit_index, 2);
        assert_eq!(trade.close_reason, CloseReason::Manual);
        assert_eq!(s.ledger().len(), 1);
        assert_eq!(s.unrealized_pips(), None);
    }

    #[test]
    fn take_profit_closes_on_first_qualifying_bar() {
        let mut s = session(&[100.0, 101.0, 102.95, 103.0, 104.0, 99.0]);
        s.set_take_profit(30.0);
        s.open_position(Side::Long).unwrap();

        assert!(s.step_by(1).auto_closed.is_none());
        assert!(s.step_by(1).auto_closed.is_none());
        let trade = s.step_by(1).auto_closed.unwrap();
        assert_eq!(trade.close_reason, CloseReason::TakeProfit);
        assert_eq!(trade.exit_index, 3);
        assert_eq!(trade.exit_price, 103.0);

        s.step_by(1);
        s.step_by(1);
        assert_eq!(s.ledger().len(), 1);
        assert!(!s.position().is_open());
    }

    #[test]
    fn stop_loss_fires_on_batch_step() {
        let closes: Vec<f64> = (0..20).map(|i| 100.0 - i as f64 * 0.5).collect();
        let mut s = session(&closes);
        s.set_stop_loss(20.0);
        s.open_position(Side::Long).unwrap();

        // Jumping ten bars evaluates only the landing bar.
        let trade = s.step_by(10).auto_closed.unwrap();
        assert_eq!(trade.close_reason, CloseReason::StopLoss);
        assert_eq!(trade.exit_index, 10);
        assert!((trade.pips + 50.0).abs() < 1e-9);
    }

    #[test]
    fn setting_threshold_applies_immediately() {
        let mut s = session(&[100.0, 105.0]);
        s.open_position(Side::Long).unwrap();
        s.step_by(1);
        let trade = s.set_take_profit(40.0).unwrap();
        assert_eq!(trade.close_reason, CloseReason::TakeProfit);
    }

    #[test]
    fn replacing_dataset_resets_all_state() {
        let mut s = session(&[1.0, 2.0, 3.0, 4.0]);
        s.seek(2);
        s.open_position(Side::Short).unwrap();
        s.step_by(1);
        s.close_position().unwrap();
        s.open_position(Side::Long).unwrap();
        s.toggle_play().unwrap();
        let generation = s.playback().generation();

        s.replace_dataset(dataset(&[5.0, 6.0]));
        assert_eq!(s.current_index(), Some(0));
        assert!(!s.position().is_open());
        assert!(s.ledger().is_empty());
        assert!(!s.playback().is_playing());
        assert_eq!(s.on_tick(Tick { generation }), TickOutcome::Ignored);
        assert_eq!(s.bars().len(), 2);
    }

    #[test]
    fn ticks_advance_until_the_end() {
        let mut s = session(&[1.0, 2.0, 3.0]);
        assert!(s.toggle_play().unwrap());
        let tick = Tick {
            generation: s.playback().generation(),
        };

        assert!(matches!(s.on_tick(tick), TickOutcome::Advanced(Advance { index: Some(1), .. })));
        assert!(matches!(s.on_tick(tick), TickOutcome::Finished(Advance { index: Some(2), .. })));
        assert!(!s.playback().is_playing());
        assert_eq!(s.on_tick(tick), TickOutcome::Ignored);
        assert_eq!(s.current_index(), Some(2));
    }

    #[test]
    fn interval_change_keeps_index() {
        let mut s = session(&[1.0, 2.0, 3.0, 4.0]);
        s.toggle_play().unwrap();
        let old = Tick {
            generation: s.playback().generation(),
        };
        s.on_tick(old);
        s.set_interval(Duration::from_millis(100));

        assert_eq!(s.on_tick(old), TickOutcome::Ignored);
        assert_eq!(s.current_index(), Some(1));
        assert!(s.playback().is_playing());
        let fresh = Tick {
            generation: s.playback().generation(),
        };
        assert!(matches!(s.on_tick(fresh), TickOutcome::Advanced(Advance { index: Some(2), .. })));
    }

    #[test]
    fn play_at_last_bar_holds_and_stops() {
        let mut s = session(&[1.0, 2.0]);
        s.seek(1);
        s.toggle_play().unwrap();
        let tick = Tick {
            generation: s.playback().generation(),
        };
        assert!(matches!(s.on_tick(tick), TickOutcome::Finished(Advance { index: Some(1), .. })));
        assert!(!s.playback().is_playing());
    }

    #[test]
    fn rewind_stops_and_keeps_trades() {
        let mut s = session(&[1.0, 2.0, 3.0]);
        s.open_position(Side::Long).unwrap();
        s.seek(2);
        s.close_position().unwrap();
        s.toggle_play().unwrap();

        s.rewind();
        assert_eq!(s.current_index(), Some(0));
        assert!(!s.playback().is_playing());
        assert_eq!(s.ledger().len(), 1);
    }

    #[test]
    fn progress_tracks_cursor() {
        let mut s = session(&[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(s.progress_pct(), 25.0);
        s.seek(100);
        assert_eq!(s.progress_pct(), 100.0);
        assert!(s.is_at_end());
    }

    #[test]
    fn snapshot_restores_fresh_session() {
        let mut s = session(&[1.0, 2.0, 3.0]);
        s.seek(2);
        s.open_position(Side::Long).unwrap();
        let snapshot = s.snapshot().unwrap();

        let mut restored = ReplaySession::new(&ReplayConfig::default());
        restored.restore(snapshot);
        assert_eq!(restored.bars(), s.bars());
        assert_eq!(restored.current_index(), Some(0));
        assert!(!restored.position().is_open());
    }
}
