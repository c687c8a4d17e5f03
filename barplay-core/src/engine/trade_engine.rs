//! Single-position trade engine with automatic take-profit / stop-loss.
//!
//! State machine:
//! - `Flat --open--> Open`
//! - `Open --close--> Flat` (manual, appends a trade)
//! - `Open --evaluate--> Flat` when the provisional pips cross a threshold
//!
//! Opening while open and closing while flat are rejected without touching
//! state. There is no netting, pyramiding or partial close.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{CloseReason, Position, PositionState, PriceBar, Side, Trade, TradeLedger};

/// Rejected trade operations. None of them change engine state.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TradeError {
    #[error("a {} position is already open; close it first", .0.label())]
    AlreadyOpen(Side),

    #[error("no open position to close")]
    NoOpenPosition,

    #[error("no current bar: load data first")]
    NoCurrentBar,
}

/// Automatic exit thresholds in pips. Zero disables a threshold.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TpSlConfig {
    pub take_profit_pips: f64,
    pub stop_loss_pips: f64,
}

impl TpSlConfig {
    /// Build from user input. Sign is ignored (`-20` means a 20-pip
    /// threshold) and non-finite values disable the threshold.
    pub fn new(take_profit_pips: f64, stop_loss_pips: f64) -> Self {
        Self {
            take_profit_pips: threshold(take_profit_pips),
            stop_loss_pips: threshold(stop_loss_pips),
        }
    }

    pub fn take_profit(&self) -> Option<f64> {
        (self.take_profit_pips > 0.0).then_some(self.take_profit_pips)
    }

    pub fn stop_loss(&self) -> Option<f64> {
        (self.stop_loss_pips > 0.0).then_some(self.stop_loss_pips)
    }

    pub fn is_disabled(&self) -> bool {
        self.take_profit().is_none() && self.stop_loss().is_none()
    }
}

fn threshold(pips: f64) -> f64 {
    if pips.is_finite() {
        pips.abs()
    } else {
        0.0
    }
}

/// Which automatic exit, if any, fires at `current_pips`.
///
/// Take-profit is checked first and wins if both thresholds hold.
pub fn exit_trigger(current_pips: f64, config: &TpSlConfig) -> Option<CloseReason> {
    if config.take_profit().is_some_and(|tp| current_pips >= tp) {
        return Some(CloseReason::TakeProfit);
    }
    if config.stop_loss().is_some_and(|sl| current_pips <= -sl) {
        return Some(CloseReason::StopLoss);
    }
    None
}

/// Owns the position state and the trade ledger.
#[derive(Debug, Clone, Default)]
pub struct TradeEngine {
    position: PositionState,
    ledger: TradeLedger,
}

impl TradeEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn position(&self) -> &PositionState {
        &self.position
    }

    pub fn ledger(&self) -> &TradeLedger {
        &self.ledger
    }

    /// Open a position at the close of `bar`, the bar at `index`.
    pub fn open(&mut self, side: Side, bar: &PriceBar, index: usize) -> Result<Position, TradeError> {
        if let PositionState::Open(existing) = &self.position {
            tracing::warn!(requested = ?side, open = ?existing.side, "open rejected: position already open");
            return Err(TradeError::AlreadyOpen(existing.side));
        }
        let position = Position {
            side,
            entry_price: bar.close,
            entry_index: index,
            entry_label: bar.label.clone(),
        };
        tracing::debug!(?side, price = bar.close, index, "position opened");
        self.position = PositionState::Open(position.clone());
        Ok(position)
    }

    /// Close the open position manually at the close of `bar`.
    pub fn close(&mut self, bar: &PriceBar, index: usize) -> Result<&Trade, TradeError> {
        let Some(position) = self.position.take() else {
            tracing::warn!("close rejected: no open position");
            return Err(TradeError::NoOpenPosition);
        };
        Ok(self.ledger.push(Trade::close(position, bar, index, CloseReason::Manual)))
    }

    /// Apply take-profit / stop-loss against `bar`. Safe to call at any time;
    /// does nothing when flat or when no threshold is crossed.
    pub fn evaluate(&mut self, bar: &PriceBar, index: usize, config: &TpSlConfig) -> Option<&Trade> {
        let current = self.unrealized_pips(bar)?;
        let reason = exit_trigger(current, config)?;
        let position = self.position.take()?;
        let trade = self.ledger.push(Trade::close(position, bar, index, reason));
        tracing::info!(
            reason = reason.label(),
            pips = trade.pips,
            exit_index = index,
            "position closed automatically"
        );
        Some(trade)
    }

    /// Provisional pips against `bar`'s close, or `None` when flat.
    pub fn unrealized_pips(&self, bar: &PriceBar) -> Option<f64> {
        self.position.as_open().map(|p| p.pips_at(bar.close))
    }

    /// Drop the position and all trades.
    pub fn reset(&mut self) {
        self.position = PositionState::Flat;
        self.ledger.clear();
    }
}
