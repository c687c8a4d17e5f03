//! Trade (a closed round trip) and the append-only ledger that collects them.

use super::bar::PriceBar;
use super::position::{Position, Side};
use serde::{Deserialize, Serialize};

/// Why a position was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CloseReason {
    Manual,
    TakeProfit,
    StopLoss,
}

impl CloseReason {
    pub fn label(self) -> &'static str {
        match self {
            CloseReason::Manual => "manual",
            CloseReason::TakeProfit => "TP",
            CloseReason::StopLoss => "SL",
        }
    }
}

/// A completed round trip: entry → exit, valued in pips.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub side: Side,

    // ── Entry ──
    pub entry_index: usize,
    pub entry_label: String,
    pub entry_price: f64,

    // ── Exit ──
    pub exit_index: usize,
    pub exit_label: String,
    pub exit_price: f64,

    pub pips: f64,
    pub close_reason: CloseReason,
}

impl Trade {
    /// Close `position` at the close of `bar`, which sits at `index`.
    pub fn close(position: Position, bar: &PriceBar, index: usize, reason: CloseReason) -> Self {
        let pips = position.pips_at(bar.close);
        Self {
            side: position.side,
            entry_index: position.entry_index,
            entry_label: position.entry_label,
            entry_price: position.entry_price,
            exit_index: index,
            exit_label: bar.label.clone(),
            exit_price: bar.close,
            pips,
            close_reason: reason,
        }
    }

    pub fn is_winner(&self) -> bool {
        self.pips > 0.0
    }

    pub fn is_loser(&self) -> bool {
        self.pips < 0.0
    }

    /// Bars between entry and exit. Zero if the cursor was rewound past the entry.
    pub fn bars_held(&self) -> usize {
        self.exit_index.saturating_sub(self.entry_index)
    }
}

/// Append-only record of closed trades, in close order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TradeLedger {
    trades: Vec<Trade>,
}

impl TradeLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, trade: Trade) -> &Trade {
        self.trades.push(trade);
        &self.trades[self.trades.len() - 1]
    }

    pub(crate) fn clear(&mut self) {
        self.trades.clear();
    }

    pub fn len(&self) -> usize {
        self.trades.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trades.is_empty()
    }

    pub fn last(&self) -> Option<&Trade> {
        self.trades.last()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Trade> {
        self.trades.iter()
    }

    pub fn as_slice(&self) -> &[Trade] {
        &self.trades
    }
}

impl From<Vec<Trade>> for TradeLedger {
    fn from(trades: Vec<Trade>) -> Self {
        Self { trades }
    }
}
