//! Performance statistics: pure functions over the trade ledger.
//!
//! Nothing here is incremental: callers recompute from the ledger after
//! every change.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::Trade;

/// Lowest and highest equity, counting the 0 before the first trade.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EquityRange {
    pub min: f64,
    pub max: f64,
}

/// Aggregate statistics for a trade ledger.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceStats {
    pub total_trades: usize,
    pub wins: usize,
    pub losses: usize,
    /// Percentage of trades with positive pips, 0..=100.
    pub win_rate: f64,
    pub avg_pips: f64,
    pub total_pips: f64,
    /// Cumulative pips after each trade.
    pub equity_curve: Vec<f64>,
    pub equity_range: Option<EquityRange>,
}

impl PerformanceStats {
    pub fn compute(trades: &[Trade]) -> Self {
        let equity_curve = equity_curve(trades);
        Self {
            total_trades: trades.len(),
            wins: trades.iter().filter(|t| t.is_winner()).count(),
            losses: trades.iter().filter(|t| t.is_loser()).count(),
            win_rate: win_rate(trades),
            avg_pips: avg_pips(trades),
            total_pips: total_pips(trades),
            equity_range: equity_range(&equity_curve),
            equity_curve,
        }
    }
}

impl fmt::Display for PerformanceStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Trades:     {} ({}W / {}L)", self.total_trades, self.wins, self.losses)?;
        writeln!(f, "Win rate:   {}%", one_decimal(self.win_rate))?;
        writeln!(f, "Avg pips:   {}", one_decimal(self.avg_pips))?;
        write!(f, "Total pips: {}", one_decimal(self.total_pips))?;
        if let Some(range) = self.equity_range {
            write!(
                f,
                "\nEquity:     {} .. {}",
                one_decimal(range.min),
                one_decimal(range.max)
            )?;
        }
        Ok(())
    }
}

/// Format with one decimal place, the precision statistics are shown at.
pub fn one_decimal(value: f64) -> String {
    format!("{value:.1}")
}

// ─── Individual metric functions ────────────────────────────────────

/// 100 × winners / trades; 0 for an empty ledger.
pub fn win_rate(trades: &[Trade]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    let wins = trades.iter().filter(|t| t.is_winner()).count();
    100.0 * wins as f64 / trades.len() as f64
}

pub fn total_pips(trades: &[Trade]) -> f64 {
    trades.iter().map(|t| t.pips).sum()
}

/// Mean pips per trade; 0 for an empty ledger.
pub fn avg_pips(trades: &[Trade]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    total_pips(trades) / trades.len() as f64
}

/// Running sum of pips, one point per trade, starting from an implicit 0.
pub fn equity_curve(trades: &[Trade]) -> Vec<f64> {
    trades
        .iter()
        .scan(0.0, |equity, t| {
            *equity += t.pips;
            Some(*equity)
        })
        .collect()
}

/// Range of the equity curve with its 0 starting point included; `None`
/// when there are no trades.
pub fn equity_range(curve: &[f64]) -> Option<EquityRange> {
    if curve.is_empty() {
        return None;
    }
    Some(curve.iter().fold(
        EquityRange { min: 0.0, max: 0.0 },
        |range, &v| EquityRange {
            min: range.min.min(v),
            max: range.max.max(v),
        },
    ))
}
