//! PriceBar, the unit of replay, and the capped sequence it lives in.

use serde::{Deserialize, Serialize};

/// Maximum number of bars retained from one ingestion. Older rows are dropped first.
pub const MAX_BARS: usize = 20_000;

/// OHLCV interval as read from the source file.
///
/// `label` is the source date and time text joined verbatim; it is what the
/// user sees. `timestamp` is local epoch milliseconds, `None` when the date
/// cell was missing or unparseable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub label: String,
    pub timestamp: Option<i64>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    #[serde(default)]
    pub volume: f64,
}

impl PriceBar {
    /// Returns true if all four prices are finite numbers.
    pub fn has_finite_prices(&self) -> bool {
        self.open.is_finite() && self.high.is_finite() && self.low.is_finite() && self.close.is_finite()
    }
}

/// Ordered, immutable bar sequence in source order, at most [`MAX_BARS`] long.
///
/// Every bar in a `BarSequence` has finite OHLC. The sequence is never edited
/// in place; a new ingestion builds a new one.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct BarSequence {
    bars: Vec<PriceBar>,
}

impl BarSequence {
    /// Build a sequence from already-parsed bars (e.g. restored from disk).
    ///
    /// Bars with non-finite prices are dropped and only the newest
    /// [`MAX_BARS`] are kept, so restored data obeys the same invariants as
    /// freshly normalized data.
    pub fn from_bars(bars: Vec<PriceBar>) -> Self {
        let mut bars: Vec<PriceBar> = bars.into_iter().filter(PriceBar::has_finite_prices).collect();
        if bars.len() > MAX_BARS {
            bars.drain(..bars.len() - MAX_BARS);
        }
        Self { bars }
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&PriceBar> {
        self.bars.get(index)
    }

    pub fn last(&self) -> Option<&PriceBar> {
        self.bars.last()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PriceBar> {
        self.bars.iter()
    }

    pub fn as_slice(&self) -> &[PriceBar] {
        &self.bars
    }
}

impl<'de> Deserialize<'de> for BarSequence {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let bars = Vec::<PriceBar>::deserialize(deserializer)?;
        Ok(Self::from_bars(bars))
    }
}

impl<'a> IntoIterator for &'a BarSequence {
    type Item = &'a PriceBar;
    type IntoIter = std::slice::Iter<'a, PriceBar>;

    fn into_iter(self) -> Self::IntoIter {
        self.bars.iter()
    }
}
