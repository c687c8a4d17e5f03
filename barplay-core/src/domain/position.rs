//! Single open position and the pip convention used to value it.

use serde::{Deserialize, Serialize};

/// Price-difference multiplier that turns a price move into pips.
///
/// Fixed for the quoted instrument; every reported statistic depends on it.
pub const PIP_SCALE: f64 = 10.0;

/// Direction of a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Long,
    Short,
}

impl Side {
    /// +1.0 for long, -1.0 for short.
    pub fn sign(self) -> f64 {
        match self {
            Side::Long => 1.0,
            Side::Short => -1.0,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Side::Long => "LONG",
            Side::Short => "SHORT",
        }
    }

    pub fn opposite(self) -> Side {
        match self {
            Side::Long => Side::Short,
            Side::Short => Side::Long,
        }
    }
}

/// Signed pips earned by a position of `side` entered at `entry` and valued at `exit`.
pub fn pips(side: Side, entry: f64, exit: f64) -> f64 {
    (exit - entry) * side.sign() * PIP_SCALE
}

/// An open position. Entry is always the close of the bar the cursor sat on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub side: Side,
    pub entry_price: f64,
    pub entry_index: usize,
    pub entry_label: String,
}

impl Position {
    /// Provisional pips if the position were closed at `price`.
    pub fn pips_at(&self, price: f64) -> f64 {
        pips(self.side, self.entry_price, price)
    }
}

/// Either flat or holding exactly one position.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub enum PositionState {
    #[default]
    Flat,
    Open(Position),
}

impl PositionState {
    pub fn is_open(&self) -> bool {
        matches!(self, PositionState::Open(_))
    }

    pub fn as_open(&self) -> Option<&Position> {
        match self {
            PositionState::Open(position) => Some(position),
            PositionState::Flat => None,
        }
    }

    /// Replace with `Flat`, returning the position that was open, if any.
    pub fn take(&mut self) -> Option<Position> {
        match std::mem::take(self) {
            PositionState::Open(position) => Some(position),
            PositionState::Flat => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_gains_when_price_rises() {
        let p = pips(Side::Long, 100.0, 103.0);
        assert!((p - 30.0).abs() < 1e-9);
    }

    #[test]
    fn short_gains_when_price_falls() {
        let p = pips(Side::Short, 150.25, 150.0);
        assert!((p - 2.5).abs() < 1e-9);
    }

    #[test]
    fn flipping_side_negates_pips() {
        for (entry, exit) in [(100.0, 101.7), (1.2345, 1.2301), (150.0, 150.0)] {
            assert_eq!(pips(Side::Long, entry, exit), -pips(Side::Short, entry, exit));
        }
    }

    #[test]
    fn take_leaves_flat() {
        let mut state = PositionState::Open(Position {
            side: Side::Short,
            entry_price: 1.5,
            entry_index: 3,
            entry_label: "2024.01.02 10:00".into(),
        });
        assert!(state.is_open());
        let taken = state.take().unwrap();
        assert_eq!(taken.entry_index, 3);
        assert_eq!(state, PositionState::Flat);
        assert!(state.take().is_none());
    }
}
