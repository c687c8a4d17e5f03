//! Domain types for bar replay

pub mod bar;
pub mod position;
pub mod trade;

pub use bar::{BarSequence, PriceBar, MAX_BARS};
pub use position::{pips, Position, PositionState, Side, PIP_SCALE};
pub use trade::{CloseReason, Trade, TradeLedger};
