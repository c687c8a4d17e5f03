//! Trade simulation: the single-position engine and the replay session that drives it

pub mod session;
pub mod trade_engine;

pub use session::{Advance, ReplayError, ReplaySession, TickOutcome};
pub use trade_engine::{exit_trigger, TpSlConfig, TradeEngine, TradeError};
