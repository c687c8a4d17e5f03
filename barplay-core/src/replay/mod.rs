//! Replay control: the bar cursor and timed autoplay

pub mod autoplay;
pub mod cursor;

pub use autoplay::{AutoplayTimer, Playback, Tick, DEFAULT_INTERVAL_MS};
pub use cursor::ReplayCursor;
