//! Timed autoplay.
//!
//! [`Playback`] is the play/pause state and interval owned by the session.
//! Every change bumps its generation. [`AutoplayTimer`] is a background
//! thread that sends [`Tick`]s stamped with the generation it was started
//! for; the owner tears it down and starts a fresh one whenever the
//! generation moves, and the session drops any tick from an older one.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Default autoplay interval: one bar every two seconds.
pub const DEFAULT_INTERVAL_MS: u64 = 2000;

/// One autoplay beat, stamped with the playback generation it belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick {
    pub generation: u64,
}

/// Play/pause state and interval.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Playback {
    playing: bool,
    interval: Duration,
    generation: u64,
}

impl Default for Playback {
    fn default() -> Self {
        Self::new(Duration::from_millis(DEFAULT_INTERVAL_MS))
    }
}

impl Playback {
    pub fn new(interval: Duration) -> Self {
        Self {
            playing: false,
            interval,
            generation: 0,
        }
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn play(&mut self) {
        if !self.playing {
            self.playing = true;
            self.bump();
        }
    }

    pub fn pause(&mut self) {
        if self.playing {
            self.playing = false;
            self.bump();
        }
    }

    /// Flip play state. Returns the new state.
    pub fn toggle(&mut self) -> bool {
        if self.playing {
            self.pause();
        } else {
            self.play();
        }
        self.playing
    }

    /// Change the interval; a running timer must be restarted to pick it up.
    pub fn set_interval(&mut self, interval: Duration) {
        if interval != self.interval {
            self.interval = interval;
            self.bump();
        }
    }

    /// Stop and orphan any outstanding ticks, e.g. when the bars are replaced.
    pub fn invalidate(&mut self) {
        self.playing = false;
        self.bump();
    }

    /// True if `tick` comes from the timer for the current generation while playing.
    pub fn accepts(&self, tick: Tick) -> bool {
        self.playing && tick.generation == self.generation
    }

    fn bump(&mut self) {
        self.generation = self.generation.wrapping_add(1);
    }
}

/// Background thread emitting [`Tick`]s at a fixed interval until cancelled.
///
/// Dropping the timer cancels it and joins the thread, so no tick is sent
/// after the timer is gone.
#[derive(Debug)]
pub struct AutoplayTimer {
    generation: u64,
    cancel: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl AutoplayTimer {
    /// Start ticking for `playback`'s current generation and interval.
    ///
    /// Ticks go into `tx` converted to the channel's event type. The thread
    /// exits on its own once the receiving side hangs up.
    pub fn spawn<T>(playback: &Playback, tx: Sender<T>) -> std::io::Result<Self>
    where
        T: From<Tick> + Send + 'static,
    {
        let generation = playback.generation();
        let interval = playback.interval().max(Duration::from_millis(1));
        let cancel = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&cancel);

        let handle = thread::Builder::new()
            .name("autoplay".into())
            .spawn(move || {
                let mut next = Instant::now() + interval;
                loop {
                    if flag.load(Ordering::Acquire) {
                        break;
                    }
                    let now = Instant::now();
                    if now < next {
                        thread::park_timeout(next - now);
                        continue;
                    }
                    if tx.send(T::from(Tick { generation })).is_err() {
                        break;
                    }
                    next += interval;
                }
            })?;

        tracing::debug!(generation, interval_ms = interval.as_millis() as u64, "autoplay timer started");
        Ok(Self {
            generation,
            cancel,
            handle: Some(handle),
        })
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Stop the thread and wait for it to exit.
    pub fn cancel(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.cancel.store(true, Ordering::Release);
            handle.thread().unpark();
            let _ = handle.join();
            tracing::debug!(generation = self.generation, "autoplay timer stopped");
        }
    }
}

impl Drop for AutoplayTimer {
    fn drop(&mut self) {
        self.shutdown();
    }
}
