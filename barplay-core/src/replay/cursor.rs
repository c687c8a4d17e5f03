//! ReplayCursor: the index of the "current" bar.
//!
//! Every movement clamps into `[0, len - 1]`; no input is an error. With no
//! bars the cursor has no index at all.

/// Cursor over a bar sequence of fixed length.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplayCursor {
    len: usize,
    index: usize,
}

impl ReplayCursor {
    pub fn new(len: usize) -> Self {
        Self { len, index: 0 }
    }

    /// Point at a new sequence of `len` bars and go back to the first bar.
    pub fn rebind(&mut self, len: usize) {
        self.len = len;
        self.reset();
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Current index, or `None` when there are no bars.
    pub fn current_index(&self) -> Option<usize> {
        (!self.is_empty()).then_some(self.index)
    }

    /// Move to `target`, clamped.
    pub fn seek(&mut self, target: i64) -> Option<usize> {
        if self.is_empty() {
            return None;
        }
        let last = i64::try_from(self.len - 1).unwrap_or(i64::MAX);
        // Clamped into [0, last], so the cast back cannot truncate.
        self.index = target.clamp(0, last) as usize;
        Some(self.index)
    }

    /// Move by `delta` bars (negative rewinds), clamped.
    pub fn step_by(&mut self, delta: i64) -> Option<usize> {
        let from = i64::try_from(self.index).unwrap_or(i64::MAX);
        self.seek(from.saturating_add(delta))
    }

    pub fn reset(&mut self) {
        self.index = 0;
    }

    /// True when sitting on the final bar (or when there are no bars).
    pub fn is_at_end(&self) -> bool {
        self.index + 1 >= self.len
    }

    /// Position through the sequence as `(index + 1) / len * 100`; 0 when empty.
    pub fn progress_pct(&self) -> f64 {
        match self.current_index() {
            Some(i) => (i + 1) as f64 / self.len as f64 * 100.0,
            None => 0.0,
        }
    }
}
