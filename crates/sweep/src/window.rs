use std::ops::Range;

use tracing::warn;

pub const OBJECT_STEP: f64 = 0.10;
pub const CLAIM_STEP: f64 = 0.05;
pub const WRAP_THRESHOLD: f64 = 0.99;

/// Statistical cursor in `[0, 1)`: collections change size between passes, so
/// a window computed from it covers roughly the next slice, not an exact set.
#[derive(Debug, Clone, Copy, Default, PartialEq, PartialOrd)]
pub struct ScanProgress(f64);

impl ScanProgress {
    pub const START: Self = Self(0.0);

    pub fn new(value: f64) -> Self {
        if value.is_finite() && (0.0..1.0).contains(&value) {
            Self(value)
        } else {
            warn!(value, "scan_progress_out_of_range_reset");
            Self::START
        }
    }

    pub fn value(self) -> f64 {
        self.0
    }

    pub fn advance(self, increment: f64, wrap_threshold: f64) -> Self {
        let next = self.0 + increment;
        if !next.is_finite() || next > wrap_threshold || next >= 1.0 || next < 0.0 {
            Self::START
        } else {
            Self(next)
        }
    }

    pub fn window(self, len: usize, step: f64, wrap_threshold: f64) -> ScanWindow {
        ScanWindow::compute(len, self, step, wrap_threshold)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanWindow {
    pub start: usize,
    pub end: usize,
}

impl ScanWindow {
    pub const EMPTY: Self = Self { start: 0, end: 0 };

    /// `start = floor(len * p)`, `end = floor(len * (p + step))`, clamped to
    /// `len`. On the final window of a lap, where `p + step` runs past
    /// `wrap_threshold` and is already within one step of the end, the window
    /// reaches the end of the collection.
    pub fn compute(
        len: usize,
        progress: ScanProgress,
        step: f64,
        wrap_threshold: f64,
    ) -> Self {
        if len == 0 {
            return Self::EMPTY;
        }

        let step = if step.is_finite() { step.max(0.0) } else { 0.0 };
        let upper = progress.value() + step;
        let end = if upper > wrap_threshold && upper > 1.0 - step {
            len
        } else {
            fraction_index(len, upper).min(len)
        };
        let start = fraction_index(len, progress.value()).min(end);

        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }
}

fn fraction_index(len: usize, fraction: f64) -> usize {
    // Float to int `as` casts saturate, so huge fractions land on usize::MAX
    // and get clamped by the caller.
    (len as f64 * fraction.max(0.0)).floor() as usize
}
