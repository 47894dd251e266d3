//! Rolling rate estimates with bounded-memory windowing.
//!
//! Three metrics drive pacing decisions:
//!
//! - **wait**: seconds a caller spent inside `get_request` before a result arrived
//! - **use rate**: seconds between consecutive `get_request` calls
//! - **solve**: seconds from enqueue to a ready answer
//!
//! Wait and solve samples are compacted once they exceed [`COMPACT_CEILING`];
//! the use rate keeps roughly the most recent two minutes of history.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

/// Sample count above which wait/solve statistics are compacted.
pub const COMPACT_CEILING: u64 = 10;
/// Sample count wait/solve statistics are compacted down to.
pub const COMPACT_FLOOR: u64 = 5;
/// Accumulated use-rate seconds that trigger windowing.
pub const USE_WINDOW_TRIGGER_SECS: f64 = 150.0;
/// Span of the oldest use-rate history discarded by windowing.
pub const USE_WINDOW_DISCARD_SECS: f64 = 120.0;
/// Minimum use-rate samples that must survive windowing.
pub const USE_WINDOW_MIN_SAMPLES: u64 = 5;

/// Running average of a time metric.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Statistic {
    /// Number of samples.
    pub count: u64,
    /// Sum of samples in seconds.
    pub total_secs: f64,
    /// Average seconds per sample as of the last refresh; 0 when empty.
    pub rate: f64,
}

impl Statistic {
    /// Add one sample.
    pub fn record(&mut self, sample: Duration) {
        self.count += 1;
        self.total_secs += sample.as_secs_f64();
    }

    /// Recompute `rate` from `count` and `total_secs`.
    #[allow(clippy::cast_precision_loss)]
    pub fn refresh(&mut self) {
        self.rate = if self.count == 0 {
            0.0
        } else {
            self.total_secs / self.count as f64
        };
    }

    /// Refresh, then shrink to `floor` samples once `count` exceeds `ceiling`,
    /// keeping the running rate.
    #[allow(clippy::cast_precision_loss)]
    pub fn compact(&mut self, ceiling: u64, floor: u64) {
        self.refresh();
        if self.count > ceiling {
            self.total_secs -= (self.count - floor) as f64 * self.rate;
            self.count = floor;
        }
    }
}

/// Interval between consecutive retrievals.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UseRate {
    /// Accumulated intervals.
    pub stat: Statistic,
    /// When the last retrieval finished (or the manager was created).
    pub last_call: Instant,
}

impl UseRate {
    /// Start measuring from `now`.
    #[must_use]
    pub const fn new(now: Instant) -> Self {
        Self {
            stat: Statistic {
                count: 0,
                total_secs: 0.0,
                rate: 0.0,
            },
            last_call: now,
        }
    }

    /// A retrieval started at `now`: record the interval since the last one.
    pub fn record_call(&mut self, now: Instant) {
        self.stat.record(now.saturating_duration_since(self.last_call));
        self.last_call = now;
    }

    /// Move the reference point without recording a sample, so time spent
    /// blocked inside a retrieval is not counted as idle time.
    pub fn touch(&mut self, now: Instant) {
        self.last_call = now;
    }

    /// Drop roughly the oldest two minutes of history once at least 150 s
    /// have accumulated, unless fewer than five samples would remain.
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    pub fn window(&mut self) {
        let stat = &mut self.stat;
        if stat.count == 0 || stat.total_secs < USE_WINDOW_TRIGGER_SECS {
            return;
        }
        let oldest = (stat.count as f64 / stat.total_secs * USE_WINDOW_DISCARD_SECS).round() as u64;
        if stat.count.saturating_sub(oldest) >= USE_WINDOW_MIN_SAMPLES && oldest < stat.count {
            stat.count -= oldest;
            stat.total_secs -= USE_WINDOW_DISCARD_SECS;
        }
    }

    /// Window, then recompute the rate.
    pub fn refresh(&mut self) {
        self.window();
        self.stat.refresh();
    }

    /// Average seconds between retrievals.
    #[must_use]
    pub const fn rate(&self) -> f64 {
        self.stat.rate
    }
}

/// All statistics a manager keeps.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ManagerStats {
    /// Time callers waited inside retrieval.
    pub wait: Statistic,
    /// Interval between retrievals.
    pub use_rate: UseRate,
    /// Time from enqueue to ready answer.
    pub solve: Statistic,
}

impl ManagerStats {
    /// Fresh statistics measuring use rate from `now`.
    #[must_use]
    pub const fn new(now: Instant) -> Self {
        Self {
            wait: Statistic {
                count: 0,
                total_secs: 0.0,
                rate: 0.0,
            },
            use_rate: UseRate::new(now),
            solve: Statistic {
                count: 0,
                total_secs: 0.0,
                rate: 0.0,
            },
        }
    }

    /// Compact, window and recompute every rate.
    pub fn refresh(&mut self) {
        self.wait.compact(COMPACT_CEILING, COMPACT_FLOOR);
        self.solve.compact(COMPACT_CEILING, COMPACT_FLOOR);
        self.use_rate.refresh();
    }
}
