//! Predictive demand model for self-pacing managers.
//!
//! Given how long results take to arrive and how quickly the caller consumes
//! them, estimate how many new jobs keep a buffer of roughly
//! [`TARGET_BUFFER_SECS`] of consumption ready.

/// Used results required before the predictive model replaces the cold start.
pub const MIN_HISTORY: u64 = 3;
/// Projected buffer (in seconds of consumption) below which jobs are sent.
pub const BUFFER_THRESHOLD_SECS: f64 = 25.0;
/// Buffer (in seconds of consumption) the model aims to reach.
pub const TARGET_BUFFER_SECS: f64 = 30.0;

/// Inputs to [`paced_demand`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PacingInput {
    /// Expected seconds from enqueue to a ready result.
    pub latency_secs: f64,
    /// Average seconds between retrievals; must be positive.
    pub use_interval_secs: f64,
    /// Results already waiting to be consumed.
    pub buffered: usize,
    /// Jobs queued or registered with the solver.
    pub inflight: usize,
    /// Upper bound on one send; 0 means none.
    pub maximum: u32,
}

/// Number of jobs to send now, before rounding. Never negative.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn paced_demand(input: &PacingInput) -> f64 {
    let rate = input.use_interval_secs;
    if !(rate > 0.0 && rate.is_finite()) {
        return 0.0;
    }

    let consumed = input.latency_secs.max(0.0) / rate;
    let projected = input.buffered as f64 + input.inflight as f64 - consumed;
    if projected * rate >= BUFFER_THRESHOLD_SECS {
        return 0.0;
    }

    let mut to_send = TARGET_BUFFER_SECS / rate - projected;
    if input.maximum > 0 {
        to_send = to_send.min(f64::from(input.maximum));
    }
    to_send.max(0.0)
}
