//! Wall-clock helpers.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Milliseconds since the Unix epoch. Returns 0 if the system clock is set
/// before the epoch.
#[must_use]
pub fn now_ms() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0)
}

/// Age of an epoch-millisecond timestamp relative to `now_ms`. Timestamps in
/// the future have age zero.
#[must_use]
pub fn age_of(timestamp_ms: u128, now_ms: u128) -> Duration {
    let millis = now_ms.saturating_sub(timestamp_ms);
    Duration::from_millis(u64::try_from(millis).unwrap_or(u64::MAX))
}

/// Epoch-millisecond timestamp `ago` before `now_ms`.
#[must_use]
pub fn ms_before(now_ms: u128, ago: Duration) -> u128 {
    now_ms.saturating_sub(ago.as_millis())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_age_of_past_and_future() {
        assert_eq!(age_of(1_000, 3_500), Duration::from_millis(2_500));
        assert_eq!(age_of(5_000, 3_500), Duration::ZERO);
    }

    #[test]
    fn test_ms_before() {
        assert_eq!(ms_before(10_000, Duration::from_secs(4)), 6_000);
        assert_eq!(ms_before(1_000, Duration::from_secs(4)), 0);
    }
}
