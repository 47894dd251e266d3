//! Tests for utility functions

use std::time::Duration;

use solve_pacer::util::{age_of, init_tracing, init_tracing_with, ms_before, now_ms};

#[test]
fn test_now_ms_is_after_2020() {
    assert!(now_ms() > 1_577_836_800_000);
}

#[test]
fn test_ms_before_and_age_of_agree() {
    let now = now_ms();
    let then = ms_before(now, Duration::from_secs(121));
    assert_eq!(age_of(then, now), Duration::from_secs(121));
}

#[test]
fn test_init_tracing_is_idempotent() {
    init_tracing_with("solve_pacer=debug");
    init_tracing();
    init_tracing();
}
