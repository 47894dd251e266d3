//! Tests for the result channel

use std::thread;
use std::time::Duration;

use solve_pacer::core::{ConfigurationError, SolvedResult};
use solve_pacer::infra::{Delivery, Received, ResultChannel};

fn result(answer: &str) -> SolvedResult {
    SolvedResult {
        task_id: "task".to_string(),
        answer: answer.to_string(),
        solved_at_ms: 0,
        cost: 0.002,
        delivered_at_ms: 0,
    }
}

#[test]
fn test_receive_times_out_when_empty() {
    let channel = ResultChannel::new();
    assert!(matches!(channel.receive(Duration::from_millis(20)), Received::Timeout));
}

#[test]
fn test_clones_share_the_channel() {
    let channel = ResultChannel::new();
    let producer = channel.clone();
    let handle = thread::spawn(move || {
        producer.deposit(Delivery::Failed(ConfigurationError::BadDomain));
        producer.deposit(Delivery::Solved(result("a")));
    });
    handle.join().unwrap();

    assert_eq!(channel.len(), 2);
    assert!(matches!(
        channel.receive(Duration::from_millis(20)),
        Received::Delivery(Delivery::Failed(ConfigurationError::BadDomain))
    ));
    assert_eq!(channel.drain(), 1);
    assert!(channel.is_empty());
}
