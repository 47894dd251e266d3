//! Integration tests for AutoManager without a running solver service.
//!
//! The solver loop is played by hand: requests are taken off the job queue
//! and reported back through the manager's `JobOwner` callbacks.

use std::time::{Duration, Instant};

use solve_pacer::config::ManagerConfig;
use solve_pacer::core::{
    AutoManager, ConfigurationError, JobStage, Manager, ManagerError, SolvedResult,
    TargetDescriptor,
};
use solve_pacer::infra::{JobQueue, QueueError};
use solve_pacer::util::{ms_before, now_ms};

// ============================================================================
// HELPER FUNCTIONS
// ============================================================================

fn target() -> TargetDescriptor {
    TargetDescriptor::v2("https://test.com/login", "site-key", false)
}

fn fast_config() -> ManagerConfig {
    ManagerConfig::default().with_wait_slice(Duration::from_millis(20))
}

fn result_aged(age: Duration) -> SolvedResult {
    let now = now_ms();
    SolvedResult {
        task_id: format!("task-{now}"),
        answer: "token".to_string(),
        solved_at_ms: ms_before(now, age),
        cost: 0.002,
        delivered_at_ms: now,
    }
}

/// Take one request off the queue and report it solved `age` ago.
fn solve_one(queue: &JobQueue, age: Duration) {
    let request = queue.try_dequeue().expect("a queued request");
    let owner = request.job.owner();
    owner.on_registered(&request.job);
    owner.on_solved(&request.job, result_aged(age), request.enqueued_at);
}

// ============================================================================
// CREATION
// ============================================================================

#[test]
fn test_create_validates_inputs() {
    let queue = JobQueue::new();
    let bad = TargetDescriptor::v2("test.com", "k", false);
    let err = AutoManager::create(&queue, bad, fast_config()).unwrap_err();
    assert!(matches!(err, ManagerError::InvalidDescriptor(_)));

    let err = AutoManager::create(&queue, target(), fast_config().with_initial(0)).unwrap_err();
    assert!(matches!(err, ManagerError::InvalidArgument(_)));
}

// ============================================================================
// SENDING AND ACCOUNTING
// ============================================================================

#[test]
fn test_limit_caps_cold_start() {
    let queue = JobQueue::new();
    let manager = AutoManager::create(&queue, target(), fast_config().with_limit(5)).unwrap();

    assert_eq!(manager.send_request(None, Some(10)).unwrap(), 5);
    assert_eq!(queue.len(), 5);
    assert_eq!(manager.status().queued, 5);

    // Already at the limit
    assert_eq!(manager.send_request(None, Some(10)).unwrap(), 0);
    assert_eq!(queue.len(), 5);
}

#[test]
fn test_queued_tracks_queue_and_registration() {
    let queue = JobQueue::new();
    let manager = AutoManager::create(&queue, target(), fast_config()).unwrap();

    assert_eq!(manager.send_request(None, Some(3)).unwrap(), 3);
    assert_eq!(manager.status().queued, queue.len());

    let request = queue.try_dequeue().unwrap();
    request.job.owner().on_registered(&request.job);

    let status = manager.status();
    assert_eq!(status.queued, 2);
    assert_eq!(status.registered, 1);
    assert_eq!(manager.upcoming(), 3);
}

#[test]
fn test_delivered_result_is_returned() {
    let queue = JobQueue::new();
    let manager = AutoManager::create(&queue, target(), fast_config()).unwrap();
    manager.send_request(None, Some(1)).unwrap();
    solve_one(&queue, Duration::ZERO);

    assert_eq!(manager.available(), 1);
    let result = manager.get_request(false, Some(Duration::from_secs(1))).unwrap();
    assert_eq!(result.answer, "token");

    let status = manager.status();
    assert_eq!(status.solved, 1);
    assert_eq!(status.used, 1);
    assert_eq!(status.upcoming, 0);
    assert_eq!(status.available, 0);
}

#[test]
fn test_predictive_model_after_history() {
    let queue = JobQueue::new();
    let manager = AutoManager::create(&queue, target(), fast_config().with_maximum(4)).unwrap();

    manager.send_request(None, Some(3)).unwrap();
    for _ in 0..3 {
        solve_one(&queue, Duration::ZERO);
        manager.get_request(false, Some(Duration::from_secs(1))).unwrap();
    }

    // Results are consumed far faster than they arrive, so the model asks
    // for as many as allowed instead of the cold-start size.
    assert_eq!(manager.send_request(None, Some(1)).unwrap(), 4);
}

#[test]
fn test_closed_queue_rolls_back_accounting() {
    let queue = JobQueue::new();
    let manager = AutoManager::create(&queue, target(), fast_config()).unwrap();
    queue.close();

    assert_eq!(
        manager.send_request(None, Some(3)),
        Err(ManagerError::Queue(QueueError::Closed))
    );
    assert_eq!(manager.status().queued, 0);

    // A refill that cannot be enqueued surfaces the same error
    assert_eq!(
        manager.get_request(true, Some(Duration::from_secs(1))),
        Err(ManagerError::Queue(QueueError::Closed))
    );
    assert_eq!(manager.upcoming(), 0);
    assert!(queue.is_empty());
}

// ============================================================================
// RETRIEVAL
// ============================================================================

#[test]
fn test_timeout_when_nothing_arrives() {
    let queue = JobQueue::new();
    let manager = AutoManager::create(&queue, target(), fast_config()).unwrap();
    manager.send_request(None, Some(1)).unwrap();

    let start = Instant::now();
    let err = manager.get_request(false, Some(Duration::from_millis(100))).unwrap_err();
    assert_eq!(err, ManagerError::TimedOut(Duration::from_millis(100)));
    assert!(start.elapsed() >= Duration::from_millis(100));
}

#[test]
fn test_refill_enqueues_exactly_one_job() {
    let queue = JobQueue::new();
    let manager = AutoManager::create(&queue, target(), fast_config()).unwrap();

    let err = manager.get_request(true, Some(Duration::from_millis(150))).unwrap_err();
    assert!(matches!(err, ManagerError::TimedOut(_)));
    assert_eq!(queue.len(), 1);
    assert_eq!(manager.status().queued, 1);
}

#[test]
fn test_stale_result_counts_as_expired() {
    let queue = JobQueue::new();
    let manager = AutoManager::create(&queue, target(), fast_config()).unwrap();
    manager.send_request(None, Some(1)).unwrap();
    solve_one(&queue, Duration::from_secs(200));

    let err = manager.get_request(false, Some(Duration::from_millis(100))).unwrap_err();
    assert!(matches!(err, ManagerError::TimedOut(_)));

    let status = manager.status();
    assert_eq!(status.expired, 1);
    assert_eq!(status.used, 0);
}

#[test]
fn test_rejection_is_reported_after_reconciling() {
    let queue = JobQueue::new();
    let manager = AutoManager::create(&queue, target(), fast_config()).unwrap();
    manager.send_request(None, Some(1)).unwrap();

    let request = queue.try_dequeue().unwrap();
    request
        .job
        .owner()
        .on_failed(&request.job, JobStage::Queued, ConfigurationError::BadSiteKey);

    assert_eq!(manager.status().queued, 0);
    let err = manager.get_request(false, Some(Duration::from_secs(1))).unwrap_err();
    assert_eq!(err, ManagerError::Rejected(ConfigurationError::BadSiteKey));
}

// ============================================================================
// STOPPING
// ============================================================================

#[test]
fn test_stop_then_exhausted() {
    let queue = JobQueue::new();
    let manager = AutoManager::create(&queue, target(), fast_config()).unwrap();
    manager.send_request(None, Some(2)).unwrap();

    manager.stop().unwrap();
    assert_eq!(manager.send_request(None, Some(5)).unwrap(), 0);
    assert_eq!(queue.len(), 2);

    // One job completes, the other is cancelled by the solver loop
    solve_one(&queue, Duration::ZERO);
    let request = queue.try_dequeue().unwrap();
    request.job.owner().on_cancelled(&request.job, JobStage::Queued);

    assert!(manager.get_request(true, Some(Duration::from_secs(1))).is_ok());
    assert_eq!(
        manager.get_request(true, Some(Duration::from_secs(1))),
        Err(ManagerError::Exhausted)
    );
    assert!(queue.is_empty());
    assert!(manager.status().finished);
    assert_eq!(manager.stop(), Err(ManagerError::AlreadyFinished));
}

#[test]
fn test_force_stop_is_immediately_exhausted() {
    let queue = JobQueue::new();
    let manager = AutoManager::create(&queue, target(), fast_config()).unwrap();
    manager.send_request(None, Some(3)).unwrap();
    solve_one(&queue, Duration::ZERO);

    manager.force_stop();
    assert_eq!(manager.available(), 0);
    assert_eq!(
        manager.get_request(false, Some(Duration::from_secs(1))),
        Err(ManagerError::Exhausted)
    );

    // Late results are discarded
    solve_one(&queue, Duration::ZERO);
    assert_eq!(manager.available(), 0);
}

#[test]
fn test_flush_keeps_counters() {
    let queue = JobQueue::new();
    let manager = AutoManager::create(&queue, target(), fast_config()).unwrap();
    manager.send_request(None, Some(2)).unwrap();
    solve_one(&queue, Duration::ZERO);
    solve_one(&queue, Duration::ZERO);

    assert_eq!(manager.flush(), 2);
    let status = manager.status();
    assert_eq!(status.available, 0);
    assert_eq!(status.solved, 2);
}

// ============================================================================
// RESTORE POINTS
// ============================================================================

#[test]
fn test_restore_point_lifecycle() {
    let queue = JobQueue::new();
    let manager = AutoManager::create(&queue, target(), fast_config()).unwrap();

    assert!(!manager.has_restore_point());
    assert!(matches!(manager.restore(), Err(ManagerError::Restore(_))));

    manager.create_restore_point(false).unwrap();
    assert!(matches!(
        manager.create_restore_point(false),
        Err(ManagerError::Restore(_))
    ));
    manager.create_restore_point(true).unwrap();

    // A burst of retrievals changes the use rate
    manager.send_request(None, Some(1)).unwrap();
    solve_one(&queue, Duration::ZERO);
    std::thread::sleep(Duration::from_millis(20));
    manager.get_request(false, Some(Duration::from_secs(1))).unwrap();
    assert!(manager.use_interval() > 0.0);

    manager.restore().unwrap();
    assert!(!manager.has_restore_point());
    assert!(manager.use_interval().abs() < f64::EPSILON);
    assert!(matches!(manager.restore(), Err(ManagerError::Restore(_))));
}
