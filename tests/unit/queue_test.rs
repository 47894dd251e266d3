//! Tests for the job queue

use std::sync::Arc;
use std::thread;
use std::time::Instant;

use solve_pacer::core::{
    ConfigurationError, Job, JobOwner, JobStage, PendingRequest, SolvedResult, TargetDescriptor,
};
use solve_pacer::infra::{JobQueue, QueueError};

struct NullOwner;

impl JobOwner for NullOwner {
    fn is_stopping(&self) -> bool {
        false
    }
    fn on_registered(&self, _job: &Job) {}
    fn on_solved(&self, _job: &Job, _result: SolvedResult, _enqueued_at: Instant) {}
    fn on_requeued(&self, _job: &Job) {}
    fn on_failed(&self, _job: &Job, _stage: JobStage, _error: ConfigurationError) {}
    fn on_cancelled(&self, _job: &Job, _stage: JobStage) {}
}

fn request() -> PendingRequest {
    let target = Arc::new(TargetDescriptor::v2("https://test.com", "k", false));
    PendingRequest::new(Job::new(target, None, Arc::new(NullOwner)))
}

#[test]
fn test_enqueue_and_dequeue() {
    let queue = JobQueue::new();
    assert!(queue.try_dequeue().is_none());

    let pending = request();
    let id = pending.job.id();
    queue.enqueue(pending).unwrap();
    assert_eq!(queue.len(), 1);
    assert_eq!(queue.try_dequeue().unwrap().job.id(), id);
    assert!(queue.is_empty());
}

#[test]
fn test_concurrent_producers_deliver_exactly_once() {
    let queue = JobQueue::new();
    let producers: Vec<_> = (0..4)
        .map(|_| {
            let queue = queue.clone();
            thread::spawn(move || {
                for _ in 0..25 {
                    queue.enqueue(request()).unwrap();
                }
            })
        })
        .collect();
    for producer in producers {
        producer.join().unwrap();
    }

    let drained = queue.drain();
    assert_eq!(drained.len(), 100);
    let mut ids: Vec<_> = drained.iter().map(|r| r.job.id()).collect();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 100);
    assert!(queue.is_empty());
}

#[test]
fn test_close_refuses_new_requests_but_keeps_queued_ones() {
    let queue = JobQueue::new();
    let producer = queue.clone();
    producer.enqueue(request()).unwrap();

    queue.close();
    queue.close();
    assert!(producer.is_closed());
    assert_eq!(producer.enqueue(request()), Err(QueueError::Closed));

    assert_eq!(queue.len(), 1);
    assert!(queue.try_dequeue().is_some());
    assert!(queue.try_dequeue().is_none());
}
