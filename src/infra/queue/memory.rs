//! In-memory multi-producer/multi-consumer job queue.
//!
//! Every clone of a [`JobQueue`] shares the same channel, so managers and
//! solver services can each hold a handle. Delivery is exactly-once per
//! enqueued request; ordering is best-effort FIFO. Closing the queue stops
//! new requests from being accepted while already queued ones can still be
//! taken.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crossbeam_channel::{unbounded, Receiver, Sender, TryRecvError};
use thiserror::Error;

use crate::core::PendingRequest;

/// Errors produced by queue operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueueError {
    /// The queue was closed and accepts no more requests.
    #[error("job queue closed")]
    Closed,
}

/// Shared transport for pending job requests.
#[derive(Clone)]
pub struct JobQueue {
    tx: Sender<PendingRequest>,
    rx: Receiver<PendingRequest>,
    closed: Arc<AtomicBool>,
}

impl JobQueue {
    /// Create a new, empty queue.
    #[must_use]
    pub fn new() -> Self {
        let (tx, rx) = unbounded();
        Self {
            tx,
            rx,
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Place a request on the queue.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::Closed`] once [`close`](Self::close) was called
    /// on any handle.
    pub fn enqueue(&self, request: PendingRequest) -> Result<(), QueueError> {
        if self.is_closed() {
            return Err(QueueError::Closed);
        }
        self.tx.send(request).map_err(|_| QueueError::Closed)
    }

    /// Refuse further requests on every handle. Idempotent.
    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::AcqRel) {
            tracing::info!(pending = self.len(), "job queue closed");
        }
    }

    /// Whether the queue has been closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Take one request without blocking.
    #[must_use]
    pub fn try_dequeue(&self) -> Option<PendingRequest> {
        match self.rx.try_recv() {
            Ok(request) => Some(request),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }

    /// Take every request currently on the queue without blocking.
    #[must_use]
    pub fn drain(&self) -> Vec<PendingRequest> {
        self.rx.try_iter().collect()
    }

    /// Number of requests currently waiting.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    /// Whether no requests are waiting.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}

impl Default for JobQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for JobQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobQueue")
            .field("len", &self.len())
            .field("closed", &self.is_closed())
            .finish()
    }
}
