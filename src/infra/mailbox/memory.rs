//! In-memory result channel, one per manager instance.
//!
//! The solver service deposits outcomes here; the owning manager consumes
//! them with bounded waits.

use std::fmt;
use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};

use crate::core::{ConfigurationError, SolvedResult};

/// Outcome deposited for a single job.
#[derive(Debug, Clone, PartialEq)]
pub enum Delivery {
    /// The job produced an answer.
    Solved(SolvedResult),
    /// The job was rejected with a non-retryable error.
    Failed(ConfigurationError),
}

/// Outcome of a bounded wait on the channel.
#[derive(Debug)]
pub enum Received {
    /// A delivery arrived.
    Delivery(Delivery),
    /// Nothing arrived within the wait slice.
    Timeout,
}

/// Channel carrying deliveries from the solver service to one manager.
#[derive(Clone)]
pub struct ResultChannel {
    tx: Sender<Delivery>,
    rx: Receiver<Delivery>,
}

impl ResultChannel {
    /// Create a new, empty channel.
    #[must_use]
    pub fn new() -> Self {
        let (tx, rx) = unbounded();
        Self { tx, rx }
    }

    /// Deposit a delivery. The channel owns both ends, so this cannot fail.
    pub fn deposit(&self, delivery: Delivery) {
        if self.tx.send(delivery).is_err() {
            tracing::error!("result channel disconnected, delivery dropped");
        }
    }

    /// Wait up to `timeout` for the next delivery.
    #[must_use]
    pub fn receive(&self, timeout: Duration) -> Received {
        match self.rx.recv_timeout(timeout) {
            Ok(delivery) => Received::Delivery(delivery),
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => Received::Timeout,
        }
    }

    /// Discard every buffered delivery and return how many were removed.
    pub fn drain(&self) -> usize {
        self.rx.try_iter().count()
    }

    /// Number of buffered deliveries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    /// Whether nothing is buffered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}

impl Default for ResultChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ResultChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResultChannel").field("len", &self.len()).finish()
    }
}
