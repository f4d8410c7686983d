//! Off-loop fetch dispatch with timeout and exactly-once delivery
//!
//! [`FetchExecutor::dispatch`] runs an acquisition on the tokio worker pool and
//! hands its outcome to a completion sink. Delivery is decided by a single
//! compare-and-swap on a shared state cell, so a completion racing a
//! cancellation resolves one way only: either the sink runs exactly once or it
//! never runs.

use std::future::Future;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::errors::FetchError;

pub type FetchOutcome<T> = Result<T, FetchError>;

/// Which fixed bound applies to an acquisition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeoutProfile {
    /// Background refreshes. Short, so a slow source cannot stall a view.
    Polling,
    /// User-initiated queries that are expected to take a while.
    Interactive,
}

const PENDING: u8 = 0;
const DELIVERED: u8 = 1;
const CANCELLED: u8 = 2;

/// Handle to one dispatched fetch.
#[derive(Debug)]
pub struct FetchHandle {
    token: CancellationToken,
    state: Arc<AtomicU8>,
    task: JoinHandle<()>,
}

impl FetchHandle {
    /// Cancels the fetch. Returns true when this call suppressed delivery,
    /// false when the outcome had already been delivered (or the fetch was
    /// already cancelled).
    pub fn cancel(&self) -> bool {
        let suppressed = self
            .state
            .compare_exchange(PENDING, CANCELLED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        if suppressed {
            self.token.cancel();
        }
        suppressed
    }

    /// True once the outcome was delivered or suppressed.
    pub fn is_settled(&self) -> bool {
        self.state.load(Ordering::Acquire) != PENDING
    }

    pub fn is_delivered(&self) -> bool {
        self.state.load(Ordering::Acquire) == DELIVERED
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

#[derive(Debug, Clone)]
pub struct FetchExecutor {
    timeout: Duration,
}

impl FetchExecutor {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Runs `op` off the calling task and delivers its outcome to `sink`.
    ///
    /// An operation that outlives the executor's bound is abandoned and
    /// delivered as [`FetchError::SourceTimeout`]. The sink runs on the worker,
    /// so it should only forward the outcome (e.g. into a channel).
    pub fn dispatch<T, F, Fut, S>(&self, op: F, sink: S) -> FetchHandle
    where
        T: Send + 'static,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = FetchOutcome<T>> + Send + 'static,
        S: FnOnce(FetchOutcome<T>) + Send + 'static,
    {
        let token = CancellationToken::new();
        let state = Arc::new(AtomicU8::new(PENDING));
        let timeout = self.timeout;

        let worker_token = token.clone();
        let worker_state = Arc::clone(&state);
        let task = tokio::spawn(async move {
            let outcome = tokio::select! {
                biased;
                _ = worker_token.cancelled() => {
                    log::debug!("Fetch cancelled before completion");
                    return;
                }
                result = tokio::time::timeout(timeout, op()) => {
                    result.unwrap_or(Err(FetchError::SourceTimeout))
                }
            };

            if worker_state
                .compare_exchange(PENDING, DELIVERED, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                sink(outcome);
            } else {
                log::debug!("Fetch completed after cancellation, discarding result");
            }
        });

        FetchHandle { token, state, task }
    }
}
