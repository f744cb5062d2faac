// crates/jobs/src/cancel.rs
//! Cooperative cancellation flag shared between the request path and a worker.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// One-way stop flag for a single job.
///
/// The request path calls [`set`](Self::set); the worker polls
/// [`is_set`](Self::is_set) at every unit boundary. Clones share the same
/// flag. A `set` uses `Release` and the poll uses `Acquire`, so a stop issued
/// from the webhook task is visible to the worker's next poll.
///
/// Cancellation is not preemptive: a unit whose extraction has already
/// started runs to completion, so the worst-case stop latency is the
/// duration of one unit.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Create an unset token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Idempotent; there is no way back.
    pub fn set(&self) {
        self.flag.store(true, Ordering::Release);
    }

    /// Whether cancellation has been requested on this token or any clone.
    pub fn is_set(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}
