// crates/jobs/src/progress.rs
//! Throttled, best-effort status updates for one job.
//!
//! Editing the remote status message on every page is wasteful and runs into
//! rate limits, so [`ProgressReporter`] turns the per-page event stream into
//! roughly `steps` edits. Notification failures are logged and swallowed;
//! they never change the outcome of the job.

use std::sync::Arc;

use crate::capability::Notifier;
use crate::messages;
use crate::types::{JobPhase, OwnerKey, StatusHandle};

/// Whether progress at `done` of `total` should produce an edit.
///
/// Fires on the last unit and whenever `done` lands on a multiple of
/// `max(1, total / steps)`.
pub fn should_emit(done: u64, total: u64, steps: u64) -> bool {
    if total == 0 || done == 0 {
        return false;
    }
    let step = (total / steps.max(1)).max(1);
    done >= total || done % step == 0
}

/// `floor(done * 100 / total)`, clamped to 100.
pub fn percent(done: u64, total: u64) -> u64 {
    if total == 0 {
        return 0;
    }
    (done.min(total) * 100) / total
}

/// Per-job status sink. Owned by the worker; calls are sequential, so edits
/// for one job are never reordered.
pub struct ProgressReporter {
    notifier: Arc<dyn Notifier>,
    owner: OwnerKey,
    handle: Option<StatusHandle>,
    steps: u64,
    last_percent: u64,
    emitted: usize,
}

impl ProgressReporter {
    /// Post the initial "processing started" status.
    ///
    /// If that fails the reporter keeps going without a status message:
    /// progress edits are skipped and terminal notices fall back to a reply.
    pub async fn start(notifier: Arc<dyn Notifier>, owner: OwnerKey, steps: u64) -> Self {
        let handle = match notifier.send_initial(owner, messages::STARTED).await {
            Ok(handle) => Some(handle),
            Err(e) => {
                tracing::warn!(%owner, error = %e, "Could not post status message");
                None
            }
        };
        Self {
            notifier,
            owner,
            handle,
            steps: steps.max(1),
            // The initial message already shows 0%.
            last_percent: 0,
            emitted: 0,
        }
    }

    /// Report cumulative progress. Returns whether an edit was attempted.
    pub async fn report(&mut self, done: u64, total: u64, phase: JobPhase) -> bool {
        if !should_emit(done, total, self.steps) {
            return false;
        }
        let pct = percent(done, total);
        if pct < self.last_percent {
            return false;
        }
        self.last_percent = pct;
        self.emitted += 1;
        tracing::debug!(owner = %self.owner, done, total, pct, phase = phase.as_str(), "Progress");

        let text = messages::progress(pct, done, total);
        if let Some(handle) = &self.handle {
            if let Err(e) = self.notifier.edit(handle, &text).await {
                tracing::warn!(owner = %self.owner, error = %e, "Progress edit failed (ignored)");
            }
        }
        true
    }

    /// Completion notice, sent before the artifact goes out.
    pub async fn finish(&mut self, message: &str) {
        self.terminal(message).await;
    }

    /// Generic failure notice.
    pub async fn fail(&mut self, message: &str) {
        self.terminal(message).await;
    }

    /// Stop notice naming the unit the worker reached.
    pub async fn cancel(&mut self, at_unit: u64, total: u64) {
        self.terminal(&messages::cancelled(at_unit, total)).await;
    }

    /// Progress edits emitted so far (terminal notices not included).
    pub fn emitted(&self) -> usize {
        self.emitted
    }

    /// Status message handle, if the initial post succeeded.
    pub fn handle(&self) -> Option<&StatusHandle> {
        self.handle.as_ref()
    }

    async fn terminal(&mut self, text: &str) {
        let result = match &self.handle {
            Some(handle) => self.notifier.edit(handle, text).await,
            None => self.notifier.reply(self.owner, text).await,
        };
        if let Err(e) = result {
            tracing::warn!(owner = %self.owner, error = %e, "Status notice failed (ignored)");
        }
    }
}
