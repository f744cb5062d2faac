// crates/jobs/src/supervisor.rs
//! Entry point for inbound requests: accepts, launches and stops jobs.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::capability::Capabilities;
use crate::config::JobConfig;
use crate::metrics;
use crate::registry::JobRegistry;
use crate::types::{Job, JobSummary, JobTicket, OwnerKey, RejectReason, SourceRef, StopResult, SubmitResult};
use crate::worker::ConversionWorker;

/// Accepts conversion requests and launches one worker task per job.
///
/// `submit` and `request_stop` never wait on a conversion; they only touch
/// the registry and spawn. Must be used from inside a Tokio runtime.
pub struct JobSupervisor {
    next_id: AtomicU64,
    registry: Arc<JobRegistry>,
    caps: Capabilities,
    config: JobConfig,
}

impl JobSupervisor {
    pub fn new(caps: Capabilities, config: JobConfig) -> Self {
        Self::with_registry(Arc::new(JobRegistry::new()), caps, config)
    }

    /// Build around an existing registry (shared with status endpoints).
    pub fn with_registry(registry: Arc<JobRegistry>, caps: Capabilities, config: JobConfig) -> Self {
        Self {
            next_id: AtomicU64::new(1),
            registry,
            caps,
            config,
        }
    }

    /// Start converting `source` for `owner`, unless the request is invalid
    /// or the owner already has a job in flight.
    pub fn submit(&self, owner: OwnerKey, source: SourceRef) -> SubmitResult {
        if !source.is_pdf() {
            tracing::info!(%owner, file = %source.file_name, "Rejected non-PDF upload");
            metrics::record_rejection("not_pdf");
            return SubmitResult::Rejected(RejectReason::NotPdf);
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let job = Job::new(id, owner);
        if !self.registry.try_acquire(owner, job.clone()) {
            tracing::info!(%owner, "Conversion already running; request rejected");
            metrics::record_rejection("already_running");
            return SubmitResult::Rejected(RejectReason::AlreadyRunning);
        }

        let worker = ConversionWorker::new(
            job,
            source,
            Arc::clone(&self.registry),
            self.caps.clone(),
            self.config.clone(),
        );
        let join = tokio::spawn(worker.run());
        tracing::debug!(%owner, job_id = id, "Conversion task spawned");

        SubmitResult::Accepted(JobTicket::new(id, join))
    }

    /// Ask the owner's in-flight job to stop at its next page boundary.
    pub fn request_stop(&self, owner: OwnerKey) -> StopResult {
        match self.registry.lookup(owner) {
            Some(job) => {
                job.token.set();
                tracing::info!(%owner, job_id = job.id, "Stop requested");
                StopResult::Stopped
            }
            None => StopResult::NoActiveJob,
        }
    }

    /// Snapshot of all in-flight jobs.
    pub fn active_jobs(&self) -> Vec<JobSummary> {
        self.registry.active().iter().map(Job::summary).collect()
    }

    pub fn registry(&self) -> &Arc<JobRegistry> {
        &self.registry
    }

    pub fn config(&self) -> &JobConfig {
        &self.config
    }
}
