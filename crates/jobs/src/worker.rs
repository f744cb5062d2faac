// crates/jobs/src/worker.rs
//! The cancellable, page-by-page conversion pipeline for one job.
//!
//! ```text
//! Starting → Extracting → (Cancelled | Empty | Writing) → Sending → Done
//!                 any non-terminal stage ──────────────────────────→ Errored
//! ```
//!
//! Every exit path releases the registry entry and removes the job's
//! temporary workspace. Faults inside the pipeline (errors, timeouts,
//! panics) end in `Errored`; nothing propagates to the caller.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::FutureExt;

use crate::capability::Capabilities;
use crate::config::JobConfig;
use crate::error::JobError;
use crate::messages;
use crate::metrics;
use crate::progress::ProgressReporter;
use crate::registry::JobRegistry;
use crate::types::{EmptyReason, Job, JobOutcome, JobPhase, OwnerKey, Row, SourceRef};

/// File name the staged source gets inside the job workspace.
const STAGED_SOURCE_NAME: &str = "source.pdf";

/// Removes the owner's registry entry when dropped, including during unwind.
struct RegistryRelease {
    registry: Arc<JobRegistry>,
    owner: OwnerKey,
    job_id: u64,
}

impl Drop for RegistryRelease {
    fn drop(&mut self) {
        if self.registry.release(self.owner) {
            tracing::debug!(owner = %self.owner, job_id = self.job_id, "Released job slot");
        }
    }
}

/// Background body of one accepted job.
pub struct ConversionWorker {
    job: Job,
    source: SourceRef,
    registry: Arc<JobRegistry>,
    caps: Capabilities,
    config: JobConfig,
}

impl ConversionWorker {
    pub fn new(
        job: Job,
        source: SourceRef,
        registry: Arc<JobRegistry>,
        caps: Capabilities,
        config: JobConfig,
    ) -> Self {
        Self {
            job,
            source,
            registry,
            caps,
            config,
        }
    }

    /// Run to a terminal state.
    pub async fn run(self) -> JobOutcome {
        let started = Instant::now();
        let owner = self.job.owner_key;
        let job_id = self.job.id;
        let _release = RegistryRelease {
            registry: Arc::clone(&self.registry),
            owner,
            job_id,
        };
        metrics::record_job_started();
        tracing::info!(%owner, job_id, file = %self.source.file_name, "Conversion started");

        let mut reporter = ProgressReporter::start(
            Arc::clone(&self.caps.notifier),
            owner,
            self.config.progress_steps,
        )
        .await;

        let result = match self.create_workspace().await {
            Ok(workspace) => {
                let run = with_timeout(self.config.job_timeout, self.convert(&mut reporter, workspace.path()));
                let result = match AssertUnwindSafe(run).catch_unwind().await {
                    Ok(result) => result,
                    Err(payload) => Err(JobError::Panicked(panic_message(payload.as_ref()))),
                };
                let path = workspace.path().to_path_buf();
                if let Err(e) = workspace.close() {
                    tracing::warn!(%owner, job_id, path = %path.display(), error = %e, "Could not remove job workspace");
                }
                result
            }
            Err(e) => Err(e),
        };

        let outcome = match result {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(%owner, job_id, error = %e, "Conversion failed");
                reporter.fail(messages::FAILED).await;
                JobOutcome::Errored
            }
        };

        let elapsed = started.elapsed();
        metrics::record_job_finished(&outcome, elapsed);
        tracing::info!(
            %owner,
            job_id,
            outcome = outcome.as_str(),
            progress_edits = reporter.emitted(),
            duration_secs = elapsed.as_secs_f64(),
            "Conversion finished"
        );
        outcome
    }

    async fn create_workspace(&self) -> Result<tempfile::TempDir, JobError> {
        tokio::fs::create_dir_all(&self.config.work_dir)
            .await
            .map_err(JobError::Workspace)?;
        tempfile::Builder::new()
            .prefix("sheetbot-")
            .tempdir_in(&self.config.work_dir)
            .map_err(JobError::Workspace)
    }

    async fn convert(
        &self,
        reporter: &mut ProgressReporter,
        workspace: &Path,
    ) -> Result<JobOutcome, JobError> {
        let owner = self.job.owner_key;
        let job_id = self.job.id;

        // Starting: stage and open the source.
        let source_path = workspace.join(STAGED_SOURCE_NAME);
        self.caps
            .fetcher
            .fetch(&self.source, &source_path)
            .await
            .map_err(JobError::Staging)?;

        let extractor = Arc::clone(&self.caps.extractor);
        let open_path = source_path.clone();
        let document = blocking("open", move || extractor.open(&open_path))
            .await?
            .map_err(JobError::Open)?;

        let total = document.unit_count();
        if total == 0 {
            tracing::info!(%owner, job_id, "Source has no pages");
            reporter.finish(messages::EMPTY_SOURCE).await;
            return Ok(JobOutcome::Empty(EmptyReason::NoUnits));
        }
        let limit = total.min(self.config.max_units);
        if limit < total {
            tracing::warn!(%owner, job_id, total, limit, "Source exceeds page ceiling; trailing pages skipped");
        }

        // Extracting
        tracing::debug!(%owner, job_id, phase = JobPhase::Extracting.as_str(), limit, "Extracting pages");
        let mut rows: Vec<Row> = Vec::new();
        for unit in 1..=limit {
            if self.job.token.is_set() {
                tracing::info!(%owner, job_id, unit, limit, "Conversion cancelled");
                reporter.cancel(unit, limit).await;
                return Ok(JobOutcome::Cancelled {
                    at_unit: unit,
                    total: limit,
                });
            }

            let page = Arc::clone(&document);
            match blocking("extract", move || page.extract_unit(unit)).await {
                Ok(Ok(unit_rows)) => rows.extend(unit_rows),
                Ok(Err(e)) => {
                    metrics::record_unit_failure();
                    tracing::warn!(%owner, job_id, unit, error = %e, "Page extraction failed; skipping page");
                }
                Err(e) => {
                    metrics::record_unit_failure();
                    tracing::warn!(%owner, job_id, unit, error = %e, "Page extraction aborted; skipping page");
                }
            }

            reporter.report(unit, limit, JobPhase::Extracting).await;
        }
        drop(document);

        if rows.is_empty() {
            tracing::info!(%owner, job_id, pages = limit, "No rows recovered");
            reporter.finish(messages::NO_ROWS).await;
            return Ok(JobOutcome::Empty(EmptyReason::NoRows));
        }

        // Writing
        let row_count = rows.len();
        tracing::debug!(%owner, job_id, phase = JobPhase::Writing.as_str(), rows = row_count, "Writing artifact");
        let artifact_name = self.source.artifact_name();
        let artifact_path = workspace.join(&artifact_name);
        let writer = Arc::clone(&self.caps.writer);
        let dest = artifact_path.clone();
        blocking("write", move || writer.write(&rows, &dest))
            .await?
            .map_err(JobError::Write)?;

        // Sending: announce first, the upload can be slow.
        tracing::debug!(%owner, job_id, phase = JobPhase::Sending.as_str(), "Sending artifact");
        reporter.finish(&messages::complete(limit, total)).await;
        self.caps
            .notifier
            .send_artifact(owner, &artifact_path, &artifact_name, messages::ARTIFACT_CAPTION)
            .await
            .map_err(JobError::Send)?;

        Ok(JobOutcome::Done {
            rows: row_count,
            truncated: limit < total,
        })
    }
}

/// Run blocking collaborator code off the async workers.
async fn blocking<T, F>(stage: &'static str, f: F) -> Result<T, JobError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| JobError::Blocking {
            stage,
            message: e.to_string(),
        })
}

async fn with_timeout<F>(limit: Option<Duration>, fut: F) -> Result<JobOutcome, JobError>
where
    F: std::future::Future<Output = Result<JobOutcome, JobError>>,
{
    match limit {
        Some(limit) => match tokio::time::timeout(limit, fut).await {
            Ok(result) => result,
            Err(_) => Err(JobError::TimedOut(limit)),
        },
        None => fut.await,
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_panic_message_variants() {
        let payload: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(payload.as_ref()), "boom");

        let payload: Box<dyn Any + Send> = Box::new(String::from("owned boom"));
        assert_eq!(panic_message(payload.as_ref()), "owned boom");

        let payload: Box<dyn Any + Send> = Box::new(42u8);
        assert_eq!(panic_message(payload.as_ref()), "unknown panic");
    }

    #[tokio::test]
    async fn test_with_timeout_expires() {
        let result = with_timeout(Some(Duration::from_millis(10)), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(JobOutcome::Errored)
        })
        .await;
        assert!(matches!(result, Err(JobError::TimedOut(_))));
    }

    #[tokio::test]
    async fn test_with_timeout_disabled_passes_through() {
        let result = with_timeout(None, async { Ok(JobOutcome::Empty(EmptyReason::NoRows)) }).await;
        assert_eq!(result.unwrap(), JobOutcome::Empty(EmptyReason::NoRows));
    }

    #[tokio::test]
    async fn test_blocking_reports_panics_as_errors() {
        let result: Result<(), JobError> = blocking("extract", || panic!("bad page")).await;
        assert!(matches!(result, Err(JobError::Blocking { stage: "extract", .. })));
    }
}
