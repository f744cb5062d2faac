// crates/jobs/src/types.rs
//! Types shared by the conversion job system.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::task::JoinHandle;

use crate::cancel::CancellationToken;

/// Unique identifier for an accepted job.
pub type JobId = u64;

/// One extracted table row. Cell order is significant.
pub type Row = Vec<String>;

/// Identifier of the single-flight scope (one chat).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct OwnerKey(pub i64);

impl fmt::Display for OwnerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for OwnerKey {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

/// Reference to an uploaded document that has not been staged locally yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRef {
    pub file_id: String,
    pub file_name: String,
}

impl SourceRef {
    pub fn new(file_id: impl Into<String>, file_name: impl Into<String>) -> Self {
        Self {
            file_id: file_id.into(),
            file_name: file_name.into(),
        }
    }

    /// True when the file name carries a `.pdf` extension (any case).
    pub fn is_pdf(&self) -> bool {
        self.file_name.to_ascii_lowercase().ends_with(".pdf")
    }

    /// File name for the converted workbook: same stem, `.xlsx` extension.
    ///
    /// Path separators are stripped so the name is safe to use inside the
    /// job workspace.
    pub fn artifact_name(&self) -> String {
        let base = self
            .file_name
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or_default()
            .replace('\0', "");
        let stem = match base.len().checked_sub(4) {
            Some(cut) if base.is_char_boundary(cut) && base[cut..].eq_ignore_ascii_case(".pdf") => {
                &base[..cut]
            }
            _ => base.as_str(),
        };
        let stem = if stem.trim().is_empty() { "converted" } else { stem };
        format!("{stem}.xlsx")
    }
}

/// Opaque reference to the in-flight status message of a job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusHandle {
    pub owner: OwnerKey,
    pub message_id: i64,
}

/// Registry entry for an in-flight job.
#[derive(Debug, Clone)]
pub struct Job {
    pub id: JobId,
    pub owner_key: OwnerKey,
    pub token: CancellationToken,
    pub started_at: DateTime<Utc>,
}

impl Job {
    pub fn new(id: JobId, owner_key: OwnerKey) -> Self {
        Self {
            id,
            owner_key,
            token: CancellationToken::new(),
            started_at: Utc::now(),
        }
    }

    /// Snapshot suitable for status endpoints.
    pub fn summary(&self) -> JobSummary {
        JobSummary {
            job_id: self.id,
            owner: self.owner_key,
            started_at: self.started_at.to_rfc3339(),
            stop_requested: self.token.is_set(),
        }
    }
}

/// Serializable view of an active job.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSummary {
    pub job_id: JobId,
    pub owner: OwnerKey,
    pub started_at: String,
    pub stop_requested: bool,
}

/// Non-terminal stage the worker is in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobPhase {
    Starting,
    Extracting,
    Writing,
    Sending,
}

impl JobPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Starting => "starting",
            Self::Extracting => "extracting",
            Self::Writing => "writing",
            Self::Sending => "sending",
        }
    }
}

/// Why a job ended without producing an artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmptyReason {
    /// The source has no units at all.
    NoUnits,
    /// Every unit was processed but no rows were recovered.
    NoRows,
}

/// Terminal state of a job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Done { rows: usize, truncated: bool },
    Cancelled { at_unit: u64, total: u64 },
    Empty(EmptyReason),
    Errored,
}

impl JobOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Done { .. } => "done",
            Self::Cancelled { .. } => "cancelled",
            Self::Empty(_) => "empty",
            Self::Errored => "errored",
        }
    }
}

/// Why `submit` refused to start a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// The uploaded file is not a PDF.
    NotPdf,
    /// The owner already has a job in flight.
    AlreadyRunning,
}

impl RejectReason {
    /// Reply text shown to the requester.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::NotPdf => crate::messages::NOT_A_PDF,
            Self::AlreadyRunning => crate::messages::ALREADY_RUNNING,
        }
    }
}

/// Handle to an accepted job.
pub struct JobTicket {
    pub id: JobId,
    join: JoinHandle<JobOutcome>,
}

impl JobTicket {
    pub(crate) fn new(id: JobId, join: JoinHandle<JobOutcome>) -> Self {
        Self { id, join }
    }

    /// Wait for the worker to reach a terminal state.
    ///
    /// The worker never surfaces faults, so a join failure (the task was
    /// aborted by runtime shutdown) is reported as `Errored`.
    pub async fn wait(self) -> JobOutcome {
        match self.join.await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(job_id = self.id, error = %e, "Conversion task did not complete");
                JobOutcome::Errored
            }
        }
    }
}

impl fmt::Debug for JobTicket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobTicket").field("id", &self.id).finish_non_exhaustive()
    }
}

/// Result of `JobSupervisor::submit`.
#[derive(Debug)]
pub enum SubmitResult {
    Accepted(JobTicket),
    Rejected(RejectReason),
}

impl SubmitResult {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted(_))
    }
}

/// Result of `JobSupervisor::request_stop`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopResult {
    Stopped,
    NoActiveJob,
}

impl StopResult {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Stopped => crate::messages::STOP_REQUESTED,
            Self::NoActiveJob => crate::messages::NOTHING_TO_STOP,
        }
    }
}
