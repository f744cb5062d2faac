// crates/jobs/src/config.rs
//! Tunables for conversion jobs.

use std::path::PathBuf;
use std::time::Duration;

/// Default number of progress edits per job.
pub const DEFAULT_PROGRESS_STEPS: u64 = 10;

/// Default hard ceiling on pages processed per document.
pub const DEFAULT_MAX_UNITS: u64 = 12_000;

/// Default wall-clock limit for one job.
pub const DEFAULT_JOB_TIMEOUT: Duration = Duration::from_secs(600);

/// Configuration shared by every job a supervisor launches.
#[derive(Debug, Clone)]
pub struct JobConfig {
    /// Roughly how many progress edits a job emits.
    pub progress_steps: u64,
    /// Units beyond this are not processed.
    pub max_units: u64,
    /// `None` disables the per-job time limit.
    pub job_timeout: Option<Duration>,
    /// Parent directory for per-job temporary workspaces.
    pub work_dir: PathBuf,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            progress_steps: DEFAULT_PROGRESS_STEPS,
            max_units: DEFAULT_MAX_UNITS,
            job_timeout: Some(DEFAULT_JOB_TIMEOUT),
            work_dir: std::env::temp_dir(),
        }
    }
}
