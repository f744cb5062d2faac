// crates/jobs/src/metrics.rs
//! Job metrics recorded through the `metrics` facade.
//!
//! Nothing is exported unless the host installs a recorder
//! (see `sheetbot-server`'s `init_metrics`).

use std::time::Duration;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};

use crate::types::JobOutcome;

pub const JOBS_TOTAL: &str = "sheetbot_jobs_total";
pub const JOB_DURATION_SECONDS: &str = "sheetbot_job_duration_seconds";
pub const UNIT_FAILURES_TOTAL: &str = "sheetbot_unit_failures_total";
pub const JOBS_ACTIVE: &str = "sheetbot_jobs_active";
pub const REJECTIONS_TOTAL: &str = "sheetbot_rejections_total";

/// Register descriptions for every job metric.
pub fn describe_job_metrics() {
    describe_counter!(JOBS_TOTAL, "Conversion jobs that reached a terminal state, by outcome");
    describe_histogram!(JOB_DURATION_SECONDS, "Wall-clock duration of conversion jobs in seconds");
    describe_counter!(UNIT_FAILURES_TOTAL, "Pages whose extraction failed and were skipped");
    describe_gauge!(JOBS_ACTIVE, "Conversion jobs currently in flight");
    describe_counter!(REJECTIONS_TOTAL, "Submissions refused, by reason");
}

pub(crate) fn record_job_started() {
    gauge!(JOBS_ACTIVE).increment(1.0);
}

pub(crate) fn record_job_finished(outcome: &JobOutcome, duration: Duration) {
    gauge!(JOBS_ACTIVE).decrement(1.0);
    counter!(JOBS_TOTAL, "outcome" => outcome.as_str()).increment(1);
    histogram!(JOB_DURATION_SECONDS, "outcome" => outcome.as_str()).record(duration.as_secs_f64());
}

pub(crate) fn record_unit_failure() {
    counter!(UNIT_FAILURES_TOTAL).increment(1);
}

pub(crate) fn record_rejection(reason: &'static str) {
    counter!(REJECTIONS_TOTAL, "reason" => reason).increment(1);
}
