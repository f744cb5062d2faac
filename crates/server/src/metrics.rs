//! Application metrics for Prometheus monitoring.
//!
//! This module provides:
//! - Prometheus metrics recorder initialization
//! - Descriptions for server-side metrics (job metrics live in `sheetbot_jobs`)
//! - Helpers for recording webhook and Bot API activity

use std::sync::OnceLock;
use std::time::Duration;

use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Global Prometheus handle for rendering metrics.
static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Initialize the Prometheus metrics recorder.
///
/// Call once at startup, before any metrics are recorded.
/// Returns `false` if a recorder was already installed.
pub fn init_metrics() -> bool {
    if PROMETHEUS_HANDLE.get().is_some() {
        return false;
    }

    let recorder = PrometheusBuilder::new().build_recorder();
    let handle = recorder.handle();

    if metrics::set_global_recorder(recorder).is_err() {
        tracing::warn!("Failed to set global metrics recorder (already set)");
        return false;
    }

    if PROMETHEUS_HANDLE.set(handle).is_err() {
        tracing::warn!("Failed to store Prometheus handle (already set)");
    }

    describe_metrics();
    sheetbot_jobs::metrics::describe_job_metrics();

    tracing::info!("Prometheus metrics initialized");
    true
}

fn describe_metrics() {
    describe_counter!(
        "sheetbot_webhook_updates_total",
        "Inbound Telegram updates by kind"
    );
    describe_counter!(
        "sheetbot_telegram_requests_total",
        "Bot API calls by method and outcome"
    );
    describe_histogram!(
        "sheetbot_telegram_request_duration_seconds",
        "Bot API call latency in seconds"
    );
}

/// Render current metrics in Prometheus text format.
///
/// Returns `None` if metrics are not initialized.
pub fn render_metrics() -> Option<String> {
    PROMETHEUS_HANDLE.get().map(|h| h.render())
}

/// Record one inbound update (`document`, `stop`, `command`, `text`, `ignored`).
pub fn record_update(kind: &'static str) {
    counter!("sheetbot_webhook_updates_total", "kind" => kind).increment(1);
}

/// Record one Bot API call.
pub fn record_api_call(method: &'static str, ok: bool, duration: Duration) {
    let outcome = if ok { "ok" } else { "error" };
    counter!("sheetbot_telegram_requests_total", "method" => method, "outcome" => outcome).increment(1);
    histogram!("sheetbot_telegram_request_duration_seconds", "method" => method)
        .record(duration.as_secs_f64());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_without_recorder_is_noop() {
        record_update("text");
        record_api_call("sendMessage", true, Duration::from_millis(3));
    }

    #[test]
    fn test_init_is_idempotent() {
        init_metrics();
        assert!(!init_metrics());
        assert!(render_metrics().is_some());
    }
}
