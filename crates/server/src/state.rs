// crates/server/src/state.rs
//! Application state for the Axum server.

use std::sync::Arc;
use std::time::Instant;

use sheetbot_jobs::{JobSupervisor, Notifier};

/// Shared application state accessible from all route handlers.
pub struct AppState {
    /// Server start time for uptime tracking.
    pub start_time: Instant,
    /// Path secret Telegram must present on `/webhook/{token}`.
    pub webhook_token: String,
    /// Accepts and stops conversion jobs.
    pub supervisor: Arc<JobSupervisor>,
    /// Used for immediate replies (greeting, rejections, stop acknowledgements).
    pub notifier: Arc<dyn Notifier>,
}

impl AppState {
    /// Create a new application state wrapped in an Arc for sharing.
    pub fn new(
        webhook_token: impl Into<String>,
        supervisor: Arc<JobSupervisor>,
        notifier: Arc<dyn Notifier>,
    ) -> Arc<Self> {
        Arc::new(Self {
            start_time: Instant::now(),
            webhook_token: webhook_token.into(),
            supervisor,
            notifier,
        })
    }

    /// Get the server uptime in seconds.
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
