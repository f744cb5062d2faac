// crates/jobs/src/error.rs
use std::time::Duration;

use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Failure reported by an external collaborator (notifier, fetcher,
/// extractor, writer).
#[derive(Debug, Error)]
#[error("{message}")]
pub struct CapabilityError {
    message: String,
    #[source]
    source: Option<BoxError>,
}

impl CapabilityError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(
        message: impl Into<String>,
        source: impl Into<BoxError>,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Internal failure of a conversion job. Logged, never shown to the user.
#[derive(Debug, Error)]
pub enum JobError {
    #[error("could not create job workspace: {0}")]
    Workspace(#[source] std::io::Error),

    #[error("staging source failed: {0}")]
    Staging(#[source] CapabilityError),

    #[error("opening source failed: {0}")]
    Open(#[source] CapabilityError),

    #[error("writing artifact failed: {0}")]
    Write(#[source] CapabilityError),

    #[error("sending artifact failed: {0}")]
    Send(#[source] CapabilityError),

    #[error("blocking task for {stage} failed: {message}")]
    Blocking { stage: &'static str, message: String },

    #[error("job exceeded its {0:?} time limit")]
    TimedOut(Duration),

    #[error("worker panicked: {0}")]
    Panicked(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_capability_error_keeps_source() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk full");
        let err = CapabilityError::with_source("write failed", io);
        assert_eq!(err.to_string(), "write failed");
        assert_eq!(err.source().unwrap().to_string(), "disk full");
    }

    #[test]
    fn test_job_error_display() {
        let err = JobError::Send(CapabilityError::new("chat not found"));
        assert_eq!(err.to_string(), "sending artifact failed: chat not found");

        let err = JobError::TimedOut(Duration::from_secs(5));
        assert_eq!(err.to_string(), "job exceeded its 5s time limit");
    }
}
