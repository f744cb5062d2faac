// crates/jobs/src/lib.rs
//! Background PDF conversion jobs, one per chat.
//!
//! Provides:
//! - `JobSupervisor` — accepts requests, enforces single-flight, spawns workers
//! - `JobRegistry` — owner → in-flight job map
//! - `ConversionWorker` — the cancellable page-by-page pipeline
//! - `ProgressReporter` — throttled, best-effort status edits
//! - `CancellationToken` — cooperative stop flag
//! - capability traits for the notifier, fetcher, extractor and writer

pub mod cancel;
pub mod capability;
pub mod config;
pub mod error;
pub mod messages;
pub mod metrics;
pub mod progress;
pub mod registry;
pub mod supervisor;
pub mod types;
pub mod worker;

pub use cancel::CancellationToken;
pub use capability::{Capabilities, ExtractionSource, Extractor, Notifier, SourceFetcher, Writer};
pub use config::JobConfig;
pub use error::{CapabilityError, JobError};
pub use progress::ProgressReporter;
pub use registry::JobRegistry;
pub use supervisor::JobSupervisor;
pub use types::{
    EmptyReason, Job, JobId, JobOutcome, JobPhase, JobSummary, JobTicket, OwnerKey, RejectReason, Row,
    SourceRef, StatusHandle, StopResult, SubmitResult,
};
pub use worker::ConversionWorker;
