// crates/jobs/src/capability.rs
//! Contracts for the collaborators a conversion job talks to.
//!
//! Implementations live outside this crate:
//! - `TelegramClient` (sheetbot-server) — `Notifier` + `SourceFetcher`
//! - `LopdfExtractor` (sheetbot-convert) — `Extractor`
//! - `XlsxWriter` (sheetbot-convert) — `Writer`

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::CapabilityError;
use crate::types::{OwnerKey, Row, SourceRef, StatusHandle};

/// Outbound messaging to the requester.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Post the status message that later progress edits replace in place.
    async fn send_initial(&self, owner: OwnerKey, text: &str) -> Result<StatusHandle, CapabilityError>;

    /// Replace the text of an existing status message.
    async fn edit(&self, handle: &StatusHandle, text: &str) -> Result<(), CapabilityError>;

    /// Deliver the finished artifact.
    async fn send_artifact(
        &self,
        owner: OwnerKey,
        artifact: &Path,
        filename: &str,
        caption: &str,
    ) -> Result<(), CapabilityError>;

    /// Send a standalone message (rejections, stop acknowledgements).
    async fn reply(&self, owner: OwnerKey, text: &str) -> Result<(), CapabilityError>;
}

/// Downloads an uploaded document into the job workspace.
#[async_trait]
pub trait SourceFetcher: Send + Sync {
    async fn fetch(&self, source: &SourceRef, dest: &Path) -> Result<(), CapabilityError>;
}

/// Opens staged documents for page-by-page extraction.
///
/// Called from the blocking pool; implementations may do synchronous I/O.
pub trait Extractor: Send + Sync {
    fn open(&self, path: &Path) -> Result<Arc<dyn ExtractionSource>, CapabilityError>;
}

/// A document opened by an [`Extractor`].
pub trait ExtractionSource: Send + Sync {
    /// Number of units (pages) in the document.
    fn unit_count(&self) -> u64;

    /// Rows recovered from unit `index` (1-based). May be empty.
    fn extract_unit(&self, index: u64) -> Result<Vec<Row>, CapabilityError>;
}

/// Turns accumulated rows into an artifact file.
///
/// Rows may have unequal lengths; laying them out is the writer's concern.
/// Called from the blocking pool.
pub trait Writer: Send + Sync {
    fn write(&self, rows: &[Row], dest: &Path) -> Result<(), CapabilityError>;
}

/// The set of collaborators a supervisor hands to every worker.
#[derive(Clone)]
pub struct Capabilities {
    pub notifier: Arc<dyn Notifier>,
    pub fetcher: Arc<dyn SourceFetcher>,
    pub extractor: Arc<dyn Extractor>,
    pub writer: Arc<dyn Writer>,
}
