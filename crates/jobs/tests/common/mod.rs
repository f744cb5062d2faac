//! In-memory collaborators for driving conversion jobs in tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use sheetbot_jobs::{
    Capabilities, CapabilityError, ExtractionSource, Extractor, JobConfig, JobRegistry, JobSupervisor, Notifier,
    OwnerKey, Row, SourceFetcher, SourceRef, StatusHandle, Writer,
};
use tokio::sync::Semaphore;

/// Something the fake notifier was asked to do.
#[derive(Debug, Clone, PartialEq)]
pub enum Sent {
    Initial(String),
    Edit(String),
    Reply(String),
    Artifact { filename: String, caption: String, rows: Vec<Row> },
}

#[derive(Default)]
pub struct FakeNotifier {
    pub fail_artifact: bool,
    pub fail_edits: bool,
    sent: Mutex<Vec<Sent>>,
}

impl FakeNotifier {
    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    pub fn edits(&self) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter_map(|s| match s {
                Sent::Edit(text) => Some(text),
                _ => None,
            })
            .collect()
    }

    /// Percentages from progress edits, in the order they were sent.
    pub fn progress_percents(&self) -> Vec<u64> {
        self.edits()
            .iter()
            .filter_map(|text| {
                let rest = text.strip_prefix("Processing your file… ")?;
                rest.split('%').next()?.parse().ok()
            })
            .collect()
    }

    pub fn last_edit(&self) -> Option<String> {
        self.edits().pop()
    }

    pub fn artifacts(&self) -> Vec<(String, Vec<Row>)> {
        self.sent()
            .into_iter()
            .filter_map(|s| match s {
                Sent::Artifact { filename, rows, .. } => Some((filename, rows)),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl Notifier for FakeNotifier {
    async fn send_initial(&self, owner: OwnerKey, text: &str) -> Result<StatusHandle, CapabilityError> {
        self.sent.lock().unwrap().push(Sent::Initial(text.to_string()));
        Ok(StatusHandle { owner, message_id: 100 })
    }

    async fn edit(&self, _handle: &StatusHandle, text: &str) -> Result<(), CapabilityError> {
        self.sent.lock().unwrap().push(Sent::Edit(text.to_string()));
        if self.fail_edits {
            return Err(CapabilityError::new("Bad Request: message to edit not found"));
        }
        Ok(())
    }

    async fn send_artifact(
        &self,
        _owner: OwnerKey,
        artifact: &Path,
        filename: &str,
        caption: &str,
    ) -> Result<(), CapabilityError> {
        if self.fail_artifact {
            return Err(CapabilityError::new("Request Entity Too Large: internal detail"));
        }
        let bytes = std::fs::read(artifact).map_err(|e| CapabilityError::with_source("read artifact", e))?;
        let rows: Vec<Row> =
            serde_json::from_slice(&bytes).map_err(|e| CapabilityError::with_source("decode artifact", e))?;
        self.sent.lock().unwrap().push(Sent::Artifact {
            filename: filename.to_string(),
            caption: caption.to_string(),
            rows,
        });
        Ok(())
    }

    async fn reply(&self, _owner: OwnerKey, text: &str) -> Result<(), CapabilityError> {
        self.sent.lock().unwrap().push(Sent::Reply(text.to_string()));
        Ok(())
    }
}

/// Writes a placeholder source file, optionally waiting on a gate first.
#[derive(Default)]
pub struct FakeFetcher {
    pub fail: bool,
    pub gate: Option<Arc<Semaphore>>,
}

#[async_trait]
impl SourceFetcher for FakeFetcher {
    async fn fetch(&self, _source: &SourceRef, dest: &Path) -> Result<(), CapabilityError> {
        if let Some(gate) = &self.gate {
            let _permit = gate.acquire().await.map_err(|e| CapabilityError::with_source("gate closed", e))?;
        }
        if self.fail {
            return Err(CapabilityError::new("file is too big"));
        }
        tokio::fs::write(dest, b"%PDF-1.4 fake")
            .await
            .map_err(|e| CapabilityError::with_source("write source", e))
    }
}

/// Behaviour of one fake page.
#[derive(Clone)]
pub enum Page {
    Rows(Vec<Row>),
    Fail,
    Panic,
    Sleep(Duration),
}

/// Row set for page `n`: two rows tagged with the page number.
pub fn page_rows(n: u64) -> Vec<Row> {
    vec![
        vec![format!("p{n}"), "a".to_string()],
        vec![format!("p{n}"), "b".to_string(), "extra".to_string()],
    ]
}

pub fn pages(count: u64) -> Vec<Page> {
    (1..=count).map(|n| Page::Rows(page_rows(n))).collect()
}

type UnitHook = Arc<dyn Fn(u64) + Send + Sync>;

#[derive(Clone, Default)]
pub struct FakeExtractor {
    pub pages: Vec<Page>,
    pub fail_open: bool,
    pub on_unit: Option<UnitHook>,
    pub calls: Arc<AtomicUsize>,
}

impl FakeExtractor {
    pub fn with_pages(pages: Vec<Page>) -> Self {
        Self {
            pages,
            ..Default::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Extractor for FakeExtractor {
    fn open(&self, path: &Path) -> Result<Arc<dyn ExtractionSource>, CapabilityError> {
        if self.fail_open || !path.exists() {
            return Err(CapabilityError::new("not a PDF"));
        }
        Ok(Arc::new(self.clone()))
    }
}

impl ExtractionSource for FakeExtractor {
    fn unit_count(&self) -> u64 {
        self.pages.len() as u64
    }

    fn extract_unit(&self, index: u64) -> Result<Vec<Row>, CapabilityError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(hook) = &self.on_unit {
            hook(index);
        }
        match &self.pages[(index - 1) as usize] {
            Page::Rows(rows) => Ok(rows.clone()),
            Page::Fail => Err(CapabilityError::new(format!("damaged page {index}"))),
            Page::Panic => panic!("extractor crashed on page {index}"),
            Page::Sleep(d) => {
                std::thread::sleep(*d);
                Ok(Vec::new())
            }
        }
    }
}

/// Serializes rows as JSON so the notifier can read them back.
#[derive(Default)]
pub struct JsonWriter {
    pub fail: bool,
    pub calls: AtomicUsize,
}

impl Writer for JsonWriter {
    fn write(&self, rows: &[Row], dest: &Path) -> Result<(), CapabilityError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(CapabilityError::new("disk full"));
        }
        let bytes = serde_json::to_vec(rows).map_err(|e| CapabilityError::with_source("encode", e))?;
        std::fs::write(dest, bytes).map_err(|e| CapabilityError::with_source("write", e))
    }
}

/// A supervisor wired to fakes, with a private work directory.
pub struct Harness {
    pub supervisor: Arc<JobSupervisor>,
    pub registry: Arc<JobRegistry>,
    pub notifier: Arc<FakeNotifier>,
    pub extractor: FakeExtractor,
    pub writer: Arc<JsonWriter>,
    pub work_dir: tempfile::TempDir,
}

pub struct HarnessBuilder {
    pub notifier: FakeNotifier,
    pub fetcher: FakeFetcher,
    pub extractor: FakeExtractor,
    pub writer: JsonWriter,
    pub registry: Arc<JobRegistry>,
    pub config: JobConfig,
}

impl HarnessBuilder {
    pub fn new(pages: Vec<Page>) -> Self {
        Self {
            notifier: FakeNotifier::default(),
            fetcher: FakeFetcher::default(),
            extractor: FakeExtractor::with_pages(pages),
            writer: JsonWriter::default(),
            registry: Arc::new(JobRegistry::new()),
            config: JobConfig::default(),
        }
    }

    pub fn build(self) -> Harness {
        let work_dir = tempfile::tempdir().unwrap();
        let config = JobConfig {
            work_dir: work_dir.path().to_path_buf(),
            ..self.config
        };
        let notifier = Arc::new(self.notifier);
        let writer = Arc::new(self.writer);
        let caps = Capabilities {
            notifier: notifier.clone(),
            fetcher: Arc::new(self.fetcher),
            extractor: Arc::new(self.extractor.clone()),
            writer: writer.clone(),
        };
        let supervisor = Arc::new(JobSupervisor::with_registry(self.registry.clone(), caps, config));
        Harness {
            supervisor,
            registry: self.registry,
            notifier,
            extractor: self.extractor,
            writer,
            work_dir,
        }
    }
}

impl Harness {
    /// Entries left in the work directory (job workspaces not cleaned up).
    pub fn leftovers(&self) -> Vec<PathBuf> {
        std::fs::read_dir(self.work_dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().path())
            .collect()
    }

    pub fn writer_calls(&self) -> usize {
        self.writer.calls.load(Ordering::SeqCst)
    }

    /// Terminal-state cleanup holds for `owner`.
    pub fn assert_cleaned_up(&self, owner: OwnerKey) {
        assert!(self.registry.lookup(owner).is_none(), "registry entry left behind");
        assert_eq!(self.leftovers(), Vec::<PathBuf>::new(), "job workspace left behind");
    }
}

pub fn pdf(name: &str) -> SourceRef {
    SourceRef::new(format!("file-{name}"), name)
}
