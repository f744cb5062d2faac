use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use sheetbot_jobs::{
    messages, Capabilities, CapabilityError, ExtractionSource, Extractor, JobConfig, JobSupervisor, Notifier,
    OwnerKey, Row, SourceFetcher, SourceRef, StatusHandle, Writer,
};
use sheetbot_server::{create_app, AppState};
use tokio::sync::Semaphore;
use tower::ServiceExt;

const TOKEN: &str = "42:test-token";

#[derive(Default)]
struct RecordingNotifier {
    replies: Mutex<Vec<(OwnerKey, String)>>,
    initial: Mutex<Vec<OwnerKey>>,
    artifacts: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    fn replies(&self) -> Vec<(OwnerKey, String)> {
        self.replies.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send_initial(&self, owner: OwnerKey, _text: &str) -> Result<StatusHandle, CapabilityError> {
        self.initial.lock().unwrap().push(owner);
        Ok(StatusHandle { owner, message_id: 1 })
    }

    async fn edit(&self, _handle: &StatusHandle, _text: &str) -> Result<(), CapabilityError> {
        Ok(())
    }

    async fn send_artifact(
        &self,
        _owner: OwnerKey,
        _artifact: &Path,
        filename: &str,
        _caption: &str,
    ) -> Result<(), CapabilityError> {
        self.artifacts.lock().unwrap().push(filename.to_string());
        Ok(())
    }

    async fn reply(&self, owner: OwnerKey, text: &str) -> Result<(), CapabilityError> {
        self.replies.lock().unwrap().push((owner, text.to_string()));
        Ok(())
    }
}

struct GatedFetcher {
    gate: Arc<Semaphore>,
}

#[async_trait]
impl SourceFetcher for GatedFetcher {
    async fn fetch(&self, _source: &SourceRef, dest: &Path) -> Result<(), CapabilityError> {
        let _permit = self
            .gate
            .acquire()
            .await
            .map_err(|e| CapabilityError::with_source("gate closed", e))?;
        tokio::fs::write(dest, b"%PDF")
            .await
            .map_err(|e| CapabilityError::with_source("write", e))
    }
}

struct OnePage;

impl Extractor for OnePage {
    fn open(&self, _path: &Path) -> Result<Arc<dyn ExtractionSource>, CapabilityError> {
        Ok(Arc::new(OnePage))
    }
}

impl ExtractionSource for OnePage {
    fn unit_count(&self) -> u64 {
        1
    }

    fn extract_unit(&self, _index: u64) -> Result<Vec<Row>, CapabilityError> {
        Ok(vec![vec!["a".to_string(), "1".to_string()]])
    }
}

struct TouchWriter;

impl Writer for TouchWriter {
    fn write(&self, _rows: &[Row], dest: &Path) -> Result<(), CapabilityError> {
        std::fs::write(dest, b"PK").map_err(|e| CapabilityError::with_source("write", e))
    }
}

struct TestApp {
    app: axum::Router,
    supervisor: Arc<JobSupervisor>,
    notifier: Arc<RecordingNotifier>,
    gate: Arc<Semaphore>,
    _work_dir: tempfile::TempDir,
}

fn test_app() -> TestApp {
    let work_dir = tempfile::tempdir().unwrap();
    let notifier = Arc::new(RecordingNotifier::default());
    let gate = Arc::new(Semaphore::new(0));
    let caps = Capabilities {
        notifier: notifier.clone(),
        fetcher: Arc::new(GatedFetcher { gate: gate.clone() }),
        extractor: Arc::new(OnePage),
        writer: Arc::new(TouchWriter),
    };
    let config = JobConfig {
        work_dir: work_dir.path().to_path_buf(),
        ..JobConfig::default()
    };
    let supervisor = Arc::new(JobSupervisor::new(caps, config));
    let state = AppState::new(TOKEN, supervisor.clone(), notifier.clone());
    TestApp {
        app: create_app(state),
        supervisor,
        notifier,
        gate,
        _work_dir: work_dir,
    }
}

/// Helper to make a request to the app.
async fn request(app: axum::Router, method: &str, uri: &str, body: Option<String>) -> (StatusCode, String) {
    let mut builder = Request::builder().method(method).uri(uri);

    let body = if let Some(raw) = body {
        builder = builder.header("content-type", "application/json");
        Body::from(raw)
    } else {
        Body::empty()
    };

    let response = app.oneshot(builder.body(body).unwrap()).await.unwrap();

    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

async fn post_update(app: &axum::Router, update: serde_json::Value) -> (StatusCode, String) {
    request(app.clone(), "POST", &format!("/webhook/{TOKEN}"), Some(update.to_string())).await
}

fn text_update(chat: i64, text: &str) -> serde_json::Value {
    serde_json::json!({
        "update_id": 1,
        "message": {"message_id": 10, "chat": {"id": chat}, "text": text}
    })
}

fn document_update(chat: i64, name: &str) -> serde_json::Value {
    serde_json::json!({
        "update_id": 2,
        "message": {
            "message_id": 11,
            "chat": {"id": chat},
            "document": {"file_id": "FILE", "file_name": name, "mime_type": "application/pdf"}
        }
    })
}

#[tokio::test]
async fn home_banner() {
    let t = test_app();
    let (status, body) = request(t.app, "GET", "/", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "🚀 Telegram PDF Converter Bot Running!");
}

#[tokio::test]
async fn health_reports_active_jobs() {
    let t = test_app();
    let (status, body) = request(t.app, "GET", "/api/health", None).await;

    assert_eq!(status, StatusCode::OK);
    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["status"], "ok");
    assert!(json["version"].is_string());
    assert!(json["uptime_secs"].is_number());
    assert_eq!(json["active_jobs"], 0);
}

#[tokio::test]
async fn wrong_token_is_not_found() {
    let t = test_app();
    let (status, body) = request(t.app, "POST", "/webhook/nope", Some(text_update(1, "hi").to_string())).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(!body.contains(TOKEN));
    assert!(t.notifier.replies().is_empty());
}

#[tokio::test]
async fn malformed_update_is_acknowledged() {
    let t = test_app();
    let (status, body) = request(t.app, "POST", &format!("/webhook/{TOKEN}"), Some("{not json".to_string())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "ok");
    assert!(t.notifier.replies().is_empty());
}

#[tokio::test]
async fn start_command_gets_greeting() {
    let t = test_app();
    let (status, _) = post_update(&t.app, text_update(7, "/start")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(t.notifier.replies(), vec![(OwnerKey(7), messages::GREETING.to_string())]);
}

#[tokio::test]
async fn plain_text_asks_for_pdf() {
    let t = test_app();
    post_update(&t.app, text_update(7, "hello")).await;
    assert_eq!(t.notifier.replies(), vec![(OwnerKey(7), messages::NOT_A_PDF.to_string())]);
}

#[tokio::test]
async fn non_pdf_document_is_rejected() {
    let t = test_app();
    post_update(&t.app, document_update(7, "notes.txt")).await;
    assert_eq!(t.notifier.replies(), vec![(OwnerKey(7), messages::NOT_A_PDF.to_string())]);
    assert!(t.supervisor.registry().is_empty());
}

#[tokio::test]
async fn oversized_pdf_is_rejected_before_a_job_starts() {
    let t = test_app();
    let update = serde_json::json!({
        "update_id": 4,
        "message": {
            "message_id": 12,
            "chat": {"id": 7},
            "document": {"file_id": "FILE", "file_name": "huge.pdf", "file_size": 25 * 1024 * 1024}
        }
    });

    let (status, body) = post_update(&t.app, update).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "ok");
    assert_eq!(t.notifier.replies(), vec![(OwnerKey(7), messages::TOO_LARGE.to_string())]);
    assert!(t.supervisor.registry().is_empty());
    assert!(t.notifier.initial.lock().unwrap().is_empty());
}

#[tokio::test]
async fn stop_without_job() {
    let t = test_app();
    post_update(&t.app, text_update(7, "/stop")).await;
    assert_eq!(t.notifier.replies(), vec![(OwnerKey(7), messages::NOTHING_TO_STOP.to_string())]);
}

#[tokio::test]
async fn pdf_is_accepted_and_duplicate_rejected() {
    let t = test_app();

    let (status, body) = post_update(&t.app, document_update(9, "bank.pdf")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "ok");
    assert_eq!(t.supervisor.registry().len(), 1);
    assert!(t.notifier.replies().is_empty());

    post_update(&t.app, document_update(9, "again.pdf")).await;
    assert_eq!(t.notifier.replies(), vec![(OwnerKey(9), messages::ALREADY_RUNNING.to_string())]);

    let (_, jobs) = request(t.app.clone(), "GET", "/api/jobs", None).await;
    let jobs: serde_json::Value = serde_json::from_str(&jobs).unwrap();
    assert_eq!(jobs.as_array().unwrap().len(), 1);
    assert_eq!(jobs[0]["owner"], 9);

    // Let the first job finish and release its slot.
    t.gate.add_permits(1);
    for _ in 0..200 {
        if t.supervisor.registry().is_empty() {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    assert!(t.supervisor.registry().is_empty());
    assert_eq!(*t.notifier.artifacts.lock().unwrap(), vec!["bank.xlsx".to_string()]);
}

#[tokio::test]
async fn stop_acknowledged_while_running() {
    let t = test_app();

    post_update(&t.app, document_update(3, "bank.pdf")).await;
    post_update(&t.app, text_update(3, "/stop")).await;

    assert_eq!(t.notifier.replies(), vec![(OwnerKey(3), messages::STOP_REQUESTED.to_string())]);
    let job = t.supervisor.registry().lookup(OwnerKey(3)).unwrap();
    assert!(job.token.is_set());

    t.gate.add_permits(1);
}
