// crates/server/src/telegram/client.rs
//! Bot API client over `reqwest`.

use std::path::Path;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;
use sheetbot_jobs::{CapabilityError, Notifier, OwnerKey, SourceFetcher, SourceRef, StatusHandle};
use thiserror::Error;
use tokio::io::AsyncWriteExt;

use super::types::{ApiResponse, File, Message};
use crate::metrics::record_api_call;

const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Upper bound for one API round trip, uploads included.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Error)]
pub enum TelegramError {
    /// Transport failure. The URL is stripped because it embeds the bot token.
    #[error("HTTP error: {0}")]
    Http(reqwest::Error),

    #[error("{method} failed: {description}")]
    Api {
        method: &'static str,
        code: Option<i64>,
        description: String,
    },

    #[error("{method} returned ok without a result")]
    MissingResult { method: &'static str },

    #[error("file {0} has no download path")]
    NoFilePath(String),

    #[error("file download failed with status {0}")]
    Download(u16),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for TelegramError {
    fn from(e: reqwest::Error) -> Self {
        TelegramError::Http(e.without_url())
    }
}

impl TelegramError {
    /// Edits that change nothing are rejected by Telegram; treat them as done.
    pub fn is_not_modified(&self) -> bool {
        matches!(self, TelegramError::Api { description, .. } if description.contains("message is not modified"))
    }
}

#[derive(Clone)]
pub struct TelegramClient {
    http: reqwest::Client,
    api_base: String,
    token: String,
}

impl std::fmt::Debug for TelegramClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramClient")
            .field("api_base", &self.api_base)
            .finish_non_exhaustive()
    }
}

impl TelegramClient {
    pub fn new(token: impl Into<String>, api_base: impl Into<String>) -> Result<Self, TelegramError> {
        let http = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            http,
            api_base: api_base.into(),
            token: token.into(),
        })
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_base, self.token, method)
    }

    fn file_url(&self, file_path: &str) -> String {
        format!("{}/file/bot{}/{}", self.api_base, self.token, file_path)
    }

    async fn call<T, B>(&self, method: &'static str, body: &B) -> Result<T, TelegramError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let start = Instant::now();
        let result: Result<T, TelegramError> = async {
            let resp = self.http.post(self.method_url(method)).json(body).send().await?;
            let envelope: ApiResponse<T> = resp.json().await?;
            unwrap_envelope(method, envelope)
        }
        .await;
        record_api_call(method, result.is_ok(), start.elapsed());
        result
    }

    pub async fn send_message(&self, chat_id: i64, text: &str) -> Result<Message, TelegramError> {
        self.call("sendMessage", &json!({ "chat_id": chat_id, "text": text })).await
    }

    pub async fn edit_message_text(&self, chat_id: i64, message_id: i64, text: &str) -> Result<(), TelegramError> {
        // The result is either the edited message or `true`.
        let _: serde_json::Value = self
            .call(
                "editMessageText",
                &json!({ "chat_id": chat_id, "message_id": message_id, "text": text }),
            )
            .await?;
        Ok(())
    }

    pub async fn send_document(
        &self,
        chat_id: i64,
        path: &Path,
        filename: &str,
        caption: &str,
    ) -> Result<Message, TelegramError> {
        let start = Instant::now();
        let result: Result<Message, TelegramError> = async {
            let bytes = tokio::fs::read(path).await?;
            let part = Part::bytes(bytes).file_name(filename.to_string()).mime_str(XLSX_MIME)?;
            let form = Form::new()
                .text("chat_id", chat_id.to_string())
                .text("caption", caption.to_string())
                .part("document", part);
            let resp = self.http.post(self.method_url("sendDocument")).multipart(form).send().await?;
            let envelope: ApiResponse<Message> = resp.json().await?;
            unwrap_envelope("sendDocument", envelope)
        }
        .await;
        record_api_call("sendDocument", result.is_ok(), start.elapsed());
        result
    }

    pub async fn get_file(&self, file_id: &str) -> Result<File, TelegramError> {
        self.call("getFile", &json!({ "file_id": file_id })).await
    }

    /// Resolve `file_id` and stream the file to `dest`.
    pub async fn download(&self, file_id: &str, dest: &Path) -> Result<u64, TelegramError> {
        let file = self.get_file(file_id).await?;
        let file_path = file
            .file_path
            .ok_or_else(|| TelegramError::NoFilePath(file.file_id.clone()))?;

        let mut resp = self.http.get(self.file_url(&file_path)).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(TelegramError::Download(status.as_u16()));
        }

        let mut out = tokio::fs::File::create(dest).await?;
        let mut written = 0u64;
        while let Some(chunk) = resp.chunk().await? {
            out.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        out.flush().await?;
        Ok(written)
    }

    pub async fn set_webhook(&self, url: &str) -> Result<(), TelegramError> {
        let _: bool = self.call("setWebhook", &json!({ "url": url })).await?;
        Ok(())
    }
}

fn unwrap_envelope<T>(method: &'static str, envelope: ApiResponse<T>) -> Result<T, TelegramError> {
    if !envelope.ok {
        return Err(TelegramError::Api {
            method,
            code: envelope.error_code,
            description: envelope.description.unwrap_or_else(|| "no description".to_string()),
        });
    }
    envelope.result.ok_or(TelegramError::MissingResult { method })
}

fn capability_error(what: &str, e: TelegramError) -> CapabilityError {
    CapabilityError::with_source(format!("{what}: {e}"), e)
}

#[async_trait]
impl Notifier for TelegramClient {
    async fn send_initial(&self, owner: OwnerKey, text: &str) -> Result<StatusHandle, CapabilityError> {
        let message = self
            .send_message(owner.0, text)
            .await
            .map_err(|e| capability_error("send status message", e))?;
        Ok(StatusHandle {
            owner,
            message_id: message.message_id,
        })
    }

    async fn edit(&self, handle: &StatusHandle, text: &str) -> Result<(), CapabilityError> {
        match self.edit_message_text(handle.owner.0, handle.message_id, text).await {
            Ok(()) => Ok(()),
            Err(e) if e.is_not_modified() => Ok(()),
            Err(e) => Err(capability_error("edit status message", e)),
        }
    }

    async fn send_artifact(
        &self,
        owner: OwnerKey,
        artifact: &Path,
        filename: &str,
        caption: &str,
    ) -> Result<(), CapabilityError> {
        self.send_document(owner.0, artifact, filename, caption)
            .await
            .map(|_| ())
            .map_err(|e| capability_error("send document", e))
    }

    async fn reply(&self, owner: OwnerKey, text: &str) -> Result<(), CapabilityError> {
        self.send_message(owner.0, text)
            .await
            .map(|_| ())
            .map_err(|e| capability_error("send message", e))
    }
}

#[async_trait]
impl SourceFetcher for TelegramClient {
    async fn fetch(&self, source: &SourceRef, dest: &Path) -> Result<(), CapabilityError> {
        let bytes = self
            .download(&source.file_id, dest)
            .await
            .map_err(|e| capability_error("download source", e))?;
        tracing::debug!(file = %source.file_name, bytes, "Source downloaded");
        Ok(())
    }
}
