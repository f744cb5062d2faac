// crates/server/src/routes/webhook.rs
//! Telegram webhook: turns inbound updates into supervisor calls.
//!
//! - POST /webhook/{token} — `404` unless `token` matches the bot token,
//!   otherwise always `200 "ok"` so Telegram does not redeliver.
//!
//! The handler never waits on a conversion. Accepted documents run as
//! background jobs; everything else gets one immediate reply.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::routing::post;
use axum::Router;
use sheetbot_jobs::{messages, OwnerKey, SourceRef, SubmitResult};

use crate::error::{ApiError, ApiResult};
use crate::metrics::record_update;
use crate::state::AppState;
use crate::telegram::{Document, Update};

const PDF_MIME: &str = "application/pdf";

/// Bot API `getFile` refuses anything larger.
pub const MAX_DOWNLOAD_BYTES: u64 = 20 * 1024 * 1024;

/// What an update asks the bot to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    Document { owner: OwnerKey, source: SourceRef },
    TooLarge { owner: OwnerKey, size: u64 },
    Stop { owner: OwnerKey },
    Command { owner: OwnerKey },
    Text { owner: OwnerKey },
}

impl Inbound {
    fn kind(&self) -> &'static str {
        match self {
            Inbound::Document { .. } => "document",
            Inbound::TooLarge { .. } => "too_large",
            Inbound::Stop { .. } => "stop",
            Inbound::Command { .. } => "command",
            Inbound::Text { .. } => "text",
        }
    }
}

/// Classify an update. Updates without a message (edits, callbacks) are ignored.
pub fn classify(update: &Update) -> Option<Inbound> {
    let message = update.message.as_ref()?;
    let owner = OwnerKey(message.chat.id);

    if let Some(document) = &message.document {
        let source = source_ref(document);
        if let Some(size) = document.file_size.filter(|&n| n > MAX_DOWNLOAD_BYTES) {
            if source.is_pdf() {
                return Some(Inbound::TooLarge { owner, size });
            }
        }
        return Some(Inbound::Document { owner, source });
    }

    let text = message.text.as_deref().unwrap_or("").trim();
    match command_name(text) {
        Some("stop") => Some(Inbound::Stop { owner }),
        Some(_) => Some(Inbound::Command { owner }),
        None => Some(Inbound::Text { owner }),
    }
}

/// `/stop@sheetbot now` → `stop`.
fn command_name(text: &str) -> Option<&str> {
    let word = text.strip_prefix('/')?.split_whitespace().next().unwrap_or("");
    Some(word.split('@').next().unwrap_or(word))
}

/// Name a PDF sent without a file name so it still passes the PDF check.
fn source_ref(document: &Document) -> SourceRef {
    let is_pdf_mime = document.mime_type.as_deref() == Some(PDF_MIME);
    let file_name = match &document.file_name {
        Some(name) if !name.trim().is_empty() => name.clone(),
        _ if is_pdf_mime => "document.pdf".to_string(),
        _ => "document".to_string(),
    };
    SourceRef::new(document.file_id.clone(), file_name)
}

/// POST /webhook/{token}
async fn receive_update(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
    body: Bytes,
) -> ApiResult<&'static str> {
    if token != state.webhook_token {
        tracing::warn!("Webhook called with wrong token");
        return Err(ApiError::NotFound);
    }

    let update: Update = match serde_json::from_slice(&body) {
        Ok(update) => update,
        Err(e) => {
            tracing::warn!(error = %e, bytes = body.len(), "Ignoring malformed update");
            record_update("malformed");
            return Ok("ok");
        }
    };

    match classify(&update) {
        Some(inbound) => {
            record_update(inbound.kind());
            dispatch(&state, inbound).await;
        }
        None => {
            tracing::debug!(update_id = update.update_id, "Ignoring update without message");
            record_update("ignored");
        }
    }
    Ok("ok")
}

async fn dispatch(state: &AppState, inbound: Inbound) {
    let (owner, reply) = match inbound {
        Inbound::Document { owner, source } => match state.supervisor.submit(owner, source) {
            SubmitResult::Accepted(ticket) => {
                tracing::info!(%owner, job_id = ticket.id, "Conversion accepted");
                return;
            }
            SubmitResult::Rejected(reason) => (owner, reason.user_message()),
        },
        Inbound::TooLarge { owner, size } => {
            tracing::info!(%owner, size, "Rejected oversized document");
            (owner, messages::TOO_LARGE)
        }
        Inbound::Stop { owner } => (owner, state.supervisor.request_stop(owner).user_message()),
        Inbound::Command { owner } => (owner, messages::GREETING),
        Inbound::Text { owner } => (owner, messages::NOT_A_PDF),
    };

    if let Err(e) = state.notifier.reply(owner, reply).await {
        tracing::warn!(%owner, error = %e, "Reply failed");
    }
}

/// Build the webhook router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/webhook/{token}", post(receive_update))
}
