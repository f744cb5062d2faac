// crates/server/src/routes/jobs.rs
//! GET /jobs — list in-flight conversions.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use sheetbot_jobs::JobSummary;

use crate::state::AppState;

/// GET /api/jobs — one entry per chat with a conversion running.
async fn list_jobs(State(state): State<Arc<AppState>>) -> Json<Vec<JobSummary>> {
    Json(state.supervisor.active_jobs())
}

/// Build the jobs router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/jobs", get(list_jobs))
}
