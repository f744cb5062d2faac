//! HTTP route handlers for the sheetbot server.

pub mod health;
pub mod jobs;
pub mod metrics;
pub mod webhook;

use std::sync::Arc;

use axum::routing::get;
use axum::Router;

use crate::state::AppState;

/// Banner served at `/` so uptime checks have something to hit.
pub const HOME_BANNER: &str = "🚀 Telegram PDF Converter Bot Running!";

async fn home() -> &'static str {
    HOME_BANNER
}

/// Create the combined router.
///
/// Routes:
/// - GET  / - Liveness banner
/// - POST /webhook/{token} - Telegram updates
/// - GET  /api/health - Health check
/// - GET  /api/jobs - In-flight conversions
/// - GET  /metrics - Prometheus metrics
pub fn api_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(home))
        .merge(webhook::router())
        .nest("/api", health::router().merge(jobs::router()))
        .merge(metrics::router())
        .with_state(state)
}
