// crates/server/src/lib.rs
//! Sheetbot server library.
//!
//! Axum webhook server and Telegram Bot API client around the
//! `sheetbot-jobs` conversion core.

pub mod config;
pub mod error;
pub mod metrics;
pub mod routes;
pub mod state;
pub mod telegram;

pub use config::{Config, ConfigError};
pub use error::*;
pub use metrics::{init_metrics, render_metrics};
pub use routes::api_routes;
pub use state::AppState;
pub use telegram::{TelegramClient, TelegramError};

use std::sync::Arc;

use axum::Router;
use tower_http::trace::TraceLayer;

/// Create the Axum application with all routes and request tracing.
pub fn create_app(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(api_routes(state))
        .layer(TraceLayer::new_for_http())
}
