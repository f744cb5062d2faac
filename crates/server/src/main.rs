// crates/server/src/main.rs
//! Sheetbot server binary.
//!
//! Reads configuration from the environment, optionally registers the
//! webhook with Telegram, then serves until SIGINT/SIGTERM.

use std::sync::Arc;

use anyhow::{Context, Result};
use sheetbot_convert::{LopdfExtractor, XlsxWriter};
use sheetbot_jobs::{Capabilities, JobSupervisor};
use sheetbot_server::{create_app, init_metrics, AppState, Config, TelegramClient};
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "warn,sheetbot_server=info,sheetbot_jobs=info,sheetbot_convert=info";

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()))
        .init();

    let config = Config::from_env()?;
    init_metrics();

    let telegram = Arc::new(
        TelegramClient::new(config.bot_token.clone(), config.api_base.clone())
            .context("building Telegram client")?,
    );

    if let Some(endpoint) = config.webhook_endpoint() {
        match telegram.set_webhook(&endpoint).await {
            Ok(()) => tracing::info!("Webhook registered"),
            Err(e) => tracing::warn!(error = %e, "Webhook registration failed (non-fatal)"),
        }
    }

    let caps = Capabilities {
        notifier: telegram.clone(),
        fetcher: telegram.clone(),
        extractor: Arc::new(LopdfExtractor::new()),
        writer: Arc::new(XlsxWriter::new()),
    };
    let supervisor = Arc::new(JobSupervisor::new(caps, config.jobs.clone()));
    let state = AppState::new(config.bot_token.clone(), supervisor, telegram);
    let app = create_app(state);

    let addr = config.socket_addr();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    tracing::info!(
        %addr,
        version = env!("CARGO_PKG_VERSION"),
        max_pages = config.jobs.max_units,
        work_dir = %config.jobs.work_dir.display(),
        "Sheetbot listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("Shutdown signal received");
}
