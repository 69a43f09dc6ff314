//! Transaction submitter service
//!
//! Accepts entry function payloads over HTTP, submits them through the
//! configured wallet bridge and confirms them against the ledger API.

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{error, info};

use tx_submitter::api::{self, AppState};
use tx_submitter::config::Settings;
use tx_submitter::delay::TokioDelay;
use tx_submitter::events::TracingSink;
use tx_submitter::ledger::LedgerClient;
use tx_submitter::metrics::MetricsServer;
use tx_submitter::tx::HttpSigner;
use tx_submitter::SubmissionEngine;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    init_logging();

    info!("Starting transaction submitter v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let settings = Settings::load()?;
    info!("Ledger API: {}", settings.ledger.base_url);

    let lookup = Arc::new(
        LedgerClient::new(&settings.ledger).context("Failed to build ledger client")?,
    );
    let signer = Arc::new(
        HttpSigner::new(
            settings.wallet.signer_url.clone(),
            Duration::from_millis(settings.wallet.request_timeout_ms),
        )
        .context("Failed to build wallet signer")?,
    );

    let engine = Arc::new(SubmissionEngine::new(
        &settings.submission,
        settings.confirmation.clone(),
        settings.ledger.clone(),
        lookup,
        Arc::new(TokioDelay),
        Arc::new(TracingSink),
    ));
    info!("Submission engine initialized");

    // Start API server
    let api_handle = tokio::spawn({
        let config = settings.api.clone();
        let state = AppState { engine, signer };
        async move {
            if let Err(e) = api::run_server(config, state).await {
                error!("API server error: {}", e);
            }
        }
    });

    // Start metrics server
    let metrics_handle = if settings.metrics.enabled {
        let server = MetricsServer::new(settings.metrics.port);
        Some(tokio::spawn(async move {
            if let Err(e) = server.run().await {
                error!("Metrics server error: {}", e);
            }
        }))
    } else {
        None
    };

    info!("Transaction submitter is running");
    info!("API server: http://{}:{}", settings.api.host, settings.api.port);
    if settings.metrics.enabled {
        info!("Metrics: http://0.0.0.0:{}/metrics", settings.metrics.port);
    }

    // Wait for shutdown signal
    shutdown_signal().await;

    info!("Shutdown signal received, stopping...");

    // In-flight submissions are dropped with their tasks
    api_handle.abort();
    if let Some(h) = metrics_handle {
        h.abort();
    }

    info!("Transaction submitter stopped");
    Ok(())
}

fn init_logging() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tx_submitter=debug,hyper=warn,reqwest=warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .init();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
