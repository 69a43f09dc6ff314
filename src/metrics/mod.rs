//! Prometheus metrics for monitoring
//!
//! Exposes metrics for:
//! - Wallet submissions and gas escalations
//! - Confirmation outcomes and latency
//! - Lifecycle event counts

use crate::error::{SubmitterError, SubmitterResult};
use crate::events::SubmissionEvent;
use crate::ledger::TransactionStatus;

use axum::{http::StatusCode, routing::get, Router};
use lazy_static::lazy_static;
use prometheus::{
    register_counter, register_counter_vec, register_histogram, Counter, CounterVec, Encoder,
    Histogram, TextEncoder,
};
use std::net::SocketAddr;
use tracing::info;

lazy_static! {
    // Submission metrics
    pub static ref TX_SUBMITTED: Counter = register_counter!(
        "tx_submitter_transactions_submitted_total",
        "Total transactions accepted by the wallet"
    ).unwrap();

    pub static ref GAS_ESCALATIONS: Counter = register_counter!(
        "tx_submitter_gas_escalations_total",
        "Total gas budget escalations after underpriced simulations"
    ).unwrap();

    // Confirmation metrics
    pub static ref LOOKUP_MISSES: Counter = register_counter!(
        "tx_submitter_lookup_misses_total",
        "Total lookups answered with not found"
    ).unwrap();

    pub static ref CONFIRMATIONS: CounterVec = register_counter_vec!(
        "tx_submitter_confirmations_total",
        "Total confirmed transactions by status",
        &["status"]
    ).unwrap();

    pub static ref CONFIRMATION_TIMEOUTS: Counter = register_counter!(
        "tx_submitter_confirmation_timeouts_total",
        "Total transactions not confirmed within the polling budget"
    ).unwrap();

    pub static ref CONFIRMATION_LATENCY: Histogram = register_histogram!(
        "tx_submitter_confirmation_latency_seconds",
        "Time from first wait to a final status",
        vec![1.0, 3.0, 5.0, 10.0, 20.0, 30.0, 60.0, 120.0, 300.0]
    ).unwrap();

    // Event metrics
    pub static ref EVENTS_EMITTED: CounterVec = register_counter_vec!(
        "tx_submitter_events_emitted_total",
        "Total lifecycle events by type",
        &["event_type"]
    ).unwrap();
}

/// Prometheus metrics server
pub struct MetricsServer {
    port: u16,
}

impl MetricsServer {
    pub fn new(port: u16) -> Self {
        Self { port }
    }

    pub async fn run(&self) -> SubmitterResult<()> {
        let app = Router::new().route("/metrics", get(metrics_handler));

        let addr = SocketAddr::from(([0, 0, 0, 0], self.port));
        info!("Starting metrics server on {}", addr);

        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| SubmitterError::Internal(format!("Failed to bind {}: {}", addr, e)))?;
        axum::serve(listener, app)
            .await
            .map_err(|e| SubmitterError::Internal(format!("Metrics server failed: {}", e)))?;

        Ok(())
    }
}

async fn metrics_handler() -> Result<String, StatusCode> {
    render().map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
}

/// Encode every registered metric in the text exposition format
pub fn render() -> SubmitterResult<String> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| SubmitterError::Internal(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| SubmitterError::Internal(e.to_string()))
}

// Helper functions to record metrics

pub fn record_tx_submitted() {
    TX_SUBMITTED.inc();
}

pub fn record_gas_escalation() {
    GAS_ESCALATIONS.inc();
}

pub fn record_lookup_miss() {
    LOOKUP_MISSES.inc();
}

pub fn record_confirmation(status: &TransactionStatus, latency_secs: f64) {
    CONFIRMATIONS.with_label_values(&[status.name()]).inc();
    CONFIRMATION_LATENCY.observe(latency_secs);
}

pub fn record_confirmation_timeout() {
    CONFIRMATION_TIMEOUTS.inc();
}

pub fn record_event(event: &SubmissionEvent) {
    EVENTS_EMITTED.with_label_values(&[event.name()]).inc();
}
