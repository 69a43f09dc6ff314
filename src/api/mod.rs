//! HTTP API for health checks, submissions and status lookups

use crate::config::ApiConfig;
use crate::coordination::SubmissionEngine;
use crate::error::{SubmitterError, SubmitterResult};
use crate::ledger::TransactionStatus;
use crate::tx::{GasConfig, Signer, TransactionPayload};

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use uuid::Uuid;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<SubmissionEngine>,
    pub signer: Arc<dyn Signer>,
}

/// Build the API router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/transactions", post(submit_transaction))
        .route("/transactions/:hash", get(get_transaction))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

/// Run the HTTP API server
pub async fn run_server(config: ApiConfig, state: AppState) -> SubmitterResult<()> {
    let app = router(state);

    let addr = format!("{}:{}", config.host, config.port);
    info!("Starting API server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| SubmitterError::Internal(format!("Failed to bind {}: {}", addr, e)))?;
    axum::serve(listener, app)
        .await
        .map_err(|e| SubmitterError::Internal(format!("API server failed: {}", e)))?;

    Ok(())
}

/// Health check endpoint - basic liveness
async fn health_check() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Submit a payload through the wallet and wait for confirmation
async fn submit_transaction(
    State(state): State<AppState>,
    Json(request): Json<SubmitRequest>,
) -> Result<Json<SubmitResponse>, ApiError> {
    let gas = GasConfig::from_options(&request.options)?;

    let outcome = state
        .engine
        .execute(state.signer.as_ref(), request.payload, gas)
        .await?;

    Ok(Json(SubmitResponse {
        submission_id: outcome.submission_id,
        hash: outcome.hash,
        status: outcome.status,
    }))
}

/// Look a transaction up once, without polling
async fn get_transaction(
    State(state): State<AppState>,
    Path(hash): Path<String>,
) -> Result<Json<StatusResponse>, ApiError> {
    let status = state.engine.check_status(&hash).await?;

    Ok(Json(StatusResponse {
        explorer_url: state.engine.explorer_link(&hash),
        hash,
        status,
    }))
}

/// Error wrapper mapping submitter errors onto HTTP responses
pub struct ApiError(SubmitterError);

impl From<SubmitterError> for ApiError {
    fn from(e: SubmitterError) -> Self {
        ApiError(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            SubmitterError::Config(_) => StatusCode::BAD_REQUEST,
            SubmitterError::Signer(_)
            | SubmitterError::SubmissionFailed { .. }
            | SubmitterError::LookupTransport { .. } => StatusCode::BAD_GATEWAY,
            SubmitterError::ConfirmationTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            SubmitterError::TransactionFailed { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            SubmitterError::Http(_) | SubmitterError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        (
            status,
            Json(ErrorResponse {
                kind: self.0.kind(),
                message: self.0.to_string(),
                retryable: self.0.is_retryable(),
            }),
        )
            .into_response()
    }
}

// Request and response types

#[derive(Deserialize)]
struct SubmitRequest {
    payload: TransactionPayload,
    #[serde(default)]
    options: Map<String, Value>,
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

#[derive(Serialize)]
struct SubmitResponse {
    submission_id: Uuid,
    hash: String,
    status: TransactionStatus,
}

#[derive(Serialize)]
struct StatusResponse {
    hash: String,
    status: TransactionStatus,
    explorer_url: Option<String>,
}

#[derive(Serialize)]
struct ErrorResponse {
    kind: &'static str,
    message: String,
    retryable: bool,
}
