//! Ledger REST lookups by transaction hash

use crate::config::LedgerConfig;
use crate::error::SubmitterResult;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, trace, warn};

/// Path fragment of the transaction-by-hash endpoint
const TRANSACTION_BY_HASH_PATH: &str = "/transactions/by_hash";

/// Lowercase message fragments that mean "not indexed yet"
const NOT_FOUND_MARKERS: [&str; 5] = [
    "transaction_not_found",
    "transaction not found",
    "not found",
    "404",
    TRANSACTION_BY_HASH_PATH,
];

const NOT_FOUND_STATUS: u16 = 404;

/// Whether a lookup should log expected misses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    Quiet,
    Verbose,
}

/// Response details attached to a failed lookup
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorResponse {
    pub status: Option<u16>,
    pub status_code: Option<u16>,
    pub data: Option<String>,
}

/// A failed lookup. Status fields are optional because different transports
/// report them at different levels.
#[derive(Debug, Clone, Default, Error)]
#[error("{message}")]
pub struct LookupError {
    pub message: String,
    pub status: Option<u16>,
    pub status_code: Option<u16>,
    pub code: Option<i64>,
    pub response: Option<ErrorResponse>,
}

impl LookupError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Default::default()
        }
    }

    /// The ledger does not know the handle (yet)
    pub fn not_found() -> Self {
        Self::new("Transaction not found yet").with_status(NOT_FOUND_STATUS)
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_response(mut self, response: ErrorResponse) -> Self {
        self.response = Some(response);
        self
    }

    /// Classify the error as "not yet indexed" rather than a real failure
    pub fn is_not_found(&self) -> bool {
        let message = self.message.to_lowercase();
        if NOT_FOUND_MARKERS.iter().any(|m| message.contains(m)) {
            return true;
        }

        if self.status == Some(NOT_FOUND_STATUS)
            || self.status_code == Some(NOT_FOUND_STATUS)
            || self.code == Some(i64::from(NOT_FOUND_STATUS))
        {
            return true;
        }

        match &self.response {
            Some(response) => {
                response.status == Some(NOT_FOUND_STATUS)
                    || response.status_code == Some(NOT_FOUND_STATUS)
                    || response
                        .data
                        .as_deref()
                        .map(|d| d.to_lowercase().contains("not found"))
                        .unwrap_or(false)
            }
            None => false,
        }
    }
}

/// Status lookup capability
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Lookup: Send + Sync {
    async fn lookup(&self, handle: &str, verbosity: Verbosity) -> Result<Value, LookupError>;
}

/// Lookup against the ledger REST API
pub struct LedgerClient {
    client: reqwest::Client,
    base_url: String,
}

impl LedgerClient {
    pub fn new(config: &LedgerConfig) -> SubmitterResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn transaction_url(&self, handle: &str) -> String {
        format!("{}{}/{}", self.base_url, TRANSACTION_BY_HASH_PATH, handle)
    }
}

#[async_trait]
impl Lookup for LedgerClient {
    async fn lookup(&self, handle: &str, verbosity: Verbosity) -> Result<Value, LookupError> {
        let response = self
            .client
            .get(self.transaction_url(handle))
            .header(CONTENT_TYPE, "application/json")
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            match verbosity {
                Verbosity::Quiet => trace!("Transaction {} not indexed yet", handle),
                Verbosity::Verbose => warn!("Transaction {} not found on ledger", handle),
            }
            return Err(LookupError::not_found());
        }

        if !status.is_success() {
            // Error bodies are free text; only the status decides whether this is a miss
            let body = response.text().await.unwrap_or_default();
            match verbosity {
                Verbosity::Quiet => {
                    debug!("Ledger lookup for {} returned HTTP {}: {}", handle, status, body)
                }
                Verbosity::Verbose => {
                    warn!("Ledger lookup for {} returned HTTP {}: {}", handle, status, body)
                }
            }
            return Err(LookupError::new(format!(
                "HTTP {}: {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("Unknown")
            ))
            .with_status(status.as_u16())
            .with_response(ErrorResponse {
                status: Some(status.as_u16()),
                status_code: None,
                data: None,
            }));
        }

        response.json::<Value>().await.map_err(transport_error)
    }
}

// The request URL contains the lookup path fragment, which would read as a miss
fn transport_error(e: reqwest::Error) -> LookupError {
    let status = e.status().map(|s| s.as_u16());
    let mut error = LookupError::new(e.without_url().to_string());
    error.status = status;
    error
}
