//! Error types for the transaction submitter

use thiserror::Error;

/// Main error type for submission and confirmation
#[derive(Error, Debug)]
pub enum SubmitterError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Signer error: {0}")]
    Signer(String),

    #[error("Submission failed after {attempts} attempts: {last_error}")]
    SubmissionFailed { attempts: u32, last_error: String },

    #[error("Lookup of transaction {handle} failed on attempt {attempt}: {message}")]
    LookupTransport {
        handle: String,
        attempt: u32,
        message: String,
    },

    #[error("Transaction {handle} not confirmed after {attempts} attempts")]
    ConfirmationTimeout { handle: String, attempts: u32 },

    #[error("Transaction {handle} failed: {vm_status}")]
    TransactionFailed { handle: String, vm_status: String },

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl SubmitterError {
    /// Check if the caller may retry the same operation later
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SubmitterError::ConfirmationTimeout { .. } | SubmitterError::LookupTransport { .. }
        )
    }

    /// Stable, machine-readable name for the error kind
    pub fn kind(&self) -> &'static str {
        match self {
            SubmitterError::Config(_) => "config",
            SubmitterError::Signer(_) => "signer",
            SubmitterError::SubmissionFailed { .. } => "submission_failed",
            SubmitterError::LookupTransport { .. } => "lookup_transport",
            SubmitterError::ConfirmationTimeout { .. } => "confirmation_timeout",
            SubmitterError::TransactionFailed { .. } => "transaction_failed",
            SubmitterError::Http(_) => "http",
            SubmitterError::Internal(_) => "internal",
        }
    }
}

impl From<reqwest::Error> for SubmitterError {
    fn from(e: reqwest::Error) -> Self {
        SubmitterError::Http(e.to_string())
    }
}

/// Result type for submitter operations
pub type SubmitterResult<T> = Result<T, SubmitterError>;
