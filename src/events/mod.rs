//! Lifecycle notifications for submissions
//!
//! The engine reports progress as discrete events; rendering them for users is
//! left to whoever consumes the sink.

use crate::ledger::TransactionStatus;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Events emitted over the life of one submission
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SubmissionEvent {
    /// Payload handed to the wallet
    Started {
        submission_id: Uuid,
        function: String,
        at: DateTime<Utc>,
    },

    /// Wallet returned a handle
    Submitted {
        submission_id: Uuid,
        hash: String,
        at: DateTime<Utc>,
    },

    /// Ledger reports the transaction as successful
    Confirmed {
        submission_id: Uuid,
        hash: String,
        status: TransactionStatus,
        at: DateTime<Utc>,
    },

    /// Submission, lookup or execution failed
    Failed {
        submission_id: Uuid,
        hash: Option<String>,
        reason: String,
        at: DateTime<Utc>,
    },

    /// Polling gave up; the transaction may still complete
    TimedOut {
        submission_id: Uuid,
        hash: String,
        attempts: u32,
        explorer_url: Option<String>,
        at: DateTime<Utc>,
    },
}

impl SubmissionEvent {
    pub fn submission_id(&self) -> Uuid {
        match self {
            SubmissionEvent::Started { submission_id, .. } => *submission_id,
            SubmissionEvent::Submitted { submission_id, .. } => *submission_id,
            SubmissionEvent::Confirmed { submission_id, .. } => *submission_id,
            SubmissionEvent::Failed { submission_id, .. } => *submission_id,
            SubmissionEvent::TimedOut { submission_id, .. } => *submission_id,
        }
    }

    /// Get event name for logs and metrics
    pub fn name(&self) -> &'static str {
        match self {
            SubmissionEvent::Started { .. } => "started",
            SubmissionEvent::Submitted { .. } => "submitted",
            SubmissionEvent::Confirmed { .. } => "confirmed",
            SubmissionEvent::Failed { .. } => "failed",
            SubmissionEvent::TimedOut { .. } => "timed_out",
        }
    }

    /// Whether no further events follow for this submission
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SubmissionEvent::Confirmed { .. }
                | SubmissionEvent::Failed { .. }
                | SubmissionEvent::TimedOut { .. }
        )
    }
}

/// Receiver of submission lifecycle events
pub trait NotificationSink: Send + Sync {
    fn notify(&self, event: SubmissionEvent);
}

/// Sink that only writes events to the log
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl NotificationSink for TracingSink {
    fn notify(&self, event: SubmissionEvent) {
        match &event {
            SubmissionEvent::Started { submission_id, function, .. } => {
                info!(%submission_id, "Processing transaction {}", function)
            }
            SubmissionEvent::Submitted { submission_id, hash, .. } => {
                info!(%submission_id, "Transaction submitted: {}, confirming in background", hash)
            }
            SubmissionEvent::Confirmed { submission_id, hash, .. } => {
                info!(%submission_id, "Transaction {} completed successfully", hash)
            }
            SubmissionEvent::Failed { submission_id, reason, .. } => {
                error!(%submission_id, "Transaction failed: {}", reason)
            }
            SubmissionEvent::TimedOut {
                submission_id,
                hash,
                explorer_url,
                ..
            } => warn!(
                %submission_id,
                "Transaction {} timed out, it may still be processing - check {}",
                hash,
                explorer_url.as_deref().unwrap_or("the explorer")
            ),
        }
    }
}

/// Sink publishing events on a broadcast channel
#[derive(Debug, Clone)]
pub struct BroadcastSink {
    sender: broadcast::Sender<SubmissionEvent>,
}

impl BroadcastSink {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SubmissionEvent> {
        self.sender.subscribe()
    }
}

impl NotificationSink for BroadcastSink {
    fn notify(&self, event: SubmissionEvent) {
        // No subscribers is fine
        let _ = self.sender.send(event);
    }
}
