//! Submission engine: wallet submission followed by ledger confirmation

use crate::config::{ConfirmationConfig, LedgerConfig, SubmissionConfig};
use crate::delay::Delay;
use crate::error::{SubmitterError, SubmitterResult};
use crate::events::{NotificationSink, SubmissionEvent};
use crate::ledger::{ConfirmationPoller, Lookup, TransactionStatus, Verbosity};
use crate::tx::{GasConfig, Signer, SubmissionRetrier, TransactionPayload};

use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, instrument};
use uuid::Uuid;

/// Final result of a confirmed submission
#[derive(Debug, Clone, Serialize)]
pub struct Outcome {
    pub submission_id: Uuid,
    pub hash: String,
    pub status: TransactionStatus,
}

/// Runs one submission at a time per call; calls share no mutable state
pub struct SubmissionEngine {
    retrier: SubmissionRetrier,
    poller: ConfirmationPoller,
    lookup: Arc<dyn Lookup>,
    sink: Arc<dyn NotificationSink>,
    ledger: LedgerConfig,
}

impl SubmissionEngine {
    pub fn new(
        submission: &SubmissionConfig,
        confirmation: ConfirmationConfig,
        ledger: LedgerConfig,
        lookup: Arc<dyn Lookup>,
        delay: Arc<dyn Delay>,
        sink: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            retrier: SubmissionRetrier::new(submission),
            poller: ConfirmationPoller::new(lookup.clone(), delay, confirmation),
            lookup,
            sink,
            ledger,
        }
    }

    /// Submit `payload` through `signer` and wait for the ledger verdict.
    ///
    /// Emits Started, Submitted and exactly one terminal event.
    #[instrument(skip_all, fields(function = %payload.function()))]
    pub async fn execute(
        &self,
        signer: &dyn Signer,
        payload: TransactionPayload,
        gas: GasConfig,
    ) -> SubmitterResult<Outcome> {
        let submission_id = Uuid::new_v4();
        self.emit(SubmissionEvent::Started {
            submission_id,
            function: payload.function().to_string(),
            at: Utc::now(),
        });

        let submitted = match self.retrier.submit(signer, &payload, gas).await {
            Ok(submitted) => submitted,
            Err(e) => {
                self.emit(SubmissionEvent::Failed {
                    submission_id,
                    hash: None,
                    reason: e.to_string(),
                    at: Utc::now(),
                });
                return Err(e);
            }
        };
        let hash = submitted.hash;

        self.emit(SubmissionEvent::Submitted {
            submission_id,
            hash: hash.clone(),
            at: Utc::now(),
        });

        match self.poller.confirm(&hash).await {
            Ok(TransactionStatus::Failed { vm_status }) => {
                let error = SubmitterError::TransactionFailed {
                    handle: hash.clone(),
                    vm_status,
                };
                self.emit(SubmissionEvent::Failed {
                    submission_id,
                    hash: Some(hash),
                    reason: error.to_string(),
                    at: Utc::now(),
                });
                Err(error)
            }
            // The poller only returns once the ledger has indexed the handle
            Ok(status) => {
                self.emit(SubmissionEvent::Confirmed {
                    submission_id,
                    hash: hash.clone(),
                    status: status.clone(),
                    at: Utc::now(),
                });
                Ok(Outcome {
                    submission_id,
                    hash,
                    status,
                })
            }
            Err(SubmitterError::ConfirmationTimeout { handle, attempts }) => {
                self.emit(SubmissionEvent::TimedOut {
                    submission_id,
                    hash: handle.clone(),
                    attempts,
                    explorer_url: self.ledger.explorer_link(&handle),
                    at: Utc::now(),
                });
                Err(SubmitterError::ConfirmationTimeout { handle, attempts })
            }
            Err(e) => {
                self.emit(SubmissionEvent::Failed {
                    submission_id,
                    hash: Some(hash),
                    reason: e.to_string(),
                    at: Utc::now(),
                });
                Err(e)
            }
        }
    }

    /// Like [`execute`](Self::execute), reporting only success or failure.
    /// Details reach callers through the notification sink.
    pub async fn submit_and_confirm(
        &self,
        signer: &dyn Signer,
        payload: TransactionPayload,
        gas: GasConfig,
    ) -> bool {
        match self.execute(signer, payload, gas).await {
            Ok(outcome) => {
                info!("Transaction {} completed", outcome.hash);
                true
            }
            Err(e) => {
                debug!("Submission did not complete: {}", e);
                false
            }
        }
    }

    /// Transfer `amount` of the native coin to `recipient`
    pub async fn transfer(
        &self,
        signer: &dyn Signer,
        recipient: &str,
        amount: u64,
        gas: GasConfig,
    ) -> bool {
        let payload = TransactionPayload::coin_transfer(recipient, amount, None);
        self.submit_and_confirm(signer, payload, gas).await
    }

    /// Single lookup without polling; an unknown handle is `Pending`
    pub async fn check_status(&self, handle: &str) -> SubmitterResult<TransactionStatus> {
        match self.lookup.lookup(handle, Verbosity::Verbose).await {
            Ok(raw) => Ok(TransactionStatus::classify(&raw)),
            Err(e) if e.is_not_found() => Ok(TransactionStatus::Pending),
            Err(e) => Err(SubmitterError::LookupTransport {
                handle: handle.to_string(),
                attempt: 1,
                message: e.message,
            }),
        }
    }

    pub fn explorer_link(&self, handle: &str) -> Option<String> {
        self.ledger.explorer_link(handle)
    }

    fn emit(&self, event: SubmissionEvent) {
        crate::metrics::record_event(&event);
        if event.is_terminal() {
            debug!(
                submission_id = %event.submission_id(),
                "Submission finished: {}",
                event.name()
            );
        }
        self.sink.notify(event);
    }
}
