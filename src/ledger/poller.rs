//! Confirmation polling for freshly submitted transactions
//!
//! Wallets often hand back a hash before the fullnode has indexed it. The
//! poller waits for propagation, then looks the hash up until it is found,
//! backing off while the ledger still answers "not found":
//! - `Waiting`: lookup misses, back off `min(step * n, cap)` and retry
//! - `Found`: the ledger returned the transaction, classify it
//! - `TimedOut`: miss budget spent, the transaction may still land later

use super::client::{Lookup, Verbosity};
use super::status::{SuccessBasis, TransactionStatus};
use crate::config::ConfirmationConfig;
use crate::delay::Delay;
use crate::error::{SubmitterError, SubmitterResult};

use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

enum PollState {
    Waiting { misses: u32 },
    Found(TransactionStatus),
    TimedOut { attempts: u32 },
}

/// Polls a lookup until a transaction handle resolves
pub struct ConfirmationPoller {
    lookup: Arc<dyn Lookup>,
    delay: Arc<dyn Delay>,
    config: ConfirmationConfig,
}

impl ConfirmationPoller {
    pub fn new(lookup: Arc<dyn Lookup>, delay: Arc<dyn Delay>, config: ConfirmationConfig) -> Self {
        Self {
            lookup,
            delay,
            config,
        }
    }

    /// Wait until `handle` is indexed and classify its status
    pub async fn confirm(&self, handle: &str) -> SubmitterResult<TransactionStatus> {
        let started = Instant::now();

        // Give the transaction time to propagate before the first lookup
        self.delay.sleep(self.config.initial_delay()).await;

        let mut state = PollState::Waiting { misses: 0 };
        loop {
            state = match state {
                PollState::Waiting { misses } if misses >= self.config.max_attempts => {
                    PollState::TimedOut { attempts: misses }
                }
                PollState::Waiting { misses } => self.poll_once(handle, misses).await?,
                PollState::Found(status) => {
                    crate::metrics::record_confirmation(&status, started.elapsed().as_secs_f64());
                    return Ok(status);
                }
                PollState::TimedOut { attempts } => {
                    warn!(
                        "Transaction {} not confirmed after {} attempts, it may still be processing",
                        handle, attempts
                    );
                    crate::metrics::record_confirmation_timeout();
                    return Err(SubmitterError::ConfirmationTimeout {
                        handle: handle.to_string(),
                        attempts,
                    });
                }
            };
        }
    }

    async fn poll_once(&self, handle: &str, misses: u32) -> SubmitterResult<PollState> {
        let attempt = misses + 1;

        match self.lookup.lookup(handle, Verbosity::Quiet).await {
            Ok(raw) => {
                info!("Transaction {} found on attempt {}", handle, attempt);
                debug!(
                    success = ?raw.get("success"),
                    vm_status = ?raw.get("vm_status"),
                    tx_type = ?raw.get("type"),
                    "Checking transaction status"
                );

                let status = TransactionStatus::classify(&raw);
                match &status {
                    TransactionStatus::Succeeded {
                        basis: SuccessBasis::Assumed,
                        ..
                    } => {
                        warn!(
                            "Transaction {} status unclear, treating as success (found and processed): {}",
                            handle, raw
                        );
                    }
                    TransactionStatus::Failed { vm_status } => {
                        error!("Transaction {} failed: {}", handle, vm_status);
                    }
                    _ => info!("Transaction {} confirmed successfully", handle),
                }
                Ok(PollState::Found(status))
            }
            Err(e) if e.is_not_found() => {
                let wait = self.config.backoff(attempt);
                if misses == 0 {
                    info!("Transaction {} not indexed yet, polling in background", handle);
                }
                debug!(
                    "Transaction {} not found (attempt {}/{}), retrying in {:?}",
                    handle, attempt, self.config.max_attempts, wait
                );
                crate::metrics::record_lookup_miss();

                self.delay.sleep(wait).await;
                Ok(PollState::Waiting { misses: attempt })
            }
            Err(e) => {
                error!("Lookup of transaction {} failed: {}", handle, e);
                Err(SubmitterError::LookupTransport {
                    handle: handle.to_string(),
                    attempt,
                    message: e.message,
                })
            }
        }
    }
}
