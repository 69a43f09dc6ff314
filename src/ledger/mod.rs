//! Ledger access and confirmation polling
//!
//! - `client`: transaction-by-hash lookups and miss classification
//! - `status`: classification of indexed transactions
//! - `poller`: backoff loop from submission to a final status

mod client;
mod poller;
mod status;

pub use client::{ErrorResponse, LedgerClient, Lookup, LookupError, Verbosity};
pub use poller::ConfirmationPoller;
pub use status::{SuccessBasis, TransactionStatus};

#[cfg(test)]
pub use client::MockLookup;
