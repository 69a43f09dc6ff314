//! Transaction submitter
//!
//! Submits payloads through a wallet signer, escalating the gas budget when the
//! wallet's simulation reports it too low, then polls the ledger until the
//! returned hash is indexed and classifies the result.

pub mod api;
pub mod config;
pub mod coordination;
pub mod delay;
pub mod error;
pub mod events;
pub mod ledger;
pub mod metrics;
pub mod tx;

pub use coordination::{Outcome, SubmissionEngine};
pub use error::{SubmitterError, SubmitterResult};
