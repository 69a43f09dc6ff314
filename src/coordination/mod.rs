//! Coordination of a single submission
//!
//! The engine:
//! 1. Submits the payload through the wallet signer, escalating gas as needed
//! 2. Polls the ledger until the returned handle is indexed
//! 3. Emits lifecycle notifications and metrics along the way

pub mod engine;

pub use engine::{Outcome, SubmissionEngine};
