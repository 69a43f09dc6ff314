//! Transaction submission through a wallet signer with gas escalation

mod gas;
mod payload;
mod sender;

pub use gas::{
    is_gas_too_low, GasConfig, GasField, WalletOptions, DEFAULT_GAS_FLOOR, GAS_TOO_LOW_MARKER,
};
pub use payload::TransactionPayload;
pub use sender::{HttpSigner, Signer, SignerFailure, SubmissionRetrier, SubmittedTransaction};

#[cfg(test)]
pub use sender::MockSigner;
