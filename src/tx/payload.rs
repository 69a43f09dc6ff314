//! Entry function payloads handed to the wallet

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Default coin type for native transfers
const DEFAULT_COIN_TYPE: &str = "0x1::aptos_coin::AptosCoin";

const COIN_TRANSFER_FUNCTION: &str = "0x1::coin::transfer";

/// Immutable description of an on-chain entry function call.
///
/// Serializes to the legacy wallet-adapter shape
/// `{"type": "entry_function_payload", "function", "type_arguments", "arguments"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionPayload {
    #[serde(rename = "type", default)]
    kind: PayloadKind,
    function: String,
    #[serde(default)]
    type_arguments: Vec<String>,
    #[serde(default)]
    arguments: Vec<Value>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
enum PayloadKind {
    #[default]
    #[serde(rename = "entry_function_payload")]
    EntryFunction,
}

impl TransactionPayload {
    pub fn new(
        function: impl Into<String>,
        type_arguments: Vec<String>,
        arguments: Vec<Value>,
    ) -> Self {
        Self {
            kind: PayloadKind::EntryFunction,
            function: function.into(),
            type_arguments,
            arguments,
        }
    }

    /// Payload for `0x1::coin::transfer` of `amount` units to `recipient`
    pub fn coin_transfer(recipient: &str, amount: u64, coin_type: Option<&str>) -> Self {
        Self::new(
            COIN_TRANSFER_FUNCTION,
            vec![coin_type.unwrap_or(DEFAULT_COIN_TYPE).to_string()],
            vec![
                Value::String(recipient.to_string()),
                Value::String(amount.to_string()),
            ],
        )
    }

    pub fn function(&self) -> &str {
        &self.function
    }

    pub fn type_arguments(&self) -> &[String] {
        &self.type_arguments
    }

    pub fn arguments(&self) -> &[Value] {
        &self.arguments
    }
}
