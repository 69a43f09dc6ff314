//! Gas configuration and wallet option aliasing
//!
//! Wallet implementations disagree on what they call the gas budget and the
//! gas price, so every value is forwarded under each known alias at once.

use crate::error::{SubmitterError, SubmitterResult};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::debug;

/// Message marker wallets return when the simulated gas budget is too small
pub const GAS_TOO_LOW_MARKER: &str = "MAX_GAS_UNITS_BELOW_MIN_TRANSACTION_GAS_UNITS";

/// Budget used when escalating from an unset or smaller budget
pub const DEFAULT_GAS_FLOOR: u64 = 5_000_000;

/// Options map handed to the signer
pub type WalletOptions = BTreeMap<String, String>;

/// Logical gas settings understood by the submitter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GasField {
    MaxGasAmount,
    GasUnitPrice,
}

impl GasField {
    pub const ALL: [GasField; 2] = [GasField::MaxGasAmount, GasField::GasUnitPrice];

    /// Keys written to the wallet options, all carrying the same value
    pub fn aliases(self) -> &'static [&'static str] {
        match self {
            GasField::MaxGasAmount => &[
                "max_gas_amount",
                "maxGasAmount",
                "maxGas",
                "max_gas",
                "gas_budget",
            ],
            GasField::GasUnitPrice => &["gas_unit_price", "gasUnitPrice", "gasPrice"],
        }
    }

    /// Keys accepted from callers, in order of precedence
    fn accepted_keys(self) -> &'static [&'static str] {
        match self {
            GasField::MaxGasAmount => &["maxGasAmount", "max_gas_amount", "max_gas", "maxGas"],
            GasField::GasUnitPrice => &["gasUnitPrice", "gas_unit_price", "gasPrice"],
        }
    }
}

/// Gas budget and price for one submission
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GasConfig {
    pub max_gas_amount: Option<u64>,
    pub gas_unit_price: Option<u64>,
}

impl GasConfig {
    pub fn with_max_gas_amount(mut self, amount: u64) -> Self {
        self.max_gas_amount = Some(amount).filter(|v| *v > 0);
        self
    }

    pub fn with_gas_unit_price(mut self, price: u64) -> Self {
        self.gas_unit_price = Some(price).filter(|v| *v > 0);
        self
    }

    /// Build a config from caller-supplied options using any accepted alias.
    ///
    /// Values may be JSON numbers or decimal strings; zero counts as unset.
    pub fn from_options(options: &Map<String, Value>) -> SubmitterResult<Self> {
        let mut config = Self::default();
        for field in GasField::ALL {
            let value = field
                .accepted_keys()
                .iter()
                .find_map(|key| options.get(*key).filter(|v| !v.is_null()).map(|v| (*key, v)));

            if let Some((key, value)) = value {
                let parsed = parse_amount(value).ok_or_else(|| {
                    SubmitterError::Config(format!("Invalid value for {}: {}", key, value))
                })?;
                config.set(field, parsed);
            }
        }
        Ok(config)
    }

    pub fn get(&self, field: GasField) -> Option<u64> {
        match field {
            GasField::MaxGasAmount => self.max_gas_amount,
            GasField::GasUnitPrice => self.gas_unit_price,
        }
    }

    fn set(&mut self, field: GasField, value: u64) {
        let value = Some(value).filter(|v| *v > 0);
        match field {
            GasField::MaxGasAmount => self.max_gas_amount = value,
            GasField::GasUnitPrice => self.gas_unit_price = value,
        }
    }

    /// Render the config with every alias populated
    pub fn wallet_options(&self) -> WalletOptions {
        let mut options = WalletOptions::new();
        for field in GasField::ALL {
            if let Some(value) = self.get(field) {
                let value = value.to_string();
                for alias in field.aliases() {
                    options.insert((*alias).to_string(), value.clone());
                }
            }
        }
        options
    }

    /// Raise the gas budget after a gas-too-low rejection.
    ///
    /// An unset budget jumps to `floor`; a set budget doubles and never lands
    /// below `floor`. Returns the new budget.
    pub fn escalate(&mut self, floor: u64) -> u64 {
        let next = match self.max_gas_amount {
            Some(current) => current.saturating_mul(2).max(floor),
            None => floor,
        };
        debug!(
            "Escalating max_gas_amount from {:?} to {}",
            self.max_gas_amount, next
        );
        self.max_gas_amount = Some(next);
        next
    }
}

fn parse_amount(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f.floor() as u64)),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    }
}

/// Check whether a wallet error reports an underpriced gas simulation
pub fn is_gas_too_low(message: &str) -> bool {
    message.contains(GAS_TOO_LOW_MARKER)
}
