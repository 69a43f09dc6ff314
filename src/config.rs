//! Configuration management for the transaction submitter
//!
//! Loads configuration from TOML files with environment variable substitution.

use anyhow::{Context, Result};
use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::tx::DEFAULT_GAS_FLOOR;

lazy_static! {
    static ref ENV_VAR: Regex = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").unwrap();
}

/// Root configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub submission: SubmissionConfig,
    #[serde(default)]
    pub confirmation: ConfirmationConfig,
    #[serde(default)]
    pub ledger: LedgerConfig,
    pub wallet: WalletConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SubmissionConfig {
    pub max_attempts: u32,
    pub gas_floor: u64,
}

impl Default for SubmissionConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            gas_floor: DEFAULT_GAS_FLOOR,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ConfirmationConfig {
    pub initial_delay_ms: u64,
    pub backoff_step_ms: u64,
    pub max_backoff_ms: u64,
    pub max_attempts: u32,
}

impl Default for ConfirmationConfig {
    fn default() -> Self {
        Self {
            initial_delay_ms: 3000,
            backoff_step_ms: 3000,
            max_backoff_ms: 15000,
            max_attempts: 30,
        }
    }
}

impl ConfirmationConfig {
    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }

    /// Wait after the `miss`-th not-found lookup (1-based)
    pub fn backoff(&self, miss: u32) -> Duration {
        let delay = self
            .backoff_step_ms
            .saturating_mul(u64::from(miss))
            .min(self.max_backoff_ms);
        Duration::from_millis(delay)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    pub base_url: String,
    pub request_timeout_ms: u64,
    /// Explorer link for a transaction, `{hash}` is replaced with the handle
    pub explorer_url: Option<String>,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.testnet.aptoslabs.com/v1".to_string(),
            request_timeout_ms: 10_000,
            explorer_url: Some(
                "https://explorer.aptoslabs.com/txn/{hash}?network=testnet".to_string(),
            ),
        }
    }
}

impl LedgerConfig {
    pub fn explorer_link(&self, hash: &str) -> Option<String> {
        self.explorer_url
            .as_ref()
            .map(|template| template.replace("{hash}", hash))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct WalletConfig {
    pub signer_url: String,
    #[serde(default = "default_signer_timeout_ms")]
    pub request_timeout_ms: u64,
}

fn default_signer_timeout_ms() -> u64 {
    60_000
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub port: u16,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: 9090,
        }
    }
}

impl Settings {
    /// Load settings from the configured file
    pub fn load() -> Result<Self> {
        let config_path = env::var("TX_SUBMITTER_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config/default.toml"));

        Self::load_from(&config_path)
    }

    /// Load settings from a specific path
    pub fn load_from(config_path: &Path) -> Result<Self> {
        let config_str = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file: {:?}", config_path))?;

        Self::parse(&config_str)
    }

    fn parse(config_str: &str) -> Result<Self> {
        // Substitute environment variables
        let config_str = substitute_env_vars(config_str);

        let settings: Settings =
            toml::from_str(&config_str).with_context(|| "Failed to parse configuration")?;

        settings.validate()?;

        Ok(settings)
    }

    /// Validate configuration
    fn validate(&self) -> Result<()> {
        if self.wallet.signer_url.trim().is_empty() {
            anyhow::bail!("wallet.signer_url must be set");
        }
        if self.ledger.base_url.trim().is_empty() {
            anyhow::bail!("ledger.base_url must be set");
        }
        if self.submission.max_attempts == 0 {
            anyhow::bail!("submission.max_attempts must be at least 1");
        }
        if self.confirmation.max_attempts == 0 {
            anyhow::bail!("confirmation.max_attempts must be at least 1");
        }
        if self.confirmation.backoff_step_ms > self.confirmation.max_backoff_ms {
            tracing::warn!(
                "confirmation.backoff_step_ms exceeds max_backoff_ms - every poll waits {}ms",
                self.confirmation.max_backoff_ms
            );
        }
        Ok(())
    }
}

/// Substitute environment variables in the format ${VAR_NAME}
fn substitute_env_vars(input: &str) -> String {
    let mut result = input.to_string();

    for cap in ENV_VAR.captures_iter(input) {
        let var_name = &cap[1];
        let var_value = env::var(var_name).unwrap_or_default();
        result = result.replace(&cap[0], &var_value);
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_env_var_substitution() {
        env::set_var("TX_SUBMITTER_TEST_VAR", "test_value");
        let input = "url = \"https://api.example.com/${TX_SUBMITTER_TEST_VAR}/endpoint\"";
        let result = substitute_env_vars(input);
        assert_eq!(result, "url = \"https://api.example.com/test_value/endpoint\"");
    }

    #[test]
    fn test_minimal_config_uses_defaults() {
        let settings = Settings::parse(
            r#"
            [wallet]
            signer_url = "http://localhost:7070/sign"
            "#,
        )
        .unwrap();

        assert_eq!(settings.submission.max_attempts, 5);
        assert_eq!(settings.submission.gas_floor, 5_000_000);
        assert_eq!(settings.confirmation.max_attempts, 30);
        assert_eq!(settings.confirmation.initial_delay(), Duration::from_millis(3000));
        assert_eq!(settings.wallet.request_timeout_ms, 60_000);
        assert!(settings.metrics.enabled);
    }

    #[test]
    fn test_backoff_is_linear_then_capped() {
        let config = ConfirmationConfig::default();
        let waits: Vec<u64> = (1..=7).map(|n| config.backoff(n).as_millis() as u64).collect();
        assert_eq!(waits, vec![3000, 6000, 9000, 12000, 15000, 15000, 15000]);
    }

    #[test]
    fn test_empty_signer_url_is_rejected() {
        let err = Settings::parse(
            r#"
            [wallet]
            signer_url = ""
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("signer_url"));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
            [ledger]
            base_url = "http://localhost:8081/v1"
            explorer_url = "https://explorer.example/tx/{{hash}}"

            [wallet]
            signer_url = "http://localhost:7070/sign"

            [confirmation]
            max_attempts = 3
            "#
        )
        .unwrap();

        let settings = Settings::load_from(file.path()).unwrap();
        assert_eq!(settings.ledger.base_url, "http://localhost:8081/v1");
        assert_eq!(settings.confirmation.max_attempts, 3);
        assert_eq!(settings.confirmation.max_backoff_ms, 15000);
        assert_eq!(
            settings.ledger.explorer_link("0xabc").as_deref(),
            Some("https://explorer.example/tx/0xabc")
        );
    }
}
