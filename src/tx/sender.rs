//! Transaction sender with gas escalation on underpriced simulations

use super::gas::{is_gas_too_low, GasConfig, WalletOptions};
use super::payload::TransactionPayload;
use crate::config::SubmissionConfig;
use crate::error::{SubmitterError, SubmitterResult};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Handle returned by the wallet for a broadcast transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmittedTransaction {
    pub hash: String,
}

/// Failure reported by a signer. Only the message is inspected.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct SignerFailure {
    pub message: String,
}

impl SignerFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Wallet capability: sign the payload and submit it, returning a handle
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Signer: Send + Sync {
    async fn sign_and_submit(
        &self,
        payload: &TransactionPayload,
        options: &WalletOptions,
    ) -> Result<SubmittedTransaction, SignerFailure>;
}

/// Signer that forwards to a wallet bridge over HTTP
pub struct HttpSigner {
    client: reqwest::Client,
    endpoint: String,
}

#[derive(Serialize)]
struct SignRequest<'a> {
    payload: &'a TransactionPayload,
    options: &'a WalletOptions,
}

impl HttpSigner {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> SubmitterResult<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait]
impl Signer for HttpSigner {
    async fn sign_and_submit(
        &self,
        payload: &TransactionPayload,
        options: &WalletOptions,
    ) -> Result<SubmittedTransaction, SignerFailure> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&SignRequest { payload, options })
            .send()
            .await
            .map_err(|e| SignerFailure::new(format!("Wallet bridge unreachable: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            // Wallet simulation errors arrive in the body; keep it intact
            let body = response.text().await.unwrap_or_default();
            return Err(SignerFailure::new(format!("HTTP {}: {}", status.as_u16(), body)));
        }

        response
            .json::<SubmittedTransaction>()
            .await
            .map_err(|e| SignerFailure::new(format!("Invalid wallet bridge response: {}", e)))
    }
}

/// Submits through a signer, raising the gas budget while the wallet reports
/// an underpriced simulation
#[derive(Debug, Clone)]
pub struct SubmissionRetrier {
    max_attempts: u32,
    gas_floor: u64,
}

impl SubmissionRetrier {
    pub fn new(config: &SubmissionConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            gas_floor: config.gas_floor,
        }
    }

    /// Sign and submit `payload`, returning the wallet's handle
    pub async fn submit(
        &self,
        signer: &dyn Signer,
        payload: &TransactionPayload,
        initial_gas: GasConfig,
    ) -> SubmitterResult<SubmittedTransaction> {
        let mut gas = initial_gas;
        let mut attempt: u32 = 0;
        let mut last_error: Option<SignerFailure> = None;

        debug!("Submitting {} to wallet", payload.function());

        while attempt < self.max_attempts {
            let options = gas.wallet_options();

            match signer.sign_and_submit(payload, &options).await {
                Ok(submitted) if submitted.hash.trim().is_empty() => {
                    warn!(
                        "Wallet accepted attempt {}/{} but returned no transaction hash",
                        attempt + 1,
                        self.max_attempts
                    );
                    return Err(SubmitterError::Signer(
                        "Wallet returned no transaction hash".to_string(),
                    ));
                }
                Ok(submitted) => {
                    info!(
                        "Transaction submitted: {} (attempt {}/{})",
                        submitted.hash,
                        attempt + 1,
                        self.max_attempts
                    );
                    crate::metrics::record_tx_submitted();
                    return Ok(submitted);
                }
                Err(failure) => {
                    warn!(
                        "Submit attempt {}/{} failed: {}",
                        attempt + 1,
                        self.max_attempts,
                        failure
                    );

                    if !is_gas_too_low(&failure.message) {
                        return Err(SubmitterError::Signer(failure.message));
                    }

                    if attempt >= self.max_attempts - 1 {
                        return Err(SubmitterError::SubmissionFailed {
                            attempts: attempt + 1,
                            last_error: failure.message,
                        });
                    }

                    let next = gas.escalate(self.gas_floor);
                    crate::metrics::record_gas_escalation();
                    info!("Retrying with increased max_gas_amount={}", next);

                    last_error = Some(failure);
                    attempt += 1;
                }
            }
        }

        Err(SubmitterError::SubmissionFailed {
            attempts: attempt,
            last_error: last_error
                .map(|e| e.message)
                .unwrap_or_else(|| "no submission attempt was made".to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tx::gas::DEFAULT_GAS_FLOOR;
    use axum::{
        http::StatusCode,
        response::{IntoResponse, Response},
        routing::post,
        Json, Router,
    };
    use serde_json::{json, Value};
    use std::sync::{Arc, Mutex};

    const GAS_ERROR: &str =
        "Simulation error: MAX_GAS_UNITS_BELOW_MIN_TRANSACTION_GAS_UNITS (code 13)";

    fn retrier() -> SubmissionRetrier {
        SubmissionRetrier::new(&SubmissionConfig {
            max_attempts: 5,
            gas_floor: DEFAULT_GAS_FLOOR,
        })
    }

    fn payload() -> TransactionPayload {
        TransactionPayload::coin_transfer("0xbeef", 10, None)
    }

    /// Signer failing with the gas marker `failures` times before succeeding.
    /// Records the `max_gas_amount` sent on each call.
    fn gas_limited_signer(failures: usize) -> (MockSigner, Arc<Mutex<Vec<Option<String>>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let calls = seen.clone();
        let mut signer = MockSigner::new();
        signer.expect_sign_and_submit().returning(move |_, options| {
            let mut calls = calls.lock().unwrap();
            calls.push(options.get("max_gas_amount").cloned());
            if calls.len() <= failures {
                Err(SignerFailure::new(GAS_ERROR))
            } else {
                Ok(SubmittedTransaction {
                    hash: "0xfeed".to_string(),
                })
            }
        });
        (signer, seen)
    }

    #[tokio::test]
    async fn test_immediate_success_uses_initial_gas() {
        let (signer, seen) = gas_limited_signer(0);
        let gas = GasConfig::default().with_max_gas_amount(2_000);

        let submitted = retrier().submit(&signer, &payload(), gas).await.unwrap();

        assert_eq!(submitted.hash, "0xfeed");
        assert_eq!(*seen.lock().unwrap(), vec![Some("2000".to_string())]);
    }

    #[tokio::test]
    async fn test_four_gas_failures_then_success_from_unset_budget() {
        let (signer, seen) = gas_limited_signer(4);

        let submitted = retrier()
            .submit(&signer, &payload(), GasConfig::default())
            .await
            .unwrap();

        assert_eq!(submitted.hash, "0xfeed");
        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                None,
                Some("5000000".to_string()),
                Some("10000000".to_string()),
                Some("20000000".to_string()),
                Some("40000000".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_escalation_doubles_large_initial_budget() {
        let (signer, seen) = gas_limited_signer(4);
        let gas = GasConfig::default().with_max_gas_amount(6_000_000);

        retrier().submit(&signer, &payload(), gas).await.unwrap();

        let last = seen.lock().unwrap().last().cloned().flatten();
        assert_eq!(last.as_deref(), Some("96000000"));
    }

    #[tokio::test]
    async fn test_gas_failures_exhaust_after_five_attempts() {
        let mut signer = MockSigner::new();
        signer
            .expect_sign_and_submit()
            .times(5)
            .returning(|_, _| Err(SignerFailure::new(GAS_ERROR)));

        let err = retrier()
            .submit(&signer, &payload(), GasConfig::default())
            .await
            .unwrap_err();

        match err {
            SubmitterError::SubmissionFailed {
                attempts,
                last_error,
            } => {
                assert_eq!(attempts, 5);
                assert_eq!(last_error, GAS_ERROR);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_non_gas_error_is_not_retried() {
        let mut signer = MockSigner::new();
        signer
            .expect_sign_and_submit()
            .times(1)
            .returning(|_, _| Err(SignerFailure::new("User rejected the request")));

        let err = retrier()
            .submit(&signer, &payload(), GasConfig::default())
            .await
            .unwrap_err();

        assert!(matches!(err, SubmitterError::Signer(msg) if msg == "User rejected the request"));
    }

    #[tokio::test]
    async fn test_blank_hash_is_a_terminal_signer_error() {
        for hash in ["", "   "] {
            let mut signer = MockSigner::new();
            signer.expect_sign_and_submit().times(1).returning(move |_, _| {
                Ok(SubmittedTransaction {
                    hash: hash.to_string(),
                })
            });

            let err = retrier()
                .submit(&signer, &payload(), GasConfig::default())
                .await
                .unwrap_err();

            assert!(
                matches!(&err, SubmitterError::Signer(msg) if msg.contains("no transaction hash")),
                "unexpected error: {err:?}"
            );
        }
    }

    #[tokio::test]
    async fn test_escalated_budget_is_sent_under_every_alias() {
        let seen = Arc::new(Mutex::new(Vec::<WalletOptions>::new()));
        let calls = seen.clone();
        let mut signer = MockSigner::new();
        signer.expect_sign_and_submit().returning(move |_, options| {
            let mut calls = calls.lock().unwrap();
            calls.push(options.clone());
            if calls.len() == 1 {
                Err(SignerFailure::new(GAS_ERROR))
            } else {
                Ok(SubmittedTransaction {
                    hash: "0x1".to_string(),
                })
            }
        });

        let gas = GasConfig::default().with_gas_unit_price(100);
        retrier().submit(&signer, &payload(), gas).await.unwrap();

        let calls = seen.lock().unwrap();
        let retried = &calls[1];
        for key in ["max_gas_amount", "maxGasAmount", "maxGas", "max_gas", "gas_budget"] {
            assert_eq!(retried.get(key).map(String::as_str), Some("5000000"));
        }
        assert_eq!(retried.get("gasPrice").map(String::as_str), Some("100"));
    }

    /// Wallet bridge that rejects any request without a gas budget and
    /// echoes the budget it finally accepted as the hash
    async fn gas_checking_bridge(Json(request): Json<Value>) -> Response {
        match request["options"]["max_gas_amount"].as_str() {
            None => (
                StatusCode::BAD_REQUEST,
                format!(
                    "{{\"message\":\"Simulation failed: {}\"}}",
                    crate::tx::GAS_TOO_LOW_MARKER
                ),
            )
                .into_response(),
            Some(budget) => Json(json!({ "hash": format!("0x{}", budget) })).into_response(),
        }
    }

    async fn bridge(app: Router) -> HttpSigner {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        HttpSigner::new(format!("http://{}/sign", addr), Duration::from_secs(2)).unwrap()
    }

    #[tokio::test]
    async fn test_http_signer_keeps_gas_marker_in_error() {
        let signer = bridge(Router::new().route("/sign", post(gas_checking_bridge))).await;

        let err = signer
            .sign_and_submit(&payload(), &WalletOptions::new())
            .await
            .unwrap_err();

        assert!(err.message.starts_with("HTTP 400: "), "{}", err.message);
        assert!(is_gas_too_low(&err.message));
    }

    #[tokio::test]
    async fn test_http_signer_escalates_through_retrier() {
        let signer = bridge(Router::new().route("/sign", post(gas_checking_bridge))).await;

        let submitted = retrier()
            .submit(&signer, &payload(), GasConfig::default())
            .await
            .unwrap();

        assert_eq!(submitted.hash, "0x5000000");
    }

    #[tokio::test]
    async fn test_http_signer_rejects_malformed_response() {
        let signer = bridge(Router::new().route(
            "/sign",
            post(|| async { Json(json!({ "txHash": "0x1" })) }),
        ))
        .await;

        let err = signer
            .sign_and_submit(&payload(), &WalletOptions::new())
            .await
            .unwrap_err();

        assert!(err.message.starts_with("Invalid wallet bridge response"));
        assert!(!is_gas_too_low(&err.message));
    }

    #[tokio::test]
    async fn test_http_signer_unreachable_bridge() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let signer =
            HttpSigner::new(format!("http://{}/sign", addr), Duration::from_secs(2)).unwrap();

        let err = retrier()
            .submit(&signer, &payload(), GasConfig::default())
            .await
            .unwrap_err();

        match err {
            SubmitterError::Signer(msg) => assert!(msg.starts_with("Wallet bridge unreachable")),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
