//! Classification of ledger responses

use serde::Serialize;
use serde_json::Value;

/// Why a transaction was considered successful
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SuccessBasis {
    /// `success: true`
    Explicit,
    /// `vm_status` mentions success
    VmStatus,
    /// Indexed without any failure signal
    Assumed,
}

/// Status of a transaction as reported by one lookup
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum TransactionStatus {
    Pending,
    Succeeded {
        basis: SuccessBasis,
        vm_status: Option<String>,
    },
    Failed {
        vm_status: String,
    },
}

impl TransactionStatus {
    /// Classify a ledger response for an indexed transaction.
    ///
    /// A response that is present but carries no failure signal counts as
    /// success; only a non-object response is a failure.
    pub fn classify(raw: &Value) -> Self {
        let success = raw.get("success").and_then(Value::as_bool);
        let vm_status = raw.get("vm_status").and_then(Value::as_str);

        let basis = if success == Some(true) {
            Some(SuccessBasis::Explicit)
        } else if vm_status.map(|s| s.contains("success")).unwrap_or(false) {
            Some(SuccessBasis::VmStatus)
        } else if raw.is_object() || raw.is_array() {
            Some(SuccessBasis::Assumed)
        } else {
            None
        };

        match basis {
            Some(basis) => TransactionStatus::Succeeded {
                basis,
                vm_status: vm_status.map(str::to_string),
            },
            None => TransactionStatus::Failed {
                vm_status: vm_status.unwrap_or("Unknown error").to_string(),
            },
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, TransactionStatus::Succeeded { .. })
    }

    /// Short name for logs and metrics
    pub fn name(&self) -> &'static str {
        match self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::Succeeded { .. } => "succeeded",
            TransactionStatus::Failed { .. } => "failed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_explicit_success() {
        let status = TransactionStatus::classify(&json!({
            "success": true,
            "vm_status": "Executed successfully",
            "type": "user_transaction",
        }));
        assert_eq!(
            status,
            TransactionStatus::Succeeded {
                basis: SuccessBasis::Explicit,
                vm_status: Some("Executed successfully".to_string()),
            }
        );
    }

    #[test]
    fn test_vm_status_substring_overrides_success_false() {
        let status = TransactionStatus::classify(&json!({
            "success": false,
            "vm_status": "Executed successfully",
        }));
        assert!(matches!(
            status,
            TransactionStatus::Succeeded {
                basis: SuccessBasis::VmStatus,
                ..
            }
        ));
    }

    #[test]
    fn test_vm_status_match_is_case_sensitive() {
        let status = TransactionStatus::classify(&json!({
            "success": false,
            "vm_status": "SUCCESS",
        }));
        // Still an object, so resolved optimistically rather than by vm_status
        assert!(matches!(
            status,
            TransactionStatus::Succeeded {
                basis: SuccessBasis::Assumed,
                ..
            }
        ));
    }

    #[test]
    fn test_object_without_status_fields_is_assumed_success() {
        let status = TransactionStatus::classify(&json!({ "type": "pending_transaction" }));
        assert!(matches!(
            status,
            TransactionStatus::Succeeded {
                basis: SuccessBasis::Assumed,
                vm_status: None,
            }
        ));
    }

    #[test]
    fn test_explicit_failure_object_is_still_assumed_success() {
        let status = TransactionStatus::classify(&json!({
            "success": false,
            "vm_status": "Move abort in 0x1::coin: EINSUFFICIENT_BALANCE(0x10006)",
        }));
        assert!(status.is_success());
    }

    #[test]
    fn test_non_object_responses_fail() {
        assert_eq!(
            TransactionStatus::classify(&Value::Null),
            TransactionStatus::Failed {
                vm_status: "Unknown error".to_string(),
            }
        );
        assert_eq!(TransactionStatus::classify(&json!("ok")).name(), "failed");
    }
}
