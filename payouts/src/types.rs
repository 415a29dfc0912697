//! Payout request types
//!
//! A payout is a user's withdrawal of wallet funds to an external
//! destination. Funds are escrowed (debited) the instant the request is
//! filed; approval moves no money, rejection and cancellation credit the
//! escrow back.
//!
//! ```text
//! Pending ──► Processing ──► Completed
//!    │             │
//!    │             └───────► Failed     (admin reject, refund)
//!    └─────────────────────► Cancelled  (requester, refund)
//! ```

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use wallet_ledger::UserId;

/// Destination for a payout
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PayoutMethod {
    /// UPI transfer
    Upi {
        /// Virtual payment address, e.g. `name@bank`
        vpa: String,
    },
    /// Bank account transfer
    #[serde(rename_all = "camelCase")]
    Bank {
        /// Account number
        account_number: String,
        /// Branch IFSC code
        ifsc: String,
        /// Account holder name
        holder_name: String,
    },
    /// Third-party wallet transfer
    Wallet {
        /// Wallet provider name
        provider: String,
        /// Account handle at the provider
        handle: String,
    },
}

impl PayoutMethod {
    /// Check the destination fields are plausible before escrowing funds
    pub fn validate(&self) -> Result<()> {
        match self {
            PayoutMethod::Upi { vpa } => {
                if vpa.is_empty() || !vpa.contains('@') {
                    return Err(Error::Validation(format!("invalid UPI VPA: {:?}", vpa)));
                }
            }
            PayoutMethod::Bank {
                account_number,
                ifsc,
                holder_name,
            } => {
                if account_number.is_empty() || holder_name.is_empty() {
                    return Err(Error::Validation(
                        "bank account number and holder name are required".to_string(),
                    ));
                }
                if ifsc.len() != 11 {
                    return Err(Error::Validation(format!(
                        "IFSC must be 11 characters, got {:?}",
                        ifsc
                    )));
                }
            }
            PayoutMethod::Wallet { provider, handle } => {
                if provider.is_empty() || handle.is_empty() {
                    return Err(Error::Validation(
                        "wallet provider and handle are required".to_string(),
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Payout request state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum PayoutStatus {
    /// Filed, funds escrowed, awaiting review
    Pending = 1,
    /// Approval in progress
    Processing = 2,
    /// Paid out externally
    Completed = 3,
    /// Rejected by an admin, escrow refunded
    Failed = 4,
    /// Withdrawn by the requester, escrow refunded
    Cancelled = 5,
}

impl PayoutStatus {
    /// Check if no further transitions are possible
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PayoutStatus::Completed | PayoutStatus::Failed | PayoutStatus::Cancelled
        )
    }
}

/// A payout request and its resolution trail
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayoutRequest {
    /// Unique payout ID (UUIDv7, creation ordered)
    pub payout_id: Uuid,

    /// Wallet owner withdrawing funds
    pub user: UserId,

    /// Amount withdrawn
    pub amount: Decimal,

    /// External destination
    pub method: PayoutMethod,

    /// Current state
    pub status: PayoutStatus,

    /// When the request was filed
    pub requested_at: DateTime<Utc>,

    /// When the request was resolved
    pub processed_at: Option<DateTime<Utc>>,

    /// Admin who approved or rejected
    pub processed_by: Option<UserId>,

    /// Why the payout failed, on rejection
    pub failure_reason: Option<String>,

    /// External settlement reference, on completion
    pub settlement_reference: Option<String>,

    /// The escrow debit transaction paired with this payout
    pub debit_transaction_id: Uuid,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_validation() {
        PayoutMethod::Upi {
            vpa: "ravi@okbank".to_string(),
        }
        .validate()
        .unwrap();

        assert!(PayoutMethod::Upi {
            vpa: "no-at-sign".to_string()
        }
        .validate()
        .is_err());

        PayoutMethod::Bank {
            account_number: "50100234567890".to_string(),
            ifsc: "HDFC0001234".to_string(),
            holder_name: "Ravi Kumar".to_string(),
        }
        .validate()
        .unwrap();

        assert!(PayoutMethod::Bank {
            account_number: "50100234567890".to_string(),
            ifsc: "HDFC".to_string(),
            holder_name: "Ravi Kumar".to_string(),
        }
        .validate()
        .is_err());

        assert!(PayoutMethod::Wallet {
            provider: "paytm".to_string(),
            handle: String::new(),
        }
        .validate()
        .is_err());
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(PayoutStatus::Completed.is_terminal());
        assert!(PayoutStatus::Failed.is_terminal());
        assert!(PayoutStatus::Cancelled.is_terminal());
        assert!(!PayoutStatus::Pending.is_terminal());
        assert!(!PayoutStatus::Processing.is_terminal());
    }

    #[test]
    fn test_json_names() {
        assert_eq!(
            serde_json::to_string(&PayoutStatus::Processing).unwrap(),
            "\"processing\""
        );

        let method = PayoutMethod::Upi {
            vpa: "ravi@okbank".to_string(),
        };
        assert_eq!(
            serde_json::to_string(&method).unwrap(),
            r#"{"upi":{"vpa":"ravi@okbank"}}"#
        );

        let method = PayoutMethod::Bank {
            account_number: "50100234567890".to_string(),
            ifsc: "HDFC0001234".to_string(),
            holder_name: "Ravi Kumar".to_string(),
        };
        let json = serde_json::to_string(&method).unwrap();
        assert!(json.contains("\"accountNumber\""));
        assert!(json.contains("\"holderName\""));
    }
}
