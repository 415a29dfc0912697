//! Core types for the wallet ledger
//!
//! All types are designed for:
//! - Deterministic serialization (bincode) in storage
//! - camelCase JSON when rendered as storefront payloads
//! - Exact arithmetic (Decimal for money)

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// User identifier (buyer, seller, courier, admin or the platform account)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(String);

impl UserId {
    /// Create new user ID
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get as string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// ISO 4217 currency code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
pub enum Currency {
    /// Indian Rupee
    INR,
    /// US Dollar
    USD,
    /// Euro
    EUR,
    /// British Pound
    GBP,
    /// UAE Dirham
    AED,
}

impl Currency {
    /// ISO 4217 code
    pub fn code(&self) -> &'static str {
        match self {
            Currency::INR => "INR",
            Currency::USD => "USD",
            Currency::EUR => "EUR",
            Currency::GBP => "GBP",
            Currency::AED => "AED",
        }
    }

    /// Parse from string
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "INR" => Some(Currency::INR),
            "USD" => Some(Currency::USD),
            "EUR" => Some(Currency::EUR),
            "GBP" => Some(Currency::GBP),
            "AED" => Some(Currency::AED),
            _ => None,
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Role an authenticated caller acts under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Customer placing orders
    Buyer,
    /// Vendor selling products
    Seller,
    /// Delivery partner
    Courier,
    /// Platform operator
    Admin,
}

/// Authenticated caller identity for role/ownership guards
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    /// Caller's user ID
    pub user: UserId,
    /// Caller's role
    pub role: Role,
}

impl Actor {
    /// Create new actor
    pub fn new(user: impl Into<String>, role: Role) -> Self {
        Self {
            user: UserId::new(user),
            role,
        }
    }

    /// Buyer actor
    pub fn buyer(user: impl Into<String>) -> Self {
        Self::new(user, Role::Buyer)
    }

    /// Seller actor
    pub fn seller(user: impl Into<String>) -> Self {
        Self::new(user, Role::Seller)
    }

    /// Courier actor
    pub fn courier(user: impl Into<String>) -> Self {
        Self::new(user, Role::Courier)
    }

    /// Admin actor
    pub fn admin(user: impl Into<String>) -> Self {
        Self::new(user, Role::Admin)
    }

    /// Check admin role
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Pagination window for list queries (skip/limit)
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Page {
    /// Records to skip
    pub skip: usize,
    /// Maximum records to return
    pub limit: usize,
}

impl Page {
    /// Hard cap on page size
    pub const MAX_LIMIT: usize = 500;

    /// Create a page, clamping the limit to [`Page::MAX_LIMIT`]
    pub fn new(skip: usize, limit: usize) -> Self {
        Self {
            skip,
            limit: limit.min(Self::MAX_LIMIT),
        }
    }
}

impl Default for Page {
    fn default() -> Self {
        Self { skip: 0, limit: 50 }
    }
}

/// Direction of a ledger entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum EntryKind {
    /// Balance increases
    Credit = 1,
    /// Balance decreases
    Debit = 2,
}

/// Revenue category a transaction belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[repr(u8)]
pub enum RevenueCategory {
    /// Seller's cut of a delivered order
    SellerShare = 1,
    /// Courier's cut plus the delivery fee
    CourierShare = 2,
    /// Platform commission
    PlatformShare = 3,
    /// Withdrawal escrow and its compensating credit
    Payout = 4,
    /// Order refund
    Refund = 5,
}

impl RevenueCategory {
    /// True for the three categories written by order settlement
    pub fn is_revenue_share(&self) -> bool {
        matches!(
            self,
            RevenueCategory::SellerShare
                | RevenueCategory::CourierShare
                | RevenueCategory::PlatformShare
        )
    }
}

/// Transaction status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum TransactionStatus {
    /// Awaiting payout outcome
    Pending = 1,
    /// Settled
    Completed = 2,
    /// Failed
    Failed = 3,
    /// Reversed by payout rejection/cancellation
    Cancelled = 4,
}

/// Per-user balance record
///
/// Created lazily on first access, never deleted. `available` is the
/// authoritative spendable amount and must never go negative;
/// `total_earned - total_withdrawn` is not required to equal it because
/// pending balance and payouts in flight create a gap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Wallet {
    /// Owner identity (unique)
    pub owner: UserId,

    /// Spendable balance, never negative
    pub available: Decimal,

    /// Balance awaiting clearance
    pub pending: Decimal,

    /// Cumulative credited earnings
    pub total_earned: Decimal,

    /// Cumulative debited withdrawals
    pub total_withdrawn: Decimal,

    /// Currency
    pub currency: Currency,

    /// Created timestamp
    pub created_at: DateTime<Utc>,

    /// Last-transaction timestamp
    pub updated_at: DateTime<Utc>,
}

impl Wallet {
    /// Create a zero-balance wallet
    pub fn new(owner: UserId, currency: Currency) -> Self {
        let now = Utc::now();
        Self {
            owner,
            available: Decimal::ZERO,
            pending: Decimal::ZERO,
            total_earned: Decimal::ZERO,
            total_withdrawn: Decimal::ZERO,
            currency,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Immutable audit record of one balance mutation
///
/// Written exactly once per ledger mutation. The only legal update after
/// creation is the `Pending -> Completed | Cancelled` status flip on a
/// payout-linked debit, reflecting the payout outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecord {
    /// Unique transaction ID (UUIDv7 for time-ordering)
    pub transaction_id: Uuid,

    /// Wallet owner this entry applies to
    pub owner: UserId,

    /// Order this entry references, if any
    pub order_ref: Option<String>,

    /// Payout request this entry references, if any
    pub payout_ref: Option<Uuid>,

    /// Credit or debit
    pub kind: EntryKind,

    /// Entry amount, always non-negative
    pub amount: Decimal,

    /// Currency
    pub currency: Currency,

    /// Revenue category
    pub category: RevenueCategory,

    /// Available balance before the mutation
    pub balance_before: Decimal,

    /// Available balance after the mutation
    pub balance_after: Decimal,

    /// Entry status
    pub status: TransactionStatus,

    /// Human-readable description referencing the source record
    pub description: String,

    /// Created timestamp
    pub created_at: DateTime<Utc>,
}

/// Input for a credit operation
#[derive(Debug, Clone)]
pub struct CreditRequest {
    /// Wallet owner to credit
    pub owner: UserId,
    /// Amount, must be positive
    pub amount: Decimal,
    /// Revenue category
    pub category: RevenueCategory,
    /// Description referencing the source record
    pub description: String,
    /// Related order number
    pub order_ref: Option<String>,
    /// Related payout request
    pub payout_ref: Option<Uuid>,
}

/// Input for a debit operation
///
/// A debit carrying a `payout_ref` is an escrow debit: its transaction is
/// written as `Pending` and flipped when the payout resolves.
#[derive(Debug, Clone)]
pub struct DebitRequest {
    /// Wallet owner to debit
    pub owner: UserId,
    /// Amount, must be positive
    pub amount: Decimal,
    /// Revenue category
    pub category: RevenueCategory,
    /// Description referencing the source record
    pub description: String,
    /// Related order number
    pub order_ref: Option<String>,
    /// Related payout request
    pub payout_ref: Option<Uuid>,
}

/// One share of an order's revenue distribution
#[derive(Debug, Clone)]
pub struct ShareCredit {
    /// Wallet owner receiving the share
    pub owner: UserId,
    /// Share amount, must be positive
    pub amount: Decimal,
    /// SellerShare, CourierShare or PlatformShare
    pub category: RevenueCategory,
    /// Description referencing the order number
    pub description: String,
}

/// Result of applying a settlement distribution
#[derive(Debug, Clone)]
pub enum SettlementOutcome {
    /// All share credits committed atomically
    Applied {
        /// The transaction records written, one per nonzero share
        transactions: Vec<TransactionRecord>,
    },
    /// Revenue transactions already exist for this order; nothing written
    AlreadyDistributed,
}

impl SettlementOutcome {
    /// True when this call performed the distribution
    pub fn is_applied(&self) -> bool {
        matches!(self, SettlementOutcome::Applied { .. })
    }
}
