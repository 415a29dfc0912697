//! Core types for orders and the catalog stock ledger
//!
//! The order status graph and the delivery sub-state graph live here as
//! pure functions; the store enforces them together with role guards.
//!
//! # State machine
//!
//! ```text
//! Pending ──► Confirmed ──► Shipped ──► Delivered
//!    │            │            │
//!    └────────────┴────────────┴──► Cancelled / Refunded
//! ```
//!
//! Forward moves along the chain are legal (skipping a step is allowed);
//! `Cancelled` and `Refunded` are absorbing. While an order is `Shipped`
//! with a courier, `delivery_status` tracks the leg:
//! `Assigned → PickedUp → OutForDelivery → Delivered | Failed`.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use wallet_ledger::UserId;

/// Catalog product (the stock ledger slice this engine owns)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Unique product ID
    pub product_id: Uuid,

    /// Seller who owns the listing
    pub seller: UserId,

    /// Display name
    pub name: String,

    /// Current unit price
    pub price: Decimal,

    /// Units in stock
    pub stock: u32,

    /// Units sold across all orders
    pub sold_count: u64,

    /// Listing is open for purchase
    pub sellable: bool,

    /// Created timestamp
    pub created_at: DateTime<Utc>,

    /// Last-mutation timestamp
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Create a sellable product with zero sales
    pub fn new(seller: UserId, name: impl Into<String>, price: Decimal, stock: u32) -> Self {
        let now = Utc::now();
        Self {
            product_id: Uuid::now_v7(),
            seller,
            name: name.into(),
            price,
            stock,
            sold_count: 0,
            sellable: true,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Shipping address snapshot carried on the order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    /// Street line
    pub line1: String,
    /// Additional line
    pub line2: Option<String>,
    /// City
    pub city: String,
    /// State or province
    pub state: String,
    /// Postal code
    pub postal_code: String,
    /// Country
    pub country: String,
}

/// Payment method chosen at checkout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PaymentMethod {
    /// Cash collected by the courier on delivery
    CashOnDelivery,
    /// UPI transfer
    Upi,
    /// Card payment
    Card,
    /// Net banking
    NetBanking,
}

/// Payment state of an order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum PaymentStatus {
    /// Awaiting payment
    Pending = 1,
    /// Payment received
    Paid = 2,
    /// Gateway reported failure
    Failed = 3,
    /// Payment returned to the buyer
    Refunded = 4,
}

/// Order lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum OrderStatus {
    /// Placed, not yet confirmed by the seller
    Pending = 1,
    /// Confirmed by the seller
    Confirmed = 2,
    /// In transit
    Shipped = 3,
    /// Delivered to the buyer
    Delivered = 4,
    /// Cancelled before delivery
    Cancelled = 5,
    /// Delivered then refunded
    Refunded = 6,
}

impl OrderStatus {
    /// Position along the forward chain, None for absorbing states
    fn rank(&self) -> Option<u8> {
        match self {
            OrderStatus::Pending => Some(0),
            OrderStatus::Confirmed => Some(1),
            OrderStatus::Shipped => Some(2),
            OrderStatus::Delivered => Some(3),
            OrderStatus::Cancelled | OrderStatus::Refunded => None,
        }
    }

    /// Check if status is terminal
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Delivered | OrderStatus::Cancelled | OrderStatus::Refunded
        )
    }

    /// Check whether moving to `new` is legal from this status
    ///
    /// Terminal states reject everything. Non-terminal states may move
    /// forward along the chain (skips allowed) or into an absorbing state.
    pub fn can_transition_to(&self, new: OrderStatus) -> bool {
        if self.is_terminal() {
            return false;
        }
        match (self.rank(), new.rank()) {
            (_, None) => true,
            (Some(from), Some(to)) => to > from,
            (None, Some(_)) => false,
        }
    }
}

/// Delivery leg sub-state, tracked while an order is shipped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[repr(u8)]
pub enum DeliveryStatus {
    /// Courier accepted the order
    Assigned = 1,
    /// Parcel collected from the seller
    PickedUp = 2,
    /// On the way to the buyer
    OutForDelivery = 3,
    /// Handed over
    Delivered = 4,
    /// Courier aborted the delivery
    Failed = 5,
}

impl DeliveryStatus {
    /// Check whether the courier may move the leg to `new`
    ///
    /// The chain only moves forward one step at a time; `Failed` is
    /// reachable from any active sub-state.
    pub fn can_advance_to(&self, new: DeliveryStatus) -> bool {
        matches!(
            (self, new),
            (DeliveryStatus::Assigned, DeliveryStatus::PickedUp)
                | (DeliveryStatus::PickedUp, DeliveryStatus::OutForDelivery)
                | (DeliveryStatus::OutForDelivery, DeliveryStatus::Delivered)
                | (DeliveryStatus::Assigned, DeliveryStatus::Failed)
                | (DeliveryStatus::PickedUp, DeliveryStatus::Failed)
                | (DeliveryStatus::OutForDelivery, DeliveryStatus::Failed)
        )
    }
}

/// One order line with its price-at-purchase snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    /// Product ordered
    pub product_id: Uuid,

    /// Product name at purchase time
    pub name: String,

    /// Units ordered
    pub quantity: u32,

    /// Unit price at purchase time
    pub unit_price: Decimal,
}

impl OrderItem {
    /// quantity × unit_price
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

/// Marketplace order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    /// Human-readable unique order number
    pub order_number: String,

    /// Buyer who placed the order
    pub buyer: UserId,

    /// Seller of record (all items belong to this seller)
    pub seller: UserId,

    /// Line items with price snapshots
    pub items: Vec<OrderItem>,

    /// Shipping destination
    pub shipping_address: Address,

    /// Σ(quantity × unit_price)
    pub items_subtotal: Decimal,

    /// Delivery fee, earned in full by the courier
    pub shipping_fee: Decimal,

    /// Tax charged
    pub tax: Decimal,

    /// Discount applied
    pub discount: Decimal,

    /// items_subtotal + shipping_fee + tax − discount
    pub total_amount: Decimal,

    /// Currency
    pub currency: wallet_ledger::Currency,

    /// Lifecycle status
    pub status: OrderStatus,

    /// Payment state
    pub payment_status: PaymentStatus,

    /// Payment method
    pub payment_method: PaymentMethod,

    /// External gateway reference once payment is confirmed
    pub gateway_reference: Option<String>,

    /// Delivery leg sub-state while shipped with a courier
    pub delivery_status: Option<DeliveryStatus>,

    /// Assigned courier
    pub courier: Option<UserId>,

    /// Created timestamp
    pub created_at: DateTime<Utc>,

    /// Last-mutation timestamp
    pub updated_at: DateTime<Utc>,

    /// Delivery timestamp
    pub delivered_at: Option<DateTime<Utc>>,

    /// Cancellation timestamp
    pub cancelled_at: Option<DateTime<Utc>>,

    /// Why the order was cancelled
    pub cancellation_reason: Option<String>,
}

impl Order {
    /// Check if the order is in a terminal status
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Delivered and paid: eligible for revenue distribution
    pub fn is_settlement_ready(&self) -> bool {
        self.status == OrderStatus::Delivered && self.payment_status == PaymentStatus::Paid
    }
}

/// One requested order line (quantity only; prices are server-side)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    /// Product to order
    pub product_id: Uuid,
    /// Units requested
    pub quantity: u32,
}

/// Input for order creation
///
/// Unit prices never appear here; they are read from the catalog at
/// creation time. Fee, tax and discount come from the pricing layer.
#[derive(Debug, Clone)]
pub struct CreateOrderRequest {
    /// Buyer placing the order
    pub buyer: UserId,
    /// Seller the items belong to
    pub seller: UserId,
    /// Requested lines
    pub items: Vec<OrderLine>,
    /// Shipping destination
    pub shipping_address: Address,
    /// Payment method chosen at checkout
    pub payment_method: PaymentMethod,
    /// Delivery fee
    pub shipping_fee: Decimal,
    /// Tax charged
    pub tax: Decimal,
    /// Discount applied
    pub discount: Decimal,
}

/// Result of a status or delivery mutation
#[derive(Debug, Clone)]
pub struct StatusChange {
    /// The order after the mutation
    pub order: Order,
    /// The order just became delivered-and-paid; distribution should run
    pub settlement_due: bool,
}

/// Result of a payment confirmation
#[derive(Debug, Clone)]
pub struct PaymentConfirmation {
    /// The order after the confirmation
    pub order: Order,
    /// The order was already paid; nothing changed
    pub already_paid: bool,
    /// The order just became delivered-and-paid; distribution should run
    pub settlement_due: bool,
}
