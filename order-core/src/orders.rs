//! Order store and state machine enforcement
//!
//! All mutations run a read-validate-write sequence under a store-wide
//! write lock and commit through one WriteBatch, so stock check-and-
//! decrement, cancellation restore and courier assignment are atomic with
//! respect to concurrent requests. The lock is never held while awaiting.
//!
//! Read queries go straight to storage without the lock.

use crate::{
    error::{Error, Result},
    storage::Storage,
    types::{
        CreateOrderRequest, DeliveryStatus, Order, OrderItem, OrderStatus, PaymentConfirmation,
        PaymentMethod, PaymentStatus, Product, StatusChange,
    },
    Config,
};
use chrono::Utc;
use parking_lot::Mutex;
use rand::distributions::Alphanumeric;
use rand::Rng;
use rust_decimal::Decimal;
use std::collections::HashSet;
use std::sync::Arc;
use wallet_ledger::{Actor, Page, Role, UserId};

/// Main order store interface
pub struct Orders {
    /// Storage backend
    storage: Arc<Storage>,

    /// Serializes all read-modify-write sections
    write_lock: Mutex<()>,

    /// Configuration
    config: Config,
}

impl Orders {
    /// Open order store with configuration
    pub fn open(config: Config) -> Result<Self> {
        let storage = Arc::new(Storage::open(&config)?);

        tracing::info!(
            prefix = %config.order_prefix,
            currency = %config.currency,
            "Order store opened"
        );

        Ok(Self {
            storage,
            write_lock: Mutex::new(()),
            config,
        })
    }

    // Catalog slice

    /// Write a product record (catalog seeding and price/stock upkeep)
    pub fn put_product(&self, product: Product) -> Result<Product> {
        let _guard = self.write_lock.lock();
        self.storage.put_product(&product)?;
        Ok(product)
    }

    /// Get product by ID
    pub fn get_product(&self, product_id: uuid::Uuid) -> Result<Product> {
        self.storage.get_product(product_id)
    }

    // Order operations

    /// Create an order, decrementing stock atomically with the order write
    ///
    /// Prices come from the catalog at this moment, never from the request.
    /// Any failure leaves no stock mutation behind.
    pub fn create_order(&self, request: CreateOrderRequest) -> Result<Order> {
        if request.items.is_empty() {
            return Err(Error::Validation("order has no items".to_string()));
        }
        let mut seen = HashSet::new();
        for line in &request.items {
            if line.quantity == 0 {
                return Err(Error::Validation(format!(
                    "zero quantity for product {}",
                    line.product_id
                )));
            }
            if !seen.insert(line.product_id) {
                return Err(Error::Validation(format!(
                    "product {} appears twice; merge the lines",
                    line.product_id
                )));
            }
        }
        if request.shipping_fee < Decimal::ZERO
            || request.tax < Decimal::ZERO
            || request.discount < Decimal::ZERO
        {
            return Err(Error::Validation(
                "fee, tax and discount must not be negative".to_string(),
            ));
        }

        let _guard = self.write_lock.lock();

        let now = Utc::now();
        let mut products = Vec::with_capacity(request.items.len());
        let mut items = Vec::with_capacity(request.items.len());
        let mut items_subtotal = Decimal::ZERO;

        for line in &request.items {
            let mut product = self.storage.get_product(line.product_id)?;

            if product.seller != request.seller {
                return Err(Error::Validation(format!(
                    "product {} is not sold by {}",
                    product.name, request.seller
                )));
            }
            if !product.sellable {
                return Err(Error::ProductUnavailable(product.name));
            }
            if line.quantity > product.stock {
                return Err(Error::OutOfStock {
                    product: product.name,
                    requested: line.quantity,
                    available: product.stock,
                });
            }

            product.stock -= line.quantity;
            product.sold_count += u64::from(line.quantity);
            product.updated_at = now;

            items.push(OrderItem {
                product_id: product.product_id,
                name: product.name.clone(),
                quantity: line.quantity,
                unit_price: product.price,
            });
            items_subtotal += product.price * Decimal::from(line.quantity);
            products.push(product);
        }

        let total_amount =
            items_subtotal + request.shipping_fee + request.tax - request.discount;
        if total_amount <= Decimal::ZERO {
            return Err(Error::Validation(format!(
                "order total must be positive, got {}",
                total_amount
            )));
        }

        let order_number = self.unused_order_number()?;
        let order = Order {
            order_number,
            buyer: request.buyer,
            seller: request.seller,
            items,
            shipping_address: request.shipping_address,
            items_subtotal,
            shipping_fee: request.shipping_fee,
            tax: request.tax,
            discount: request.discount,
            total_amount,
            currency: self.config.currency,
            status: OrderStatus::Pending,
            payment_status: PaymentStatus::Pending,
            payment_method: request.payment_method,
            gateway_reference: None,
            delivery_status: None,
            courier: None,
            created_at: now,
            updated_at: now,
            delivered_at: None,
            cancelled_at: None,
            cancellation_reason: None,
        };

        self.storage.commit(&products, std::slice::from_ref(&order), &[])?;

        tracing::info!(
            order_number = %order.order_number,
            buyer = %order.buyer,
            seller = %order.seller,
            total = %order.total_amount,
            "Order created"
        );

        Ok(order)
    }

    /// Move an order along the status graph (seller of record or admin)
    ///
    /// Cancelling restores the stock decremented at creation. Marking
    /// delivered stamps `delivered_at` and completes cash-on-delivery
    /// payment. Refunding requires the order to have been paid.
    pub fn transition_status(
        &self,
        order_number: &str,
        new_status: OrderStatus,
        actor: &Actor,
        reason: Option<String>,
    ) -> Result<StatusChange> {
        let _guard = self.write_lock.lock();

        let mut order = self.storage.get_order(order_number)?;
        self.require_seller_or_admin(actor, &order)?;

        if order.status.is_terminal() {
            return Err(Error::InvalidTransition(format!(
                "order {} is {:?} and cannot change status",
                order_number, order.status
            )));
        }
        if !order.status.can_transition_to(new_status) {
            return Err(Error::InvalidTransition(format!(
                "order {} cannot move {:?} -> {:?}",
                order_number, order.status, new_status
            )));
        }

        let now = Utc::now();
        let mut products = Vec::new();

        match new_status {
            OrderStatus::Cancelled => {
                products = self.restore_stock(&order)?;
                order.cancelled_at = Some(now);
                order.cancellation_reason =
                    Some(reason.unwrap_or_else(|| format!("Cancelled by {}", actor.user)));
            }
            OrderStatus::Delivered => {
                order.delivered_at = Some(now);
                if order.delivery_status.is_some() {
                    order.delivery_status = Some(DeliveryStatus::Delivered);
                }
                complete_cod_payment(&mut order);
            }
            OrderStatus::Refunded => {
                if order.payment_status != PaymentStatus::Paid {
                    return Err(Error::InvalidTransition(format!(
                        "order {} was never paid; nothing to refund",
                        order_number
                    )));
                }
                order.payment_status = PaymentStatus::Refunded;
                order.cancelled_at = Some(now);
                order.cancellation_reason =
                    Some(reason.unwrap_or_else(|| format!("Refunded by {}", actor.user)));
            }
            OrderStatus::Pending | OrderStatus::Confirmed | OrderStatus::Shipped => {}
        }

        order.status = new_status;
        order.updated_at = now;

        let settlement_due = order.is_settlement_ready();

        self.storage.commit(&products, std::slice::from_ref(&order), &[])?;

        tracing::info!(
            order_number = %order_number,
            status = ?new_status,
            settlement_due,
            "Order status changed"
        );

        Ok(StatusChange {
            order,
            settlement_due,
        })
    }

    /// Courier self-assignment: first caller wins the order
    pub fn accept_delivery(&self, order_number: &str, actor: &Actor) -> Result<Order> {
        if actor.role != Role::Courier {
            return Err(Error::Forbidden(format!(
                "{} is not a courier",
                actor.user
            )));
        }

        let _guard = self.write_lock.lock();

        let mut order = self.storage.get_order(order_number)?;

        if order.courier.is_some() {
            return Err(Error::AlreadyAssigned(order_number.to_string()));
        }
        if order.status != OrderStatus::Confirmed {
            return Err(Error::InvalidTransition(format!(
                "order {} is {:?}; only confirmed orders can be accepted",
                order_number, order.status
            )));
        }

        order.courier = Some(actor.user.clone());
        order.delivery_status = Some(DeliveryStatus::Assigned);
        order.status = OrderStatus::Shipped;
        order.updated_at = Utc::now();

        self.storage.commit(&[], std::slice::from_ref(&order), &[])?;

        tracing::info!(
            order_number = %order_number,
            courier = %actor.user,
            "Delivery accepted"
        );

        Ok(order)
    }

    /// Advance the delivery leg (assigned courier only)
    ///
    /// `Delivered` completes the order; `Failed` cancels it and restores
    /// stock, leaving payment untouched.
    pub fn update_delivery_status(
        &self,
        order_number: &str,
        actor: &Actor,
        new: DeliveryStatus,
    ) -> Result<StatusChange> {
        let _guard = self.write_lock.lock();

        let mut order = self.storage.get_order(order_number)?;

        if actor.role != Role::Courier || order.courier.as_ref() != Some(&actor.user) {
            return Err(Error::Forbidden(format!(
                "{} is not the courier assigned to {}",
                actor.user, order_number
            )));
        }
        if order.status != OrderStatus::Shipped {
            return Err(Error::InvalidTransition(format!(
                "order {} is {:?}; no delivery in progress",
                order_number, order.status
            )));
        }
        let current = order.delivery_status.ok_or_else(|| {
            Error::InvalidTransition(format!("order {} has no delivery leg", order_number))
        })?;
        if !current.can_advance_to(new) {
            return Err(Error::InvalidTransition(format!(
                "delivery for {} cannot move {:?} -> {:?}",
                order_number, current, new
            )));
        }

        let now = Utc::now();
        order.delivery_status = Some(new);
        let mut products = Vec::new();
        let mut settlement_due = false;

        match new {
            DeliveryStatus::Delivered => {
                order.status = OrderStatus::Delivered;
                order.delivered_at = Some(now);
                complete_cod_payment(&mut order);
                settlement_due = order.payment_status == PaymentStatus::Paid;
            }
            DeliveryStatus::Failed => {
                products = self.restore_stock(&order)?;
                order.status = OrderStatus::Cancelled;
                order.cancelled_at = Some(now);
                order.cancellation_reason =
                    Some(format!("Delivery failed by courier {}", actor.user));
            }
            _ => {}
        }

        order.updated_at = now;
        self.storage.commit(&products, std::slice::from_ref(&order), &[])?;

        tracing::info!(
            order_number = %order_number,
            delivery_status = ?new,
            settlement_due,
            "Delivery status updated"
        );

        Ok(StatusChange {
            order,
            settlement_due,
        })
    }

    /// Payment-gateway confirmation hook
    ///
    /// Idempotent: confirming an already-paid order changes nothing and
    /// reports `already_paid`.
    pub fn confirm_payment(
        &self,
        order_number: &str,
        gateway_reference: impl Into<String>,
        method: PaymentMethod,
    ) -> Result<PaymentConfirmation> {
        let _guard = self.write_lock.lock();

        let mut order = self.storage.get_order(order_number)?;

        if matches!(order.status, OrderStatus::Cancelled | OrderStatus::Refunded) {
            return Err(Error::InvalidTransition(format!(
                "order {} is {:?}; payment cannot be confirmed",
                order_number, order.status
            )));
        }
        match order.payment_status {
            PaymentStatus::Paid => {
                return Ok(PaymentConfirmation {
                    order,
                    already_paid: true,
                    settlement_due: false,
                });
            }
            PaymentStatus::Refunded => {
                return Err(Error::InvalidTransition(format!(
                    "payment for order {} was already refunded",
                    order_number
                )));
            }
            PaymentStatus::Pending | PaymentStatus::Failed => {}
        }

        order.payment_status = PaymentStatus::Paid;
        order.gateway_reference = Some(gateway_reference.into());
        order.payment_method = method;
        order.updated_at = Utc::now();

        let settlement_due = order.status == OrderStatus::Delivered;

        self.storage.commit(&[], std::slice::from_ref(&order), &[])?;

        tracing::info!(
            order_number = %order_number,
            method = ?method,
            settlement_due,
            "Payment confirmed"
        );

        Ok(PaymentConfirmation {
            order,
            already_paid: false,
            settlement_due,
        })
    }

    /// Admin override of the payment state
    ///
    /// Legal moves: `Pending -> Paid|Failed`, `Paid -> Refunded`.
    pub fn update_payment_status(
        &self,
        order_number: &str,
        new: PaymentStatus,
        actor: &Actor,
    ) -> Result<StatusChange> {
        if !actor.is_admin() {
            return Err(Error::Forbidden(format!(
                "{} is not an admin",
                actor.user
            )));
        }

        let _guard = self.write_lock.lock();

        let mut order = self.storage.get_order(order_number)?;

        let legal = matches!(
            (order.payment_status, new),
            (PaymentStatus::Pending, PaymentStatus::Paid)
                | (PaymentStatus::Pending, PaymentStatus::Failed)
                | (PaymentStatus::Paid, PaymentStatus::Refunded)
        );
        if !legal {
            return Err(Error::InvalidTransition(format!(
                "payment for {} cannot move {:?} -> {:?}",
                order_number, order.payment_status, new
            )));
        }

        order.payment_status = new;
        order.updated_at = Utc::now();

        let settlement_due = new == PaymentStatus::Paid && order.status == OrderStatus::Delivered;

        self.storage.commit(&[], std::slice::from_ref(&order), &[])?;

        tracing::info!(
            order_number = %order_number,
            payment_status = ?new,
            settlement_due,
            "Payment status updated"
        );

        Ok(StatusChange {
            order,
            settlement_due,
        })
    }

    /// Return a shipped, undelivered order to the delivery pool
    ///
    /// Clears the courier and the delivery leg and resets the order to
    /// `Confirmed` so another courier can accept it.
    pub fn make_available_for_delivery(&self, order_number: &str, actor: &Actor) -> Result<Order> {
        let _guard = self.write_lock.lock();

        let mut order = self.storage.get_order(order_number)?;
        self.require_seller_or_admin(actor, &order)?;

        if order.status != OrderStatus::Shipped {
            return Err(Error::InvalidTransition(format!(
                "order {} is {:?}; only shipped orders can be made available",
                order_number, order.status
            )));
        }
        if order.delivery_status == Some(DeliveryStatus::Delivered) {
            return Err(Error::InvalidTransition(format!(
                "order {} was already delivered",
                order_number
            )));
        }

        let mut index_deletes = Vec::new();
        if let Some(courier) = &order.courier {
            index_deletes.push(Storage::courier_index_key(courier, &order)?);
        }

        order.courier = None;
        order.delivery_status = None;
        order.status = OrderStatus::Confirmed;
        order.updated_at = Utc::now();

        self.storage
            .commit(&[], std::slice::from_ref(&order), &index_deletes)?;

        tracing::info!(order_number = %order_number, "Order returned to delivery pool");

        Ok(order)
    }

    // Queries

    /// Get order by number
    pub fn get(&self, order_number: &str) -> Result<Order> {
        self.storage.get_order(order_number)
    }

    /// A buyer's orders, newest first
    pub fn list_for_buyer(&self, buyer: &UserId, page: Page) -> Result<Vec<Order>> {
        let numbers = self.storage.orders_for_buyer(buyer)?;
        self.load_page(numbers, page)
    }

    /// A seller's orders, newest first
    pub fn list_for_seller(&self, seller: &UserId, page: Page) -> Result<Vec<Order>> {
        let numbers = self.storage.orders_for_seller(seller)?;
        self.load_page(numbers, page)
    }

    /// A courier's orders, newest first
    pub fn list_for_courier(&self, courier: &UserId, page: Page) -> Result<Vec<Order>> {
        let numbers = self.storage.orders_for_courier(courier)?;
        self.load_page(numbers, page)
    }

    // Internal helpers

    fn load_page(&self, numbers: Vec<String>, page: Page) -> Result<Vec<Order>> {
        let mut orders = Vec::new();
        for number in numbers.into_iter().rev().skip(page.skip).take(page.limit) {
            orders.push(self.storage.get_order(&number)?);
        }
        Ok(orders)
    }

    fn require_seller_or_admin(&self, actor: &Actor, order: &Order) -> Result<()> {
        let allowed =
            actor.is_admin() || (actor.role == Role::Seller && actor.user == order.seller);
        if !allowed {
            return Err(Error::Forbidden(format!(
                "{} may not manage order {}",
                actor.user, order.order_number
            )));
        }
        Ok(())
    }

    /// Put back exactly the stock decremented at creation
    fn restore_stock(&self, order: &Order) -> Result<Vec<Product>> {
        let now = Utc::now();
        let mut products = Vec::with_capacity(order.items.len());
        for item in &order.items {
            let mut product = self.storage.get_product(item.product_id)?;
            product.stock += item.quantity;
            product.sold_count = product.sold_count.saturating_sub(u64::from(item.quantity));
            product.updated_at = now;
            products.push(product);
        }
        Ok(products)
    }

    fn unused_order_number(&self) -> Result<String> {
        // Collisions are vanishingly rare; a handful of retries is plenty
        for _ in 0..5 {
            let candidate = self.generate_order_number();
            if !self.storage.order_exists(&candidate)? {
                return Ok(candidate);
            }
        }
        Err(Error::Storage(
            "could not allocate a unique order number".to_string(),
        ))
    }

    fn generate_order_number(&self) -> String {
        let date = Utc::now().format("%Y%m%d");
        let suffix: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(6)
            .map(char::from)
            .collect::<String>()
            .to_ascii_uppercase();
        format!("{}-{}-{}", self.config.order_prefix, date, suffix)
    }
}

/// Cash on delivery completes when the parcel is handed over
fn complete_cod_payment(order: &mut Order) {
    if order.payment_method == PaymentMethod::CashOnDelivery
        && order.payment_status == PaymentStatus::Pending
    {
        order.payment_status = PaymentStatus::Paid;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Address, OrderLine};
    use rust_decimal_macros::dec;
    use tempfile::TempDir;
    use uuid::Uuid;

    fn setup() -> (Orders, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.data_dir = temp_dir.path().to_path_buf();
        let orders = Orders::open(config).unwrap();
        (orders, temp_dir)
    }

    fn seed_product(orders: &Orders, seller: &str, price: Decimal, stock: u32) -> Product {
        orders
            .put_product(Product::new(
                UserId::new(seller),
                "Masala Chai 250g",
                price,
                stock,
            ))
            .unwrap()
    }

    fn test_address() -> Address {
        Address {
            line1: "14 MG Road".to_string(),
            line2: None,
            city: "Bengaluru".to_string(),
            state: "Karnataka".to_string(),
            postal_code: "560001".to_string(),
            country: "IN".to_string(),
        }
    }

    fn order_request(product: &Product, quantity: u32) -> CreateOrderRequest {
        CreateOrderRequest {
            buyer: UserId::new("buyer-1"),
            seller: product.seller.clone(),
            items: vec![OrderLine {
                product_id: product.product_id,
                quantity,
            }],
            shipping_address: test_address(),
            payment_method: PaymentMethod::CashOnDelivery,
            shipping_fee: dec!(50),
            tax: dec!(0),
            discount: dec!(0),
        }
    }

    /// Create -> confirm -> accept -> deliver, for settlement-path tests
    fn delivered_order(orders: &Orders, product: &Product) -> Order {
        let order = orders.create_order(order_request(product, 1)).unwrap();
        let seller = Actor::seller(product.seller.as_str());
        orders
            .transition_status(&order.order_number, OrderStatus::Confirmed, &seller, None)
            .unwrap();
        let courier = Actor::courier("courier-1");
        orders.accept_delivery(&order.order_number, &courier).unwrap();
        orders
            .update_delivery_status(&order.order_number, &courier, DeliveryStatus::PickedUp)
            .unwrap();
        orders
            .update_delivery_status(&order.order_number, &courier, DeliveryStatus::OutForDelivery)
            .unwrap();
        orders
            .update_delivery_status(&order.order_number, &courier, DeliveryStatus::Delivered)
            .unwrap()
            .order
    }

    #[test]
    fn test_create_order_decrements_stock() {
        let (orders, _temp) = setup();
        let product = seed_product(&orders, "seller-1", dec!(100), 10);

        let order = orders.create_order(order_request(&product, 3)).unwrap();

        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.payment_status, PaymentStatus::Pending);
        assert_eq!(order.items_subtotal, dec!(300));
        assert_eq!(order.total_amount, dec!(350)); // + 50 shipping
        assert_eq!(order.items[0].unit_price, dec!(100));

        let updated = orders.get_product(product.product_id).unwrap();
        assert_eq!(updated.stock, 7);
        assert_eq!(updated.sold_count, 3);
    }

    #[test]
    fn test_create_order_out_of_stock_leaves_no_mutation() {
        let (orders, _temp) = setup();
        let product = seed_product(&orders, "seller-1", dec!(100), 2);

        let err = orders.create_order(order_request(&product, 3)).unwrap_err();
        match err {
            Error::OutOfStock {
                requested,
                available,
                ..
            } => {
                assert_eq!(requested, 3);
                assert_eq!(available, 2);
            }
            other => panic!("unexpected error: {other}"),
        }

        let untouched = orders.get_product(product.product_id).unwrap();
        assert_eq!(untouched.stock, 2);
        assert_eq!(untouched.sold_count, 0);
    }

    #[test]
    fn test_create_order_unsellable_product() {
        let (orders, _temp) = setup();
        let mut product = Product::new(UserId::new("seller-1"), "Retired Item", dec!(100), 5);
        product.sellable = false;
        let product = orders.put_product(product).unwrap();

        let err = orders.create_order(order_request(&product, 1)).unwrap_err();
        assert!(matches!(err, Error::ProductUnavailable(_)));
    }

    #[test]
    fn test_create_order_validation() {
        let (orders, _temp) = setup();
        let product = seed_product(&orders, "seller-1", dec!(100), 5);

        // Empty items
        let mut request = order_request(&product, 1);
        request.items.clear();
        assert!(matches!(
            orders.create_order(request),
            Err(Error::Validation(_))
        ));

        // Zero quantity
        let err = orders.create_order(order_request(&product, 0)).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));

        // Duplicate line
        let mut request = order_request(&product, 1);
        request.items.push(OrderLine {
            product_id: product.product_id,
            quantity: 1,
        });
        assert!(matches!(
            orders.create_order(request),
            Err(Error::Validation(_))
        ));

        // Item from a different seller
        let mut request = order_request(&product, 1);
        request.seller = UserId::new("seller-2");
        assert!(matches!(
            orders.create_order(request),
            Err(Error::Validation(_))
        ));

        // Unknown product
        let mut request = order_request(&product, 1);
        request.items[0].product_id = Uuid::now_v7();
        assert!(matches!(
            orders.create_order(request),
            Err(Error::ProductNotFound(_))
        ));
    }

    #[test]
    fn test_transition_guards() {
        let (orders, _temp) = setup();
        let product = seed_product(&orders, "seller-1", dec!(100), 5);
        let order = orders.create_order(order_request(&product, 1)).unwrap();

        // Buyer cannot drive the seller state machine
        let buyer = Actor::buyer("buyer-1");
        assert!(matches!(
            orders.transition_status(&order.order_number, OrderStatus::Confirmed, &buyer, None),
            Err(Error::Forbidden(_))
        ));

        // Another seller cannot either
        let other_seller = Actor::seller("seller-2");
        assert!(matches!(
            orders.transition_status(
                &order.order_number,
                OrderStatus::Confirmed,
                &other_seller,
                None
            ),
            Err(Error::Forbidden(_))
        ));

        // Skipping forward is legal
        let seller = Actor::seller("seller-1");
        let change = orders
            .transition_status(&order.order_number, OrderStatus::Shipped, &seller, None)
            .unwrap();
        assert_eq!(change.order.status, OrderStatus::Shipped);
        assert!(!change.settlement_due);

        // Backward is not
        assert!(matches!(
            orders.transition_status(&order.order_number, OrderStatus::Confirmed, &seller, None),
            Err(Error::InvalidTransition(_))
        ));
    }

    #[test]
    fn test_cancel_restores_stock_exactly() {
        let (orders, _temp) = setup();
        let product = seed_product(&orders, "seller-1", dec!(100), 10);
        let order = orders.create_order(order_request(&product, 4)).unwrap();
        assert_eq!(orders.get_product(product.product_id).unwrap().stock, 6);

        let admin = Actor::admin("admin-1");
        let change = orders
            .transition_status(
                &order.order_number,
                OrderStatus::Cancelled,
                &admin,
                Some("buyer changed their mind".to_string()),
            )
            .unwrap();

        assert_eq!(change.order.status, OrderStatus::Cancelled);
        assert!(change.order.cancelled_at.is_some());
        assert_eq!(
            change.order.cancellation_reason.as_deref(),
            Some("buyer changed their mind")
        );

        let restored = orders.get_product(product.product_id).unwrap();
        assert_eq!(restored.stock, 10);
        assert_eq!(restored.sold_count, 0);

        // Terminal: a second cancel is rejected
        assert!(matches!(
            orders.transition_status(&order.order_number, OrderStatus::Cancelled, &admin, None),
            Err(Error::InvalidTransition(_))
        ));
    }

    #[test]
    fn test_seller_delivery_completes_cod() {
        let (orders, _temp) = setup();
        let product = seed_product(&orders, "seller-1", dec!(100), 5);
        let order = orders.create_order(order_request(&product, 1)).unwrap();

        let seller = Actor::seller("seller-1");
        let change = orders
            .transition_status(&order.order_number, OrderStatus::Delivered, &seller, None)
            .unwrap();

        assert_eq!(change.order.status, OrderStatus::Delivered);
        assert!(change.order.delivered_at.is_some());
        assert_eq!(change.order.payment_status, PaymentStatus::Paid);
        assert!(change.settlement_due);
    }

    #[test]
    fn test_refund_requires_paid() {
        let (orders, _temp) = setup();
        let product = seed_product(&orders, "seller-1", dec!(100), 5);
        let order = orders.create_order(order_request(&product, 1)).unwrap();

        let admin = Actor::admin("admin-1");
        assert!(matches!(
            orders.transition_status(&order.order_number, OrderStatus::Refunded, &admin, None),
            Err(Error::InvalidTransition(_))
        ));

        orders
            .confirm_payment(&order.order_number, "upi-ref-1", PaymentMethod::Upi)
            .unwrap();

        let change = orders
            .transition_status(&order.order_number, OrderStatus::Refunded, &admin, None)
            .unwrap();
        assert_eq!(change.order.status, OrderStatus::Refunded);
        assert_eq!(change.order.payment_status, PaymentStatus::Refunded);
        assert!(!change.settlement_due);
    }

    #[test]
    fn test_accept_delivery_first_courier_wins() {
        let (orders, _temp) = setup();
        let product = seed_product(&orders, "seller-1", dec!(100), 5);
        let order = orders.create_order(order_request(&product, 1)).unwrap();
        let seller = Actor::seller("seller-1");

        // Only confirmed orders can be accepted
        let courier_a = Actor::courier("courier-a");
        assert!(matches!(
            orders.accept_delivery(&order.order_number, &courier_a),
            Err(Error::InvalidTransition(_))
        ));

        orders
            .transition_status(&order.order_number, OrderStatus::Confirmed, &seller, None)
            .unwrap();

        let accepted = orders.accept_delivery(&order.order_number, &courier_a).unwrap();
        assert_eq!(accepted.status, OrderStatus::Shipped);
        assert_eq!(accepted.delivery_status, Some(DeliveryStatus::Assigned));
        assert_eq!(accepted.courier, Some(UserId::new("courier-a")));

        // Second courier loses the race
        let courier_b = Actor::courier("courier-b");
        assert!(matches!(
            orders.accept_delivery(&order.order_number, &courier_b),
            Err(Error::AlreadyAssigned(_))
        ));

        // Non-couriers cannot accept at all
        assert!(matches!(
            orders.accept_delivery(&order.order_number, &seller),
            Err(Error::Forbidden(_))
        ));
    }

    #[test]
    fn test_delivery_updates_guarded_by_courier() {
        let (orders, _temp) = setup();
        let product = seed_product(&orders, "seller-1", dec!(100), 5);
        let order = orders.create_order(order_request(&product, 1)).unwrap();
        let seller = Actor::seller("seller-1");
        orders
            .transition_status(&order.order_number, OrderStatus::Confirmed, &seller, None)
            .unwrap();

        let courier_a = Actor::courier("courier-a");
        orders.accept_delivery(&order.order_number, &courier_a).unwrap();

        // A different courier cannot update the leg
        let courier_b = Actor::courier("courier-b");
        assert!(matches!(
            orders.update_delivery_status(&order.order_number, &courier_b, DeliveryStatus::PickedUp),
            Err(Error::Forbidden(_))
        ));

        // The leg cannot skip steps
        assert!(matches!(
            orders.update_delivery_status(
                &order.order_number,
                &courier_a,
                DeliveryStatus::Delivered
            ),
            Err(Error::InvalidTransition(_))
        ));

        let change = orders
            .update_delivery_status(&order.order_number, &courier_a, DeliveryStatus::PickedUp)
            .unwrap();
        assert_eq!(change.order.delivery_status, Some(DeliveryStatus::PickedUp));
        assert!(!change.settlement_due);
    }

    #[test]
    fn test_courier_delivery_completes_order() {
        let (orders, _temp) = setup();
        let product = seed_product(&orders, "seller-1", dec!(100), 5);

        let order = delivered_order(&orders, &product);
        assert_eq!(order.status, OrderStatus::Delivered);
        assert_eq!(order.delivery_status, Some(DeliveryStatus::Delivered));
        assert!(order.delivered_at.is_some());
        // COD collected on the doorstep
        assert_eq!(order.payment_status, PaymentStatus::Paid);
    }

    #[test]
    fn test_delivery_failure_cancels_and_restocks() {
        let (orders, _temp) = setup();
        let product = seed_product(&orders, "seller-1", dec!(100), 5);
        let order = orders.create_order(order_request(&product, 2)).unwrap();
        let seller = Actor::seller("seller-1");
        orders
            .transition_status(&order.order_number, OrderStatus::Confirmed, &seller, None)
            .unwrap();
        let courier = Actor::courier("courier-1");
        orders.accept_delivery(&order.order_number, &courier).unwrap();
        orders
            .update_delivery_status(&order.order_number, &courier, DeliveryStatus::PickedUp)
            .unwrap();

        let change = orders
            .update_delivery_status(&order.order_number, &courier, DeliveryStatus::Failed)
            .unwrap();

        assert_eq!(change.order.status, OrderStatus::Cancelled);
        assert!(!change.settlement_due);
        // Payment stays pending; nothing was collected
        assert_eq!(change.order.payment_status, PaymentStatus::Pending);

        let restored = orders.get_product(product.product_id).unwrap();
        assert_eq!(restored.stock, 5);
    }

    #[test]
    fn test_confirm_payment_idempotent() {
        let (orders, _temp) = setup();
        let product = seed_product(&orders, "seller-1", dec!(100), 5);
        let order = orders.create_order(order_request(&product, 1)).unwrap();

        let confirmation = orders
            .confirm_payment(&order.order_number, "upi-ref-1", PaymentMethod::Upi)
            .unwrap();
        assert!(!confirmation.already_paid);
        assert!(!confirmation.settlement_due); // not delivered yet
        assert_eq!(confirmation.order.payment_status, PaymentStatus::Paid);
        assert_eq!(confirmation.order.gateway_reference.as_deref(), Some("upi-ref-1"));

        // Gateway retries the webhook
        let again = orders
            .confirm_payment(&order.order_number, "upi-ref-1", PaymentMethod::Upi)
            .unwrap();
        assert!(again.already_paid);
        assert!(!again.settlement_due);
        assert_eq!(again.order.gateway_reference.as_deref(), Some("upi-ref-1"));
    }

    #[test]
    fn test_confirm_payment_after_delivery_flags_settlement() {
        let (orders, _temp) = setup();
        let product = seed_product(&orders, "seller-1", dec!(100), 5);
        let order = orders.create_order(order_request(&product, 1)).unwrap();
        let seller = Actor::seller("seller-1");

        // Deliver an online-payment order before the gateway confirms
        let mut request = order_request(&product, 1);
        request.payment_method = PaymentMethod::Upi;
        let order2 = orders.create_order(request).unwrap();
        orders
            .transition_status(&order2.order_number, OrderStatus::Delivered, &seller, None)
            .unwrap();

        let confirmation = orders
            .confirm_payment(&order2.order_number, "upi-ref-2", PaymentMethod::Upi)
            .unwrap();
        assert!(confirmation.settlement_due);

        // Cancelled orders reject confirmation
        let admin = Actor::admin("admin-1");
        orders
            .transition_status(&order.order_number, OrderStatus::Cancelled, &admin, None)
            .unwrap();
        assert!(matches!(
            orders.confirm_payment(&order.order_number, "upi-ref-3", PaymentMethod::Upi),
            Err(Error::InvalidTransition(_))
        ));
    }

    #[test]
    fn test_update_payment_status_matrix() {
        let (orders, _temp) = setup();
        let product = seed_product(&orders, "seller-1", dec!(100), 5);
        let order = orders.create_order(order_request(&product, 1)).unwrap();

        let seller = Actor::seller("seller-1");
        let admin = Actor::admin("admin-1");

        // Admin only
        assert!(matches!(
            orders.update_payment_status(&order.order_number, PaymentStatus::Paid, &seller),
            Err(Error::Forbidden(_))
        ));

        // Pending -> Refunded is illegal
        assert!(matches!(
            orders.update_payment_status(&order.order_number, PaymentStatus::Refunded, &admin),
            Err(Error::InvalidTransition(_))
        ));

        let change = orders
            .update_payment_status(&order.order_number, PaymentStatus::Paid, &admin)
            .unwrap();
        assert_eq!(change.order.payment_status, PaymentStatus::Paid);

        let change = orders
            .update_payment_status(&order.order_number, PaymentStatus::Refunded, &admin)
            .unwrap();
        assert_eq!(change.order.payment_status, PaymentStatus::Refunded);
    }

    #[test]
    fn test_make_available_for_delivery() {
        let (orders, _temp) = setup();
        let product = seed_product(&orders, "seller-1", dec!(100), 5);
        let order = orders.create_order(order_request(&product, 1)).unwrap();
        let seller = Actor::seller("seller-1");

        // Only shipped orders can go back to the pool
        assert!(matches!(
            orders.make_available_for_delivery(&order.order_number, &seller),
            Err(Error::InvalidTransition(_))
        ));

        orders
            .transition_status(&order.order_number, OrderStatus::Confirmed, &seller, None)
            .unwrap();
        let courier_a = Actor::courier("courier-a");
        orders.accept_delivery(&order.order_number, &courier_a).unwrap();

        let released = orders
            .make_available_for_delivery(&order.order_number, &seller)
            .unwrap();
        assert_eq!(released.status, OrderStatus::Confirmed);
        assert_eq!(released.courier, None);
        assert_eq!(released.delivery_status, None);

        // The first courier no longer sees it
        let listed = orders
            .list_for_courier(&UserId::new("courier-a"), Page::default())
            .unwrap();
        assert!(listed.is_empty());

        // Another courier can now take it
        let courier_b = Actor::courier("courier-b");
        let reassigned = orders.accept_delivery(&order.order_number, &courier_b).unwrap();
        assert_eq!(reassigned.courier, Some(UserId::new("courier-b")));
    }

    #[test]
    fn test_listings_newest_first() {
        let (orders, _temp) = setup();
        let product = seed_product(&orders, "seller-1", dec!(100), 50);

        let mut numbers = Vec::new();
        for _ in 0..3 {
            // Distinct creation instants keep the index order deterministic
            std::thread::sleep(std::time::Duration::from_millis(2));
            let order = orders.create_order(order_request(&product, 1)).unwrap();
            numbers.push(order.order_number);
        }

        let listed = orders
            .list_for_buyer(&UserId::new("buyer-1"), Page::new(0, 2))
            .unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].order_number, numbers[2]);
        assert_eq!(listed[1].order_number, numbers[1]);

        let rest = orders
            .list_for_buyer(&UserId::new("buyer-1"), Page::new(2, 2))
            .unwrap();
        assert_eq!(rest.len(), 1);
        assert_eq!(rest[0].order_number, numbers[0]);

        let seller_view = orders
            .list_for_seller(&UserId::new("seller-1"), Page::default())
            .unwrap();
        assert_eq!(seller_view.len(), 3);
    }
}
