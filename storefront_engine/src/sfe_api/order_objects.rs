use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use storefront_common::Paise;

use crate::{
    db_types::{Order, OrderId, OrderStatusType, PaymentMethod, PaymentStatus, ShippingAddress, StockItem},
    traits::GatewayOrder,
};

static PINCODE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{6}$").expect("static regex"));
static PHONE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\+?\d{10,15}$").expect("static regex"));
static EMAIL: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("static regex"));

//--------------------------------------      CartItem       ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub product_id: i64,
    pub quantity: i64,
}

impl From<&CartItem> for StockItem {
    fn from(item: &CartItem) -> Self {
        StockItem::new(item.product_id, item.quantity)
    }
}

//--------------------------------------   CheckoutRequest   ---------------------------------------------------------
/// Everything the customer submits at checkout.
///
/// `total_amount` is what the storefront showed the customer. It is checked against catalog prices before anything is
/// reserved, and the order records the catalog prices, not the client's.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutRequest {
    pub customer_name: String,
    pub email: String,
    pub phone: String,
    pub shipping_address: ShippingAddress,
    pub items: Vec<CartItem>,
    pub total_amount: Paise,
    pub payment_method: PaymentMethod,
}

impl CheckoutRequest {
    /// Shape checks that need no catalog access.
    pub fn validate(&self) -> Result<(), String> {
        if self.customer_name.trim().is_empty() {
            return Err("Customer name is required".into());
        }
        if !EMAIL.is_match(self.email.trim()) {
            return Err(format!("'{}' is not a valid email address", self.email));
        }
        if !PHONE.is_match(self.phone.trim()) {
            return Err(format!("'{}' is not a valid phone number", self.phone));
        }
        let addr = &self.shipping_address;
        if addr.address.trim().is_empty() || addr.city.trim().is_empty() || addr.state.trim().is_empty() {
            return Err("A complete shipping address is required".into());
        }
        if !PINCODE.is_match(addr.pincode.trim()) {
            return Err(format!("'{}' is not a valid 6-digit pincode", addr.pincode));
        }
        if self.items.is_empty() {
            return Err("The order must contain at least one item".into());
        }
        if let Some(item) = self.items.iter().find(|i| i.quantity <= 0) {
            return Err(format!("Quantity for product {} must be positive", item.product_id));
        }
        if !self.total_amount.is_positive() {
            return Err("The order total must be positive".into());
        }
        Ok(())
    }

    pub fn stock_items(&self) -> Vec<StockItem> {
        self.items.iter().map(StockItem::from).collect()
    }
}

//--------------------------------------   CheckoutResult    ---------------------------------------------------------
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutResult {
    pub order: Order,
    /// The gateway payment intent the client must complete. `None` for cash-on-delivery orders.
    pub gateway_order: Option<GatewayOrder>,
}

//-------------------------------------- PaymentConfirmation ---------------------------------------------------------
/// The triple the gateway hands the customer's browser after a successful payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentConfirmation {
    pub gateway_order_id: String,
    pub gateway_payment_id: String,
    pub signature: String,
}

//--------------------------------------    OrderChanged     ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderChanged {
    pub old_order: Order,
    pub new_order: Order,
}

impl OrderChanged {
    pub fn new(old_order: Order, new_order: Order) -> Self {
        Self { old_order, new_order }
    }
}

//--------------------------------------    TrackedOrder     ---------------------------------------------------------
/// The public, read-only view of an order. No internal ids, no contact details beyond the name, no address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedOrder {
    pub order_id: OrderId,
    pub order_status: OrderStatusType,
    pub payment_status: PaymentStatus,
    pub customer_name: String,
    pub created_at: DateTime<Utc>,
    pub total_amount: Paise,
    pub items: Vec<TrackedItem>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedItem {
    pub name: String,
    pub quantity: i64,
    pub price: Paise,
}

impl From<Order> for TrackedOrder {
    fn from(order: Order) -> Self {
        let items = order
            .items
            .into_iter()
            .map(|item| TrackedItem { name: item.name, quantity: item.quantity, price: item.price })
            .collect();
        Self {
            order_id: order.order_id,
            order_status: order.order_status,
            payment_status: order.payment_status,
            customer_name: order.customer_name,
            created_at: order.created_at,
            total_amount: order.total_amount,
            items,
        }
    }
}
