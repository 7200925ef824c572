use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use log::error;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use storefront_common::Paise;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[error("Conversion error: {0}")]
pub struct ConversionError(String);

//--------------------------------------        Product        ---------------------------------------------------------
/// The inventory-relevant view of a catalog product.
///
/// `is_active` is maintained by the storage layer: any write that leaves `stock <= 0` flips it to `false`. Restoring
/// stock does not reactivate the product. That is left to catalog administrators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub price: Paise,
    pub stock: i64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: String,
    pub price: Paise,
    pub stock: i64,
}

impl NewProduct {
    pub fn new<S: Into<String>>(name: S, price: Paise, stock: i64) -> Self {
        Self { name: name.into(), price, stock }
    }
}

//--------------------------------------    StockDirection     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StockDirection {
    /// Reserve stock. Conditional on availability.
    Decrease,
    /// Return stock. Never blocked.
    Increase,
}

impl Display for StockDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StockDirection::Decrease => write!(f, "DECREASE"),
            StockDirection::Increase => write!(f, "INCREASE"),
        }
    }
}

/// A single (product, quantity) pair handed to the inventory ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockItem {
    pub product_id: i64,
    pub quantity: i64,
}

impl StockItem {
    pub fn new(product_id: i64, quantity: i64) -> Self {
        Self { product_id, quantity }
    }
}

impl From<&OrderItem> for StockItem {
    fn from(item: &OrderItem) -> Self {
        Self { product_id: item.product_id, quantity: item.quantity }
    }
}

//--------------------------------------        Customer       ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Customer {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCustomer {
    pub name: String,
    /// Always stored lower-cased
    pub email: String,
    pub phone: Option<String>,
}

impl NewCustomer {
    pub fn new<S: Into<String>>(name: S, email: &str, phone: Option<String>) -> Self {
        Self { name: name.into(), email: email.trim().to_lowercase(), phone }
    }
}

//--------------------------------------     PaymentMethod     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    /// Paid through the payment gateway before the order is placed.
    Online,
    /// Legacy cash-on-delivery. Placed immediately, no gateway interaction.
    Cod,
}

impl Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentMethod::Online => write!(f, "ONLINE"),
            PaymentMethod::Cod => write!(f, "COD"),
        }
    }
}

impl FromStr for PaymentMethod {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ONLINE" => Ok(Self::Online),
            "COD" => Ok(Self::Cod),
            s => Err(ConversionError(format!("Invalid payment method: {s}"))),
        }
    }
}

//--------------------------------------     PaymentStatus     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    /// No confirmed payment yet.
    Pending,
    /// Payment captured and verified.
    Paid,
    /// The payment failed, or the order was abandoned before payment.
    Failed,
}

impl Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentStatus::Pending => write!(f, "PENDING"),
            PaymentStatus::Paid => write!(f, "PAID"),
            PaymentStatus::Failed => write!(f, "FAILED"),
        }
    }
}

impl FromStr for PaymentStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(Self::Pending),
            "PAID" => Ok(Self::Paid),
            "FAILED" => Ok(Self::Failed),
            s => Err(ConversionError(format!("Invalid payment status: {s}"))),
        }
    }
}

impl From<String> for PaymentStatus {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_else(|_| {
            error!("Invalid payment status: {value}. But this conversion cannot fail. Defaulting to PENDING");
            PaymentStatus::Pending
        })
    }
}

//--------------------------------------   OrderStatusType     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatusType {
    /// Stock is reserved and a gateway order exists, but the customer has not paid yet.
    AwaitingPayment,
    /// Paid online, or a cash-on-delivery order that has been accepted.
    Placed,
    /// The merchant has accepted the order for fulfilment.
    Confirmed,
    Shipped,
    Delivered,
    /// The reservation has been returned to stock. Terminal for payment purposes.
    Cancelled,
}

impl Display for OrderStatusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderStatusType::AwaitingPayment => write!(f, "AWAITING_PAYMENT"),
            OrderStatusType::Placed => write!(f, "PLACED"),
            OrderStatusType::Confirmed => write!(f, "CONFIRMED"),
            OrderStatusType::Shipped => write!(f, "SHIPPED"),
            OrderStatusType::Delivered => write!(f, "DELIVERED"),
            OrderStatusType::Cancelled => write!(f, "CANCELLED"),
        }
    }
}

impl FromStr for OrderStatusType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "AWAITING_PAYMENT" => Ok(Self::AwaitingPayment),
            "PLACED" => Ok(Self::Placed),
            "CONFIRMED" => Ok(Self::Confirmed),
            "SHIPPED" => Ok(Self::Shipped),
            "DELIVERED" => Ok(Self::Delivered),
            "CANCELLED" => Ok(Self::Cancelled),
            s => Err(ConversionError(format!("Invalid order status: {s}"))),
        }
    }
}

impl From<String> for OrderStatusType {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_else(|_| {
            error!("Invalid order status: {value}. But this conversion cannot fail. Defaulting to AWAITING_PAYMENT");
            OrderStatusType::AwaitingPayment
        })
    }
}

//--------------------------------------        OrderId        ---------------------------------------------------------
/// The human-readable order reference, e.g. `AVIRA-1718000000000-042`. This is the identifier customers see.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct OrderId(pub String);

impl FromStr for OrderId {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

impl From<String> for OrderId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for OrderId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl OrderId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Orders can be addressed by their internal id or by their human-readable order id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderRef {
    Id(i64),
    OrderId(OrderId),
}

impl FromStr for OrderRef {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.parse::<i64>() {
            Ok(id) => Ok(Self::Id(id)),
            Err(_) => Ok(Self::OrderId(OrderId::from(s))),
        }
    }
}

impl From<OrderId> for OrderRef {
    fn from(oid: OrderId) -> Self {
        Self::OrderId(oid)
    }
}

impl Display for OrderRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderRef::Id(id) => write!(f, "(internal id {id})"),
            OrderRef::OrderId(oid) => write!(f, "{oid}"),
        }
    }
}

//--------------------------------------    ShippingAddress    ---------------------------------------------------------
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingAddress {
    pub address: String,
    pub city: String,
    pub state: String,
    pub pincode: String,
}

//--------------------------------------       OrderItem       ---------------------------------------------------------
/// A line item. Name and price are copied from the catalog when the order is created and never change afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct OrderItem {
    pub product_id: i64,
    pub name: String,
    pub price: Paise,
    pub quantity: i64,
}

impl OrderItem {
    pub fn new<S: Into<String>>(product_id: i64, name: S, price: Paise, quantity: i64) -> Self {
        Self { product_id, name: name.into(), price, quantity }
    }

    pub fn line_total(&self) -> Paise {
        self.price * self.quantity
    }

    /// `None` if the line total does not fit in an `i64`.
    pub fn checked_line_total(&self) -> Option<Paise> {
        self.price.checked_mul(self.quantity)
    }
}

//--------------------------------------         Order         ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Order {
    pub id: i64,
    pub order_id: OrderId,
    pub customer_id: i64,
    pub customer_name: String,
    pub phone: String,
    pub email: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub pincode: String,
    pub total_amount: Paise,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub order_status: OrderStatusType,
    pub gateway_order_id: Option<String>,
    pub gateway_payment_id: Option<String>,
    pub gateway_signature: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[sqlx(skip)]
    pub items: Vec<OrderItem>,
}

impl Order {
    pub fn stock_items(&self) -> Vec<StockItem> {
        self.items.iter().map(StockItem::from).collect()
    }

    pub fn is_paid(&self) -> bool {
        self.payment_status == PaymentStatus::Paid
    }

    pub fn is_cancelled(&self) -> bool {
        self.order_status == OrderStatusType::Cancelled
    }
}

//--------------------------------------        NewOrder       ---------------------------------------------------------
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub order_id: OrderId,
    pub customer_id: i64,
    pub customer_name: String,
    pub phone: String,
    pub email: String,
    pub shipping: ShippingAddress,
    pub items: Vec<OrderItem>,
    pub total_amount: Paise,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub order_status: OrderStatusType,
    pub gateway_order_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl NewOrder {
    /// Creates a new order record for the given customer. The initial status depends on the payment method:
    /// online orders wait for payment, cash-on-delivery orders are placed immediately.
    pub fn new(order_id: OrderId, customer: &Customer, payment_method: PaymentMethod, items: Vec<OrderItem>) -> Self {
        let total_amount = items.iter().map(OrderItem::line_total).sum();
        let order_status = match payment_method {
            PaymentMethod::Online => OrderStatusType::AwaitingPayment,
            PaymentMethod::Cod => OrderStatusType::Placed,
        };
        Self {
            order_id,
            customer_id: customer.id,
            customer_name: customer.name.clone(),
            phone: customer.phone.clone().unwrap_or_default(),
            email: customer.email.clone(),
            shipping: ShippingAddress::default(),
            items,
            total_amount,
            payment_method,
            payment_status: PaymentStatus::Pending,
            order_status,
            gateway_order_id: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_contact<S: Into<String>>(mut self, customer_name: S, phone: S) -> Self {
        self.customer_name = customer_name.into();
        self.phone = phone.into();
        self
    }

    /// The address typed at checkout. Tracking and notifications use this, even when the customer record was matched
    /// by phone and holds a different email.
    pub fn with_email<S: Into<String>>(mut self, email: S) -> Self {
        self.email = email.into();
        self
    }

    pub fn with_shipping(mut self, shipping: ShippingAddress) -> Self {
        self.shipping = shipping;
        self
    }

    pub fn with_gateway_order_id<S: Into<String>>(mut self, gateway_order_id: S) -> Self {
        self.gateway_order_id = Some(gateway_order_id.into());
        self
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    pub fn stock_items(&self) -> Vec<StockItem> {
        self.items.iter().map(StockItem::from).collect()
    }
}
