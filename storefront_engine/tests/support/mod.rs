#![allow(dead_code)]
use chrono::{Duration, Utc};
use log::*;
use sqlx::{migrate::MigrateDatabase, Sqlite};
use storefront_common::Paise;
use storefront_engine::{
    db_types::{NewCustomer, NewOrder, NewProduct, Order, OrderItem, PaymentMethod, Product, ShippingAddress, StockDirection},
    events::{EventProducer, EventProducers, OrderAnnulledEvent, OrderPaidEvent, OrderPlacedEvent},
    order_objects::{CartItem, CheckoutRequest},
    test_utils::{prepare_env::new_test_db, TestGateway},
    traits::{CustomerManagement, InventoryManagement, OrderManagement, StorefrontDatabase},
    InventoryApi,
    OrderFlowApi,
    SqliteDatabase,
};
use tokio::sync::mpsc;

/// A fresh database, an order flow api wired to a [`TestGateway`], and receivers for every event the api publishes.
pub struct Harness {
    pub api: OrderFlowApi<SqliteDatabase, TestGateway>,
    pub inventory: InventoryApi<SqliteDatabase>,
    pub gateway: TestGateway,
    pub paid: mpsc::Receiver<OrderPaidEvent>,
    pub placed: mpsc::Receiver<OrderPlacedEvent>,
    pub annulled: mpsc::Receiver<OrderAnnulledEvent>,
}

impl Harness {
    pub async fn new() -> Self {
        let db = new_test_db().await;
        let gateway = TestGateway::new();
        let (paid_tx, paid) = mpsc::channel(256);
        let (placed_tx, placed) = mpsc::channel(256);
        let (annulled_tx, annulled) = mpsc::channel(256);
        let producers = EventProducers {
            order_paid_producer: vec![EventProducer::new(paid_tx)],
            order_placed_producer: vec![EventProducer::new(placed_tx)],
            order_annulled_producer: vec![EventProducer::new(annulled_tx)],
        };
        let inventory = InventoryApi::new(db.clone());
        let api = OrderFlowApi::new(db, gateway.clone(), producers).with_order_id_prefix("TEST");
        Self { api, inventory, gateway, paid, placed, annulled }
    }

    pub fn db(&self) -> &SqliteDatabase {
        self.api.db()
    }

    pub async fn seed_product(&self, name: &str, rupees: i64, stock: i64) -> Product {
        self.inventory.create_product(NewProduct::new(name, Paise::from_rupees(rupees), stock)).await.unwrap()
    }

    pub async fn product(&self, id: i64) -> Product {
        self.db().fetch_product(id).await.unwrap().expect("product exists")
    }

    pub async fn stock(&self, id: i64) -> i64 {
        self.product(id).await.stock
    }

    pub async fn order(&self, order: &Order) -> Order {
        self.db().fetch_order_by_id(order.id).await.unwrap().expect("order exists")
    }

    /// Inserts an online order created `minutes_ago`, reserving its stock the way checkout does.
    pub async fn backdated_order(&self, product: &Product, quantity: i64, minutes_ago: i64) -> Order {
        let items = vec![OrderItem::new(product.id, product.name.clone(), product.price, quantity)];
        let order_id = storefront_engine::helpers::generate_order_id("OLD");
        let customer = self
            .db()
            .fetch_or_create_customer(NewCustomer::new("Lakshmi", "lakshmi@example.com", Some("9876543210".into())))
            .await
            .unwrap();
        let order = NewOrder::new(order_id.clone(), &customer, PaymentMethod::Online, items)
            .with_shipping(address())
            .with_gateway_order_id(format!("order_old_{}", order_id.as_str()))
            .with_created_at(Utc::now() - Duration::minutes(minutes_ago));
        assert!(self.inventory.adjust_stock(&order.stock_items(), StockDirection::Decrease).await.unwrap());
        self.db().insert_order(order).await.unwrap()
    }

    pub async fn tear_down(mut self) {
        let url = self.api.db().url().to_string();
        self.api.db_mut().close().await;
        if let Err(e) = Sqlite::drop_database(&url).await {
            warn!("🚀️ Could not remove test database {url}: {e}");
        }
    }
}

pub fn address() -> ShippingAddress {
    ShippingAddress {
        address: "12 Temple Street".into(),
        city: "Kanchipuram".into(),
        state: "Tamil Nadu".into(),
        pincode: "631501".into(),
    }
}

/// A valid checkout for the given products and quantities, with the correct total.
pub fn checkout(email: &str, lines: &[(&Product, i64)], payment_method: PaymentMethod) -> CheckoutRequest {
    let items = lines.iter().map(|(p, qty)| CartItem { product_id: p.id, quantity: *qty }).collect();
    let total_amount = lines.iter().map(|(p, qty)| p.price * *qty).sum();
    CheckoutRequest {
        customer_name: "Meera Iyer".into(),
        email: email.into(),
        phone: "9876543210".into(),
        shipping_address: address(),
        items,
        total_amount,
        payment_method,
    }
}

/// Number of events waiting in the channel. Events are published before the api call returns, so after an await
/// this is exact.
pub fn drain<E>(rx: &mut mpsc::Receiver<E>) -> usize {
    let mut n = 0;
    while rx.try_recv().is_ok() {
        n += 1;
    }
    n
}
