use std::collections::HashMap;

use cucumber::World;
use log::*;
use storefront_engine::{
    db_types::{Order, Product},
    events::{EventProducer, EventProducers, OrderAnnulledEvent, OrderPaidEvent},
    test_utils::{
        prepare_env::{create_database, random_db_path, run_migrations},
        TestGateway,
    },
    OrderFlowApi,
    OrderFlowError,
    SqliteDatabase,
};
use tokio::sync::mpsc;

#[derive(Default, Debug, World)]
pub struct StorefrontWorld {
    pub system: Option<StorefrontSystem>,
}

#[derive(Debug)]
pub struct StorefrontSystem {
    pub db_path: String,
    pub api: OrderFlowApi<SqliteDatabase, TestGateway>,
    pub gateway: TestGateway,
    pub products: HashMap<String, Product>,
    pub orders: HashMap<String, Order>,
    pub last_error: Option<OrderFlowError>,
    pub paid_events: mpsc::Receiver<OrderPaidEvent>,
    pub annulled_events: mpsc::Receiver<OrderAnnulledEvent>,
    pub paid_count: usize,
    pub annulled_count: usize,
}

impl StorefrontWorld {
    pub fn system(&mut self) -> &mut StorefrontSystem {
        self.system.as_mut().expect("Storefront not initialised")
    }

    pub fn api(&self) -> &OrderFlowApi<SqliteDatabase, TestGateway> {
        &self.system.as_ref().expect("Storefront not initialised").api
    }
}

impl StorefrontSystem {
    pub async fn new() -> Self {
        let url = prepare_test_env().await;
        let db = SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating connection to database");
        debug!("Created database: {url}");
        let gateway = TestGateway::new();
        let (paid_tx, paid_events) = mpsc::channel(64);
        let (annulled_tx, annulled_events) = mpsc::channel(64);
        let producers = EventProducers {
            order_paid_producer: vec![EventProducer::new(paid_tx)],
            order_annulled_producer: vec![EventProducer::new(annulled_tx)],
            ..Default::default()
        };
        let api = OrderFlowApi::new(db, gateway.clone(), producers);
        Self {
            db_path: url,
            api,
            gateway,
            products: HashMap::new(),
            orders: HashMap::new(),
            last_error: None,
            paid_events,
            annulled_events,
            paid_count: 0,
            annulled_count: 0,
        }
    }

    pub fn product(&self, name: &str) -> &Product {
        self.products.get(name).unwrap_or_else(|| panic!("No product called {name}"))
    }

    pub fn order(&self, alias: &str) -> &Order {
        self.orders.get(alias).unwrap_or_else(|| panic!("No order called {alias}"))
    }

    /// Moves any newly published events into the running counts.
    pub fn collect_events(&mut self) {
        while self.paid_events.try_recv().is_ok() {
            self.paid_count += 1;
        }
        while self.annulled_events.try_recv().is_ok() {
            self.annulled_count += 1;
        }
    }
}

pub async fn prepare_test_env() -> String {
    let path = random_db_path();
    create_database(&path).await;
    run_migrations(&path).await;
    path
}
