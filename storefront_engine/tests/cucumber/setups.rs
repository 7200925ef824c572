use cucumber::given;
use storefront_common::Paise;
use storefront_engine::{db_types::NewProduct, InventoryApi};

use crate::cucumber::{storefront_world::StorefrontSystem, StorefrontWorld};

#[given("a fresh install")]
async fn fresh_database(world: &mut StorefrontWorld) {
    let system = StorefrontSystem::new().await;
    world.system = Some(system);
}

#[given(expr = "a product {string} priced at {int} rupees with {int} in stock")]
async fn seed_product(world: &mut StorefrontWorld, name: String, rupees: i64, stock: i64) {
    let system = world.system();
    let inventory = InventoryApi::new(system.api.db().clone());
    let product = inventory
        .create_product(NewProduct::new(name.clone(), Paise::from_rupees(rupees), stock))
        .await
        .expect("Error creating product");
    system.products.insert(name, product);
}
