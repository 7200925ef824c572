use cucumber::{then, when};
use storefront_engine::{
    db_types::{OrderRef, OrderStatusType, PaymentMethod, PaymentStatus},
    order_objects::{CartItem, CheckoutRequest, PaymentConfirmation},
    traits::{InventoryManagement, OrderManagement},
};

use crate::cucumber::StorefrontWorld;

fn payment_method(s: &str) -> PaymentMethod {
    s.parse().unwrap_or_else(|_| panic!("Unknown payment method {s}"))
}

#[when(expr = "{word} checks out {int} x {string} paying {word}")]
async fn check_out(world: &mut StorefrontWorld, alias: String, quantity: i64, name: String, method: String) {
    let system = world.system();
    let product = system.product(&name).clone();
    let request = CheckoutRequest {
        customer_name: alias.clone(),
        email: format!("{}@example.com", alias.to_lowercase()),
        phone: "9876543210".into(),
        shipping_address: storefront_engine::db_types::ShippingAddress {
            address: "1 Silk Road".into(),
            city: "Kanchipuram".into(),
            state: "Tamil Nadu".into(),
            pincode: "631501".into(),
        },
        items: vec![CartItem { product_id: product.id, quantity }],
        total_amount: product.price * quantity,
        payment_method: payment_method(&method),
    };
    match system.api.create_order(request).await {
        Ok(result) => {
            system.orders.insert(alias, result.order);
            system.last_error = None;
        },
        Err(e) => system.last_error = Some(e),
    }
    system.collect_events();
}

#[when(expr = "the gateway confirms {word}'s payment {word} to the browser")]
async fn client_confirms(world: &mut StorefrontWorld, alias: String, payment_id: String) {
    let system = world.system();
    let gateway_order_id = system.order(&alias).gateway_order_id.clone().expect("online order");
    let signature = system.gateway.sign(&gateway_order_id, &payment_id);
    let confirmation = PaymentConfirmation { gateway_order_id, gateway_payment_id: payment_id, signature };
    system.last_error = system.api.verify_payment(confirmation).await.err();
    system.collect_events();
}

#[when(expr = "{word} submits payment {word} with a forged signature")]
async fn forged_confirmation(world: &mut StorefrontWorld, alias: String, payment_id: String) {
    let system = world.system();
    let gateway_order_id = system.order(&alias).gateway_order_id.clone().expect("online order");
    let signature = system.gateway.sign("order_forged", &payment_id);
    let confirmation = PaymentConfirmation { gateway_order_id, gateway_payment_id: payment_id, signature };
    system.last_error = system.api.verify_payment(confirmation).await.err();
    system.collect_events();
}

#[when(expr = "the gateway sends a payment captured webhook for {word} with payment {word}")]
async fn webhook_captured(world: &mut StorefrontWorld, alias: String, payment_id: String) {
    let system = world.system();
    let gateway_order_id = system.order(&alias).gateway_order_id.clone().expect("online order");
    system.last_error = system.api.payment_captured(&gateway_order_id, Some(payment_id.as_str())).await.err();
    system.collect_events();
}

#[when(expr = "{word} cancels the order")]
async fn cancel(world: &mut StorefrontWorld, alias: String) {
    let system = world.system();
    let order_ref = OrderRef::Id(system.order(&alias).id);
    system.last_error = system.api.cancel_order(&order_ref).await.err();
    system.collect_events();
}

#[when(expr = "{word} retries the payment")]
async fn retry(world: &mut StorefrontWorld, alias: String) {
    let system = world.system();
    let order_ref = OrderRef::Id(system.order(&alias).id);
    match system.api.retry_payment(&order_ref).await {
        Ok(result) => {
            system.orders.insert(alias, result.order);
            system.last_error = None;
        },
        Err(e) => system.last_error = Some(e),
    }
}

#[then(expr = "{string} has {int} in stock")]
async fn check_stock(world: &mut StorefrontWorld, name: String, stock: i64) {
    let system = world.system();
    let id = system.product(&name).id;
    let product = system.api.db().fetch_product(id).await.unwrap().unwrap();
    assert_eq!(product.stock, stock);
}

#[then(expr = "{string} is {word}")]
async fn check_active(world: &mut StorefrontWorld, name: String, state: String) {
    let system = world.system();
    let id = system.product(&name).id;
    let product = system.api.db().fetch_product(id).await.unwrap().unwrap();
    assert_eq!(product.is_active, state == "active", "product is_active = {}", product.is_active);
}

#[then(expr = "{word}'s order is {word} with payment {word}")]
async fn check_order(world: &mut StorefrontWorld, alias: String, status: String, payment: String) {
    let system = world.system();
    let id = system.order(&alias).id;
    let order = system.api.db().fetch_order_by_id(id).await.unwrap().unwrap();
    assert_eq!(order.order_status, status.parse::<OrderStatusType>().unwrap());
    assert_eq!(order.payment_status, payment.parse::<PaymentStatus>().unwrap());
}

#[then(expr = "the checkout is rejected for {word}")]
async fn check_rejected(world: &mut StorefrontWorld, reason: String) {
    let err = world.system().last_error.clone().expect("an error was expected");
    let name = format!("{err:?}");
    assert!(name.starts_with(&reason), "expected {reason}, got {name}");
}

#[then(expr = "the request fails with {word}")]
async fn check_failure(world: &mut StorefrontWorld, reason: String) {
    check_rejected(world, reason).await;
}

#[then(expr = "there are {int} orders")]
async fn count_orders(world: &mut StorefrontWorld, n: usize) {
    let orders = world.api().db().fetch_orders().await.unwrap();
    assert_eq!(orders.len(), n);
}

#[then(expr = "{int} paid notification(s) was/were sent")]
async fn count_paid(world: &mut StorefrontWorld, n: usize) {
    let system = world.system();
    system.collect_events();
    assert_eq!(system.paid_count, n);
}

#[then(expr = "{int} annulled notification(s) was/were sent")]
async fn count_annulled(world: &mut StorefrontWorld, n: usize) {
    let system = world.system();
    system.collect_events();
    assert_eq!(system.annulled_count, n);
}
