use std::{collections::HashMap, fmt::Debug};

use chrono::Duration;
use log::*;
use storefront_common::{Paise, INR_CURRENCY_CODE};

use crate::{
    db_types::{
        NewCustomer,
        NewOrder,
        Order,
        OrderItem,
        OrderRef,
        OrderStatusType,
        PaymentMethod,
        PaymentStatus,
        StockDirection,
        StockItem,
    },
    events::{EventProducers, OrderAnnulledEvent, OrderPaidEvent, OrderPlacedEvent},
    helpers::{generate_order_id, DEFAULT_ORDER_ID_PREFIX},
    sfe_api::{
        errors::OrderFlowError,
        inventory_api::InventoryApi,
        order_objects::{CheckoutRequest, CheckoutResult, OrderChanged, PaymentConfirmation},
    },
    traits::{ExpiryResult, GatewayOrderRequest, OrderGuard, OrderUpdate, PaymentGateway, StorefrontDatabase},
};

/// `OrderFlowApi` drives every order through its lifecycle: checkout, payment confirmation over both the client and
/// webhook channels, cancellation, payment retry, manual status changes and the expiry sweep.
///
/// Every status change is a guarded transition ([`crate::traits::OrderManagement::transition_order`]). Whoever wins
/// the transition owns its side effects (stock movement and hook notifications). A losing writer sees `None` and
/// treats it as "somebody else already did this".
pub struct OrderFlowApi<B, G> {
    db: B,
    gateway: G,
    producers: EventProducers,
    order_id_prefix: String,
    currency: String,
}

impl<B, G> Debug for OrderFlowApi<B, G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderFlowApi ({})", self.order_id_prefix)
    }
}

impl<B: Clone, G: Clone> Clone for OrderFlowApi<B, G> {
    fn clone(&self) -> Self {
        Self {
            db: self.db.clone(),
            gateway: self.gateway.clone(),
            producers: self.producers.clone(),
            order_id_prefix: self.order_id_prefix.clone(),
            currency: self.currency.clone(),
        }
    }
}

impl<B, G> OrderFlowApi<B, G> {
    pub fn new(db: B, gateway: G, producers: EventProducers) -> Self {
        Self {
            db,
            gateway,
            producers,
            order_id_prefix: DEFAULT_ORDER_ID_PREFIX.to_string(),
            currency: INR_CURRENCY_CODE.to_string(),
        }
    }

    pub fn with_order_id_prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.order_id_prefix = prefix.into();
        self
    }

    pub fn with_currency<S: Into<String>>(mut self, currency: S) -> Self {
        self.currency = currency.into();
        self
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    pub fn db_mut(&mut self) -> &mut B {
        &mut self.db
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }
}

impl<B, G> OrderFlowApi<B, G>
where
    B: StorefrontDatabase,
    G: PaymentGateway,
{
    fn inventory(&self) -> InventoryApi<B> {
        InventoryApi::new(self.db.clone())
    }

    /// Turns a checkout request into an order.
    ///
    /// Stock is reserved before the customer is resolved and before the gateway is contacted. Any failure after the
    /// reservation hands the stock back before the error is returned, so a rejected checkout never leaves stock
    /// reserved and never leaves an order record behind.
    pub async fn create_order(&self, request: CheckoutRequest) -> Result<CheckoutResult, OrderFlowError> {
        request.validate().map_err(OrderFlowError::ValidationError)?;
        let items = self.price_cart(&request).await?;
        let stock_items = items.iter().map(StockItem::from).collect::<Vec<_>>();

        let inventory = self.inventory();
        if !inventory.adjust_stock(&stock_items, StockDirection::Decrease).await? {
            info!("🔄️📦️ Checkout for {} rejected. Insufficient stock.", request.email);
            return Err(OrderFlowError::InsufficientStock);
        }
        match self.persist_new_order(&request, items).await {
            Ok(result) => {
                info!(
                    "🔄️📦️ Order {} created for {} ({}, {})",
                    result.order.order_id, result.order.email, result.order.payment_method, result.order.total_amount
                );
                if result.order.payment_method == PaymentMethod::Cod {
                    self.call_order_placed_hook(&result.order).await;
                }
                Ok(result)
            },
            Err(e) => {
                warn!("🔄️📦️ Checkout for {} failed after stock was reserved: {e}. Releasing the reservation.", request.email);
                self.release_stock(&stock_items).await;
                Err(e)
            },
        }
    }

    /// Looks up every cart item in the catalog and checks the client total against catalog prices. Line items carry a
    /// snapshot of the catalog name and price.
    async fn price_cart(&self, request: &CheckoutRequest) -> Result<Vec<OrderItem>, OrderFlowError> {
        let mut ids = request.items.iter().map(|i| i.product_id).collect::<Vec<_>>();
        ids.sort_unstable();
        ids.dedup();
        let catalog = self.inventory().fetch_products(&ids).await?;
        let catalog = catalog.into_iter().map(|p| (p.id, p)).collect::<HashMap<_, _>>();
        let items = request
            .items
            .iter()
            .map(|item| {
                let product = catalog.get(&item.product_id).ok_or(OrderFlowError::ProductNotFound(item.product_id))?;
                Ok(OrderItem::new(product.id, product.name.clone(), product.price, item.quantity))
            })
            .collect::<Result<Vec<_>, OrderFlowError>>()?;
        let expected = items
            .iter()
            .try_fold(Paise::default(), |total, item| item.checked_line_total().and_then(|line| total.checked_add(line)))
            .ok_or_else(|| OrderFlowError::ValidationError("The order total is too large".into()))?;
        if expected != request.total_amount {
            return Err(OrderFlowError::ValidationError(format!(
                "Order total {} does not match the catalog total {expected}",
                request.total_amount
            )));
        }
        Ok(items)
    }

    /// Everything in checkout that happens while stock is held: customer resolution, the remote gateway order and
    /// the order record itself.
    async fn persist_new_order(
        &self,
        request: &CheckoutRequest,
        items: Vec<OrderItem>,
    ) -> Result<CheckoutResult, OrderFlowError> {
        let new_customer =
            NewCustomer::new(request.customer_name.trim(), request.email.trim(), Some(request.phone.trim().to_string()));
        let customer = self.db.fetch_or_create_customer(new_customer).await?;
        let order_id = generate_order_id(&self.order_id_prefix);
        let mut order = NewOrder::new(order_id.clone(), &customer, request.payment_method, items)
            .with_contact(request.customer_name.trim(), request.phone.trim())
            .with_email(request.email.trim())
            .with_shipping(request.shipping_address.clone());
        let gateway_order = match request.payment_method {
            PaymentMethod::Online => {
                let gw_request = GatewayOrderRequest {
                    amount: order.total_amount,
                    currency: self.currency.clone(),
                    receipt: order_id.as_str().to_string(),
                };
                let gateway_order = self.gateway.create_order(gw_request).await.map_err(|e| {
                    error!("🔄️💳️ Gateway order creation for {order_id} failed: {e}");
                    OrderFlowError::from(e)
                })?;
                debug!("🔄️💳️ Gateway order {} opened for {order_id}", gateway_order.id);
                order = order.with_gateway_order_id(gateway_order.id.clone());
                Some(gateway_order)
            },
            PaymentMethod::Cod => None,
        };
        let order = self.db.insert_order(order).await?;
        Ok(CheckoutResult { order, gateway_order })
    }

    /// Client-channel payment confirmation.
    ///
    /// An order that is already paid is reported as success without looking at the signature. A valid signature
    /// moves the order to PAID/PLACED. An invalid one cancels the order, returns its stock and reports
    /// [`OrderFlowError::InvalidSignature`].
    pub async fn verify_payment(&self, confirmation: PaymentConfirmation) -> Result<Order, OrderFlowError> {
        let PaymentConfirmation { gateway_order_id, gateway_payment_id, signature } = confirmation;
        let order = self
            .db
            .fetch_order_by_gateway_order_id(&gateway_order_id)
            .await?
            .ok_or_else(|| OrderFlowError::OrderNotFound(format!("for gateway order {gateway_order_id}")))?;
        if order.is_paid() {
            debug!("🔄️💳️ Order {} is already paid. Nothing to verify.", order.order_id);
            return Ok(order);
        }
        if self.gateway.verify_payment_signature(&gateway_order_id, &gateway_payment_id, &signature) {
            self.mark_paid(order, Some(&gateway_payment_id), Some(&signature)).await
        } else {
            warn!("🔄️💳️ Invalid payment signature submitted for order {} (payment {gateway_payment_id})", order.order_id);
            self.fail_payment(order, "Invalid payment signature").await?;
            Err(OrderFlowError::InvalidSignature)
        }
    }

    /// Webhook `payment.captured`. Returns `None` if the gateway order does not belong to any order we know of.
    ///
    /// A delivery without a payment id still marks the order as paid, but leaves the stored payment id untouched.
    pub async fn payment_captured(
        &self,
        gateway_order_id: &str,
        gateway_payment_id: Option<&str>,
    ) -> Result<Option<Order>, OrderFlowError> {
        let Some(order) = self.db.fetch_order_by_gateway_order_id(gateway_order_id).await? else {
            // A payment retry replaces the gateway order id, so money can still arrive against the old one
            error!(
                "🔄️💳️ Payment {} was captured for gateway order {gateway_order_id}, which no order refers to. The \
                 payment cannot be matched and a refund may be required.",
                gateway_payment_id.unwrap_or("(no payment id)")
            );
            return Ok(None);
        };
        if order.is_paid() {
            debug!("🔄️💳️ Capture webhook for {} is a duplicate. Order is already paid.", order.order_id);
            return Ok(Some(order));
        }
        self.mark_paid(order, gateway_payment_id, None).await.map(Some)
    }

    /// Webhook `payment.failed`. Orders that are already paid or cancelled are left alone.
    pub async fn payment_failed(&self, gateway_order_id: &str) -> Result<Option<Order>, OrderFlowError> {
        let Some(order) = self.db.fetch_order_by_gateway_order_id(gateway_order_id).await? else {
            warn!("🔄️💳️ Payment failure for unknown gateway order {gateway_order_id}. Ignoring.");
            return Ok(None);
        };
        let result = self.fail_payment(order, "Payment failed at the gateway").await?;
        Ok(Some(result))
    }

    /// Moves an unpaid order to PAID/PLACED. Only the writer that wins the transition publishes the paid event.
    async fn mark_paid(
        &self,
        order: Order,
        gateway_payment_id: Option<&str>,
        signature: Option<&str>,
    ) -> Result<Order, OrderFlowError> {
        let guard = OrderGuard::new()
            .payment_status_not(PaymentStatus::Paid)
            .order_status_not(OrderStatusType::Cancelled);
        let update = OrderUpdate::paid(gateway_payment_id, signature);
        if let Some(paid) = self.db.transition_order(order.id, &guard, &update).await? {
            info!("🔄️💳️ Order {} is paid (payment {})", paid.order_id, gateway_payment_id.unwrap_or("unknown"));
            self.call_order_paid_hook(&paid).await;
            return Ok(paid);
        }
        let current = self.refetch(&order).await?;
        if current.is_paid() {
            debug!("🔄️💳️ Order {} was marked paid by another channel first", current.order_id);
            return Ok(current);
        }
        if current.is_cancelled() {
            return self.mark_cancelled_order_paid(current, gateway_payment_id, signature).await;
        }
        Err(OrderFlowError::invalid_state("mark the order as paid", current.order_status, current.payment_status))
    }

    /// Money arrived for an order that was already cancelled (usually by the expiry sweep). The stock was returned
    /// when it was cancelled, so it has to be reserved again before the order can be revived.
    async fn mark_cancelled_order_paid(
        &self,
        order: Order,
        gateway_payment_id: Option<&str>,
        signature: Option<&str>,
    ) -> Result<Order, OrderFlowError> {
        let items = order.stock_items();
        let inventory = self.inventory();
        let guard = OrderGuard::new()
            .order_status_is(OrderStatusType::Cancelled)
            .payment_status_not(PaymentStatus::Paid);
        if inventory.adjust_stock(&items, StockDirection::Decrease).await? {
            let update = OrderUpdate::paid(gateway_payment_id, signature);
            match self.db.transition_order(order.id, &guard, &update).await? {
                Some(paid) => {
                    info!("🔄️💳️ Cancelled order {} was paid. Stock re-reserved and order revived.", paid.order_id);
                    self.call_order_paid_hook(&paid).await;
                    Ok(paid)
                },
                None => {
                    self.release_stock(&items).await;
                    self.refetch(&order).await
                },
            }
        } else {
            let update = OrderUpdate::new()
                .with_payment_status(PaymentStatus::Paid)
                .with_gateway_payment_id(gateway_payment_id)
                .with_gateway_signature(signature);
            let recorded = self.db.transition_order(order.id, &guard, &update).await?;
            match recorded {
                Some(o) => {
                    error!(
                        "🔄️💳️ Order {} was paid after it was cancelled and the stock is gone. The order stays \
                         cancelled. A refund of {} is required for payment {}.",
                        o.order_id,
                        o.total_amount,
                        gateway_payment_id.unwrap_or("unknown")
                    );
                    Ok(o)
                },
                None => self.refetch(&order).await,
            }
        }
    }

    /// Moves an order that is neither paid nor cancelled to FAILED/CANCELLED and returns its stock. If another writer
    /// got there first, the current record is returned and nothing else happens.
    async fn fail_payment(&self, order: Order, reason: &str) -> Result<Order, OrderFlowError> {
        let guard = OrderGuard::new()
            .payment_status_not(PaymentStatus::Paid)
            .order_status_not(OrderStatusType::Cancelled);
        match self.db.transition_order(order.id, &guard, &OrderUpdate::cancelled()).await? {
            Some(cancelled) => {
                info!("🔄️💳️ Order {} cancelled: {reason}", cancelled.order_id);
                self.release_stock(&cancelled.stock_items()).await;
                self.call_order_annulled_hook(&cancelled, reason).await;
                Ok(cancelled)
            },
            None => {
                debug!("🔄️💳️ Order {} was already paid or cancelled. {reason} ignored.", order.order_id);
                self.refetch(&order).await
            },
        }
    }

    /// Customer-initiated cancellation. Only orders that are awaiting payment, or whose payment is still pending,
    /// can be cancelled.
    pub async fn cancel_order(&self, order_ref: &OrderRef) -> Result<Order, OrderFlowError> {
        let order = self.fetch_order(order_ref).await?;
        let cancellable = order.order_status != OrderStatusType::Cancelled
            && (order.order_status == OrderStatusType::AwaitingPayment || order.payment_status == PaymentStatus::Pending);
        if !cancellable {
            return Err(OrderFlowError::invalid_state("cancel the order", order.order_status, order.payment_status));
        }
        // Pin the state we just checked, so a concurrent payment or sweep makes this a no-op
        let guard = OrderGuard::new()
            .order_status_is(order.order_status)
            .payment_status_is(order.payment_status)
            .order_status_not(OrderStatusType::Cancelled);
        match self.db.transition_order(order.id, &guard, &OrderUpdate::cancelled()).await? {
            Some(cancelled) => {
                info!("🔄️❌️ Order {} cancelled by the customer", cancelled.order_id);
                self.release_stock(&cancelled.stock_items()).await;
                self.call_order_annulled_hook(&cancelled, "Cancelled by the customer").await;
                Ok(cancelled)
            },
            None => {
                let current = self.refetch(&order).await?;
                Err(OrderFlowError::invalid_state("cancel the order", current.order_status, current.payment_status))
            },
        }
    }

    /// Opens a fresh gateway order for an unpaid online order and puts it back into AWAITING_PAYMENT/PENDING. The
    /// original stock reservation stays in force.
    pub async fn retry_payment(&self, order_ref: &OrderRef) -> Result<CheckoutResult, OrderFlowError> {
        let order = self.fetch_order(order_ref).await?;
        if order.is_paid() || order.is_cancelled() || order.payment_method != PaymentMethod::Online {
            return Err(OrderFlowError::invalid_state("retry payment", order.order_status, order.payment_status));
        }
        let request = GatewayOrderRequest {
            amount: order.total_amount,
            currency: self.currency.clone(),
            receipt: order.order_id.as_str().to_string(),
        };
        let gateway_order = self.gateway.create_order(request).await.map_err(|e| {
            error!("🔄️💳️ Gateway order creation for retry of {} failed: {e}", order.order_id);
            OrderFlowError::from(e)
        })?;
        let guard = OrderGuard::new()
            .payment_status_not(PaymentStatus::Paid)
            .order_status_not(OrderStatusType::Cancelled);
        let update = OrderUpdate::new()
            .with_gateway_order_id(gateway_order.id.clone())
            .with_payment_status(PaymentStatus::Pending)
            .with_order_status(OrderStatusType::AwaitingPayment);
        match self.db.transition_order(order.id, &guard, &update).await? {
            Some(order) => {
                info!("🔄️💳️ Payment retry for {} opened gateway order {}", order.order_id, gateway_order.id);
                Ok(CheckoutResult { order, gateway_order: Some(gateway_order) })
            },
            None => {
                let current = self.refetch(&order).await?;
                Err(OrderFlowError::invalid_state("retry payment", current.order_status, current.payment_status))
            },
        }
    }

    /// Manual status change from the admin surface. Payment status is not touched.
    ///
    /// Moving an order into CANCELLED returns its stock. Moving it out of CANCELLED reserves the stock again first; if
    /// the stock is no longer there, the order stays CANCELLED and the change is rejected.
    pub async fn update_order_status(
        &self,
        order_ref: &OrderRef,
        new_status: OrderStatusType,
    ) -> Result<OrderChanged, OrderFlowError> {
        let old_order = self.fetch_order(order_ref).await?;
        let old_status = old_order.order_status;
        if old_status == new_status {
            debug!("🔄️🛠️ Order {} is already {new_status}", old_order.order_id);
            return Ok(OrderChanged::new(old_order.clone(), old_order));
        }
        let guard = OrderGuard::new().order_status_is(old_status);
        let update = OrderUpdate::new().with_order_status(new_status);
        let resuming = old_status == OrderStatusType::Cancelled;
        let items = old_order.stock_items();
        if resuming && !self.inventory().adjust_stock(&items, StockDirection::Decrease).await? {
            warn!("🔄️🛠️ Cannot move order {} out of CANCELLED: insufficient stock", old_order.order_id);
            return Err(OrderFlowError::InvalidStateTransition(format!(
                "Cannot move order {} to {new_status}: insufficient stock. The order remains CANCELLED.",
                old_order.order_id
            )));
        }
        let transitioned = match self.db.transition_order(old_order.id, &guard, &update).await {
            Ok(t) => t,
            Err(e) => {
                if resuming {
                    self.release_stock(&items).await;
                }
                return Err(e.into());
            },
        };
        let Some(new_order) = transitioned else {
            if resuming {
                self.release_stock(&items).await;
            }
            let current = self.refetch(&old_order).await?;
            return Err(OrderFlowError::InvalidStateTransition(format!(
                "Order {} changed to {} while it was being updated",
                current.order_id, current.order_status
            )));
        };
        info!("🔄️🛠️ Order {} status changed from {old_status} to {new_status}", new_order.order_id);
        if new_status == OrderStatusType::Cancelled {
            self.release_stock(&new_order.stock_items()).await;
            self.call_order_annulled_hook(&new_order, "Cancelled by an administrator").await;
        }
        Ok(OrderChanged::new(old_order, new_order))
    }

    /// Cancels every online order that has been waiting for payment for longer than `older_than` and returns its
    /// stock. One bad order never stops the sweep.
    pub async fn expire_stale_orders(&self, older_than: Duration) -> Result<ExpiryResult, OrderFlowError> {
        let candidates = self.db.fetch_stale_orders(older_than).await?;
        let mut result = ExpiryResult::default();
        if candidates.is_empty() {
            trace!("🔄️🕰️ No stale orders to expire");
            return Ok(result);
        }
        debug!("🔄️🕰️ {} stale orders found", candidates.len());
        let guard = OrderGuard::new()
            .order_status_is(OrderStatusType::AwaitingPayment)
            .payment_status_is(PaymentStatus::Pending);
        for order in candidates {
            match self.db.transition_order(order.id, &guard, &OrderUpdate::cancelled()).await {
                Ok(Some(cancelled)) => {
                    self.release_stock(&cancelled.stock_items()).await;
                    self.call_order_annulled_hook(&cancelled, "Payment window expired").await;
                    info!("🔄️🕰️ Order {} expired and its stock restored", cancelled.order_id);
                    result.cancelled.push(cancelled);
                },
                Ok(None) => {
                    debug!("🔄️🕰️ Order {} changed before it could be expired. Skipping.", order.order_id);
                    result.skipped.push(order.order_id);
                },
                Err(e) => {
                    error!("🔄️🕰️ Could not expire order {}: {e}", order.order_id);
                    result.failed.push((order.order_id, e.to_string()));
                },
            }
        }
        Ok(result)
    }

    async fn fetch_order(&self, order_ref: &OrderRef) -> Result<Order, OrderFlowError> {
        let order = match order_ref {
            OrderRef::Id(id) => self.db.fetch_order_by_id(*id).await?,
            OrderRef::OrderId(oid) => self.db.fetch_order_by_order_id(oid).await?,
        };
        order.ok_or_else(|| OrderFlowError::not_found(order_ref))
    }

    async fn refetch(&self, order: &Order) -> Result<Order, OrderFlowError> {
        self.db.fetch_order_by_id(order.id).await?.ok_or_else(|| OrderFlowError::not_found(&OrderRef::Id(order.id)))
    }

    /// Returns stock owned by a transition this call won. Errors are logged, never propagated: the order transition
    /// has already been committed and cannot be undone.
    async fn release_stock(&self, items: &[StockItem]) {
        if items.is_empty() {
            return;
        }
        if let Err(e) = self.inventory().adjust_stock(items, StockDirection::Increase).await {
            error!("🔄️📦️ Stock release was incomplete: {e}. Stock levels need manual review.");
        }
    }

    async fn call_order_paid_hook(&self, order: &Order) {
        for emitter in &self.producers.order_paid_producer {
            debug!("🔄️📬️ Notifying order paid hook subscribers for {}", order.order_id);
            emitter.publish_event(OrderPaidEvent::new(order.clone())).await;
        }
    }

    async fn call_order_placed_hook(&self, order: &Order) {
        for emitter in &self.producers.order_placed_producer {
            debug!("🔄️📬️ Notifying order placed hook subscribers for {}", order.order_id);
            emitter.publish_event(OrderPlacedEvent::new(order.clone())).await;
        }
    }

    async fn call_order_annulled_hook(&self, order: &Order, reason: &str) {
        for emitter in &self.producers.order_annulled_producer {
            debug!("🔄️📬️ Notifying order annulled hook subscribers for {}", order.order_id);
            emitter.publish_event(OrderAnnulledEvent::new(order.clone(), reason)).await;
        }
    }
}

