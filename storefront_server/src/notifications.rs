//! Order notifications
//!
//! When an order is confirmed (paid online, or placed as cash-on-delivery) the customer gets an email and the store
//! owner gets a WhatsApp alert. Both channels are optional and configured in [`NotificationConfig`].
//!
//! Notifications hang off the engine's event hooks, so they run on their own tasks after the order transition has
//! been committed. A failed delivery is logged and forgotten. It never affects the order.
use std::time::Duration;

use futures::future::BoxFuture;
use log::*;
use reqwest::Client;
use serde_json::json;
use storefront_engine::{
    db_types::{Order, PaymentMethod},
    events::{EventHandlers, EventHooks},
};
use thiserror::Error;

use crate::config::{EmailConfig, NotificationConfig, WhatsAppConfig};

pub const NOTIFICATION_EVENT_BUFFER_SIZE: usize = 25;
const STORE_NAME: &str = "AVIRAVASTRA";

#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("Could not send the notification. {0}")]
    RequestFailed(String),
    #[error("The notification service refused the message. Status {status}. {message}")]
    Rejected { status: u16, message: String },
}

#[derive(Clone)]
pub struct Notifier {
    client: Client,
    config: NotificationConfig,
}

impl Notifier {
    pub fn new(config: NotificationConfig) -> Result<Self, NotificationError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| NotificationError::RequestFailed(e.to_string()))?;
        Ok(Self { client, config })
    }

    pub fn is_enabled(&self) -> bool {
        self.config.email.is_some() || self.config.whatsapp.is_some()
    }

    /// Sends every configured notification for a confirmed order. Failures are logged per channel.
    pub async fn order_confirmed(&self, order: &Order) {
        if let Some(email) = &self.config.email {
            let subject = format!("Your {STORE_NAME} Order is Confirmed - {}", order.order_id.as_str());
            let html = order_email_html(order);
            match self.send_email(email, &order.email, &subject, &html).await {
                Ok(()) => info!("📧️ Confirmation email for order {} sent", order.order_id),
                Err(e) => error!("📧️ Could not send confirmation email for order {}. {e}", order.order_id),
            }
            if let Some(admin) = &email.admin_email {
                let subject = format!("New order {} ({})", order.order_id.as_str(), order.total_amount);
                if let Err(e) = self.send_email(email, admin, &subject, &html).await {
                    error!("📧️ Could not send the admin copy for order {}. {e}", order.order_id);
                }
            }
        }
        if let Some(whatsapp) = &self.config.whatsapp {
            match self.send_whatsapp(whatsapp, &whatsapp_message(order)).await {
                Ok(()) => info!("📧️ WhatsApp alert for order {} sent", order.order_id),
                Err(e) => error!("📧️ Could not send WhatsApp alert for order {}. {e}", order.order_id),
            }
        }
    }

    async fn send_email(&self, config: &EmailConfig, to: &str, subject: &str, html: &str) -> Result<(), NotificationError> {
        let body = json!({
            "from": format!("{STORE_NAME} <{}>", config.from),
            "to": to,
            "subject": subject,
            "html": html,
        });
        let mut req = self.client.post(&config.api_url).json(&body);
        if !config.api_key.is_empty() {
            req = req.bearer_auth(config.api_key.reveal());
        }
        let response = req.send().await.map_err(|e| NotificationError::RequestFailed(e.to_string()))?;
        check_response(response).await
    }

    async fn send_whatsapp(&self, config: &WhatsAppConfig, message: &str) -> Result<(), NotificationError> {
        let body = json!({ "phone": config.admin_phone, "message": message });
        let response = self
            .client
            .post(&config.api_url)
            .bearer_auth(config.token.reveal())
            .json(&body)
            .send()
            .await
            .map_err(|e| NotificationError::RequestFailed(e.to_string()))?;
        check_response(response).await
    }
}

async fn check_response(response: reqwest::Response) -> Result<(), NotificationError> {
    if response.status().is_success() {
        return Ok(());
    }
    let status = response.status().as_u16();
    let message = response.text().await.unwrap_or_default();
    Err(NotificationError::Rejected { status, message })
}

/// Wires the notifier into the order events. Paid online orders and newly placed cash-on-delivery orders both count
/// as confirmed.
pub fn create_notification_event_handlers(config: NotificationConfig) -> Result<EventHandlers, NotificationError> {
    let mut hooks = EventHooks::default();
    let notifier = Notifier::new(config)?;
    if !notifier.is_enabled() {
        info!("📧️ No notification channels are configured");
        return Ok(EventHandlers::new(NOTIFICATION_EVENT_BUFFER_SIZE, hooks));
    }
    let paid_notifier = notifier.clone();
    hooks.on_order_paid(move |ev| {
        let notifier = paid_notifier.clone();
        debug!("📧️ Order {} has been paid. Sending notifications.", ev.order.order_id);
        Box::pin(async move { notifier.order_confirmed(&ev.order).await })
    });
    hooks.on_order_placed(move |ev| {
        if ev.order.payment_method != PaymentMethod::Cod {
            return no_op();
        }
        let notifier = notifier.clone();
        debug!("📧️ COD order {} has been placed. Sending notifications.", ev.order.order_id);
        Box::pin(async move { notifier.order_confirmed(&ev.order).await })
    });
    hooks.on_order_annulled(|ev| {
        info!("📧️ Order {} was cancelled ({}). No notification is sent.", ev.order.order_id, ev.reason);
        no_op()
    });
    Ok(EventHandlers::new(NOTIFICATION_EVENT_BUFFER_SIZE, hooks))
}

fn no_op() -> BoxFuture<'static, ()> {
    Box::pin(async {})
}

pub fn whatsapp_message(order: &Order) -> String {
    format!(
        "*New Order Received!*\n\nOrder ID: {}\nCustomer: {}\nStatus: {}\nMethod: {}\nAmount: {}\n\nCheck the admin panel \
         for details.",
        order.order_id.as_str(),
        order.customer_name,
        order.order_status,
        order.payment_method,
        order.total_amount
    )
}

pub fn order_email_html(order: &Order) -> String {
    let rows = order
        .items
        .iter()
        .map(|item| {
            format!(
                "<tr><td>{}</td><td style=\"text-align:center\">{}</td><td style=\"text-align:right\">{}</td></tr>",
                escape_html(&item.name),
                item.quantity,
                item.price
            )
        })
        .collect::<String>();
    let total_label = match order.payment_method {
        PaymentMethod::Online => "Total Paid",
        PaymentMethod::Cod => "Total Due on Delivery",
    };
    format!(
        "<div style=\"font-family:sans-serif;max-width:600px;margin:0 auto\">\
         <h1 style=\"color:#800000\">{STORE_NAME}</h1>\
         <h2>Order Confirmed!</h2>\
         <p>Hello {name},</p>\
         <p>Thank you for shopping with us. Your order has been placed and is being processed by our team.</p>\
         <p><strong>Order ID:</strong> {order_id}<br><strong>Date:</strong> {date}</p>\
         <table style=\"width:100%;border-collapse:collapse\">\
         <thead><tr><th style=\"text-align:left\">Item</th><th>Qty</th><th style=\"text-align:right\">Price</th></tr></thead>\
         <tbody>{rows}</tbody>\
         <tfoot><tr><td colspan=\"2\" style=\"text-align:right\"><strong>{total_label}:</strong></td>\
         <td style=\"text-align:right\"><strong>{total}</strong></td></tr></tfoot>\
         </table>\
         <h3>Shipping Address</h3>\
         <p>{address}<br>{city}, {state} - {pincode}</p>\
         </div>",
        name = escape_html(&order.customer_name),
        order_id = order.order_id.as_str(),
        date = order.created_at.format("%d %b %Y"),
        total = order.total_amount,
        address = escape_html(&order.address),
        city = escape_html(&order.city),
        state = escape_html(&order.state),
        pincode = escape_html(&order.pincode),
    )
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;").replace('"', "&quot;")
}
