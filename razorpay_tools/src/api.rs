use std::sync::Arc;

use log::*;
use reqwest::{Client, Method};
use serde::{de::DeserializeOwned, Serialize};
use storefront_common::Paise;

use crate::{
    config::RazorpayConfig,
    data_objects::{NewRazorpayOrder, RazorpayOrder},
    helpers::receipt_for,
    RazorpayApiError,
};

#[derive(Clone)]
pub struct RazorpayApi {
    config: RazorpayConfig,
    client: Arc<Client>,
}

impl RazorpayApi {
    pub fn new(config: RazorpayConfig) -> Result<Self, RazorpayApiError> {
        if config.key_id.is_empty() || config.key_secret.is_empty() {
            return Err(RazorpayApiError::Initialization("Razorpay key id and secret are required".into()));
        }
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| RazorpayApiError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    pub fn config(&self) -> &RazorpayConfig {
        &self.config
    }

    /// Creates a gateway order for `amount`, referencing our order id as the receipt.
    pub async fn create_order(
        &self,
        amount: Paise,
        currency: &str,
        order_id: &str,
    ) -> Result<RazorpayOrder, RazorpayApiError> {
        if amount.value() <= 0 {
            return Err(RazorpayApiError::InvalidRequest(format!("Order amount must be positive. Got {amount}")));
        }
        let body = NewRazorpayOrder {
            amount: amount.value(),
            currency: currency.to_string(),
            receipt: receipt_for(order_id),
            notes: Some(serde_json::json!({ "order_id": order_id })),
        };
        let order: RazorpayOrder = self.rest_query(Method::POST, "/orders", &[], Some(body)).await?;
        info!("💳️ Razorpay order {} created for {order_id} ({amount})", order.id);
        Ok(order)
    }

    async fn rest_query<T: DeserializeOwned, B: Serialize>(
        &self,
        method: Method,
        path: &str,
        params: &[(&str, &str)],
        body: Option<B>,
    ) -> Result<T, RazorpayApiError> {
        let url = self.url(path);
        trace!("💳️ Razorpay request: {method} {url}");
        let mut req = self
            .client
            .request(method, url)
            .basic_auth(&self.config.key_id, Some(self.config.key_secret.reveal()))
            .query(params);
        if let Some(b) = body {
            req = req.json(&b);
        }
        let response = req.send().await.map_err(|e| RazorpayApiError::RestResponseError(e.to_string()))?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_else(|e| e.to_string());
            warn!("💳️ Razorpay request failed with status {status}: {message}");
            return Err(RazorpayApiError::QueryError { status, message });
        }
        let result = response.json::<T>().await.map_err(|e| RazorpayApiError::JsonError(e.to_string()))?;
        Ok(result)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.api_url)
    }
}
