//! In-process gateway for tests and local runs without credentials.

use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::PaymentError;
use crate::gateway::{PaymentGateway, PaymentLink, PaymentLinkRequest, WebhookData, WebhookPayload};
use crate::signature::verify_data;

/// Hands out fake checkout URLs and verifies webhooks with a fixed key.
pub struct MockGateway {
    checksum_key: String,
    created: Mutex<Vec<PaymentLinkRequest>>,
    cancelled: Mutex<Vec<i64>>,
}

impl MockGateway {
    #[must_use]
    pub fn new(checksum_key: impl Into<String>) -> Self {
        Self {
            checksum_key: checksum_key.into(),
            created: Mutex::new(Vec::new()),
            cancelled: Mutex::new(Vec::new()),
        }
    }

    #[must_use]
    pub fn created(&self) -> Vec<PaymentLinkRequest> {
        self.created.lock().map(|v| v.clone()).unwrap_or_default()
    }

    #[must_use]
    pub fn cancelled(&self) -> Vec<i64> {
        self.cancelled.lock().map(|v| v.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl PaymentGateway for MockGateway {
    async fn create_link(&self, request: PaymentLinkRequest) -> Result<PaymentLink, PaymentError> {
        let order_code = request.order_code;
        if let Ok(mut created) = self.created.lock() {
            created.push(request);
        }
        Ok(PaymentLink {
            order_code,
            checkout_url: format!("https://checkout.invalid/{order_code}"),
            payment_link_id: Some(format!("mock-{order_code}")),
            qr_code: None,
        })
    }

    async fn cancel_link(&self, order_code: i64, _reason: &str) -> Result<(), PaymentError> {
        if let Ok(mut cancelled) = self.cancelled.lock() {
            cancelled.push(order_code);
        }
        Ok(())
    }

    fn verify_webhook(&self, payload: &WebhookPayload) -> Result<WebhookData, PaymentError> {
        let Value::Object(ref data) = payload.data else {
            return Err(PaymentError::MalformedWebhook("data is not an object".into()));
        };
        if !verify_data(&self.checksum_key, data, &payload.signature) {
            return Err(PaymentError::InvalidSignature);
        }
        WebhookData::from_payload(payload)
    }
}
