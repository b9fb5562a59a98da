//! Gateway trait and the types that cross it.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use lex_core::enums::PaymentStatus;

use crate::error::PaymentError;

/// The gateway rejects longer descriptions.
pub const MAX_DESCRIPTION_CHARS: usize = 25;

/// Gateway status code for a paid order.
pub const SUCCESS_CODE: &str = "00";

#[must_use]
pub fn truncate_description(description: &str) -> String {
    description.trim().chars().take(MAX_DESCRIPTION_CHARS).collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentLinkRequest {
    pub order_code: i64,
    pub amount: i64,
    pub description: String,
    /// Falls back to the configured URL when `None`.
    pub return_url: Option<String>,
    pub cancel_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentLink {
    pub order_code: i64,
    pub checkout_url: String,
    pub payment_link_id: Option<String>,
    pub qr_code: Option<String>,
}

/// Body the gateway POSTs to our webhook.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookPayload {
    pub code: String,
    #[serde(default)]
    pub desc: String,
    #[serde(default)]
    pub success: Option<bool>,
    pub data: Value,
    pub signature: String,
}

/// A verified webhook, reduced to what the payment state machine needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookData {
    pub order_code: i64,
    pub amount: i64,
    pub reference: Option<String>,
    pub status: PaymentStatus,
}

impl WebhookData {
    /// Pull the fields out of an already verified `data` object.
    ///
    /// The outcome comes from the signed `data.code`; the envelope `code`
    /// sits outside the signature and may only repeat it.
    ///
    /// # Errors
    ///
    /// Returns `PaymentError::MalformedWebhook` when `orderCode`, `amount` or
    /// `code` is missing, or the envelope code disagrees with the signed one.
    pub fn from_payload(payload: &WebhookPayload) -> Result<Self, PaymentError> {
        let data = &payload.data;
        let order_code = data
            .get("orderCode")
            .and_then(Value::as_i64)
            .ok_or_else(|| PaymentError::MalformedWebhook("missing orderCode".into()))?;
        let amount = data
            .get("amount")
            .and_then(Value::as_i64)
            .ok_or_else(|| PaymentError::MalformedWebhook("missing amount".into()))?;
        let reference = data
            .get("reference")
            .and_then(Value::as_str)
            .map(ToString::to_string);
        let code = data
            .get("code")
            .and_then(Value::as_str)
            .ok_or_else(|| PaymentError::MalformedWebhook("missing code".into()))?;
        if !payload.code.is_empty() && payload.code != code {
            return Err(PaymentError::MalformedWebhook(format!(
                "envelope code {} disagrees with signed code {code}",
                payload.code
            )));
        }
        let status = if code == SUCCESS_CODE {
            PaymentStatus::Success
        } else {
            PaymentStatus::Failed
        };
        Ok(Self {
            order_code,
            amount,
            reference,
            status,
        })
    }
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Create a hosted checkout link for an order.
    ///
    /// # Errors
    ///
    /// Returns `PaymentError` on transport failures or gateway rejection.
    async fn create_link(&self, request: PaymentLinkRequest) -> Result<PaymentLink, PaymentError>;

    /// # Errors
    ///
    /// Returns `PaymentError` on transport failures or gateway rejection.
    async fn cancel_link(&self, order_code: i64, reason: &str) -> Result<(), PaymentError>;

    /// Check the signature and extract the order outcome.
    ///
    /// # Errors
    ///
    /// Returns `PaymentError::InvalidSignature` for a forged or altered payload.
    fn verify_webhook(&self, payload: &WebhookPayload) -> Result<WebhookData, PaymentError>;
}
