//! PayOS merchant API adapter.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use lex_config::PaymentConfig;

use crate::error::PaymentError;
use crate::gateway::{
    PaymentGateway, PaymentLink, PaymentLinkRequest, SUCCESS_CODE, WebhookData, WebhookPayload,
    truncate_description,
};
use crate::signature::{sign_payment_request, verify_data};

pub struct PayOsGateway {
    client: Client,
    base_url: String,
    client_id: String,
    api_key: String,
    checksum_key: String,
    return_url: String,
    cancel_url: String,
}

impl std::fmt::Debug for PayOsGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PayOsGateway")
            .field("base_url", &self.base_url)
            .field("client_id", &self.client_id)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateLinkBody<'a> {
    order_code: i64,
    amount: i64,
    description: &'a str,
    return_url: &'a str,
    cancel_url: &'a str,
    signature: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CancelBody<'a> {
    cancellation_reason: &'a str,
}

/// Every PayOS response is wrapped in `{code, desc, data}`.
#[derive(Debug, Deserialize)]
struct Envelope {
    code: String,
    #[serde(default)]
    desc: String,
    data: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LinkData {
    checkout_url: String,
    payment_link_id: Option<String>,
    qr_code: Option<String>,
}

impl PayOsGateway {
    /// # Errors
    ///
    /// Returns `PaymentError::NotConfigured` if credentials are missing.
    pub fn from_config(config: &PaymentConfig) -> Result<Self, PaymentError> {
        if !config.is_configured() {
            return Err(PaymentError::NotConfigured);
        }
        Ok(Self {
            client: Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client_id: config.client_id.clone(),
            api_key: config.api_key.clone(),
            checksum_key: config.checksum_key.clone(),
            return_url: config.return_url.clone(),
            cancel_url: config.cancel_url.clone(),
        })
    }

    async fn post<B: Serialize + Sync>(&self, path: &str, body: &B) -> Result<Envelope, PaymentError> {
        let url = format!("{}{path}", self.base_url);
        let response = self
            .client
            .post(&url)
            .header("x-client-id", &self.client_id)
            .header("x-api-key", &self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| PaymentError::Http(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(PaymentError::Http(format!("HTTP {status}: {text}")));
        }
        let envelope: Envelope = response
            .json()
            .await
            .map_err(|e| PaymentError::Parse(e.to_string()))?;
        if envelope.code != SUCCESS_CODE {
            return Err(PaymentError::Rejected {
                code: envelope.code,
                desc: envelope.desc,
            });
        }
        Ok(envelope)
    }
}

#[async_trait]
impl PaymentGateway for PayOsGateway {
    async fn create_link(&self, request: PaymentLinkRequest) -> Result<PaymentLink, PaymentError> {
        let description = truncate_description(&request.description);
        let return_url = request.return_url.as_deref().unwrap_or(&self.return_url);
        let cancel_url = request.cancel_url.as_deref().unwrap_or(&self.cancel_url);
        let signature = sign_payment_request(
            &self.checksum_key,
            request.amount,
            cancel_url,
            &description,
            request.order_code,
            return_url,
        )?;
        let body = CreateLinkBody {
            order_code: request.order_code,
            amount: request.amount,
            description: &description,
            return_url,
            cancel_url,
            signature,
        };

        let envelope = self.post("/v2/payment-requests", &body).await?;
        let data: LinkData = envelope
            .data
            .ok_or_else(|| PaymentError::Parse("response has no data".into()))
            .and_then(|d| serde_json::from_value(d).map_err(|e| PaymentError::Parse(e.to_string())))?;
        tracing::info!(order_code = request.order_code, "payment link created");
        Ok(PaymentLink {
            order_code: request.order_code,
            checkout_url: data.checkout_url,
            payment_link_id: data.payment_link_id,
            qr_code: data.qr_code,
        })
    }

    async fn cancel_link(&self, order_code: i64, reason: &str) -> Result<(), PaymentError> {
        self.post(
            &format!("/v2/payment-requests/{order_code}/cancel"),
            &CancelBody {
                cancellation_reason: reason,
            },
        )
        .await?;
        tracing::info!(order_code, "payment link cancelled");
        Ok(())
    }

    fn verify_webhook(&self, payload: &WebhookPayload) -> Result<WebhookData, PaymentError> {
        let Value::Object(ref data) = payload.data else {
            return Err(PaymentError::MalformedWebhook("data is not an object".into()));
        };
        if !verify_data(&self.checksum_key, data, &payload.signature) {
            tracing::warn!("webhook signature mismatch");
            return Err(PaymentError::InvalidSignature);
        }
        WebhookData::from_payload(payload)
    }
}
