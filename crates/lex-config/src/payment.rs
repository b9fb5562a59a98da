//! Payment gateway (PayOS) configuration.

use serde::{Deserialize, Serialize};

fn default_base_url() -> String {
    String::from("https://api-merchant.payos.vn")
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PaymentConfig {
    #[serde(default)]
    pub client_id: String,

    #[serde(default)]
    pub api_key: String,

    /// HMAC key for request and webhook signatures.
    #[serde(default)]
    pub checksum_key: String,

    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default)]
    pub return_url: String,

    #[serde(default)]
    pub cancel_url: String,
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            api_key: String::new(),
            checksum_key: String::new(),
            base_url: default_base_url(),
            return_url: String::new(),
            cancel_url: String::new(),
        }
    }
}

impl PaymentConfig {
    #[must_use]
    pub fn is_configured(&self) -> bool {
        !self.client_id.is_empty() && !self.api_key.is_empty() && !self.checksum_key.is_empty()
    }
}
