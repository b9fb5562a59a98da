//! JWT signing configuration.

use serde::{Deserialize, Serialize};

/// Minimum accepted HMAC secret length in bytes.
pub const MIN_SECRET_LEN: usize = 32;

fn default_issuer() -> String {
    String::from("lexora")
}

const fn default_access_ttl_secs() -> i64 {
    15 * 60
}

const fn default_refresh_ttl_secs() -> i64 {
    7 * 24 * 60 * 60
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct JwtConfig {
    /// HS256 secret. Must be at least [`MIN_SECRET_LEN`] bytes.
    #[serde(default)]
    pub secret: String,

    #[serde(default = "default_issuer")]
    pub issuer: String,

    #[serde(default = "default_access_ttl_secs")]
    pub access_ttl_secs: i64,

    #[serde(default = "default_refresh_ttl_secs")]
    pub refresh_ttl_secs: i64,
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            secret: String::new(),
            issuer: default_issuer(),
            access_ttl_secs: default_access_ttl_secs(),
            refresh_ttl_secs: default_refresh_ttl_secs(),
        }
    }
}

impl JwtConfig {
    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.secret.len() >= MIN_SECRET_LEN
    }
}
