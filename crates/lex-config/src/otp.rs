//! One-time password settings for password reset.

use serde::{Deserialize, Serialize};

const fn default_ttl_secs() -> i64 {
    300
}

const fn default_length() -> usize {
    6
}

const fn default_max_attempts() -> u32 {
    5
}

const fn default_reset_token_ttl_secs() -> i64 {
    600
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OtpConfig {
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: i64,

    #[serde(default = "default_length")]
    pub length: usize,

    /// Wrong guesses allowed before the code is burned.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Lifetime of the reset token handed out after a correct OTP.
    #[serde(default = "default_reset_token_ttl_secs")]
    pub reset_token_ttl_secs: i64,
}

impl Default for OtpConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_ttl_secs(),
            length: default_length(),
            max_attempts: default_max_attempts(),
            reset_token_ttl_secs: default_reset_token_ttl_secs(),
        }
    }
}
