//! # lex-config
//!
//! Layered configuration loading for Lexora using figment.
//!
//! Configuration sources (in priority order, highest wins):
//! 1. Environment variables (`LEXORA_*` prefix, `__` as separator)
//! 2. Working-directory `lexora.toml`
//! 3. User-level `~/.config/lexora/config.toml`
//! 4. Built-in defaults
//!
//! Figment maps `LEXORA_JWT__SECRET` -> `jwt.secret`,
//! `LEXORA_STORAGE__BUCKET_NAME` -> `storage.bucket_name`, etc.
//!
//! ```no_run
//! use lex_config::LexConfig;
//!
//! let config = LexConfig::load_with_dotenv().expect("config");
//! config.validate().expect("valid config");
//! println!("listening on {}", config.server.bind_addr());
//! ```

mod database;
mod error;
mod general;
mod jwt;
mod llm;
mod otp;
mod payment;
mod server;
mod storage;

pub use database::DatabaseConfig;
pub use error::ConfigError;
pub use general::GeneralConfig;
pub use jwt::{JwtConfig, MIN_SECRET_LEN};
pub use llm::{LlmConfig, RagConfig};
pub use otp::OtpConfig;
pub use payment::PaymentConfig;
pub use server::ServerConfig;
pub use storage::StorageConfig;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct LexConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub jwt: JwtConfig,
    #[serde(default)]
    pub otp: OtpConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub payment: PaymentConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub rag: RagConfig,
    #[serde(default)]
    pub general: GeneralConfig,
}

impl LexConfig {
    /// Load configuration from TOML files and environment variables.
    ///
    /// Does NOT call `dotenvy`; use [`Self::load_with_dotenv`] for `.env` support.
    pub fn load() -> Result<Self, ConfigError> {
        Self::figment().extract().map_err(ConfigError::from)
    }

    /// Load configuration after reading a `.env` file from the workspace root.
    pub fn load_with_dotenv() -> Result<Self, ConfigError> {
        Self::load_dotenv_from_workspace();
        Self::load()
    }

    /// Build the figment provider chain.
    ///
    /// Public so tests can add providers on top.
    pub fn figment() -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(global_path) = Self::global_config_path() {
            if global_path.exists() {
                figment = figment.merge(Toml::file(global_path));
            }
        }

        let local_path = PathBuf::from("lexora.toml");
        if local_path.exists() {
            figment = figment.merge(Toml::file(local_path));
        }

        figment.merge(Env::prefixed("LEXORA_").split("__"))
    }

    /// Reject settings the server cannot run with.
    ///
    /// Optional integrations (storage, payment, llm) are allowed to stay
    /// unconfigured; the server falls back or disables them.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.jwt.secret.is_empty() {
            return Err(ConfigError::NotConfigured {
                section: "jwt".into(),
            });
        }
        if !self.jwt.is_configured() {
            return Err(invalid(
                "jwt.secret",
                format!("must be at least {MIN_SECRET_LEN} bytes"),
            ));
        }
        if self.jwt.access_ttl_secs <= 0 {
            return Err(invalid("jwt.access_ttl_secs", "must be positive"));
        }
        if self.jwt.refresh_ttl_secs <= self.jwt.access_ttl_secs {
            return Err(invalid(
                "jwt.refresh_ttl_secs",
                "must be longer than the access token lifetime",
            ));
        }
        if self.otp.length == 0 || self.otp.length > 10 {
            return Err(invalid("otp.length", "must be between 1 and 10"));
        }
        if self.otp.ttl_secs <= 0 {
            return Err(invalid("otp.ttl_secs", "must be positive"));
        }
        if self.rag.chunk_size == 0 {
            return Err(invalid("rag.chunk_size", "must be positive"));
        }
        if self.rag.chunk_overlap >= self.rag.chunk_size {
            return Err(invalid(
                "rag.chunk_overlap",
                "must be smaller than rag.chunk_size",
            ));
        }
        if self.general.max_page_size == 0 {
            return Err(invalid("general.max_page_size", "must be positive"));
        }
        if self.general.sweep_interval_secs == 0 {
            return Err(invalid("general.sweep_interval_secs", "must be positive"));
        }
        Ok(())
    }

    fn global_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("lexora").join("config.toml"))
    }

    /// Walk up from `CARGO_MANIFEST_DIR` looking for `.env`, then try the
    /// current directory. Missing files are ignored.
    fn load_dotenv_from_workspace() {
        if let Ok(manifest_dir) = std::env::var("CARGO_MANIFEST_DIR") {
            let mut dir = PathBuf::from(manifest_dir);
            // crate -> crates/ -> workspace root
            for _ in 0..3 {
                let env_path = dir.join(".env");
                if env_path.exists() {
                    let _ = dotenvy::from_path(&env_path);
                    return;
                }
                if !dir.pop() {
                    break;
                }
            }
        }

        let _ = dotenvy::dotenv();
    }
}

fn invalid(field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> LexConfig {
        let mut config = LexConfig::default();
        config.jwt.secret = "0123456789abcdef0123456789abcdef".into();
        config
    }

    #[test]
    fn default_config_has_optional_sections_unconfigured() {
        let config = LexConfig::default();
        assert!(!config.jwt.is_configured());
        assert!(!config.storage.is_configured());
        assert!(!config.payment.is_configured());
        assert!(!config.llm.is_configured());
        assert_eq!(config.general.default_page_size, 20);
    }

    #[test]
    fn missing_secret_is_not_configured() {
        let err = LexConfig::default().validate().unwrap_err();
        assert!(matches!(err, ConfigError::NotConfigured { ref section } if section == "jwt"));
    }

    #[test]
    fn short_secret_is_invalid() {
        let mut config = valid();
        config.jwt.secret = "short".into();
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref field, .. } if field == "jwt.secret"));
    }

    #[test]
    fn overlap_must_be_smaller_than_chunk() {
        let mut config = valid();
        config.rag.chunk_overlap = config.rag.chunk_size;
        assert!(config.validate().is_err());
    }

    #[test]
    fn valid_config_passes() {
        valid().validate().expect("should validate");
    }
}
