//! Integration tests for TOML configuration loading.
//!
//! Uses `figment::Jail` for sandboxed file and env var manipulation.

use figment::{
    Figment, Jail,
    providers::{Format, Serialized, Toml},
};
use lex_config::LexConfig;

#[test]
fn loads_sections_from_toml() {
    Jail::expect_with(|jail| {
        jail.create_file(
            "config.toml",
            r#"
[server]
host = "127.0.0.1"
port = 8080
cors_origins = ["http://localhost:5173"]

[jwt]
secret = "0123456789abcdef0123456789abcdef"
access_ttl_secs = 600

[storage]
bucket_name = "lexora-uploads"
access_key_id = "key"
secret_access_key = "secret"
endpoint = "http://localhost:9000"

[rag]
top_k = 6
"#,
        )?;

        let config: LexConfig = Figment::from(Serialized::defaults(LexConfig::default()))
            .merge(Toml::file("config.toml"))
            .extract()?;

        assert_eq!(config.server.bind_addr(), "127.0.0.1:8080");
        assert_eq!(config.server.cors_origins, vec!["http://localhost:5173"]);
        assert_eq!(config.jwt.access_ttl_secs, 600);
        assert_eq!(config.jwt.refresh_ttl_secs, 604_800);
        assert!(config.storage.is_configured());
        assert_eq!(config.rag.top_k, 6);
        assert_eq!(config.rag.chunk_size, 800);
        Ok(())
    });
}

#[test]
fn local_lexora_toml_is_picked_up() {
    Jail::expect_with(|jail| {
        jail.create_file(
            "lexora.toml",
            r#"
[database]
path = "custom.db"

[general]
test_grace_secs = 120
"#,
        )?;

        let config = LexConfig::load().expect("config loads");
        assert_eq!(config.database.path, "custom.db");
        assert_eq!(config.general.test_grace_secs, 120);
        Ok(())
    });
}

#[test]
fn missing_sections_get_defaults() {
    Jail::expect_with(|jail| {
        jail.create_file("config.toml", "[server]\nport = 4000\n")?;

        let config: LexConfig = Figment::from(Serialized::defaults(LexConfig::default()))
            .merge(Toml::file("config.toml"))
            .extract()?;

        assert_eq!(config.server.port, 4000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.otp.length, 6);
        assert_eq!(config.otp.max_attempts, 5);
        assert_eq!(config.payment.base_url, "https://api-merchant.payos.vn");
        Ok(())
    });
}
