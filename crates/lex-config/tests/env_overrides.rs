use figment::Jail;
use lex_config::LexConfig;

#[test]
fn env_vars_map_to_nested_sections() {
    Jail::expect_with(|jail| {
        jail.set_env("LEXORA_JWT__SECRET", "abcdefghijklmnopqrstuvwxyz012345");
        jail.set_env("LEXORA_SERVER__PORT", "9090");
        jail.set_env("LEXORA_PAYMENT__CLIENT_ID", "client");
        jail.set_env("LEXORA_PAYMENT__API_KEY", "api");
        jail.set_env("LEXORA_PAYMENT__CHECKSUM_KEY", "checksum");

        let config = LexConfig::load().expect("config loads");
        assert_eq!(config.server.port, 9090);
        assert!(config.jwt.is_configured());
        assert!(config.payment.is_configured());
        config.validate().expect("valid");
        Ok(())
    });
}

#[test]
fn env_beats_local_toml() {
    Jail::expect_with(|jail| {
        jail.create_file("lexora.toml", "[llm]\nmodel = \"from-file\"\n")?;
        jail.set_env("LEXORA_LLM__MODEL", "from-env");

        let config = LexConfig::load().expect("config loads");
        assert_eq!(config.llm.model, "from-env");
        Ok(())
    });
}
