//! libSQL database configuration.

use serde::{Deserialize, Serialize};

fn default_path() -> String {
    String::from("lexora.db")
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    /// Local database file, or `:memory:`.
    #[serde(default = "default_path")]
    pub path: String,

    /// Remote libSQL URL (e.g. `libsql://lexora.turso.io`). Empty = local only.
    #[serde(default)]
    pub url: String,

    /// Remote auth token.
    #[serde(default)]
    pub auth_token: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_path(),
            url: String::new(),
            auth_token: String::new(),
        }
    }
}

impl DatabaseConfig {
    /// Whether a remote replica is configured.
    #[must_use]
    pub fn is_remote(&self) -> bool {
        !self.url.is_empty() && !self.auth_token.is_empty()
    }
}
