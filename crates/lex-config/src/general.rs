//! General application configuration.

use serde::{Deserialize, Serialize};

const fn default_page_size() -> u32 {
    20
}

const fn default_max_page_size() -> u32 {
    100
}

const fn default_test_grace_secs() -> i64 {
    300
}

const fn default_sweep_interval_secs() -> u64 {
    60
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GeneralConfig {
    /// Default page size for list endpoints.
    #[serde(default = "default_page_size")]
    pub default_page_size: u32,

    /// Upper bound a client may request.
    #[serde(default = "default_max_page_size")]
    pub max_page_size: u32,

    /// Extra time past a test's duration before an attempt counts as abandoned.
    #[serde(default = "default_test_grace_secs")]
    pub test_grace_secs: i64,

    /// How often the abandoned-test sweeper runs.
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            default_page_size: default_page_size(),
            max_page_size: default_max_page_size(),
            test_grace_secs: default_test_grace_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

impl GeneralConfig {
    /// Clamp a requested page size into `1..=max_page_size`.
    #[must_use]
    pub fn clamp_page_size(&self, requested: Option<u32>) -> u32 {
        requested
            .unwrap_or(self.default_page_size)
            .clamp(1, self.max_page_size)
    }
}
