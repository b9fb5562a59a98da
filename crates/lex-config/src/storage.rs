//! S3-compatible object storage configuration.

use serde::{Deserialize, Serialize};

fn default_bucket_name() -> String {
    String::from("lexora")
}

fn default_region() -> String {
    String::from("auto")
}

const fn default_max_upload_bytes() -> usize {
    10 * 1024 * 1024
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    #[serde(default = "default_bucket_name")]
    pub bucket_name: String,

    #[serde(default = "default_region")]
    pub region: String,

    /// Custom endpoint (R2, MinIO). Empty = AWS default.
    #[serde(default)]
    pub endpoint: String,

    #[serde(default)]
    pub access_key_id: String,

    #[serde(default)]
    pub secret_access_key: String,

    /// Base URL used to build public links. Empty = derived from endpoint.
    #[serde(default)]
    pub public_base_url: String,

    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            bucket_name: default_bucket_name(),
            region: default_region(),
            endpoint: String::new(),
            access_key_id: String::new(),
            secret_access_key: String::new(),
            public_base_url: String::new(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

impl StorageConfig {
    /// Check if the storage config has the minimum required fields.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        !self.access_key_id.is_empty()
            && !self.secret_access_key.is_empty()
            && !self.bucket_name.is_empty()
    }

    /// Base URL for public object links, without a trailing slash.
    #[must_use]
    pub fn public_base(&self) -> String {
        let base = if !self.public_base_url.is_empty() {
            self.public_base_url.clone()
        } else if !self.endpoint.is_empty() {
            format!("{}/{}", self.endpoint, self.bucket_name)
        } else {
            format!(
                "https://{}.s3.{}.amazonaws.com",
                self.bucket_name, self.region
            )
        };
        base.trim_end_matches('/').to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_not_configured() {
        let config = StorageConfig::default();
        assert!(!config.is_configured());
        assert_eq!(config.bucket_name, "lexora");
        assert_eq!(config.max_upload_bytes, 10 * 1024 * 1024);
    }

    #[test]
    fn public_base_prefers_explicit_url() {
        let config = StorageConfig {
            public_base_url: "https://cdn.lexora.vn/".into(),
            endpoint: "http://localhost:9000".into(),
            ..Default::default()
        };
        assert_eq!(config.public_base(), "https://cdn.lexora.vn");
    }

    #[test]
    fn public_base_from_endpoint() {
        let config = StorageConfig {
            endpoint: "http://localhost:9000".into(),
            ..Default::default()
        };
        assert_eq!(config.public_base(), "http://localhost:9000/lexora");
    }

    #[test]
    fn public_base_from_region() {
        let config = StorageConfig {
            region: "ap-southeast-1".into(),
            ..Default::default()
        };
        assert_eq!(
            config.public_base(),
            "https://lexora.s3.ap-southeast-1.amazonaws.com"
        );
    }
}
