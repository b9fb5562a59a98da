//! # lex-storage
//!
//! Uploads for avatars, lesson media, and question audio/images.
//!
//! [`UploadStore`] sits on any `object_store::ObjectStore`: an `AmazonS3`
//! store (works for AWS, R2, and MinIO) when credentials are configured,
//! `InMemory` otherwise.

pub mod error;

use std::sync::Arc;

use bytes::Bytes;
use chrono::Utc;
use object_store::aws::AmazonS3Builder;
use object_store::memory::InMemory;
use object_store::path::Path;
use object_store::{Attribute, Attributes, ObjectStore, PutOptions, PutPayload};
use serde::Serialize;

use lex_config::StorageConfig;

pub use error::StorageError;

/// Content types accepted for upload.
pub const ALLOWED_CONTENT_TYPES: &[&str] = &[
    "image/png",
    "image/jpeg",
    "image/gif",
    "image/webp",
    "audio/mpeg",
    "audio/wav",
    "audio/ogg",
    "audio/mp4",
    "video/mp4",
    "application/pdf",
    "text/plain",
];

/// Folders uploads may land in.
pub const ALLOWED_FOLDERS: &[&str] = &["avatars", "thumbnails", "lessons", "questions", "documents"];

const MAX_NAME_CHARS: usize = 80;

/// Where an upload ended up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredObject {
    pub key: String,
    pub url: String,
    pub size: usize,
    pub content_type: String,
}

pub struct UploadStore {
    store: Arc<dyn ObjectStore>,
    public_base: String,
    max_bytes: usize,
}

impl UploadStore {
    #[must_use]
    pub fn new(store: Arc<dyn ObjectStore>, public_base: &str, max_bytes: usize) -> Self {
        Self {
            store,
            public_base: public_base.trim_end_matches('/').to_string(),
            max_bytes,
        }
    }

    /// In-memory store, for tests and for running without storage credentials.
    #[must_use]
    pub fn in_memory(public_base: &str, max_bytes: usize) -> Self {
        Self::new(Arc::new(InMemory::new()), public_base, max_bytes)
    }

    /// Build from config. Falls back to an in-memory store when the
    /// credentials are missing.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Store` if the S3 builder rejects the settings.
    pub fn from_config(config: &StorageConfig) -> Result<Self, StorageError> {
        if !config.is_configured() {
            tracing::warn!("storage credentials not set, uploads are kept in memory");
            return Ok(Self::in_memory(&config.public_base(), config.max_upload_bytes));
        }

        let mut builder = AmazonS3Builder::new()
            .with_bucket_name(&config.bucket_name)
            .with_region(&config.region)
            .with_access_key_id(&config.access_key_id)
            .with_secret_access_key(&config.secret_access_key);
        if !config.endpoint.is_empty() {
            builder = builder
                .with_endpoint(&config.endpoint)
                .with_virtual_hosted_style_request(false)
                .with_allow_http(config.endpoint.starts_with("http://"));
        }
        let store = builder.build()?;
        tracing::info!(bucket = %config.bucket_name, "object storage ready");
        Ok(Self::new(
            Arc::new(store),
            &config.public_base(),
            config.max_upload_bytes,
        ))
    }

    #[must_use]
    pub const fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    /// Store `data` under `folder/<unix-millis>-<sanitized name>`.
    ///
    /// # Errors
    ///
    /// Rejects empty or oversized files, unknown folders, and content types
    /// outside [`ALLOWED_CONTENT_TYPES`]. Store failures pass through.
    pub async fn upload(
        &self,
        folder: &str,
        file_name: &str,
        content_type: &str,
        data: Bytes,
    ) -> Result<StoredObject, StorageError> {
        if !ALLOWED_FOLDERS.contains(&folder) {
            return Err(StorageError::InvalidFolder(folder.to_string()));
        }
        if data.is_empty() {
            return Err(StorageError::Empty);
        }
        if data.len() > self.max_bytes {
            return Err(StorageError::TooLarge {
                size: data.len(),
                limit: self.max_bytes,
            });
        }
        let content_type = normalize_content_type(content_type);
        if !ALLOWED_CONTENT_TYPES.contains(&content_type.as_str()) {
            return Err(StorageError::UnsupportedType(content_type));
        }

        let key = format!(
            "{folder}/{}-{}",
            Utc::now().timestamp_millis(),
            sanitize_file_name(file_name)
        );
        let path = Path::parse(&key)?;
        let size = data.len();

        let mut attributes = Attributes::new();
        attributes.insert(Attribute::ContentType, content_type.clone().into());
        let options = PutOptions {
            attributes,
            ..Default::default()
        };
        self.store
            .put_opts(&path, PutPayload::from(data), options)
            .await?;

        tracing::info!(%key, size, %content_type, "upload stored");
        Ok(StoredObject {
            url: self.public_url(&key),
            key,
            size,
            content_type,
        })
    }

    /// Remove an object. Missing objects are not an error.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` for invalid keys or store failures.
    pub async fn delete(&self, key: &str) -> Result<(), StorageError> {
        let path = Path::parse(key)?;
        match self.store.delete(&path).await {
            Ok(()) | Err(object_store::Error::NotFound { .. }) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Read an object back.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Store` with `NotFound` when the key is absent.
    pub async fn fetch(&self, key: &str) -> Result<Bytes, StorageError> {
        let path = Path::parse(key)?;
        Ok(self.store.get(&path).await?.bytes().await?)
    }

    #[must_use]
    pub fn public_url(&self, key: &str) -> String {
        format!("{}/{key}", self.public_base)
    }

    /// Recover the object key from a URL this store produced.
    #[must_use]
    pub fn key_from_url<'a>(&self, url: &'a str) -> Option<&'a str> {
        url.strip_prefix(self.public_base.as_str())?
            .strip_prefix('/')
    }
}

/// Lowercase and drop parameters (`image/PNG; charset=x` → `image/png`).
fn normalize_content_type(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// Keep ASCII letters, digits, `.`, `-`, `_`; collapse everything else to `-`.
#[must_use]
pub fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();
    let mut out = String::with_capacity(base.len());
    for c in base.chars() {
        if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
            out.push(c.to_ascii_lowercase());
        } else if !out.ends_with('-') {
            out.push('-');
        }
    }
    let trimmed = out.trim_matches(|c| c == '-' || c == '.');
    if trimmed.is_empty() {
        return "file".to_string();
    }
    trimmed.chars().take(MAX_NAME_CHARS).collect()
}
