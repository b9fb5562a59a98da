use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("file is empty")]
    Empty,

    #[error("file is {size} bytes, the limit is {limit}")]
    TooLarge { size: usize, limit: usize },

    #[error("content type '{0}' is not allowed")]
    UnsupportedType(String),

    #[error("invalid upload folder '{0}'")]
    InvalidFolder(String),

    #[error("object store error: {0}")]
    Store(#[from] object_store::Error),

    #[error("invalid object path: {0}")]
    Path(#[from] object_store::path::Error),
}

impl StorageError {
    /// True when the upload itself was rejected, as opposed to the store failing.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::Empty | Self::TooLarge { .. } | Self::UnsupportedType(_) | Self::InvalidFolder(_)
        )
    }
}
