//! Embedding error types.

#[derive(Debug, thiserror::Error)]
pub enum EmbeddingError {
    /// Model download, ONNX runtime, or cache setup failed.
    #[error("Model initialization failed: {0}")]
    InitFailed(String),

    #[error("Embedding generation failed: {0}")]
    EmbedFailed(String),

    /// The model returned fewer vectors than inputs.
    #[error("Empty result from embedding model")]
    EmptyResult,
}
