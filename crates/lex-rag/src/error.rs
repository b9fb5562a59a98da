use lex_db::error::DatabaseError;
use lex_embeddings::EmbeddingError;

use crate::backend::LlmError;

#[derive(Debug, thiserror::Error)]
pub enum RagError {
    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error(transparent)]
    Embedding(#[from] EmbeddingError),

    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error("document '{0}' has no text to index")]
    EmptyDocument(String),

    #[error("background task failed: {0}")]
    Join(String),
}
