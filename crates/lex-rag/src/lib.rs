//! # lex-rag
//!
//! The AI tutor: an OpenAI-compatible LLM client, a knowledge base of
//! embedded text chunks stored in libSQL, and the pipeline that answers a
//! chat message with retrieved context and recent history.
//!
//! Retrieval is brute-force cosine similarity over every stored chunk. The
//! knowledge base is a handful of study guides, so a vector index would not
//! pay for itself.

pub mod backend;
pub mod chunk;
pub mod error;
pub mod knowledge;
pub mod pipeline;

pub use backend::{
    CompletionRequest, CompletionResponse, LlmBackend, LlmError, MockBackend, OpenAiBackend,
    Turn, TurnRole,
};
pub use chunk::chunk_text;
pub use error::RagError;
pub use knowledge::{KnowledgeBase, RetrievedChunk};
pub use pipeline::ChatPipeline;
