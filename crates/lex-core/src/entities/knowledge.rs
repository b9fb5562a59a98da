use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A retrievable slice of a knowledge document. The embedding is kept in the
/// database only and is not part of the serialized entity.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct KnowledgeChunk {
    pub id: String,
    pub source: String,
    pub chunk_index: i64,
    pub content: String,
    pub created_at: DateTime<Utc>,
}
