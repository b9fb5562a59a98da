//! Knowledge chunks for retrieval. Embeddings are stored as little-endian
//! `f32` blobs next to the text.

use chrono::Utc;

use lex_core::entities::KnowledgeChunk;
use lex_core::ids::PREFIX_KNOWLEDGE_CHUNK;
use lex_core::responses::KnowledgeSourceSummary;

use crate::error::DatabaseError;
use crate::helpers::{collect_rows, format_datetime, parse_datetime, require_text};
use crate::service::LexService;

const SELECT_COLS: &str = "id, source, chunk_index, content, created_at";

fn row_to_chunk(row: &libsql::Row) -> Result<KnowledgeChunk, DatabaseError> {
    Ok(KnowledgeChunk {
        id: row.get(0)?,
        source: row.get(1)?,
        chunk_index: row.get(2)?,
        content: row.get(3)?,
        created_at: parse_datetime(&row.get::<String>(4)?)?,
    })
}

/// Serialize an embedding as little-endian `f32`s.
#[must_use]
pub fn encode_embedding(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|v| v.to_le_bytes()).collect()
}

/// Inverse of [`encode_embedding`].
///
/// # Errors
///
/// Returns `DatabaseError::InvalidState` when the blob length is not a multiple of 4.
pub fn decode_embedding(bytes: &[u8]) -> Result<Vec<f32>, DatabaseError> {
    if bytes.len() % 4 != 0 {
        return Err(DatabaseError::InvalidState(format!(
            "embedding blob of {} bytes is not a list of f32",
            bytes.len()
        )));
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect())
}

impl LexService {
    /// Replace a source's chunks with `chunks` (text and embedding pairs) in one transaction.
    pub async fn replace_knowledge_source(
        &self,
        source: &str,
        chunks: Vec<(String, Vec<f32>)>,
    ) -> Result<Vec<KnowledgeChunk>, DatabaseError> {
        let source = require_text("source", source)?;
        let now = Utc::now();

        let tx = self.begin_write().await?;
        let result = async {
            self.conn()
                .execute(
                    "DELETE FROM knowledge_chunks WHERE source = ?1",
                    [source.as_str()],
                )
                .await?;
            let mut stored = Vec::with_capacity(chunks.len());
            for (chunk_index, (content, embedding)) in (0_i64..).zip(chunks) {
                let id = self.db().generate_id(PREFIX_KNOWLEDGE_CHUNK).await?;
                self.conn()
                    .execute(
                        "INSERT INTO knowledge_chunks (id, source, chunk_index, content, embedding, created_at)
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                        libsql::params![
                            id.as_str(),
                            source.as_str(),
                            chunk_index,
                            content.as_str(),
                            encode_embedding(&embedding),
                            format_datetime(&now)
                        ],
                    )
                    .await?;
                stored.push(KnowledgeChunk {
                    id,
                    source: source.clone(),
                    chunk_index,
                    content,
                    created_at: now,
                });
            }
            Ok(stored)
        }
        .await;
        let stored = tx.finish(result).await?;
        tracing::info!(%source, chunks = stored.len(), "knowledge source stored");
        Ok(stored)
    }

    /// Insert one chunk.
    pub async fn insert_knowledge_chunk(
        &self,
        source: &str,
        chunk_index: i64,
        content: &str,
        embedding: &[f32],
    ) -> Result<KnowledgeChunk, DatabaseError> {
        let source = require_text("source", source)?;
        let _guard = self.write_lock().await;
        let id = self.db().generate_id(PREFIX_KNOWLEDGE_CHUNK).await?;
        let now = Utc::now();
        self.conn()
            .execute(
                "INSERT INTO knowledge_chunks (id, source, chunk_index, content, embedding, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                libsql::params![
                    id.as_str(),
                    source.as_str(),
                    chunk_index,
                    content,
                    encode_embedding(embedding),
                    format_datetime(&now)
                ],
            )
            .await
            .map_err(|e| DatabaseError::from(e).on_unique("chunk index already used for this source"))?;
        Ok(KnowledgeChunk {
            id,
            source,
            chunk_index,
            content: content.to_string(),
            created_at: now,
        })
    }

    /// Every chunk with its embedding, for brute-force similarity search.
    pub async fn list_chunk_embeddings(
        &self,
    ) -> Result<Vec<(KnowledgeChunk, Vec<f32>)>, DatabaseError> {
        let rows = self
            .conn()
            .query(
                &format!(
                    "SELECT {SELECT_COLS}, embedding FROM knowledge_chunks
                     ORDER BY source, chunk_index"
                ),
                (),
            )
            .await?;
        collect_rows(rows, |row| {
            let chunk = row_to_chunk(row)?;
            let embedding = decode_embedding(&row.get::<Vec<u8>>(5)?)?;
            Ok((chunk, embedding))
        })
        .await
    }

    /// Returns the number of chunks removed.
    pub async fn delete_knowledge_source(&self, source: &str) -> Result<u64, DatabaseError> {
        let _guard = self.write_lock().await;
        let removed = self
            .conn()
            .execute("DELETE FROM knowledge_chunks WHERE source = ?1", [source])
            .await?;
        if removed == 0 {
            return Err(DatabaseError::not_found("knowledge source", source));
        }
        Ok(removed)
    }

    pub async fn list_knowledge_sources(
        &self,
    ) -> Result<Vec<KnowledgeSourceSummary>, DatabaseError> {
        let rows = self
            .conn()
            .query(
                "SELECT source, COUNT(*) FROM knowledge_chunks GROUP BY source ORDER BY source",
                (),
            )
            .await?;
        collect_rows(rows, |row| {
            Ok(KnowledgeSourceSummary {
                source: row.get(0)?,
                chunks: row.get(1)?,
            })
        })
        .await
    }
}
