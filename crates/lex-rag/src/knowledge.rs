//! Ingestion and retrieval over the knowledge chunk table.

use std::sync::Arc;

use lex_core::entities::KnowledgeChunk;
use lex_db::service::LexService;
use lex_embeddings::{Embedder, cosine_similarity};

use crate::chunk::chunk_text;
use crate::error::RagError;

/// A stored chunk with its similarity to the query.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievedChunk {
    pub chunk: KnowledgeChunk,
    pub score: f32,
}

pub struct KnowledgeBase {
    svc: Arc<LexService>,
    embedder: Arc<dyn Embedder>,
    chunk_size: usize,
    chunk_overlap: usize,
}

impl KnowledgeBase {
    pub fn new(
        svc: Arc<LexService>,
        embedder: Arc<dyn Embedder>,
        chunk_size: usize,
        chunk_overlap: usize,
    ) -> Self {
        Self {
            svc,
            embedder,
            chunk_size,
            chunk_overlap,
        }
    }

    /// Embedding runs on the blocking pool; fastembed inference is CPU-bound.
    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, RagError> {
        let embedder = Arc::clone(&self.embedder);
        tokio::task::spawn_blocking(move || embedder.embed_batch(texts))
            .await
            .map_err(|e| RagError::Join(e.to_string()))?
            .map_err(RagError::from)
    }

    /// Chunk, embed, and store `text` under `source`, replacing any earlier
    /// version of that source.
    ///
    /// # Errors
    ///
    /// Returns `RagError::EmptyDocument` when `text` has no words.
    pub async fn ingest(&self, source: &str, text: &str) -> Result<Vec<KnowledgeChunk>, RagError> {
        let pieces = chunk_text(text, self.chunk_size, self.chunk_overlap);
        if pieces.is_empty() {
            return Err(RagError::EmptyDocument(source.to_string()));
        }
        let embeddings = self.embed(pieces.clone()).await?;
        let stored = self
            .svc
            .replace_knowledge_source(source, pieces.into_iter().zip(embeddings).collect())
            .await?;
        tracing::info!(source, chunks = stored.len(), "knowledge source ingested");
        Ok(stored)
    }

    /// The `top_k` chunks most similar to `query` scoring at least `min_score`,
    /// best first.
    pub async fn retrieve(
        &self,
        query: &str,
        top_k: usize,
        min_score: f32,
    ) -> Result<Vec<RetrievedChunk>, RagError> {
        if top_k == 0 || query.trim().is_empty() {
            return Ok(Vec::new());
        }
        let stored = self.svc.list_chunk_embeddings().await?;
        if stored.is_empty() {
            return Ok(Vec::new());
        }
        let query_vec = self
            .embed(vec![query.to_string()])
            .await?
            .into_iter()
            .next()
            .unwrap_or_default();

        let mut scored: Vec<RetrievedChunk> = stored
            .into_iter()
            .map(|(chunk, embedding)| RetrievedChunk {
                score: cosine_similarity(&query_vec, &embedding),
                chunk,
            })
            .filter(|r| r.score >= min_score)
            .collect();
        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored.truncate(top_k);
        tracing::debug!(hits = scored.len(), "knowledge retrieved");
        Ok(scored)
    }
}

#[cfg(test)]
mod tests {
    use lex_embeddings::HashEmbedder;
    use pretty_assertions::assert_eq;

    use super::*;

    async fn knowledge_base() -> KnowledgeBase {
        let svc = Arc::new(LexService::new_local(":memory:").await.unwrap());
        KnowledgeBase::new(svc, Arc::new(HashEmbedder::default()), 60, 10)
    }

    #[tokio::test]
    async fn ingest_replaces_previous_version() {
        let kb = knowledge_base().await;
        let first = kb
            .ingest("toeic-guide", "Part 5 has incomplete sentences about grammar and vocabulary. Part 7 is reading comprehension with single and multiple passages.")
            .await
            .unwrap();
        assert!(first.len() > 1);

        let second = kb.ingest("toeic-guide", "Short replacement.").await.unwrap();
        assert_eq!(second.len(), 1);
        let sources = kb.svc.list_knowledge_sources().await.unwrap();
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].chunks, 1);
    }

    #[tokio::test]
    async fn empty_document_is_rejected() {
        let kb = knowledge_base().await;
        assert!(matches!(
            kb.ingest("blank", "   ").await,
            Err(RagError::EmptyDocument(_))
        ));
    }

    #[tokio::test]
    async fn retrieve_ranks_matching_chunk_first() {
        let kb = knowledge_base().await;
        kb.ingest("listening", "photographs question response conversations talks")
            .await
            .unwrap();
        kb.ingest("reading", "incomplete sentences text completion passages")
            .await
            .unwrap();

        let hits = kb
            .retrieve("incomplete sentences text completion passages", 2, -1.0)
            .await
            .unwrap();
        assert_eq!(hits[0].chunk.source, "reading");
        assert!(hits[0].score > 0.99);

        let none = kb.retrieve("anything", 0, 0.0).await.unwrap();
        assert!(none.is_empty());
    }
}
