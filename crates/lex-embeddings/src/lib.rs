//! # lex-embeddings
//!
//! Text embeddings for the tutor's knowledge base.
//!
//! [`EmbeddingEngine`] runs `AllMiniLML6V2` locally through fastembed (ONNX
//! runtime, 384 dimensions, no API key). [`HashEmbedder`] is a deterministic
//! stand-in that needs no model download, used in tests and when the model
//! cannot be loaded.
//!
//! Both are synchronous. From async code call them inside
//! `tokio::task::spawn_blocking`.

pub mod error;
mod hash;

use std::path::PathBuf;
use std::sync::Mutex;

use fastembed::{EmbeddingModel, TextEmbedding, TextInitOptions};

pub use error::EmbeddingError;
pub use hash::HashEmbedder;

/// Turns text into fixed-size vectors.
pub trait Embedder: Send + Sync {
    /// One vector per input, in input order.
    ///
    /// # Errors
    ///
    /// Returns `EmbeddingError` when inference fails.
    fn embed_batch(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, EmbeddingError>;

    fn dimension(&self) -> usize;

    /// # Errors
    ///
    /// Returns `EmbeddingError::EmptyResult` if nothing comes back.
    fn embed_one(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.embed_batch(vec![text.to_string()])?
            .pop()
            .ok_or(EmbeddingError::EmptyResult)
    }
}

/// Model cache under the user cache dir, e.g. `~/.cache/lexora/fastembed`.
fn cache_dir() -> PathBuf {
    dirs::cache_dir().map_or_else(
        || PathBuf::from(".fastembed_cache"),
        |c| c.join("lexora").join("fastembed"),
    )
}

/// fastembed `AllMiniLML6V2` behind a mutex, since `embed` needs `&mut self`.
pub struct EmbeddingEngine {
    model: Mutex<TextEmbedding>,
}

impl EmbeddingEngine {
    /// Load the model, downloading it (~80MB) on first use.
    ///
    /// # Errors
    ///
    /// Returns [`EmbeddingError::InitFailed`] if download or ONNX setup fails.
    pub fn new() -> Result<Self, EmbeddingError> {
        let dir = cache_dir();
        tracing::info!(cache = %dir.display(), "loading embedding model");
        let model = TextEmbedding::try_new(
            TextInitOptions::new(EmbeddingModel::AllMiniLML6V2)
                .with_cache_dir(dir)
                .with_show_download_progress(false),
        )
        .map_err(|e| EmbeddingError::InitFailed(e.to_string()))?;
        Ok(Self {
            model: Mutex::new(model),
        })
    }
}

impl Embedder for EmbeddingEngine {
    fn embed_batch(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let expected = texts.len();
        let mut model = self
            .model
            .lock()
            .map_err(|_| EmbeddingError::EmbedFailed("embedding model lock poisoned".into()))?;
        let vectors = model
            .embed(texts, None)
            .map_err(|e| EmbeddingError::EmbedFailed(e.to_string()))?;
        if vectors.len() != expected {
            return Err(EmbeddingError::EmptyResult);
        }
        Ok(vectors)
    }

    fn dimension(&self) -> usize {
        384
    }
}

/// Cosine similarity. Zero when either vector is all zeros or the lengths differ.
#[must_use]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cosine_basics() {
        assert!((cosine_similarity(&[1.0, 0.0], &[2.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 3.0]).abs() < 1e-6);
        assert!((cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]) + 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]).abs() < f32::EPSILON);
        assert!(cosine_similarity(&[1.0], &[1.0, 0.0]).abs() < f32::EPSILON);
    }

    // Downloads the model; run with `cargo test -- --ignored`.
    #[test]
    #[ignore = "downloads the fastembed model"]
    fn engine_embeds_384_dims_and_clusters() {
        let engine = EmbeddingEngine::new().expect("engine should init");
        let vectors = engine
            .embed_batch(vec![
                "present simple tense for habits".into(),
                "we use the simple present for routines".into(),
                "chocolate cake recipe with buttercream".into(),
            ])
            .expect("embed should succeed");
        assert_eq!(vectors.len(), 3);
        assert!(vectors.iter().all(|v| v.len() == engine.dimension()));

        let related = cosine_similarity(&vectors[0], &vectors[1]);
        let unrelated = cosine_similarity(&vectors[0], &vectors[2]);
        assert!(related > unrelated, "{related:.3} vs {unrelated:.3}");
    }

    #[test]
    #[ignore = "downloads the fastembed model"]
    fn engine_is_deterministic() {
        let engine = EmbeddingEngine::new().expect("engine should init");
        let a = engine.embed_one("She goes to work every day.").unwrap();
        let b = engine.embed_one("She goes to work every day.").unwrap();
        assert_eq!(a, b);
    }
}
