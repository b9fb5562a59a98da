//! Feature-hashing embedder.
//!
//! Each lowercase word is hashed (FNV-1a) into one of `dimension` buckets;
//! the bucket counts are L2-normalized. Texts sharing words get a positive
//! cosine similarity, which is all retrieval tests need.

use crate::Embedder;
use crate::error::EmbeddingError;

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0100_0000_01b3;

#[derive(Debug, Clone, Copy)]
pub struct HashEmbedder {
    dimension: usize,
}

impl HashEmbedder {
    #[must_use]
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }

    fn bucket(&self, word: &str) -> usize {
        let hash = word
            .bytes()
            .fold(FNV_OFFSET, |h, b| (h ^ u64::from(b)).wrapping_mul(FNV_PRIME));
        // Modulo of a u64 by a usize bucket count always fits back in usize.
        usize::try_from(hash % self.dimension as u64).unwrap_or_default()
    }

    fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0.0_f32; self.dimension];
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            v[self.bucket(&word.to_lowercase())] += 1.0;
        }
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut v {
                *x /= norm;
            }
        }
        v
    }
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self::new(384)
    }
}

impl Embedder for HashEmbedder {
    fn embed_batch(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Ok(texts.iter().map(|t| self.embed_text(t)).collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::cosine_similarity;

    #[test]
    fn shared_words_score_higher() {
        let e = HashEmbedder::default();
        let q = e.embed_one("present perfect tense").unwrap();
        let near = e.embed_one("The present perfect tense links past and now").unwrap();
        let far = e.embed_one("Invoices are due on Friday").unwrap();
        assert_eq!(q.len(), 384);
        assert!(cosine_similarity(&q, &near) > cosine_similarity(&q, &far));
    }

    #[test]
    fn empty_text_is_zero_vector() {
        let e = HashEmbedder::new(8);
        assert_eq!(e.embed_one("").unwrap(), vec![0.0; 8]);
    }

    #[test]
    fn case_insensitive_and_deterministic() {
        let e = HashEmbedder::new(64);
        assert_eq!(e.embed_one("Grammar").unwrap(), e.embed_one("grammar").unwrap());
    }
}
