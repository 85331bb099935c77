//! Embedding computation with a deterministic fallback.
//!
//! A real semantic embedding model is out of scope (it's an external
//! collaborator, not something this crate ships); grounded on
//! `original_source/memory/embeddings.py`, the store stays operational
//! without one by hashing text into a unit vector instead. Similarity
//! scores from the fallback are not semantically meaningful beyond
//! exact/near-exact text matches, but every code path that consumes an
//! embedding keeps working.

use sha2::{Digest, Sha384};

pub const EMBEDDING_DIM: usize = 384;

/// Produces an embedding vector for a piece of text.
pub trait Embedder: Send + Sync {
    fn embed(&self, text: &str) -> Vec<f32>;

    fn embed_batch(&self, texts: &[String]) -> Vec<Vec<f32>> {
        texts.iter().map(|t| self.embed(t)).collect()
    }
}

/// SHA-384-hash-derived embedding. Used whenever no real model is wired
/// in, which today is always — this is the only `Embedder` this crate
/// ships.
pub struct FallbackEmbedder;

impl Embedder for FallbackEmbedder {
    fn embed(&self, text: &str) -> Vec<f32> {
        fallback_embed(text)
    }
}

pub fn fallback_embed(text: &str) -> Vec<f32> {
    let mut values = Vec::with_capacity(EMBEDDING_DIM);
    let mut seed = text.as_bytes().to_vec();

    while values.len() < EMBEDDING_DIM {
        let mut hasher = Sha384::new();
        hasher.update(&seed);
        let digest = hasher.finalize();
        for byte in digest.iter() {
            if values.len() == EMBEDDING_DIM {
                break;
            }
            values.push((*byte as f32 / 255.0) * 2.0 - 1.0);
        }
        seed = digest.to_vec();
    }

    normalize(&mut values);
    values
}

fn normalize(v: &mut [f32]) {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}

/// Cosine similarity between two vectors of equal length. Returns 0.0 for
/// mismatched lengths or a zero vector rather than panicking.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_embed_is_deterministic() {
        let a = fallback_embed("sort a list of numbers");
        let b = fallback_embed("sort a list of numbers");
        assert_eq!(a, b);
    }

    #[test]
    fn fallback_embed_has_expected_dimension() {
        let v = fallback_embed("anything");
        assert_eq!(v.len(), EMBEDDING_DIM);
    }

    #[test]
    fn fallback_embed_differs_for_different_text() {
        let a = fallback_embed("fetch the weather");
        let b = fallback_embed("compute a fibonacci number");
        assert_ne!(a, b);
    }

    #[test]
    fn cosine_similarity_identical_vectors_is_one() {
        let v = fallback_embed("same text");
        let sim = cosine_similarity(&v, &v);
        assert!((sim - 1.0).abs() < 1e-4);
    }

    #[test]
    fn cosine_similarity_mismatched_length_is_zero() {
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[1.0, 0.0, 0.0]), 0.0);
    }

    #[test]
    fn fallback_embedder_trait_object() {
        let embedder: Box<dyn Embedder> = Box::new(FallbackEmbedder);
        let batch = embedder.embed_batch(&["a".to_string(), "b".to_string()]);
        assert_eq!(batch.len(), 2);
    }
}
