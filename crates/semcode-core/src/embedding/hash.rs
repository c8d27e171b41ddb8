//! Local feature-hashing embedder
//!
//! Deterministic, dependency-free vectors: identifier-aware tokens and their
//! character trigrams are hashed with blake3 into signed buckets, then the
//! vector is L2-normalised. Texts sharing vocabulary land close together,
//! which is enough for code search without a neural model.

use super::Embedder;
use crate::error::{Error, Result};
use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;

pub const DEFAULT_DIMENSIONS: usize = 384;

const TOKEN_WEIGHT: f32 = 1.0;
const SUBWORD_WEIGHT: f32 = 0.8;
const TRIGRAM_WEIGHT: f32 = 0.25;

lazy_static! {
    static ref WORD_RE: Regex = Regex::new(r"[A-Za-z0-9_]+").expect("valid word regex");
    static ref CAMEL_RE: Regex =
        Regex::new(r"[A-Z]+[a-z0-9]*|[a-z0-9]+").expect("valid camel-case regex");
}

pub struct HashEmbedder {
    dimensions: usize,
    model: String,
}

impl HashEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
            model: format!("feature-hash-{}", dimensions.max(1)),
        }
    }

    pub fn embed_sync(&self, text: &str) -> Vec<f32> {
        embed_text(text, self.dimensions)
    }
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self::new(DEFAULT_DIMENSIONS)
    }
}

#[async_trait]
impl Embedder for HashEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.embed_sync(text))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let dims = self.dimensions;
        let texts = texts.to_vec();
        tokio::task::spawn_blocking(move || texts.iter().map(|t| embed_text(t, dims)).collect())
            .await
            .map_err(|e| Error::ExternalError(format!("embedding task failed: {}", e)))
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Lower-cased words plus the snake_case / camelCase parts of identifiers
pub fn identifier_tokens(text: &str) -> Vec<(String, f32)> {
    let mut tokens = Vec::new();
    for word in WORD_RE.find_iter(text) {
        let word = word.as_str();
        let lower = word.to_lowercase();

        let parts: Vec<String> = word
            .split('_')
            .flat_map(|piece| CAMEL_RE.find_iter(piece).map(|m| m.as_str().to_lowercase()))
            .filter(|p| !p.is_empty())
            .collect();

        if parts.len() > 1 {
            for part in parts {
                tokens.push((part, SUBWORD_WEIGHT));
            }
        }
        tokens.push((lower, TOKEN_WEIGHT));
    }
    tokens
}

fn embed_text(text: &str, dims: usize) -> Vec<f32> {
    let mut vector = vec![0.0f32; dims];

    for (token, weight) in identifier_tokens(text) {
        add_feature(&mut vector, token.as_bytes(), weight);

        let padded: Vec<char> = format!("^{}$", token).chars().collect();
        if padded.len() > 4 {
            for window in padded.windows(3) {
                let trigram: String = window.iter().collect();
                add_feature(&mut vector, trigram.as_bytes(), TRIGRAM_WEIGHT * weight);
            }
        }
    }

    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        vector.iter_mut().for_each(|x| *x /= norm);
    }
    vector
}

fn add_feature(vector: &mut [f32], feature: &[u8], weight: f32) {
    let hash = blake3::hash(feature);
    let bytes = hash.as_bytes();
    let mut index_bytes = [0u8; 8];
    index_bytes.copy_from_slice(&bytes[..8]);
    let index = (u64::from_le_bytes(index_bytes) % vector.len() as u64) as usize;
    let sign = if bytes[8] & 1 == 0 { 1.0 } else { -1.0 };
    vector[index] += sign * weight;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::cosine_similarity;

    #[test]
    fn test_identifier_tokens_split_snake_and_camel() {
        let tokens: Vec<String> = identifier_tokens("parse_config loadHTTPConfig")
            .into_iter()
            .map(|(t, _)| t)
            .collect();
        assert!(tokens.contains(&"parse_config".to_string()));
        assert!(tokens.contains(&"parse".to_string()));
        assert!(tokens.contains(&"config".to_string()));
        assert!(tokens.contains(&"loadhttpconfig".to_string()));
        assert!(tokens.contains(&"load".to_string()));
    }

    #[tokio::test]
    async fn test_deterministic_and_normalized() {
        let embedder = HashEmbedder::default();
        let a = embedder.embed("fn parse_config(path: &Path)").await.unwrap();
        let b = embedder.embed("fn parse_config(path: &Path)").await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), DEFAULT_DIMENSIONS);
        let norm: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-4);
    }

    #[tokio::test]
    async fn test_batch_preserves_order() {
        let embedder = HashEmbedder::new(64);
        let texts = vec!["alpha".to_string(), "beta gamma".to_string()];
        let batch = embedder.embed_batch(&texts).await.unwrap();
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[0], embedder.embed_sync("alpha"));
        assert_eq!(batch[1], embedder.embed_sync("beta gamma"));
    }

    #[test]
    fn test_shared_vocabulary_is_closer() {
        let embedder = HashEmbedder::default();
        let query = embedder.embed_sync("load configuration");
        let related = embedder.embed_sync("def load_configuration(path):\n    \"\"\"Load the configuration file.\"\"\"");
        let unrelated = embedder.embed_sync("def render_sprite(canvas):\n    draw(canvas)");
        assert!(cosine_similarity(&query, &related) > cosine_similarity(&query, &unrelated));
    }

    #[test]
    fn test_empty_text_is_zero_vector() {
        let v = HashEmbedder::new(8).embed_sync("  ");
        assert!(v.iter().all(|x| *x == 0.0));
    }
}
