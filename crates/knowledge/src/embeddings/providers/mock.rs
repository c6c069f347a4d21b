//! Deterministic offline embedding backend.

use crate::embeddings::provider::{BackendError, EmbeddingBackend};
use std::collections::HashMap;

/// Dimension used when none is configured.
pub const DEFAULT_MOCK_DIMENSIONS: usize = 384;

/// Mock backend for development without network access.
///
/// Hashes word trigrams into a fixed number of buckets and normalizes the
/// result. Vectors are content-dependent and stable across runs, which is
/// enough to exercise ranking against a CSV built with the same backend.
#[derive(Debug)]
pub struct MockBackend {
    dimensions: usize,
}

impl MockBackend {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }

    /// Embed one text.
    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut embedding = vec![0.0; self.dimensions];
        let lower = text.to_lowercase();

        let mut word_freq: HashMap<&str, u32> = HashMap::new();
        for word in lower.split_whitespace().filter(|w| w.chars().count() > 2) {
            *word_freq.entry(word).or_insert(0) += 1;
        }

        for (word, freq) in &word_freq {
            let chars: Vec<char> = word.chars().collect();
            for window in chars.windows(3) {
                let hash = window
                    .iter()
                    .fold(0u64, |acc, c| acc.wrapping_mul(37).wrapping_add(*c as u64));
                embedding[(hash as usize) % self.dimensions] += (*freq as f32).sqrt();
            }

            let word_hash = word
                .bytes()
                .fold(0u64, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u64));
            embedding[(word_hash as usize) % self.dimensions] += *freq as f32;
        }

        let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut embedding {
                *v /= norm;
            }
        }

        embedding
    }
}

#[async_trait::async_trait]
impl EmbeddingBackend for MockBackend {
    fn provider_name(&self) -> &str {
        "mock"
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, BackendError> {
        Ok(texts.iter().map(|text| self.embed_text(text)).collect())
    }
}
