// src/embed/hashing.rs
//! Local feature-hashing embedder: lowercased word unigrams (weight 1.0) and bigrams
//! (weight 0.7) are hashed into a fixed number of buckets, then L2-normalised.
//! No model and no network. Lexical overlap only: near-verbatim copies (a word or
//! two changed, different punctuation or case) clear the default 0.85 threshold,
//! paraphrases usually land around 0.5 and survive. Use the `tei` embedder when
//! reworded duplicates must be caught.

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use super::Embedder;
use crate::error::EmbedError;

const UNIGRAM_WEIGHT: f32 = 1.0;
const BIGRAM_WEIGHT: f32 = 0.7;

#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dimension: usize,
}

impl HashingEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }

    /// All-zero vector for text without words.
    pub fn vector(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0.0f32; self.dimension];
        let lower = text.to_lowercase();
        let words: Vec<&str> = lower
            .split_whitespace()
            .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()))
            .filter(|w| !w.is_empty())
            .collect();

        for w in &words {
            if w.chars().count() >= 2 {
                hash_into(&mut v, w, UNIGRAM_WEIGHT);
            }
        }
        for pair in words.windows(2) {
            hash_into(&mut v, &format!("{}_{}", pair[0], pair[1]), BIGRAM_WEIGHT);
        }

        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            v.iter_mut().for_each(|x| *x /= norm);
        }
        v
    }
}

#[async_trait]
impl Embedder for HashingEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
        Ok(texts.iter().map(|t| self.vector(t)).collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn name(&self) -> &'static str {
        "hashing"
    }
}

/// Signed bucket from the first digest bytes, plus a half-weight second bucket.
fn hash_into(v: &mut [f32], term: &str, weight: f32) {
    let digest = Sha256::digest(term.as_bytes());
    let dim = v.len();

    let idx = u32::from_le_bytes([digest[0], digest[1], digest[2], digest[3]]) as usize % dim;
    let sign = if digest[4] & 1 == 0 { 1.0 } else { -1.0 };
    v[idx] += sign * weight;

    let idx2 = u32::from_le_bytes([digest[5], digest[6], digest[7], digest[8]]) as usize % dim;
    let sign2 = if digest[9] & 1 == 0 { 1.0 } else { -1.0 };
    v[idx2] += sign2 * weight * 0.5;
}
