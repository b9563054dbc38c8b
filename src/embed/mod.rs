// src/embed/mod.rs
//! Embedding providers. The pipeline only sees `dyn Embedder`; the concrete provider
//! is picked from `[embedder]` in the digest config.

pub mod hashing;
pub mod tei;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::config::{EmbedderConfig, EmbedderKind};
use crate::error::EmbedError;

pub use hashing::HashingEmbedder;
pub use tei::TeiEmbedder;

/// Text to fixed-dimension vector. Must be deterministic for identical text and
/// model, and batching must not change per-item results.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// One vector per input, in input order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError>;

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        let mut out = self.embed_batch(&[text.to_string()]).await?;
        let got = out.len();
        match (out.pop(), got) {
            (Some(v), 1) => Ok(v),
            _ => Err(EmbedError::Mismatch { expected: 1, got }),
        }
    }

    fn dimension(&self) -> usize;

    fn name(&self) -> &'static str;
}

pub type DynEmbedder = Arc<dyn Embedder>;

/// `embed_batch` bounded by `timeout`; an elapsed timer becomes [`EmbedError::Timeout`].
pub async fn embed_with_timeout(
    embedder: &dyn Embedder,
    texts: &[String],
    timeout: Duration,
) -> Result<Vec<Vec<f32>>, EmbedError> {
    match tokio::time::timeout(timeout, embedder.embed_batch(texts)).await {
        Ok(res) => res,
        Err(_) => Err(EmbedError::Timeout(timeout)),
    }
}

/// Build the configured provider.
pub fn build_embedder(cfg: &EmbedderConfig) -> anyhow::Result<DynEmbedder> {
    match cfg.kind {
        EmbedderKind::Hashing => Ok(Arc::new(HashingEmbedder::new(cfg.dimension))),
        EmbedderKind::Tei => {
            let url = cfg
                .url
                .as_deref()
                .ok_or_else(|| anyhow::anyhow!("embedder.url is required for kind = \"tei\""))?;
            let client = TeiEmbedder::new(url, cfg.dimension, cfg.timeout())?;
            Ok(Arc::new(client))
        }
    }
}
