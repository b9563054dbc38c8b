// src/embed/tei.rs
//! Text Embeddings Inference client (`POST {url}/embed`).

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tracing::debug;

use super::Embedder;
use crate::error::EmbedError;

/// Maximum number of texts per /embed call.
const BATCH_SIZE: usize = 64;

pub struct TeiEmbedder {
    http: reqwest::Client,
    url: String,
    dimension: usize,
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    inputs: &'a [String],
}

impl TeiEmbedder {
    pub fn new(base_url: &str, dimension: usize, timeout: Duration) -> Result<Self, EmbedError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("channel-digest/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(4))
            .timeout(timeout)
            .build()?;
        Ok(Self {
            http,
            url: format!("{}/embed", base_url.trim_end_matches('/')),
            dimension,
        })
    }
}

#[async_trait]
impl Embedder for TeiEmbedder {
    /// Texts are sent in groups of [`BATCH_SIZE`]; any failed group fails the batch.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
        let mut all = Vec::with_capacity(texts.len());

        for chunk in texts.chunks(BATCH_SIZE) {
            let resp = self
                .http
                .post(&self.url)
                .json(&EmbedRequest { inputs: chunk })
                .send()
                .await?;

            let status = resp.status();
            if !status.is_success() {
                return Err(EmbedError::Status(status.as_u16()));
            }

            let body = resp.bytes().await?;
            let vectors: Vec<Vec<f32>> = serde_json::from_slice(&body)?;
            if vectors.len() != chunk.len() {
                return Err(EmbedError::Mismatch {
                    expected: chunk.len(),
                    got: vectors.len(),
                });
            }
            if let Some(bad) = vectors.iter().find(|v| v.len() != self.dimension) {
                return Err(EmbedError::Dimension {
                    expected: self.dimension,
                    got: bad.len(),
                });
            }
            debug!(count = chunk.len(), "tei batch embedded");
            all.extend(vectors);
        }

        Ok(all)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn name(&self) -> &'static str {
        "tei"
    }
}
