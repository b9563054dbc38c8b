// src/lib.rs
// Public library surface for integration tests, the HTTP binary and the demo.

pub mod analysis;
pub mod api;
pub mod config;
pub mod digest;
pub mod embed;
pub mod error;
pub mod metrics;

pub mod ai_bootstrap;

// ---- Re-exports for stable public API ----
pub use crate::api::router;
pub use crate::config::DigestConfig;
pub use crate::digest::{DigestOutput, DigestPipeline, DigestStats, RunOptions};
pub use crate::error::{ConfigError, EmbedError};

use tracing::info;

/// One-off smoke test of the analysis client. Never panics on a failed call; the
/// result is only logged.
///
/// Uses the same timeout and prompt cap as the running pipeline.
///
/// ```ignore
/// if let Err(e) = channel_digest::run_ai_quick_probe(&cfg.analysis).await {
///     tracing::warn!(error = ?e, "analysis quick probe didn't run");
/// }
/// ```
pub async fn run_ai_quick_probe(limits: &config::AnalysisLimits) -> anyhow::Result<()> {
    // Path is relative to the runtime working dir (repo root in `cargo shuttle run`)
    let ai = ai_bootstrap::AiRuntime::from_path(config::ai::DEFAULT_AI_CONFIG_PATH, limits)?;
    ai.quick_probe().await;
    info!("analysis quick probe finished");
    Ok(())
}
