// src/api.rs
//! HTTP surface over the digest pipeline.

use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shuttle_axum::axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use crate::ai_bootstrap::AiRuntime;
use crate::analysis::{client_factory, AnalysisFactory};
use crate::config::ai::DEFAULT_AI_CONFIG_PATH;
use crate::config::DigestConfig;
use crate::digest::{DigestPipeline, DigestStats, RunOptions, ScoreBreakdown};
use crate::embed::build_embedder;

/// Current pipeline behind a lock. Runs clone the inner `Arc`, so a reload never
/// affects a run already in flight.
#[derive(Clone)]
pub struct PipelineHandle {
    inner: Arc<RwLock<Arc<DigestPipeline>>>,
    analysis: AnalysisFactory,
    /// `None`: resolve via `DIGEST_CONFIG_PATH` / default path on every reload.
    config_path: Option<PathBuf>,
}

impl PipelineHandle {
    pub fn new(
        pipeline: DigestPipeline,
        analysis: AnalysisFactory,
        config_path: Option<PathBuf>,
    ) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Arc::new(pipeline))),
            analysis,
            config_path,
        }
    }

    pub fn current(&self) -> Arc<DigestPipeline> {
        match self.inner.read() {
            Ok(g) => g.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Re-read the TOML, rebuild embedder, analysis client and pipeline, swap them in.
    /// On error the running pipeline stays untouched.
    pub fn reload(&self) -> anyhow::Result<()> {
        let cfg = match &self.config_path {
            Some(p) => DigestConfig::load_from(p)?,
            None => DigestConfig::load()?,
        };
        let embedder = build_embedder(&cfg.embedder)?;
        let analysis = (self.analysis)(&cfg.analysis);
        let pipeline = DigestPipeline::new(Arc::new(cfg), embedder, analysis)
            .context("building pipeline from reloaded config")?;

        let mut guard = self
            .inner
            .write()
            .map_err(|_| anyhow::anyhow!("lock poisoned"))?;
        *guard = Arc::new(pipeline);
        Ok(())
    }
}

#[derive(Clone)]
pub struct AppState {
    pub pipeline: PipelineHandle,
}

impl AppState {
    /// Production wiring: digest config from env/defaults, analysis client from
    /// `config/ai.json` (missing file → analysis disabled).
    pub fn bootstrap() -> anyhow::Result<Self> {
        let cfg = DigestConfig::load().context("loading digest config")?;
        let ai = AiRuntime::from_path(DEFAULT_AI_CONFIG_PATH, &cfg.analysis)?;
        let embedder = build_embedder(&cfg.embedder)?;
        let pipeline = DigestPipeline::new(Arc::new(cfg), embedder, ai.client)?;
        info!(
            embedder = pipeline.embedder_name(),
            analysis = pipeline.analysis_provider(),
            "digest pipeline ready"
        );
        Ok(Self {
            pipeline: PipelineHandle::new(pipeline, client_factory(ai.cfg), None),
        })
    }

    pub fn new(pipeline: PipelineHandle) -> Self {
        Self { pipeline }
    }
}

pub fn router(state: AppState) -> Router {
    create_router(state)
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/digest", post(digest))
        .route("/score", post(score))
        .route("/config", get(current_config))
        .route("/admin/reload-config", post(admin_reload_config))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

#[derive(Deserialize)]
struct DigestReq {
    posts: Vec<String>,
    #[serde(default)]
    top_n: Option<usize>,
    #[serde(default)]
    sentences: Option<usize>,
}

#[derive(Serialize)]
struct DigestResp {
    groups: Vec<Vec<String>>,
    report: String,
    chunks: Vec<String>,
    stats: DigestStats,
    generated_at: DateTime<Utc>,
}

async fn digest(
    State(state): State<AppState>,
    Json(body): Json<DigestReq>,
) -> Result<Json<DigestResp>, (StatusCode, String)> {
    let opts = RunOptions::new(body.top_n, body.sentences)
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;

    let pipeline = state.pipeline.current();
    let out = pipeline.run_with(&body.posts, opts).await;

    let report_cfg = &pipeline.config().report;
    Ok(Json(DigestResp {
        groups: out.formatted_groups(&report_cfg.labels.item_marker),
        chunks: out.report.chunks(report_cfg.max_message_chars),
        report: out.report.text,
        stats: out.stats,
        generated_at: out.report.generated_at,
    }))
}

#[derive(Deserialize)]
struct ScoreReq {
    text: String,
}

async fn score(State(state): State<AppState>, Json(body): Json<ScoreReq>) -> Json<ScoreBreakdown> {
    let pipeline = state.pipeline.current();
    Json(pipeline.scorer().breakdown(&body.text))
}

async fn current_config(State(state): State<AppState>) -> Json<DigestConfig> {
    let pipeline = state.pipeline.current();
    Json(pipeline.config().as_ref().clone())
}

async fn admin_reload_config(State(state): State<AppState>) -> (StatusCode, String) {
    match state.pipeline.reload() {
        Ok(()) => {
            info!("digest config reloaded");
            (StatusCode::OK, "reloaded".to_string())
        }
        Err(e) => {
            warn!(error = %format!("{e:#}"), "config reload failed");
            (StatusCode::INTERNAL_SERVER_ERROR, format!("failed: {e:#}"))
        }
    }
}
