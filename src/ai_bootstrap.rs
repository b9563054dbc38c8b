// src/ai_bootstrap.rs
use std::path::Path;

use tracing::{info, warn};

use crate::analysis::{build_client_from_config, DynAnalysisClient};
use crate::config::ai::AiConfig;
use crate::config::AnalysisLimits;

pub struct AiRuntime {
    pub cfg: AiConfig,
    pub client: DynAnalysisClient,
}

impl AiRuntime {
    pub fn from_path<P: AsRef<Path>>(path: P, limits: &AnalysisLimits) -> anyhow::Result<Self> {
        let cfg = AiConfig::load_or_disabled(path)?;
        // Safe diagnostics: only provider + enabled + key length
        info!(
            provider = %cfg.provider,
            enabled = cfg.enabled,
            model = %cfg.model,
            key_len = cfg.api_key.len(),
            "analysis config loaded"
        );
        let client = build_client_from_config(&cfg, limits);
        Ok(Self { cfg, client })
    }

    pub async fn quick_probe(&self) {
        if !self.cfg.enabled {
            warn!("analysis quick_probe skipped: disabled in config");
            return;
        }
        let sample = "Новость 1: Нефть марки Brent подорожала на 2,5% до 85,46 доллара за баррель.";
        let out = self.client.analyze(sample).await;
        info!(
            provider = self.client.provider_name(),
            ok = out.is_some(),
            chars = out.as_deref().map_or(0, |s| s.chars().count()),
            "analysis quick_probe finished"
        );
    }
}
