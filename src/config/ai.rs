// src/config/ai.rs
use serde::{Deserialize, Serialize};
use std::{env, fs, path::Path};

pub const DEFAULT_AI_CONFIG_PATH: &str = "config/ai.json";
pub const MISTRAL_BASE_URL: &str = "https://api.mistral.ai/v1";

fn default_provider() -> String {
    "mistral".to_string()
}
fn default_model() -> String {
    "mistral-medium".to_string()
}
fn default_base_url() -> String {
    MISTRAL_BASE_URL.to_string()
}
fn default_max_tokens() -> u32 {
    600
}
fn default_temperature() -> f32 {
    0.2
}

/// Summarization-service settings, loaded from `config/ai.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    pub enabled: bool,
    /// Only "mistral" is implemented (case-insensitive).
    #[serde(default = "default_provider")]
    pub provider: String,
    /// "ENV" means: read from MISTRAL_API_KEY.
    #[serde(default, skip_serializing)]
    pub api_key: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            provider: default_provider(),
            api_key: String::new(),
            model: default_model(),
            base_url: default_base_url(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
        }
    }
}

impl AiConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let data = fs::read_to_string(path)?;
        Self::from_json_str(&data)
    }

    /// Missing file → disabled config. A present but broken file is still an error.
    pub fn load_or_disabled<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        if !path.as_ref().exists() {
            return Ok(Self::default());
        }
        Self::load_from_file(path)
    }

    pub fn from_json_str(data: &str) -> anyhow::Result<Self> {
        let mut cfg: AiConfig = serde_json::from_str(data)?;

        // Normalize provider
        cfg.provider = cfg.provider.to_lowercase();
        if cfg.provider != "mistral" {
            anyhow::bail!("Unsupported provider in config: {}", cfg.provider);
        }

        // Resolve api key if "ENV"
        if cfg.api_key.trim().eq_ignore_ascii_case("env") {
            cfg.api_key = if cfg.enabled {
                env::var("MISTRAL_API_KEY")
                    .map_err(|_| anyhow::anyhow!("Missing MISTRAL_API_KEY env var"))?
            } else {
                env::var("MISTRAL_API_KEY").unwrap_or_default()
            };
        }

        if !(0.0..=2.0).contains(&cfg.temperature) {
            anyhow::bail!("temperature {} is outside 0.0..=2.0", cfg.temperature);
        }
        if cfg.max_tokens == 0 {
            anyhow::bail!("max_tokens must be at least 1");
        }

        Ok(cfg)
    }
}
