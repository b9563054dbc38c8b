// src/config/digest.rs
//! Digest pipeline configuration loaded from `config/digest.toml`.
//!
//! Every field has a documented default, so an empty file (or no file at all) yields a
//! working configuration. Lookup order:
//! 1) `$DIGEST_CONFIG_PATH` (must exist when set)
//! 2) `config/digest.toml`
//! 3) built-in defaults
//!
//! After parsing, `DIGEST_DEDUP_THRESHOLD`, `DIGEST_TOP_N` and `DIGEST_SENTENCES` may
//! override single values. The result is validated; invalid values are rejected, not
//! clamped.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::ConfigError;

pub const DEFAULT_DIGEST_CONFIG_PATH: &str = "config/digest.toml";
pub const ENV_DIGEST_CONFIG_PATH: &str = "DIGEST_CONFIG_PATH";
pub const ENV_DEDUP_THRESHOLD: &str = "DIGEST_DEDUP_THRESHOLD";
pub const ENV_TOP_N: &str = "DIGEST_TOP_N";
pub const ENV_SENTENCES: &str = "DIGEST_SENTENCES";

/// Full pipeline configuration. Cheap to clone; shared as `Arc<DigestConfig>` snapshots.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DigestConfig {
    pub segmenter: SegmenterConfig,
    pub scoring: ScoringConfig,
    pub summary: SummaryConfig,
    pub grouping: GroupingConfig,
    pub dedup: DedupConfig,
    pub embedder: EmbedderConfig,
    pub report: ReportConfig,
    pub analysis: AnalysisLimits,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmenterConfig {
    /// Sentences must be strictly longer than this (in characters).
    pub min_chars: usize,
    /// Sentences must be strictly shorter than this (in characters).
    pub max_chars: usize,
    /// Characters replaced by a space before splitting (bullets, stray ampersands).
    pub decorative_glyphs: String,
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            min_chars: 20,
            max_chars: 500,
            decorative_glyphs: "■•&▪►".to_string(),
        }
    }
}

/// Named weighting schemes. `compact` is the scheme used for report generation;
/// `embedding` is the older scheme with an emotion term and a longer length norm.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeightPreset {
    #[default]
    Compact,
    Embedding,
    Custom,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringWeights {
    pub keyword: f32,
    pub numeric: f32,
    pub entity: f32,
    #[serde(default)]
    pub emotion: f32,
    pub length: f32,
    /// Character count at which the length signal saturates at 1.0.
    #[serde(default = "default_length_norm")]
    pub length_norm: f32,
}

fn default_length_norm() -> f32 {
    400.0
}

impl ScoringWeights {
    pub const fn compact() -> Self {
        Self {
            keyword: 0.5,
            numeric: 0.3,
            entity: 0.2,
            emotion: 0.0,
            length: 0.1,
            length_norm: 400.0,
        }
    }

    pub const fn embedding() -> Self {
        Self {
            keyword: 0.4,
            numeric: 0.2,
            entity: 0.0,
            emotion: 0.2,
            length: 0.2,
            length_norm: 1000.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub preset: WeightPreset,
    /// Required when `preset = "custom"`, ignored otherwise.
    pub weights: Option<ScoringWeights>,
    /// Overrides the preset's length norm.
    pub length_norm: Option<f32>,
    pub keywords: Vec<String>,
    pub entities: Vec<String>,
    pub emotional_words: Vec<String>,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            preset: WeightPreset::Compact,
            weights: None,
            length_norm: None,
            keywords: to_strings(&[
                "финансы",
                "акции",
                "нефть",
                "газ",
                "экономика",
                "курс",
                "биржа",
                "дивиденды",
                "криптовалюта",
                "инвестиции",
            ]),
            entities: to_strings(&[
                "USD",
                "EUR",
                "RUB",
                "нефть",
                "газ",
                "акции",
                "дивиденды",
                "прибыль",
                "кредит",
            ]),
            emotional_words: to_strings(&["рост", "падение", "кризис", "прорыв", "рекорд"]),
        }
    }
}

impl ScoringConfig {
    /// The weights actually applied: preset (or custom table) plus the optional norm override.
    pub fn resolved_weights(&self) -> Result<ScoringWeights, ConfigError> {
        let mut w = match self.preset {
            WeightPreset::Compact => ScoringWeights::compact(),
            WeightPreset::Embedding => ScoringWeights::embedding(),
            WeightPreset::Custom => self.weights.ok_or(ConfigError::MissingCustomWeights)?,
        };
        if let Some(norm) = self.length_norm {
            w.length_norm = norm;
        }
        Ok(w)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SummaryConfig {
    /// Top-scoring sentences kept per post.
    pub sentences_in_summary: usize,
    /// Posts of at most this many characters are dropped before segmentation.
    pub min_post_chars: usize,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            sentences_in_summary: 2,
            min_post_chars: 50,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupingConfig {
    /// Items per output group ("post").
    pub top_n: usize,
}

impl Default for GroupingConfig {
    fn default() -> Self {
        Self { top_n: 3 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DedupConfig {
    /// Cosine similarity above which the later item of a pair is discarded.
    pub threshold: f32,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self { threshold: 0.85 }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbedderKind {
    /// Local feature-hashing embedder (no network).
    #[default]
    Hashing,
    /// Text Embeddings Inference server.
    Tei,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbedderConfig {
    pub kind: EmbedderKind,
    /// Base URL of the TEI server (e.g. `http://localhost:8080`).
    pub url: Option<String>,
    pub dimension: usize,
    pub timeout_secs: u64,
}

impl Default for EmbedderConfig {
    fn default() -> Self {
        Self {
            kind: EmbedderKind::Hashing,
            url: None,
            dimension: 384,
            timeout_secs: 20,
        }
    }
}

impl EmbedderConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Display strings of the rendered report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportLabels {
    pub title: String,
    pub block: String,
    pub conclusions: String,
    pub no_data: String,
    pub analysis_unavailable: String,
    pub footer: String,
    pub bullet: String,
    pub item_marker: String,
    pub prompt_item: String,
}

impl Default for ReportLabels {
    fn default() -> Self {
        Self {
            title: "ФИНАНСОВЫЙ БЮЛЛЕТЕНЬ".to_string(),
            block: "Блок".to_string(),
            conclusions: "КЛЮЧЕВЫЕ ВЫВОДЫ:".to_string(),
            no_data: "⚠ Нет данных для анализа".to_string(),
            analysis_unavailable: "Анализ недоступен. Рекомендуем проверить подключение."
                .to_string(),
            footer: "Отчет сгенерирован автоматически".to_string(),
            bullet: "→".to_string(),
            item_marker: "📌".to_string(),
            prompt_item: "Новость".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Width of rules, headers and centered lines.
    pub line_width: usize,
    /// Maximum width of wrapped item lines (indent included).
    pub wrap_width: usize,
    /// Item text is cut to this many characters before wrapping.
    pub item_char_cap: usize,
    /// Delivery chunk size (messaging transport limit).
    pub max_message_chars: usize,
    pub labels: ReportLabels,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            line_width: 60,
            wrap_width: 58,
            item_char_cap: 300,
            max_message_chars: 4096,
            labels: ReportLabels::default(),
        }
    }
}

/// Limits around the summarization-service call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisLimits {
    pub timeout_secs: u64,
    /// Per-item character cap inside the prompt.
    pub prompt_item_cap: usize,
    /// Total prompt character cap.
    pub prompt_char_cap: usize,
}

impl Default for AnalysisLimits {
    fn default() -> Self {
        Self {
            timeout_secs: 20,
            prompt_item_cap: 200,
            prompt_char_cap: 3500,
        }
    }
}

impl AnalysisLimits {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl DigestConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let cfg: DigestConfig = toml::from_str(s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load from an explicit path, apply env overrides, validate.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading digest config from {}", path.display()))?;
        let mut cfg: DigestConfig = toml::from_str(&content)
            .map_err(ConfigError::from)
            .with_context(|| format!("parsing {}", path.display()))?;
        cfg.apply_overrides(|k| std::env::var(k).ok())?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Resolve the config path from env + fallbacks and load it.
    pub fn load() -> anyhow::Result<Self> {
        if let Ok(p) = std::env::var(ENV_DIGEST_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(anyhow!(
                    "{ENV_DIGEST_CONFIG_PATH} points to non-existent path {}",
                    pb.display()
                ));
            }
            return Self::load_from(&pb);
        }
        let default_path = PathBuf::from(DEFAULT_DIGEST_CONFIG_PATH);
        if default_path.exists() {
            return Self::load_from(&default_path);
        }
        info!(
            path = DEFAULT_DIGEST_CONFIG_PATH,
            "digest config not found, using built-in defaults"
        );
        let mut cfg = DigestConfig::default();
        cfg.apply_overrides(|k| std::env::var(k).ok())?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Apply single-value overrides. `lookup` is `std::env::var` in production.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(ENV_DEDUP_THRESHOLD) {
            self.dedup.threshold = raw.trim().parse().map_err(|_| ConfigError::Env {
                var: ENV_DEDUP_THRESHOLD,
                value: raw.clone(),
            })?;
        }
        if let Some(raw) = lookup(ENV_TOP_N) {
            self.grouping.top_n = raw.trim().parse().map_err(|_| ConfigError::Env {
                var: ENV_TOP_N,
                value: raw.clone(),
            })?;
        }
        if let Some(raw) = lookup(ENV_SENTENCES) {
            self.summary.sentences_in_summary =
                raw.trim().parse().map_err(|_| ConfigError::Env {
                    var: ENV_SENTENCES,
                    value: raw.clone(),
                })?;
        }
        Ok(())
    }

    /// Reject anything the pipeline cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let seg = &self.segmenter;
        if seg.min_chars >= seg.max_chars {
            return Err(ConfigError::InvertedBounds {
                min: seg.min_chars,
                max: seg.max_chars,
            });
        }

        let w = self.scoring.resolved_weights()?;
        for (field, value) in [
            ("scoring.weights.keyword", w.keyword),
            ("scoring.weights.numeric", w.numeric),
            ("scoring.weights.entity", w.entity),
            ("scoring.weights.emotion", w.emotion),
            ("scoring.weights.length", w.length),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::OutOfRange {
                    field,
                    value: f64::from(value),
                    expected: "finite and >= 0",
                });
            }
        }
        if w.keyword + w.numeric + w.entity + w.emotion + w.length <= 0.0 {
            return Err(ConfigError::ZeroWeights);
        }
        if !w.length_norm.is_finite() || w.length_norm <= 0.0 {
            return Err(ConfigError::OutOfRange {
                field: "scoring.length_norm",
                value: f64::from(w.length_norm),
                expected: "finite and > 0",
            });
        }
        for (field, list) in [
            ("scoring.keywords", &self.scoring.keywords),
            ("scoring.entities", &self.scoring.entities),
            ("scoring.emotional_words", &self.scoring.emotional_words),
        ] {
            if list.iter().any(|t| t.trim().is_empty()) {
                return Err(ConfigError::BlankToken { field });
            }
        }

        require_nonzero("summary.sentences_in_summary", self.summary.sentences_in_summary)?;
        require_nonzero("grouping.top_n", self.grouping.top_n)?;

        let t = self.dedup.threshold;
        if !t.is_finite() || !(-1.0..=1.0).contains(&t) {
            return Err(ConfigError::OutOfRange {
                field: "dedup.threshold",
                value: f64::from(t),
                expected: "a cosine similarity in [-1.0, 1.0]",
            });
        }

        require_nonzero("embedder.dimension", self.embedder.dimension)?;
        require_nonzero("embedder.timeout_secs", self.embedder.timeout_secs as usize)?;
        if self.embedder.kind == EmbedderKind::Tei
            && self.embedder.url.as_deref().map_or(true, |u| u.trim().is_empty())
        {
            return Err(ConfigError::MissingEmbedderUrl);
        }

        let r = &self.report;
        require_nonzero("report.item_char_cap", r.item_char_cap)?;
        require_nonzero("report.max_message_chars", r.max_message_chars)?;
        if r.wrap_width < 10 || r.wrap_width > r.line_width {
            return Err(ConfigError::OutOfRange {
                field: "report.wrap_width",
                value: r.wrap_width as f64,
                expected: "10..=report.line_width",
            });
        }

        require_nonzero("analysis.timeout_secs", self.analysis.timeout_secs as usize)?;
        require_nonzero("analysis.prompt_item_cap", self.analysis.prompt_item_cap)?;
        require_nonzero("analysis.prompt_char_cap", self.analysis.prompt_char_cap)?;

        Ok(())
    }
}

fn require_nonzero(field: &'static str, value: usize) -> Result<(), ConfigError> {
    if value == 0 {
        Err(ConfigError::Zero { field })
    } else {
        Ok(())
    }
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        DigestConfig::default().validate().unwrap();
    }

    #[test]
    fn empty_toml_yields_defaults() {
        let cfg = DigestConfig::from_toml_str("").unwrap();
        assert_eq!(cfg, DigestConfig::default());
    }

    #[test]
    fn defaults_roundtrip_through_toml() {
        let cfg = DigestConfig::default();
        let s = toml::to_string(&cfg).unwrap();
        let back = DigestConfig::from_toml_str(&s).unwrap();
        assert_eq!(back, cfg);
    }

    #[test]
    fn presets_resolve_to_documented_weights() {
        let mut sc = ScoringConfig::default();
        assert_eq!(sc.resolved_weights().unwrap(), ScoringWeights::compact());

        sc.preset = WeightPreset::Embedding;
        let w = sc.resolved_weights().unwrap();
        assert_eq!(w, ScoringWeights::embedding());

        sc.length_norm = Some(250.0);
        assert_eq!(sc.resolved_weights().unwrap().length_norm, 250.0);
    }

    #[test]
    fn custom_preset_without_weights_is_rejected() {
        let err = DigestConfig::from_toml_str(
            r#"
[scoring]
preset = "custom"
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::MissingCustomWeights));
    }

    #[test]
    fn custom_weights_are_used() {
        let cfg = DigestConfig::from_toml_str(
            r#"
[scoring]
preset = "custom"
[scoring.weights]
keyword = 1.0
numeric = 0.0
entity = 0.0
length = 0.0
"#,
        )
        .unwrap();
        let w = cfg.scoring.resolved_weights().unwrap();
        assert_eq!(w.keyword, 1.0);
        assert_eq!(w.emotion, 0.0);
        assert_eq!(w.length_norm, 400.0);
    }

    #[test]
    fn overrides_parse_and_reject_garbage() {
        let mut cfg = DigestConfig::default();
        cfg.apply_overrides(|k| match k {
            ENV_DEDUP_THRESHOLD => Some("0.9".into()),
            ENV_TOP_N => Some(" 5 ".into()),
            _ => None,
        })
        .unwrap();
        assert_eq!(cfg.dedup.threshold, 0.9);
        assert_eq!(cfg.grouping.top_n, 5);
        assert_eq!(cfg.summary.sentences_in_summary, 2);

        let err = cfg
            .apply_overrides(|k| (k == ENV_SENTENCES).then(|| "two".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Env { var: ENV_SENTENCES, .. }));
    }
}
