// src/config/mod.rs
pub mod ai;
pub mod digest;

pub use ai::AiConfig;
pub use digest::{
    AnalysisLimits, DedupConfig, DigestConfig, EmbedderConfig, EmbedderKind, GroupingConfig,
    ReportConfig, ReportLabels, ScoringConfig, ScoringWeights, SegmenterConfig, SummaryConfig,
    WeightPreset,
};
