// src/digest/mod.rs
//! Digest pipeline: segment → score → summarize → embed → dedupe → rank/group → render.
//!
//! Scores are computed before deduplication so they stay stable regardless of which
//! items get removed. Collaborator failures never abort a run:
//! - embedding failure/timeout: dedup is skipped for the batch, items carry an empty
//!   placeholder embedding
//! - analysis failure/timeout: the report prints the "analysis unavailable" notice

pub mod dedup;
pub mod rank;
pub mod report;
pub mod scoring;
pub mod segment;
pub mod summarize;
pub mod types;

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Instant;

use metrics::{counter, describe_counter, describe_histogram, histogram};
use once_cell::sync::OnceCell;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::analysis::{format_prompt, DynAnalysisClient};
use crate::config::DigestConfig;
use crate::embed::{embed_with_timeout, DynEmbedder};
use crate::error::{ConfigError, EmbedError};

pub use dedup::{cosine_similarity, dedupe};
pub use rank::rank_and_group;
pub use report::{chunk_report, Report, ReportFormatter};
pub use scoring::{LexicalScorer, ScoreBreakdown, Scorer};
pub use segment::{RuleSegmenter, Segmenter};
pub use summarize::{Summarizer, Summary};
pub use types::{Group, ProcessedItem, ScoredSentence, Sentence};

/// One-time metrics registration (so series show up on /metrics).
pub fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("digest_posts_received_total", "Posts submitted to the pipeline.");
        describe_counter!(
            "digest_posts_dropped_total",
            "Posts dropped before summarization, by reason."
        );
        describe_counter!(
            "digest_duplicates_total",
            "Items removed as near-duplicates."
        );
        describe_counter!(
            "digest_embed_failures_total",
            "Batches whose embedding call failed or timed out."
        );
        describe_counter!(
            "digest_analysis_fallbacks_total",
            "Reports rendered without analysis."
        );
        describe_histogram!("digest_run_ms", "Pipeline run time in milliseconds.");
    });
}

/// Short sha256 prefix; raw post text is never logged.
pub(crate) fn anon_hash(text: &str) -> String {
    use sha2::{Digest, Sha256};
    let digest = Sha256::digest(text.as_bytes());
    let mut out = String::with_capacity(12);
    for b in digest.iter().take(6) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

/// Per-request overrides of the configured grouping and summary size.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    pub top_n: Option<NonZeroUsize>,
    pub sentences: Option<NonZeroUsize>,
}

impl RunOptions {
    /// Overrides from plain counts; zero is rejected, never coerced.
    pub fn new(top_n: Option<usize>, sentences: Option<usize>) -> Result<Self, ConfigError> {
        Ok(Self {
            top_n: top_n.map(|n| non_zero("top_n", n)).transpose()?,
            sentences: sentences.map(|n| non_zero("sentences", n)).transpose()?,
        })
    }
}

fn non_zero(field: &'static str, value: usize) -> Result<NonZeroUsize, ConfigError> {
    NonZeroUsize::new(value).ok_or(ConfigError::Zero { field })
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DigestStats {
    pub received: usize,
    /// Not longer than `summary.min_post_chars`.
    pub too_short: usize,
    /// Long enough, but no sentence survived segmentation.
    pub no_sentences: usize,
    pub summarized: usize,
    pub duplicates: usize,
    pub dedup_skipped: bool,
    pub groups: usize,
}

#[derive(Debug, Clone)]
pub struct DigestOutput {
    pub groups: Vec<Group>,
    pub report: Report,
    pub stats: DigestStats,
    /// Raw analysis text, when the service answered.
    pub analysis: Option<String>,
}

impl DigestOutput {
    /// Item strings per group, e.g. `📌 1. <summary>`.
    pub fn formatted_groups(&self, marker: &str) -> Vec<Vec<String>> {
        self.groups.iter().map(|g| g.formatted(marker)).collect()
    }
}

pub struct DigestPipeline {
    config: Arc<DigestConfig>,
    top_n: NonZeroUsize,
    sentences: NonZeroUsize,
    summarizer: Summarizer,
    embedder: DynEmbedder,
    analysis: DynAnalysisClient,
    formatter: ReportFormatter,
}

impl DigestPipeline {
    /// Validate `config` and build the default segmenter/scorer from it.
    pub fn new(
        config: Arc<DigestConfig>,
        embedder: DynEmbedder,
        analysis: DynAnalysisClient,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let segmenter = Arc::new(RuleSegmenter::new(&config.segmenter));
        let scorer = Arc::new(LexicalScorer::new(&config.scoring)?);
        Self::assemble(config, segmenter, scorer, embedder, analysis)
    }

    /// Inject custom segmentation/scoring strategies. `config` is still validated.
    pub fn with_strategies(
        config: Arc<DigestConfig>,
        segmenter: Arc<dyn Segmenter>,
        scorer: Arc<dyn Scorer>,
        embedder: DynEmbedder,
        analysis: DynAnalysisClient,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Self::assemble(config, segmenter, scorer, embedder, analysis)
    }

    fn assemble(
        config: Arc<DigestConfig>,
        segmenter: Arc<dyn Segmenter>,
        scorer: Arc<dyn Scorer>,
        embedder: DynEmbedder,
        analysis: DynAnalysisClient,
    ) -> Result<Self, ConfigError> {
        let top_n = non_zero("grouping.top_n", config.grouping.top_n)?;
        let sentences = non_zero("summary.sentences_in_summary", config.summary.sentences_in_summary)?;
        let formatter = ReportFormatter::new(&config.report);
        Ok(Self {
            summarizer: Summarizer::new(segmenter, scorer),
            top_n,
            sentences,
            config,
            embedder,
            analysis,
            formatter,
        })
    }

    pub fn config(&self) -> &Arc<DigestConfig> {
        &self.config
    }

    pub fn summarizer(&self) -> &Summarizer {
        &self.summarizer
    }

    pub fn scorer(&self) -> &dyn Scorer {
        self.summarizer.scorer()
    }

    pub fn embedder_name(&self) -> &'static str {
        self.embedder.name()
    }

    pub fn analysis_provider(&self) -> &'static str {
        self.analysis.provider_name()
    }

    pub async fn run(&self, posts: &[String]) -> DigestOutput {
        self.run_with(posts, RunOptions::default()).await
    }

    /// Full pass over one batch. Never fails; see the module docs for fallbacks.
    pub async fn run_with(&self, posts: &[String], opts: RunOptions) -> DigestOutput {
        ensure_metrics_described();
        let started = Instant::now();
        let cfg = &self.config;
        let top_n = opts.top_n.unwrap_or(self.top_n);
        let k = opts.sentences.unwrap_or(self.sentences).get();

        let mut stats = DigestStats {
            received: posts.len(),
            ..Default::default()
        };
        counter!("digest_posts_received_total").increment(posts.len() as u64);

        // 1) summarize (scores are fixed here)
        let mut summaries: Vec<(usize, Summary)> = Vec::with_capacity(posts.len());
        for (idx, post) in posts.iter().enumerate() {
            if post.chars().count() <= cfg.summary.min_post_chars {
                stats.too_short += 1;
                debug!(id = %anon_hash(post), idx, "post too short, dropped");
                continue;
            }
            match self.summarizer.summarize(post, k) {
                Some(summary) => summaries.push((idx, summary)),
                None => {
                    stats.no_sentences += 1;
                    debug!(id = %anon_hash(post), idx, "no sentences, dropped");
                }
            }
        }
        stats.summarized = summaries.len();
        counter!("digest_posts_dropped_total", "reason" => "too_short")
            .increment(stats.too_short as u64);
        counter!("digest_posts_dropped_total", "reason" => "no_sentences")
            .increment(stats.no_sentences as u64);

        // 2) embed
        let embeddings = if summaries.is_empty() {
            Some(Vec::new())
        } else {
            self.embed_summaries(&summaries).await
        };
        stats.dedup_skipped = embeddings.is_none();

        let mut embeddings = embeddings.unwrap_or_default().into_iter();
        let items: Vec<ProcessedItem> = summaries
            .into_iter()
            .map(|(source_index, summary)| ProcessedItem {
                source_index,
                embedding: embeddings.next().unwrap_or_default(),
                score: summary.score,
                summary: summary.text,
            })
            .collect();

        // 3) dedupe
        let items = if stats.dedup_skipped {
            items
        } else {
            let before = items.len();
            let kept = dedupe(items, cfg.dedup.threshold);
            stats.duplicates = before - kept.len();
            kept
        };
        counter!("digest_duplicates_total").increment(stats.duplicates as u64);

        // 4) rank + group
        let groups = rank_and_group(items, top_n);
        stats.groups = groups.len();

        // 5) analysis + render
        let analysis = if groups.is_empty() {
            None
        } else {
            let prompt = format_prompt(
                &groups,
                &cfg.report.labels.prompt_item,
                cfg.analysis.prompt_item_cap,
                cfg.analysis.prompt_char_cap,
            );
            let out = self.analysis.analyze(&prompt).await;
            if out.is_none() {
                counter!("digest_analysis_fallbacks_total").increment(1);
                warn!(
                    provider = self.analysis.provider_name(),
                    "analysis unavailable, using fallback notice"
                );
            }
            out
        };
        let report = self.formatter.render(&groups, analysis.as_deref());

        let ms = started.elapsed().as_secs_f64() * 1000.0;
        histogram!("digest_run_ms").record(ms);
        info!(
            received = stats.received,
            summarized = stats.summarized,
            duplicates = stats.duplicates,
            groups = stats.groups,
            dedup_skipped = stats.dedup_skipped,
            ms,
            "digest run finished"
        );

        DigestOutput {
            groups,
            report,
            stats,
            analysis,
        }
    }

    /// `None` when the provider failed; the caller then skips dedup.
    async fn embed_summaries(&self, summaries: &[(usize, Summary)]) -> Option<Vec<Vec<f32>>> {
        let texts: Vec<String> = summaries.iter().map(|(_, s)| s.text.clone()).collect();
        let res = embed_with_timeout(
            self.embedder.as_ref(),
            &texts,
            self.config.embedder.timeout(),
        )
        .await
        .and_then(|vectors| {
            if vectors.len() == texts.len() {
                Ok(vectors)
            } else {
                Err(EmbedError::Mismatch {
                    expected: texts.len(),
                    got: vectors.len(),
                })
            }
        });

        match res {
            Ok(vectors) => Some(vectors),
            Err(e) => {
                counter!("digest_embed_failures_total").increment(1);
                warn!(
                    error = %e,
                    embedder = self.embedder.name(),
                    count = texts.len(),
                    "embedding failed, dedup skipped for this batch"
                );
                None
            }
        }
    }
}
