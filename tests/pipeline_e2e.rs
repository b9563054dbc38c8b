// tests/pipeline_e2e.rs
//
// End-to-end runs of the digest pipeline with deterministic collaborators.
//
// Covered:
// - near-duplicate removal + ranking (financial post first, reworded copy gone)
// - default hashing embedder: near-verbatim copy removed, paraphrase kept
// - post without sentences is dropped
// - analysis timeout still renders every group plus the fallback notice
// - embedding failure skips dedup instead of failing the run
// - empty batch renders the no-data block

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use channel_digest::analysis::{DisabledClient, DynAnalysisClient, FixedProvider, TimeoutClient};
use channel_digest::embed::{Embedder, HashingEmbedder};
use channel_digest::{DigestConfig, DigestPipeline, EmbedError};

const FINANCIAL: &str = "Нефть марки Brent подорожала на 2,5% и достигла 85,46 USD за баррель. \
    Аналитики ожидают дальнейшего роста котировок нефти на бирже.";
const GENERIC: &str = "Вчера в городе прошел фестиваль уличной музыки и танцев. \
    Организаторы довольны количеством гостей и хорошей погодой.";
const REWORDED: &str = "Стоимость Brent выросла до 85,46 USD за баррель, прибавив 2,5%. \
    Эксперты ждут продолжения роста цен на нефть на бирже.";

const NEAR_COPY: &str = "Нефть марки Brent подорожала на 2,5% и достигла 85,46 USD за баррель. \
    Эксперты ожидают дальнейшего роста котировок нефти на бирже.";

/// Two-topic embedder: anything about Brent points one way, everything else the other.
struct TopicEmbedder;

#[async_trait]
impl Embedder for TopicEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
        Ok(texts
            .iter()
            .map(|t| {
                if t.to_lowercase().contains("brent") {
                    vec![1.0, 0.1]
                } else {
                    vec![0.0, 1.0]
                }
            })
            .collect())
    }
    fn dimension(&self) -> usize {
        2
    }
    fn name(&self) -> &'static str {
        "topic"
    }
}

struct FailingEmbedder;

#[async_trait]
impl Embedder for FailingEmbedder {
    async fn embed_batch(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
        Err(EmbedError::Status(503))
    }
    fn dimension(&self) -> usize {
        2
    }
    fn name(&self) -> &'static str {
        "failing"
    }
}

fn posts(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn pipeline_with(
    cfg: DigestConfig,
    embedder: Arc<dyn Embedder>,
    analysis: DynAnalysisClient,
) -> DigestPipeline {
    DigestPipeline::new(Arc::new(cfg), embedder, analysis).expect("valid config")
}

#[tokio::test]
async fn near_duplicate_is_removed_and_financial_post_ranks_first() {
    let p = pipeline_with(
        DigestConfig::default(),
        Arc::new(TopicEmbedder),
        Arc::new(DisabledClient),
    );
    let out = p.run(&posts(&[FINANCIAL, GENERIC, REWORDED])).await;

    let kept: Vec<usize> = out
        .groups
        .iter()
        .flat_map(|g| g.items.iter().map(|i| i.source_index))
        .collect();
    assert_eq!(kept, vec![0, 1], "stats: {:?}", out.stats);
    assert_eq!(out.stats.duplicates, 1);
    assert!(!out.stats.dedup_skipped);

    let first = &out.groups[0].items[0];
    assert!(first.summary.contains("85,46"));
    assert!(first.score > out.groups[0].items[1].score);

    let formatted = out.formatted_groups("📌");
    assert!(formatted[0][0].starts_with("📌 1. Нефть марки Brent"));
}

#[tokio::test]
async fn hashing_embedder_removes_near_copies_but_keeps_paraphrases() {
    let cfg = DigestConfig::default();
    let embedder = Arc::new(HashingEmbedder::new(cfg.embedder.dimension));
    let p = pipeline_with(cfg, embedder, Arc::new(DisabledClient));

    let out = p.run(&posts(&[FINANCIAL, GENERIC, REWORDED, NEAR_COPY])).await;
    let mut kept: Vec<usize> = out
        .groups
        .iter()
        .flat_map(|g| g.items.iter().map(|i| i.source_index))
        .collect();
    kept.sort_unstable();
    assert_eq!(kept, vec![0, 1, 2], "stats: {:?}", out.stats);
    assert_eq!(out.stats.duplicates, 1);
}

#[tokio::test]
async fn post_without_sentences_is_dropped() {
    let mut cfg = DigestConfig::default();
    cfg.summary.min_post_chars = 0;
    let p = pipeline_with(cfg, Arc::new(TopicEmbedder), Arc::new(DisabledClient));

    let out = p.run(&posts(&["Без точки и коротко", GENERIC])).await;
    assert_eq!(out.stats.no_sentences, 1);
    assert_eq!(out.stats.summarized, 1);
    let kept: Vec<usize> = out
        .groups
        .iter()
        .flat_map(|g| g.items.iter().map(|i| i.source_index))
        .collect();
    assert_eq!(kept, vec![1]);
}

#[tokio::test]
async fn short_posts_are_filtered_before_segmentation() {
    let p = pipeline_with(
        DigestConfig::default(),
        Arc::new(TopicEmbedder),
        Arc::new(DisabledClient),
    );
    let out = p.run(&posts(&["", "   ", "Слишком коротко."])).await;
    assert_eq!(out.stats.too_short, 3);
    assert!(out.groups.is_empty());
    assert!(out.report.text.contains("⚠ Нет данных для анализа"));
}

#[tokio::test]
async fn analysis_timeout_keeps_groups_and_prints_notice() {
    let slow = TimeoutClient::with_timeout(
        FixedProvider::new("1. Поздний ответ.").with_delay(Duration::from_millis(500)),
        Duration::from_millis(50),
        3500,
    );
    let mut cfg = DigestConfig::default();
    cfg.grouping.top_n = 1;
    let p = pipeline_with(cfg, Arc::new(TopicEmbedder), Arc::new(slow));

    let out = p.run(&posts(&[FINANCIAL, GENERIC])).await;
    assert_eq!(out.groups.len(), 2);
    assert!(out.analysis.is_none());
    let text = &out.report.text;
    assert!(text.contains("▌ Блок 1 ▌"));
    assert!(text.contains("▌ Блок 2 ▌"));
    assert!(text.contains("Анализ недоступен. Рекомендуем проверить подключение."));
    assert!(!text.contains("Поздний ответ"));
}

#[tokio::test]
async fn embedding_failure_skips_dedup() {
    let p = pipeline_with(
        DigestConfig::default(),
        Arc::new(FailingEmbedder),
        Arc::new(DisabledClient),
    );
    let out = p.run(&posts(&[FINANCIAL, GENERIC, REWORDED])).await;
    assert!(out.stats.dedup_skipped);
    assert_eq!(out.stats.duplicates, 0);
    let total: usize = out.groups.iter().map(|g| g.len()).sum();
    assert_eq!(total, 3);
    assert!(out
        .groups
        .iter()
        .flat_map(|g| g.items.iter())
        .all(|i| i.embedding.is_empty()));
}

#[tokio::test]
async fn groups_are_ordered_by_score_across_boundaries() {
    let mut cfg = DigestConfig::default();
    cfg.grouping.top_n = 1;
    let p = pipeline_with(cfg, Arc::new(TopicEmbedder), Arc::new(DisabledClient));

    let out = p.run(&posts(&[GENERIC, FINANCIAL])).await;
    let scores: Vec<f32> = out.groups.iter().map(|g| g.items[0].score).collect();
    assert_eq!(out.groups[0].items[0].source_index, 1);
    assert!(scores.windows(2).all(|w| w[0] >= w[1]));
    assert_eq!(
        out.groups.iter().map(|g| g.index).collect::<Vec<_>>(),
        vec![1, 2]
    );
}
