// src/digest/scoring.rs
//! Interest scoring: a weighted sum of lexical signals.
//!
//! total = w.keyword * K + w.numeric * N + w.entity * E + w.emotion * M + w.length * L
//!
//! - K: configured keywords present (whole word, case-insensitive), each counted once
//! - N: decimal numbers such as `85,46` or `3.5`
//! - E: occurrences of domain entity tokens (currency codes, commodities, statement terms)
//! - M: occurrences of emotionally loaded words (only weighted by the `embedding` preset)
//! - L: `min(chars / length_norm, 1.0)`
//!
//! All weights are validated non-negative, so scores are never negative.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use super::segment::collapse_whitespace;
use crate::config::{ScoringConfig, ScoringWeights};
use crate::error::ConfigError;

static RE_DECIMAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b\d+[.,]\d+\b").expect("decimal regex"));

/// Signal counts behind one score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoreBreakdown {
    pub keywords: usize,
    pub numbers: usize,
    pub entities: usize,
    pub emotions: usize,
    pub length: f32,
    pub total: f32,
}

/// Scoring strategy. Implementations must be pure and deterministic.
pub trait Scorer: Send + Sync {
    fn breakdown(&self, text: &str) -> ScoreBreakdown;

    fn score(&self, text: &str) -> f32 {
        self.breakdown(text).total
    }
}

/// Default scorer over keyword/entity/emotion vocabularies.
#[derive(Debug, Clone)]
pub struct LexicalScorer {
    weights: ScoringWeights,
    keywords: Vec<Regex>,
    entities: Option<Regex>,
    emotions: Option<Regex>,
}

impl LexicalScorer {
    pub fn new(cfg: &ScoringConfig) -> Result<Self, ConfigError> {
        let weights = cfg.resolved_weights()?;
        let keywords = cfg
            .keywords
            .iter()
            .map(|k| {
                Regex::new(&format!(r"(?i)\b{}\b", regex::escape(k.trim()))).map_err(|source| {
                    ConfigError::Pattern {
                        field: "scoring.keywords",
                        source,
                    }
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            weights,
            keywords,
            entities: alternation("scoring.entities", &cfg.entities)?,
            emotions: alternation("scoring.emotional_words", &cfg.emotional_words)?,
        })
    }

    pub fn weights(&self) -> &ScoringWeights {
        &self.weights
    }
}

impl Scorer for LexicalScorer {
    fn breakdown(&self, text: &str) -> ScoreBreakdown {
        let text = collapse_whitespace(text);
        let w = &self.weights;

        let keywords = self.keywords.iter().filter(|re| re.is_match(&text)).count();
        let numbers = RE_DECIMAL.find_iter(&text).count();
        let entities = count_matches(self.entities.as_ref(), &text);
        let emotions = count_matches(self.emotions.as_ref(), &text);
        let length = (text.chars().count() as f32 / w.length_norm).min(1.0);

        let total = w.keyword * keywords as f32
            + w.numeric * numbers as f32
            + w.entity * entities as f32
            + w.emotion * emotions as f32
            + w.length * length;

        ScoreBreakdown {
            keywords,
            numbers,
            entities,
            emotions,
            length,
            total,
        }
    }
}

/// `(?i)\b(?:a|b|c)\b`, or `None` for an empty vocabulary.
fn alternation(field: &'static str, words: &[String]) -> Result<Option<Regex>, ConfigError> {
    if words.is_empty() {
        return Ok(None);
    }
    let body = words
        .iter()
        .map(|w| regex::escape(w.trim()))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!(r"(?i)\b(?:{body})\b"))
        .map(Some)
        .map_err(|source| ConfigError::Pattern { field, source })
}

fn count_matches(re: Option<&Regex>, text: &str) -> usize {
    re.map_or(0, |re| re.find_iter(text).count())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WeightPreset;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-5
    }

    #[test]
    fn counts_each_signal() {
        let scorer = LexicalScorer::new(&ScoringConfig::default()).unwrap();
        let text = "Акции выросли на 2,5%, а нефть подорожала до 60.20 USD; нефть снова в центре внимания.";
        let b = scorer.breakdown(text);

        // keywords: акции, нефть (presence, not occurrences)
        assert_eq!(b.keywords, 2);
        assert_eq!(b.numbers, 2);
        // entities: акции, нефть x2, USD
        assert_eq!(b.entities, 4);
        assert_eq!(b.emotions, 0);

        let len = text.chars().count() as f32 / 400.0;
        assert!(approx(b.length, len));
        assert!(approx(b.total, 2.0 * 0.5 + 2.0 * 0.3 + 4.0 * 0.2 + len * 0.1));
    }

    #[test]
    fn keywords_match_whole_words_case_insensitively() {
        let scorer = LexicalScorer::new(&ScoringConfig::default()).unwrap();
        assert_eq!(scorer.breakdown("БИРЖА открылась ростом").keywords, 1);
        // "газета" must not match "газ"
        assert_eq!(scorer.breakdown("газета вышла утром").keywords, 0);
        assert_eq!(scorer.breakdown("газета вышла утром").entities, 0);
    }

    #[test]
    fn length_signal_saturates() {
        let scorer = LexicalScorer::new(&ScoringConfig::default()).unwrap();
        let long = "слово ".repeat(200);
        let b = scorer.breakdown(&long);
        assert_eq!(b.length, 1.0);
        assert!(approx(b.total, 0.1));
    }

    #[test]
    fn embedding_preset_uses_emotion_term() {
        let cfg = ScoringConfig {
            preset: WeightPreset::Embedding,
            ..Default::default()
        };
        let scorer = LexicalScorer::new(&cfg).unwrap();
        let text = "Рекорд и рост индекса";
        let b = scorer.breakdown(text);
        assert_eq!(b.emotions, 2);
        let len = text.chars().count() as f32 / 1000.0;
        assert!(approx(b.total, 2.0 * 0.2 + len * 0.2));
    }

    #[test]
    fn empty_text_scores_zero() {
        let scorer = LexicalScorer::new(&ScoringConfig::default()).unwrap();
        assert_eq!(scorer.score(""), 0.0);
    }

    #[test]
    fn empty_vocabularies_are_allowed() {
        let cfg = ScoringConfig {
            keywords: vec![],
            entities: vec![],
            emotional_words: vec![],
            ..Default::default()
        };
        let scorer = LexicalScorer::new(&cfg).unwrap();
        let b = scorer.breakdown("USD нефть 1,5");
        assert_eq!((b.keywords, b.entities, b.numbers), (0, 0, 1));
    }
}
