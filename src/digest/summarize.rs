// src/digest/summarize.rs
//! Extractive summaries: keep the top-k sentences by score, in original order.

use std::sync::Arc;

use super::scoring::Scorer;
use super::segment::Segmenter;
use super::types::ScoredSentence;

/// Summarizer output for one post, before embedding.
#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub text: String,
    /// Score of the summary text as a whole, not the sum of its sentences.
    pub score: f32,
    /// Selected sentences in original order.
    pub sentences: Vec<ScoredSentence>,
}

#[derive(Clone)]
pub struct Summarizer {
    segmenter: Arc<dyn Segmenter>,
    scorer: Arc<dyn Scorer>,
}

impl Summarizer {
    pub fn new(segmenter: Arc<dyn Segmenter>, scorer: Arc<dyn Scorer>) -> Self {
        Self { segmenter, scorer }
    }

    pub fn scorer(&self) -> &dyn Scorer {
        self.scorer.as_ref()
    }

    /// Every accepted sentence of `text` with its score, in original order.
    pub fn score_sentences(&self, text: &str) -> Vec<ScoredSentence> {
        self.segmenter
            .segment(text)
            .into_iter()
            .map(|sentence| {
                let score = self.scorer.score(&sentence.text);
                ScoredSentence { sentence, score }
            })
            .collect()
    }

    /// `None` when the post yields no sentences (or `k == 0`).
    pub fn summarize(&self, text: &str, k: usize) -> Option<Summary> {
        let mut scored = self.score_sentences(text);
        if scored.is_empty() || k == 0 {
            return None;
        }

        // stable: equal scores keep the earlier sentence first
        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored.truncate(k);
        scored.sort_by_key(|s| s.sentence.index);

        let text = scored
            .iter()
            .map(|s| s.sentence.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        let score = self.scorer.score(&text);

        Some(Summary {
            text,
            score,
            sentences: scored,
        })
    }
}
