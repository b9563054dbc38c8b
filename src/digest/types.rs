// src/digest/types.rs
use serde::{Deserialize, Serialize};

/// A sentence accepted by the segmenter; `index` is its position among the
/// accepted sentences of the parent post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sentence {
    pub text: String,
    pub index: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredSentence {
    pub sentence: Sentence,
    pub score: f32,
}

/// One post after summarization and embedding. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessedItem {
    /// Position of the source post in the input batch.
    pub source_index: usize,
    pub summary: String,
    /// Empty when the embedding provider was unavailable for the batch.
    #[serde(skip)]
    pub embedding: Vec<f32>,
    pub score: f32,
}

/// One output "post": up to `top_n` items in rank order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Group {
    /// 1-based position among the groups.
    pub index: usize,
    pub items: Vec<ProcessedItem>,
}

impl Group {
    /// Item strings numbered within the group, e.g. `📌 1. <summary>`.
    pub fn formatted(&self, marker: &str) -> Vec<String> {
        self.items
            .iter()
            .enumerate()
            .map(|(i, it)| format!("{marker} {}. {}", i + 1, it.summary))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
