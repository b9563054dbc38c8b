// src/digest/dedup.rs
//! Near-duplicate removal by pairwise cosine similarity of summary embeddings.
//!
//! For every pair (i, j) with i < j whose similarity is strictly above the threshold,
//! item j is dropped. O(n²) over a handful of posts per run.

use std::collections::BTreeSet;

use super::types::ProcessedItem;

/// Cosine similarity; 0.0 for empty, mismatched or zero-norm vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f64 = a
        .iter()
        .zip(b.iter())
        .map(|(x, y)| f64::from(*x) * f64::from(*y))
        .sum();
    let norm_a: f64 = a.iter().map(|x| f64::from(*x).powi(2)).sum::<f64>().sqrt();
    let norm_b: f64 = b.iter().map(|x| f64::from(*x).powi(2)).sum::<f64>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// Indices of items to discard.
pub fn duplicate_indices(items: &[ProcessedItem], threshold: f32) -> BTreeSet<usize> {
    let mut dupes = BTreeSet::new();
    if items.len() < 2 {
        return dupes;
    }
    let threshold = f64::from(threshold);
    for i in 0..items.len() {
        for j in (i + 1)..items.len() {
            if cosine_similarity(&items[i].embedding, &items[j].embedding) > threshold {
                dupes.insert(j);
            }
        }
    }
    dupes
}

/// Order-preserving subsequence of `items` without near-duplicates.
pub fn dedupe(items: Vec<ProcessedItem>, threshold: f32) -> Vec<ProcessedItem> {
    let dupes = duplicate_indices(&items, threshold);
    if dupes.is_empty() {
        return items;
    }
    items
        .into_iter()
        .enumerate()
        .filter(|(idx, _)| !dupes.contains(idx))
        .map(|(_, it)| it)
        .collect()
}
