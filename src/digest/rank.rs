// src/digest/rank.rs
use std::num::NonZeroUsize;

use super::types::{Group, ProcessedItem};

/// Sort by score descending (stable) and cut into groups of `top_n`.
pub fn rank_and_group(mut items: Vec<ProcessedItem>, top_n: NonZeroUsize) -> Vec<Group> {
    let size = top_n.get();
    items.sort_by(|a, b| b.score.total_cmp(&a.score));

    let mut groups = Vec::with_capacity(items.len().div_ceil(size));
    let mut iter = items.into_iter().peekable();
    while iter.peek().is_some() {
        let chunk: Vec<ProcessedItem> = iter.by_ref().take(size).collect();
        groups.push(Group {
            index: groups.len() + 1,
            items: chunk,
        });
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    fn n(v: usize) -> NonZeroUsize {
        NonZeroUsize::new(v).unwrap()
    }

    fn item(idx: usize, score: f32) -> ProcessedItem {
        ProcessedItem {
            source_index: idx,
            summary: format!("item {idx}"),
            embedding: vec![],
            score,
        }
    }

    #[test]
    fn sorts_descending_and_chunks() {
        let items = vec![item(0, 1.0), item(1, 3.0), item(2, 2.0), item(3, 0.5), item(4, 2.5)];
        let groups = rank_and_group(items, n(2));
        let layout: Vec<Vec<usize>> = groups
            .iter()
            .map(|g| g.items.iter().map(|i| i.source_index).collect())
            .collect();
        assert_eq!(layout, vec![vec![1, 4], vec![2, 0], vec![3]]);
        assert_eq!(groups.iter().map(|g| g.index).collect::<Vec<_>>(), vec![1, 2, 3]);
    }

    #[test]
    fn ties_keep_input_order() {
        let items = vec![item(0, 1.0), item(1, 1.0), item(2, 1.0)];
        let groups = rank_and_group(items, n(5));
        let order: Vec<usize> = groups[0].items.iter().map(|i| i.source_index).collect();
        assert_eq!(order, vec![0, 1, 2]);
    }

    #[test]
    fn empty_input_gives_no_groups() {
        assert!(rank_and_group(vec![], n(3)).is_empty());
    }

    #[test]
    fn formatted_lines_are_numbered_per_group() {
        let groups = rank_and_group(vec![item(0, 2.0), item(1, 1.0), item(2, 0.0)], n(2));
        assert_eq!(groups[1].formatted("📌"), vec!["📌 1. item 2".to_string()]);
        assert_eq!(groups[0].formatted("📌")[1], "📌 2. item 1");
    }
}
