//! Bounded best-of-N selection over a document score map.
//!
//! Heapify all candidates in O(n), pop the best `k`, then keep popping while
//! the next entry ties the k-th score exactly. Only that small boundary set
//! is sorted before truncating back to `k`.

use crate::DocId;
use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, HashMap};

/// Default number of results per query.
pub const DEFAULT_K: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredDoc {
    pub doc_id: DocId,
    pub score: f64,
}

/// Ranking key `(-score, doc_id)`: smaller keys are better results.
#[derive(Debug, Clone, Copy)]
struct RankKey(ScoredDoc);

impl Ord for RankKey {
    fn cmp(&self, other: &Self) -> Ordering {
        other.0.score.total_cmp(&self.0.score).then(self.0.doc_id.cmp(&other.0.doc_id))
    }
}

impl PartialOrd for RankKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for RankKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for RankKey {}

/// Up to `k` documents by descending score, ties by ascending doc id.
pub fn top_k(scores: &HashMap<DocId, f64>, k: usize) -> Vec<ScoredDoc> {
    if k == 0 || scores.is_empty() {
        return Vec::new();
    }
    let keys: Vec<Reverse<RankKey>> = scores
        .iter()
        .map(|(&doc_id, &score)| Reverse(RankKey(ScoredDoc { doc_id, score })))
        .collect();
    // min-heap over rank keys
    let mut heap = BinaryHeap::from(keys);

    let mut selected: Vec<ScoredDoc> = Vec::with_capacity(k.min(heap.len()));
    while selected.len() < k {
        match heap.pop() {
            Some(Reverse(RankKey(doc))) => selected.push(doc),
            None => break,
        }
    }

    if let Some(cutoff) = selected.last().map(|d| d.score) {
        while let Some(Reverse(RankKey(next))) = heap.peek() {
            if next.score != cutoff {
                break;
            }
            selected.push(*next);
            heap.pop();
        }
    }

    selected.sort_by(|a, b| RankKey(*a).cmp(&RankKey(*b)));
    selected.truncate(k);
    selected
}

/// Render ranked doc ids as one space separated result line.
pub fn format_line(ranked: &[ScoredDoc]) -> String {
    ranked.iter().map(|d| d.doc_id.to_string()).collect::<Vec<_>>().join(" ")
}
