//! Cosine-similarity ranking over a weighted index with bounded top-k selection.

use crate::vocabulary::Vocabulary;
use crate::weighting::Weighting;
use crate::{DocId, TermId};
use std::cmp::{Ordering, Reverse};
use std::collections::{BTreeMap, BTreeSet, BinaryHeap};

#[derive(Debug, Clone, Copy)]
pub struct Ranked {
    pub doc_id: DocId,
    pub similarity: f32,
}

// Greater means better: higher similarity, then lower doc id.
impl Ord for Ranked {
    fn cmp(&self, other: &Self) -> Ordering {
        self.similarity
            .total_cmp(&other.similarity)
            .then_with(|| other.doc_id.cmp(&self.doc_id))
    }
}

impl PartialOrd for Ranked {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Ranked {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Ranked {}

/// The `k` best entries, best first. Holds at most `k` entries at any time.
pub fn top_k<I>(items: I, k: usize) -> Vec<Ranked>
where
    I: IntoIterator<Item = Ranked>,
{
    if k == 0 {
        return Vec::new();
    }
    let mut heap: BinaryHeap<Reverse<Ranked>> = BinaryHeap::with_capacity(k + 1);
    for item in items {
        if heap.len() < k {
            heap.push(Reverse(item));
        } else if heap.peek().is_some_and(|worst| item > worst.0) {
            heap.pop();
            heap.push(Reverse(item));
        }
    }
    heap.into_sorted_vec().into_iter().map(|Reverse(r)| r).collect()
}

/// Query weights: each distinct known term weighted by its idf.
pub fn query_vector(term_ids: &[TermId], vocab: &Vocabulary) -> Vec<(TermId, f32)> {
    term_ids.iter().map(|&tid| (tid, vocab.idf(tid))).collect()
}

/// Rank documents by cosine similarity to the query terms.
///
/// When `candidates` is given, only those documents are scored. Documents with
/// zero similarity are never returned.
pub fn rank(
    term_ids: &[TermId],
    vocab: &Vocabulary,
    weighting: &Weighting,
    candidates: Option<&BTreeSet<DocId>>,
    k: usize,
) -> Vec<Ranked> {
    if k == 0 || term_ids.is_empty() {
        return Vec::new();
    }
    let query = query_vector(term_ids, vocab);
    let query_norm = query.iter().map(|(_, w)| w * w).sum::<f32>().sqrt();
    if query_norm == 0.0 {
        return Vec::new();
    }

    let mut dots: BTreeMap<DocId, f32> = BTreeMap::new();
    for (tid, q_w) in &query {
        for p in weighting.index.postings(*tid) {
            if candidates.is_some_and(|c| !c.contains(&p.doc_id)) {
                continue;
            }
            *dots.entry(p.doc_id).or_insert(0.0) += p.weight * q_w;
        }
    }

    let scored = dots.into_iter().filter_map(|(doc_id, dot)| {
        let doc_norm = weighting.norms.get(doc_id);
        if doc_norm <= 0.0 {
            return None;
        }
        let similarity = (dot / (doc_norm * query_norm)).min(1.0);
        (similarity > 0.0).then_some(Ranked { doc_id, similarity })
    });
    top_k(scored, k)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn r(doc_id: DocId, similarity: f32) -> Ranked {
        Ranked { doc_id, similarity }
    }

    #[test]
    fn top_k_orders_by_similarity_then_doc_id() {
        let items = vec![r(4, 0.2), r(1, 0.9), r(3, 0.5), r(0, 0.5), r(2, 0.1)];
        let top = top_k(items, 3);
        let ids: Vec<DocId> = top.iter().map(|x| x.doc_id).collect();
        assert_eq!(ids, vec![1, 0, 3]);
    }

    #[test]
    fn top_k_length_is_min_of_k_and_input() {
        let items = vec![r(0, 0.3), r(1, 0.2)];
        assert_eq!(top_k(items.clone(), 5).len(), 2);
        assert_eq!(top_k(items.clone(), 1).len(), 1);
        assert!(top_k(items, 0).is_empty());
    }

    #[test]
    fn ties_prefer_lower_doc_id_when_evicting() {
        let items = vec![r(7, 0.5), r(2, 0.5), r(5, 0.5)];
        let ids: Vec<DocId> = top_k(items, 2).iter().map(|x| x.doc_id).collect();
        assert_eq!(ids, vec![2, 5]);
    }
}
