//! Weighted posting lists and per-document norms for one scoring scheme.
//!
//! Weights are accumulated per document straight into sparse postings; the
//! norm of each document is taken over its full weight vector, not just the
//! terms a query happens to touch.

use crate::analysis::AnalyzedDoc;
use crate::vocabulary::Vocabulary;
use crate::{DocId, Posting, Scheme, TermId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightedIndex {
    pub scheme: Scheme,
    /// Indexed by term id; postings sorted by doc id, weights > 0.
    postings: Vec<Vec<Posting>>,
}

impl WeightedIndex {
    pub fn postings(&self, term_id: TermId) -> &[Posting] {
        self.postings.get(term_id as usize).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn num_terms(&self) -> usize {
        self.postings.len()
    }

    pub fn num_postings(&self) -> usize {
        self.postings.iter().map(Vec::len).sum()
    }
}

/// L2 norm of every document's weight vector, indexed by doc id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NormTable {
    norms: Vec<f32>,
}

impl NormTable {
    pub fn get(&self, doc_id: DocId) -> f32 {
        self.norms.get(doc_id as usize).copied().unwrap_or(0.0)
    }

    pub fn len(&self) -> usize {
        self.norms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.norms.is_empty()
    }
}

/// A weighted index together with the norms computed from the same weights.
#[derive(Debug, Clone, PartialEq)]
pub struct Weighting {
    pub index: WeightedIndex,
    pub norms: NormTable,
}

impl Weighting {
    pub fn build(scheme: Scheme, docs: &[AnalyzedDoc], vocab: &Vocabulary) -> Self {
        let mut postings: Vec<Vec<Posting>> = vec![Vec::new(); vocab.len()];
        let mut norms = Vec::with_capacity(docs.len());

        for (doc_id, doc) in docs.iter().enumerate() {
            let weights = document_weights(scheme, doc, vocab);
            let mut sum_sq = 0.0f32;
            for (tid, weight) in weights {
                if weight > 0.0 {
                    sum_sq += weight * weight;
                    postings[tid as usize].push(Posting { doc_id: doc_id as DocId, weight });
                }
            }
            norms.push(sum_sq.sqrt());
        }

        let index = WeightedIndex { scheme, postings };
        tracing::debug!(%scheme, num_postings = index.num_postings(), "built weighted index");
        Self { index, norms: NormTable { norms } }
    }
}

fn counts<'a, I>(tokens: I, vocab: &Vocabulary) -> BTreeMap<TermId, u32>
where
    I: IntoIterator<Item = &'a String>,
{
    let mut tf: BTreeMap<TermId, u32> = BTreeMap::new();
    for token in tokens {
        if let Some(tid) = vocab.term_id(token) {
            *tf.entry(tid).or_insert(0) += 1;
        }
    }
    tf
}

/// The document's weight for every vocabulary term it touches.
///
/// - `Tfidf`: `tf(description) * idf`
/// - `Blended`: `tf(title) + (1 + ln tf(description)) * idf`, the description
///   part being zero when the term is absent from the description
/// - `Boolean`: 1 for every description term
pub fn document_weights(scheme: Scheme, doc: &AnalyzedDoc, vocab: &Vocabulary) -> BTreeMap<TermId, f32> {
    let desc = counts(&doc.description, vocab);
    match scheme {
        Scheme::Boolean => desc.into_keys().map(|tid| (tid, 1.0)).collect(),
        Scheme::Tfidf => desc.into_iter().map(|(tid, tf)| (tid, tf as f32 * vocab.idf(tid))).collect(),
        Scheme::Blended => {
            let mut weights: BTreeMap<TermId, f32> = desc
                .into_iter()
                .map(|(tid, tf)| (tid, (1.0 + (tf as f32).ln()) * vocab.idf(tid)))
                .collect();
            for (tid, tf) in counts(&doc.title, vocab) {
                *weights.entry(tid).or_insert(0.0) += tf as f32;
            }
            weights
        }
    }
}
