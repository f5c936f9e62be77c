//! Boolean inverted index over descriptions with AND semantics.

use crate::analysis::AnalyzedDoc;
use crate::tokenizer::normalize;
use crate::vocabulary::Vocabulary;
use crate::{DocId, TermId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BooleanIndex {
    /// Indexed by term id; each list is sorted and free of duplicates.
    postings: Vec<Vec<DocId>>,
}

impl BooleanIndex {
    pub fn build(docs: &[AnalyzedDoc], vocab: &Vocabulary) -> Self {
        let mut postings: Vec<Vec<DocId>> = vec![Vec::new(); vocab.len()];
        for (doc_id, doc) in docs.iter().enumerate() {
            let distinct: BTreeSet<TermId> =
                doc.description.iter().filter_map(|t| vocab.term_id(t)).collect();
            for tid in distinct {
                // doc ids are visited in ascending order, so lists stay sorted
                postings[tid as usize].push(doc_id as DocId);
            }
        }
        Self { postings }
    }

    pub fn postings(&self, term_id: TermId) -> &[DocId] {
        self.postings.get(term_id as usize).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn num_terms(&self) -> usize {
        self.postings.len()
    }

    /// Documents containing every known query term. Unknown terms are skipped;
    /// a query with no known term matches nothing.
    pub fn search(&self, query: &str, vocab: &Vocabulary) -> BTreeSet<DocId> {
        let tokens = normalize(query);
        self.intersect(&vocab.known_ids(&tokens))
    }

    pub fn intersect(&self, term_ids: &[TermId]) -> BTreeSet<DocId> {
        let mut iter = term_ids.iter();
        let mut result: BTreeSet<DocId> = match iter.next() {
            Some(&first) => self.postings(first).iter().copied().collect(),
            None => return BTreeSet::new(),
        };
        for &tid in iter {
            if result.is_empty() {
                break;
            }
            let list = self.postings(tid);
            result.retain(|d| list.binary_search(d).is_ok());
        }
        result
    }
}
