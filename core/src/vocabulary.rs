//! Term <-> term-id mapping built once per corpus snapshot.
//!
//! Ids are assigned in lexical order of the distinct description terms, so
//! rebuilding from the same corpus always yields the same ids.

use crate::analysis::AnalyzedDoc;
use crate::TermId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

#[derive(Serialize, Deserialize)]
struct VocabularyRepr {
    terms: Vec<String>,
    df: Vec<u32>,
    num_docs: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "VocabularyRepr", into = "VocabularyRepr")]
pub struct Vocabulary {
    terms: Vec<String>,
    ids: HashMap<String, TermId>,
    /// Number of documents whose description contains each term.
    df: Vec<u32>,
    num_docs: u32,
}

impl From<VocabularyRepr> for Vocabulary {
    fn from(repr: VocabularyRepr) -> Self {
        let ids = repr.terms.iter().enumerate().map(|(i, t)| (t.clone(), i as TermId)).collect();
        Self { terms: repr.terms, ids, df: repr.df, num_docs: repr.num_docs }
    }
}

impl From<Vocabulary> for VocabularyRepr {
    fn from(v: Vocabulary) -> Self {
        Self { terms: v.terms, df: v.df, num_docs: v.num_docs }
    }
}

impl Vocabulary {
    pub fn build(docs: &[AnalyzedDoc]) -> Self {
        let distinct: BTreeSet<&str> = docs
            .iter()
            .flat_map(|d| d.description.iter().map(String::as_str))
            .collect();
        let terms: Vec<String> = distinct.into_iter().map(str::to_owned).collect();
        let ids: HashMap<String, TermId> =
            terms.iter().enumerate().map(|(i, t)| (t.clone(), i as TermId)).collect();

        let mut df = vec![0u32; terms.len()];
        for doc in docs {
            let seen: BTreeSet<TermId> = doc.description.iter().filter_map(|t| ids.get(t).copied()).collect();
            for tid in seen {
                df[tid as usize] += 1;
            }
        }

        tracing::debug!(num_terms = terms.len(), num_docs = docs.len(), "built vocabulary");
        Self { terms, ids, df, num_docs: docs.len() as u32 }
    }

    pub fn term_id(&self, term: &str) -> Option<TermId> {
        self.ids.get(term).copied()
    }

    pub fn term(&self, id: TermId) -> Option<&str> {
        self.terms.get(id as usize).map(String::as_str)
    }

    pub fn doc_frequency(&self, id: TermId) -> u32 {
        self.df.get(id as usize).copied().unwrap_or(0)
    }

    pub fn num_docs(&self) -> u32 {
        self.num_docs
    }

    /// Smoothed idf: `1 + ln((N + 1) / (1 + df))`.
    pub fn idf(&self, id: TermId) -> f32 {
        idf(self.num_docs, self.doc_frequency(id))
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn terms(&self) -> impl Iterator<Item = (TermId, &str)> + '_ {
        self.terms.iter().enumerate().map(|(i, t)| (i as TermId, t.as_str()))
    }

    /// Known term ids of `tokens`, deduplicated, in order of first appearance.
    pub fn known_ids<'a, I>(&self, tokens: I) -> Vec<TermId>
    where
        I: IntoIterator<Item = &'a String>,
    {
        let mut out = Vec::new();
        for token in tokens {
            if let Some(id) = self.term_id(token) {
                if !out.contains(&id) {
                    out.push(id);
                }
            }
        }
        out
    }
}

pub fn idf(num_docs: u32, df: u32) -> f32 {
    1.0 + ((num_docs as f32 + 1.0) / (1.0 + df as f32)).ln()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::analyze;
    use crate::Course;

    fn corpus() -> Vec<AnalyzedDoc> {
        analyze(&[
            Course::new("Data Science MSc", "data science statistics"),
            Course::new("Physics", "quantum physics mechanics"),
            Course::new("Applied Data Analytics", "data analytics statistics machine learning"),
        ])
    }

    #[test]
    fn ids_follow_lexical_order() {
        let vocab = Vocabulary::build(&corpus());
        let terms: Vec<&str> = vocab.terms().map(|(_, t)| t).collect();
        let mut sorted = terms.clone();
        sorted.sort();
        assert_eq!(terms, sorted);
        for (id, term) in vocab.terms() {
            assert_eq!(vocab.term_id(term), Some(id));
            assert_eq!(vocab.term(id), Some(term));
        }
    }

    #[test]
    fn rebuild_is_deterministic() {
        assert_eq!(Vocabulary::build(&corpus()), Vocabulary::build(&corpus()));
    }

    #[test]
    fn unknown_terms_are_not_found() {
        let vocab = Vocabulary::build(&corpus());
        assert_eq!(vocab.term_id("astronomi"), None);
        assert_eq!(vocab.term(vocab.len() as TermId), None);
    }

    #[test]
    fn title_only_terms_are_excluded() {
        let vocab = Vocabulary::build(&corpus());
        // "applied" occurs only in a title
        assert!(vocab.term_id(&crate::tokenizer::normalize("applied")[0]).is_none());
    }

    #[test]
    fn document_frequency_counts_documents_not_occurrences() {
        let docs = analyze(&[Course::new("", "data data data"), Course::new("", "data physics")]);
        let vocab = Vocabulary::build(&docs);
        let data = vocab.term_id("data").unwrap();
        assert_eq!(vocab.doc_frequency(data), 2);
        assert_eq!(vocab.num_docs(), 2);
        assert!((vocab.idf(data) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn serde_roundtrip_restores_lookup_table() {
        let vocab = Vocabulary::build(&corpus());
        let bytes = bincode::serialize(&vocab).unwrap();
        let back: Vocabulary = bincode::deserialize(&bytes).unwrap();
        assert_eq!(back, vocab);
        assert!(back.term_id("data").is_some());
    }
}
