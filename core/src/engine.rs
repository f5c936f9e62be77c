//! Engine handle bundling one corpus snapshot with its indexes.

use crate::analysis::analyze;
use crate::boolean::BooleanIndex;
use crate::error::{EngineError, Result};
use crate::persist::{self, IndexPaths};
use crate::ranker::{rank, Ranked};
use crate::tokenizer::normalize;
use crate::vocabulary::Vocabulary;
use crate::weighting::Weighting;
use crate::{Course, DocId, Scheme};
use parking_lot::Mutex;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, OnceLock};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchHit<'a> {
    pub doc_id: DocId,
    pub similarity: f32,
    pub course: &'a Course,
}

/// Vocabulary, boolean index, corpus records and the built weighted schemes of
/// one snapshot. Read-only once constructed.
#[derive(Debug, Clone)]
pub struct Engine {
    vocabulary: Vocabulary,
    boolean: BooleanIndex,
    courses: Vec<Course>,
    weightings: BTreeMap<Scheme, Weighting>,
}

impl Engine {
    /// Build every artifact from `courses`; document ids are positions in `courses`.
    pub fn build(courses: Vec<Course>, schemes: &[Scheme]) -> Self {
        let docs = analyze(&courses);
        let vocabulary = Vocabulary::build(&docs);
        let boolean = BooleanIndex::build(&docs, &vocabulary);
        let weightings = schemes
            .iter()
            .filter(|s| s.is_weighted())
            .map(|&s| (s, Weighting::build(s, &docs, &vocabulary)))
            .collect();
        tracing::info!(num_docs = courses.len(), num_terms = vocabulary.len(), "engine built");
        Self { vocabulary, boolean, courses, weightings }
    }

    pub(crate) fn from_parts(
        vocabulary: Vocabulary,
        boolean: BooleanIndex,
        courses: Vec<Course>,
        weightings: BTreeMap<Scheme, Weighting>,
    ) -> Self {
        Self { vocabulary, boolean, courses, weightings }
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    pub fn boolean_index(&self) -> &BooleanIndex {
        &self.boolean
    }

    pub fn courses(&self) -> &[Course] {
        &self.courses
    }

    pub fn course(&self, doc_id: DocId) -> Option<&Course> {
        self.courses.get(doc_id as usize)
    }

    pub fn num_docs(&self) -> usize {
        self.courses.len()
    }

    /// Schemes this engine can answer, `Boolean` always included.
    pub fn schemes(&self) -> Vec<Scheme> {
        std::iter::once(Scheme::Boolean).chain(self.weightings.keys().copied()).collect()
    }

    pub fn weighting(&self, scheme: Scheme) -> Result<&Weighting> {
        self.weightings.get(&scheme).ok_or(EngineError::SchemeNotBuilt(scheme))
    }

    pub(crate) fn weightings(&self) -> &BTreeMap<Scheme, Weighting> {
        &self.weightings
    }

    /// Documents whose description contains every known query term.
    pub fn boolean_search(&self, query: &str) -> BTreeSet<DocId> {
        self.boolean.search(query, &self.vocabulary)
    }

    /// At most `k` hits, best first. Ties are broken by ascending doc id.
    ///
    /// `Boolean` returns the conjunctive matches in doc id order with similarity 1.
    /// `Tfidf` scores every document sharing a known term with the query.
    /// `Blended` scores only documents containing every known query term.
    pub fn search(&self, query: &str, k: usize, scheme: Scheme) -> Result<Vec<SearchHit<'_>>> {
        let weighting = match scheme {
            Scheme::Boolean => None,
            weighted => Some(self.weighting(weighted)?),
        };
        let tokens = normalize(query);
        let term_ids = self.vocabulary.known_ids(&tokens);

        let ranked: Vec<Ranked> = match (scheme, weighting) {
            (Scheme::Blended, Some(w)) => {
                let candidates = self.boolean.intersect(&term_ids);
                if candidates.is_empty() {
                    Vec::new()
                } else {
                    rank(&term_ids, &self.vocabulary, w, Some(&candidates), k)
                }
            }
            (_, Some(w)) => rank(&term_ids, &self.vocabulary, w, None, k),
            (_, None) => self
                .boolean
                .intersect(&term_ids)
                .into_iter()
                .take(k)
                .map(|doc_id| Ranked { doc_id, similarity: 1.0 })
                .collect(),
        };
        tracing::debug!(query, %scheme, known_terms = term_ids.len(), hits = ranked.len(), "search");

        Ok(ranked
            .into_iter()
            .filter_map(|r| {
                self.course(r.doc_id).map(|course| SearchHit { doc_id: r.doc_id, similarity: r.similarity, course })
            })
            .collect())
    }
}

type Loader = Box<dyn Fn() -> Result<Engine> + Send + Sync>;

/// An engine loaded on first use. Concurrent first callers load it once; a
/// failed load is not remembered, so the next call tries again.
pub struct LazyEngine {
    loader: Loader,
    cell: OnceLock<Arc<Engine>>,
    gate: Mutex<()>,
}

impl LazyEngine {
    pub fn open(paths: IndexPaths) -> Self {
        Self::with_loader(move || persist::load_engine(&paths))
    }

    pub fn with_loader<F>(loader: F) -> Self
    where
        F: Fn() -> Result<Engine> + Send + Sync + 'static,
    {
        Self { loader: Box::new(loader), cell: OnceLock::new(), gate: Mutex::new(()) }
    }

    pub fn get(&self) -> Result<Arc<Engine>> {
        if let Some(engine) = self.cell.get() {
            return Ok(Arc::clone(engine));
        }
        let _guard = self.gate.lock();
        if let Some(engine) = self.cell.get() {
            return Ok(Arc::clone(engine));
        }
        let engine = Arc::new((self.loader)()?);
        let _ = self.cell.set(Arc::clone(&engine));
        Ok(engine)
    }

    pub fn is_loaded(&self) -> bool {
        self.cell.get().is_some()
    }
}

impl std::fmt::Debug for LazyEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LazyEngine").field("loaded", &self.is_loaded()).finish()
    }
}
