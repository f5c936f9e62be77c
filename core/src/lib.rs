//! Indexing and ranking engine for course listings.
//!
//! Build once per corpus snapshot, persist, then answer free-text queries with
//! boolean AND matching or cosine ranking under a TF-IDF or blended
//! title + description weighting.

pub mod analysis;
pub mod boolean;
pub mod engine;
pub mod error;
mod index;
pub mod persist;
pub mod ranker;
pub mod tokenizer;
pub mod vocabulary;
pub mod weighting;

pub use engine::{Engine, LazyEngine, SearchHit};
pub use error::{EngineError, Result};
pub use index::{Course, DocId, Posting, Scheme, TermId, UnknownScheme};
