use msc_core::persist::{load_engine, load_meta, rebuild_scheme, save_engine, IndexPaths};
use msc_core::{Course, DocId, Engine, EngineError, LazyEngine, Scheme};
use tempfile::tempdir;

fn corpus() -> Vec<Course> {
    vec![
        Course::new("Data Science MSc", "data science statistics"),
        Course::new("Physics", "quantum physics mechanics"),
        Course::new("Applied Data Analytics", "data analytics statistics machine learning"),
    ]
}

fn hits(engine: &Engine, query: &str, scheme: Scheme) -> Vec<(DocId, f32)> {
    engine.search(query, 10, scheme).unwrap().iter().map(|h| (h.doc_id, h.similarity)).collect()
}

#[test]
fn saved_snapshot_loads_back_identically() {
    let dir = tempdir().unwrap();
    let paths = IndexPaths::new(dir.path().join("index"));
    let built = Engine::build(corpus(), &Scheme::WEIGHTED);
    save_engine(&paths, &built).unwrap();

    let loaded = load_engine(&paths).unwrap();
    assert_eq!(loaded.vocabulary(), built.vocabulary());
    assert_eq!(loaded.courses(), built.courses());
    for scheme in [Scheme::Boolean, Scheme::Tfidf, Scheme::Blended] {
        assert_eq!(hits(&loaded, "data statistics", scheme), hits(&built, "data statistics", scheme));
    }

    let meta = load_meta(&paths).unwrap();
    assert_eq!(meta.num_docs, 3);
    assert_eq!(meta.schemes, vec![Scheme::Tfidf, Scheme::Blended]);
}

#[test]
fn unbuilt_scheme_is_reported_after_load() {
    let dir = tempdir().unwrap();
    let paths = IndexPaths::new(dir.path().join("index"));
    save_engine(&paths, &Engine::build(corpus(), &[Scheme::Tfidf])).unwrap();
    let loaded = load_engine(&paths).unwrap();
    let err = loaded.search("data", 5, Scheme::Blended).unwrap_err();
    assert!(matches!(err, EngineError::SchemeNotBuilt(Scheme::Blended)));
}

#[test]
fn rebuild_scheme_adds_one_scheme_without_touching_others() {
    let dir = tempdir().unwrap();
    let paths = IndexPaths::new(dir.path().join("index"));
    save_engine(&paths, &Engine::build(corpus(), &[Scheme::Tfidf])).unwrap();
    let before = std::fs::read(paths.postings(Scheme::Tfidf)).unwrap();

    rebuild_scheme(&paths, Scheme::Blended).unwrap();

    assert_eq!(std::fs::read(paths.postings(Scheme::Tfidf)).unwrap(), before);
    let loaded = load_engine(&paths).unwrap();
    let reference = Engine::build(corpus(), &Scheme::WEIGHTED);
    assert_eq!(hits(&loaded, "data statistics", Scheme::Blended), hits(&reference, "data statistics", Scheme::Blended));
    assert!(!paths.root.join("blended.staging").exists());
}

#[test]
fn full_rebuild_replaces_every_artifact() {
    let dir = tempdir().unwrap();
    let paths = IndexPaths::new(dir.path().join("index"));
    save_engine(&paths, &Engine::build(corpus(), &Scheme::WEIGHTED)).unwrap();
    save_engine(&paths, &Engine::build(vec![Course::new("Law", "contract law")], &[Scheme::Tfidf])).unwrap();

    let loaded = load_engine(&paths).unwrap();
    assert_eq!(loaded.num_docs(), 1);
    assert!(loaded.vocabulary().term_id("data").is_none());
    assert!(!paths.scheme_dir(Scheme::Blended).exists());
    assert!(!dir.path().join("index.staging").exists());
    assert!(!dir.path().join("index.previous").exists());
}

#[cfg(unix)]
#[test]
fn failed_build_leaves_prior_snapshot_loadable() {
    let dir = tempdir().unwrap();
    let paths = IndexPaths::new(dir.path().join("index"));
    save_engine(&paths, &Engine::build(corpus(), &Scheme::WEIGHTED)).unwrap();

    // a dangling link where the staging directory goes makes the snapshot write fail
    std::os::unix::fs::symlink(dir.path().join("nowhere"), dir.path().join("index.staging")).unwrap();
    assert!(save_engine(&paths, &Engine::build(vec![Course::new("Law", "contract law")], &[Scheme::Tfidf])).is_err());

    let loaded = load_engine(&paths).unwrap();
    assert_eq!(loaded.num_docs(), 3);
    assert_eq!(loaded.schemes(), vec![Scheme::Boolean, Scheme::Tfidf, Scheme::Blended]);
    assert!(!dir.path().join("index.previous").exists());
}

#[test]
fn scheme_rebuild_replaces_existing_scheme_dir() {
    let dir = tempdir().unwrap();
    let paths = IndexPaths::new(dir.path().join("index"));
    save_engine(&paths, &Engine::build(corpus(), &Scheme::WEIGHTED)).unwrap();
    let before = std::fs::read(paths.postings(Scheme::Tfidf)).unwrap();

    rebuild_scheme(&paths, Scheme::Tfidf).unwrap();

    assert_eq!(std::fs::read(paths.postings(Scheme::Tfidf)).unwrap(), before);
    assert!(!paths.root.join("tfidf.previous").exists());
    assert_eq!(load_engine(&paths).unwrap().num_docs(), 3);
}

#[test]
fn lazy_engine_reports_not_built_then_loads() {
    let dir = tempdir().unwrap();
    let paths = IndexPaths::new(dir.path().join("index"));
    let lazy = LazyEngine::open(paths.clone());

    let err = lazy.get().unwrap_err();
    assert!(err.is_not_built());
    assert!(!lazy.is_loaded());

    save_engine(&paths, &Engine::build(corpus(), &Scheme::WEIGHTED)).unwrap();
    let engine = lazy.get().unwrap();
    assert_eq!(engine.num_docs(), 3);
    assert!(lazy.is_loaded());
}
