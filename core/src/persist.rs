use crate::analysis::analyze;
use crate::boolean::BooleanIndex;
use crate::engine::Engine;
use crate::error::{EngineError, Result};
use crate::vocabulary::Vocabulary;
use crate::weighting::{NormTable, WeightedIndex, Weighting};
use crate::{Course, Scheme};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, create_dir_all, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetaFile {
    pub num_docs: u32,
    pub num_terms: u32,
    pub created_at: String,
    pub version: u32,
    /// Weighted schemes present in this snapshot.
    pub schemes: Vec<Scheme>,
}

#[derive(Debug, Clone)]
pub struct IndexPaths {
    pub root: PathBuf,
}

impl IndexPaths {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        // drops trailing separators so sibling paths stay outside the root
        Self { root: root.as_ref().components().collect() }
    }
    pub fn meta(&self) -> PathBuf { self.root.join("meta.json") }
    pub fn vocabulary(&self) -> PathBuf { self.root.join("vocabulary.bin") }
    pub fn boolean(&self) -> PathBuf { self.root.join("boolean.bin") }
    pub fn docs(&self) -> PathBuf { self.root.join("docs.bin") }
    pub fn scheme_dir(&self, scheme: Scheme) -> PathBuf { self.root.join(scheme.as_str()) }
    pub fn postings(&self, scheme: Scheme) -> PathBuf { self.scheme_dir(scheme).join("postings.bin") }
    pub fn norms(&self, scheme: Scheme) -> PathBuf { self.scheme_dir(scheme).join("norms.bin") }
    fn sibling(&self, suffix: &str) -> PathBuf {
        let mut s = self.root.clone().into_os_string();
        s.push(suffix);
        PathBuf::from(s)
    }
    fn staging(&self) -> PathBuf { self.sibling(".staging") }
    fn previous(&self) -> PathBuf { self.sibling(".previous") }
}

fn write_bin<T: Serialize + ?Sized>(path: &Path, value: &T, artifact: &'static str) -> Result<()> {
    if let Some(dir) = path.parent() {
        create_dir_all(dir)?;
    }
    let bytes = bincode::serialize(value).map_err(|source| EngineError::Encode { artifact, source })?;
    let mut f = File::create(path)?;
    f.write_all(&bytes)?;
    Ok(())
}

fn read_bin<T: DeserializeOwned>(path: &Path, artifact: &'static str) -> Result<T> {
    if !path.exists() {
        return Err(EngineError::NotBuilt { artifact, path: path.to_path_buf() });
    }
    let mut f = File::open(path)?;
    let mut buf = Vec::new();
    f.read_to_end(&mut buf)?;
    bincode::deserialize(&buf).map_err(|source| EngineError::Corrupt { path: path.to_path_buf(), source })
}

fn write_meta(paths: &IndexPaths, meta: &MetaFile) -> Result<()> {
    create_dir_all(&paths.root)?;
    let tmp = paths.root.join("meta.json.tmp");
    fs::write(&tmp, serde_json::to_string_pretty(meta)?)?;
    fs::rename(&tmp, paths.meta())?;
    Ok(())
}

pub fn load_meta(paths: &IndexPaths) -> Result<MetaFile> {
    let path = paths.meta();
    if !path.exists() {
        return Err(EngineError::NotBuilt { artifact: "index metadata", path });
    }
    let mut buf = String::new();
    File::open(&path)?.read_to_string(&mut buf)?;
    Ok(serde_json::from_str(&buf)?)
}

pub fn load_vocabulary(paths: &IndexPaths) -> Result<Vocabulary> {
    read_bin(&paths.vocabulary(), "vocabulary")
}

pub fn load_boolean(paths: &IndexPaths) -> Result<BooleanIndex> {
    read_bin(&paths.boolean(), "boolean index")
}

pub fn load_docs(paths: &IndexPaths) -> Result<Vec<Course>> {
    read_bin(&paths.docs(), "corpus snapshot")
}

pub fn load_weighting(paths: &IndexPaths, scheme: Scheme) -> Result<Weighting> {
    let index: WeightedIndex = read_bin(&paths.postings(scheme), "weighted index")?;
    let norms: NormTable = read_bin(&paths.norms(scheme), "norm table")?;
    if index.scheme != scheme {
        return Err(EngineError::Mismatch {
            artifact: "weighted index",
            detail: format!("found scheme '{}' under '{}'", index.scheme, scheme),
        });
    }
    Ok(Weighting { index, norms })
}

fn write_weighting(paths: &IndexPaths, weighting: &Weighting) -> Result<()> {
    let scheme = weighting.index.scheme;
    write_bin(&paths.postings(scheme), &weighting.index, "weighted index")?;
    write_bin(&paths.norms(scheme), &weighting.norms, "norm table")
}

fn now_rfc3339() -> String {
    time::OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_default()
}

fn meta_for(engine: &Engine) -> MetaFile {
    MetaFile {
        num_docs: engine.num_docs() as u32,
        num_terms: engine.vocabulary().len() as u32,
        created_at: now_rfc3339(),
        version: FORMAT_VERSION,
        schemes: engine.weightings().keys().copied().collect(),
    }
}

fn write_snapshot(paths: &IndexPaths, engine: &Engine) -> Result<()> {
    write_bin(&paths.vocabulary(), engine.vocabulary(), "vocabulary")?;
    write_bin(&paths.boolean(), engine.boolean_index(), "boolean index")?;
    write_bin(&paths.docs(), engine.courses(), "corpus snapshot")?;
    for weighting in engine.weightings().values() {
        write_weighting(paths, weighting)?;
    }
    write_meta(paths, &meta_for(engine))
}

/// Move `staged` to `target`. An existing `target` is parked at `aside` and put
/// back if the move fails; removing it afterwards is best effort.
fn swap_dir(staged: &Path, target: &Path, aside: &Path) -> Result<()> {
    if aside.exists() {
        fs::remove_dir_all(aside)?;
    }
    let replacing = target.exists();
    if replacing {
        fs::rename(target, aside)?;
    }
    if let Err(e) = fs::rename(staged, target) {
        if replacing {
            if let Err(restore) = fs::rename(aside, target) {
                tracing::error!(path = %target.display(), error = %restore, "could not restore replaced artifacts");
            }
        }
        return Err(e.into());
    }
    if replacing {
        if let Err(e) = fs::remove_dir_all(aside) {
            tracing::warn!(path = %aside.display(), error = %e, "could not remove replaced artifacts");
        }
    }
    Ok(())
}

/// Persist a full snapshot, replacing whatever is at `paths.root`.
///
/// Everything is written to a sibling staging directory first; the previous
/// snapshot is only touched once the new one is complete.
pub fn save_engine(paths: &IndexPaths, engine: &Engine) -> Result<()> {
    let staging = paths.staging();
    if staging.exists() {
        fs::remove_dir_all(&staging)?;
    }
    if let Err(e) = write_snapshot(&IndexPaths::new(&staging), engine) {
        let _ = fs::remove_dir_all(&staging);
        return Err(e);
    }

    if let Err(e) = swap_dir(&staging, &paths.root, &paths.previous()) {
        let _ = fs::remove_dir_all(&staging);
        return Err(e);
    }
    tracing::info!(root = %paths.root.display(), num_docs = engine.num_docs(), "snapshot saved");
    Ok(())
}

/// Load the snapshot and every weighted scheme listed in its metadata.
pub fn load_engine(paths: &IndexPaths) -> Result<Engine> {
    let meta = load_meta(paths)?;
    if meta.version != FORMAT_VERSION {
        return Err(EngineError::Mismatch {
            artifact: "index metadata",
            detail: format!("format version {}, expected {}", meta.version, FORMAT_VERSION),
        });
    }
    let vocabulary = load_vocabulary(paths)?;
    let boolean = load_boolean(paths)?;
    let courses = load_docs(paths)?;

    if boolean.num_terms() != vocabulary.len() {
        return Err(EngineError::Mismatch {
            artifact: "boolean index",
            detail: format!("{} terms, vocabulary has {}", boolean.num_terms(), vocabulary.len()),
        });
    }

    let mut weightings = BTreeMap::new();
    for scheme in meta.schemes.iter().copied().filter(Scheme::is_weighted) {
        let weighting = load_weighting(paths, scheme)?;
        if weighting.index.num_terms() != vocabulary.len() || weighting.norms.len() != courses.len() {
            return Err(EngineError::Mismatch {
                artifact: "weighted index",
                detail: format!(
                    "scheme '{}' covers {} terms / {} documents, snapshot has {} / {}",
                    scheme,
                    weighting.index.num_terms(),
                    weighting.norms.len(),
                    vocabulary.len(),
                    courses.len()
                ),
            });
        }
        weightings.insert(scheme, weighting);
    }

    tracing::info!(
        root = %paths.root.display(),
        num_docs = courses.len(),
        num_terms = vocabulary.len(),
        schemes = ?meta.schemes,
        "snapshot loaded"
    );
    Ok(Engine::from_parts(vocabulary, boolean, courses, weightings))
}

/// Recompute one scheme from the persisted snapshot and swap it into place.
/// Other schemes are left untouched.
pub fn rebuild_scheme(paths: &IndexPaths, scheme: Scheme) -> Result<()> {
    let mut meta = load_meta(paths)?;
    let vocabulary = load_vocabulary(paths)?;
    let courses = load_docs(paths)?;
    let docs = analyze(&courses);

    if !scheme.is_weighted() {
        let boolean = BooleanIndex::build(&docs, &vocabulary);
        let tmp = paths.root.join("boolean.bin.tmp");
        write_bin(&tmp, &boolean, "boolean index")?;
        fs::rename(&tmp, paths.boolean())?;
        tracing::info!(%scheme, "scheme rebuilt");
        return Ok(());
    }

    let weighting = Weighting::build(scheme, &docs, &vocabulary);
    let target = paths.scheme_dir(scheme);
    let staging = paths.root.join(format!("{}.staging", scheme.as_str()));
    if staging.exists() {
        fs::remove_dir_all(&staging)?;
    }
    let staged = write_bin(&staging.join("postings.bin"), &weighting.index, "weighted index")
        .and_then(|_| write_bin(&staging.join("norms.bin"), &weighting.norms, "norm table"))
        .and_then(|_| swap_dir(&staging, &target, &paths.root.join(format!("{}.previous", scheme.as_str()))));
    if let Err(e) = staged {
        let _ = fs::remove_dir_all(&staging);
        return Err(e);
    }

    if !meta.schemes.contains(&scheme) {
        meta.schemes.push(scheme);
        meta.schemes.sort();
    }
    write_meta(paths, &meta)?;
    tracing::info!(%scheme, num_postings = weighting.index.num_postings(), "scheme rebuilt");
    Ok(())
}
