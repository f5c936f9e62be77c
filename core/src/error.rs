use crate::Scheme;
use std::path::PathBuf;

pub type Result<T, E = EngineError> = std::result::Result<T, E>;

#[derive(thiserror::Error, Debug)]
pub enum EngineError {
    /// A required artifact has not been built or persisted yet.
    #[error("{artifact} has not been built (expected at {})", path.display())]
    NotBuilt { artifact: &'static str, path: PathBuf },
    /// The snapshot exists but this scoring scheme was never built for it.
    #[error("index for scheme '{0}' has not been built")]
    SchemeNotBuilt(Scheme),
    #[error("corrupt artifact {}: {source}", path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: bincode::Error,
    },
    /// Artifacts on disk do not belong to the same build.
    #[error("{artifact} does not match the vocabulary: {detail}")]
    Mismatch { artifact: &'static str, detail: String },
    #[error("failed to encode {artifact}: {source}")]
    Encode {
        artifact: &'static str,
        #[source]
        source: bincode::Error,
    },
    #[error("invalid index metadata: {0}")]
    Meta(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl EngineError {
    /// True when the caller can recover by running a build.
    pub fn is_not_built(&self) -> bool {
        matches!(self, EngineError::NotBuilt { .. } | EngineError::SchemeNotBuilt(_))
    }
}
