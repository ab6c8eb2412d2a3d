//! Error types for building, saving and loading artifacts.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ArtifactError {
    /// An artifact file is absent. Serving cannot start until a build runs.
    #[error(
        "Artifact {file} not found in {dir}. Run `cinematch build` to generate the artifact set."
    )]
    Missing { dir: PathBuf, file: String },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot (de)serialize {path}: {source}")]
    Serde {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Artifacts on disk disagree with each other (e.g. a partial rebuild)
    #[error("Artifacts are inconsistent: {0}. Rebuild with `cinematch build`.")]
    Inconsistent(String),

    #[error("Invalid feature configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, ArtifactError>;
