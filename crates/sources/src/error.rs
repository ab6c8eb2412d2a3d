//! Error types for candidate sources.

use data_loader::{DataLoadError, MovieId};
use pipeline::ArtifactError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Movie {0} is not in the catalog")]
    UnknownMovie(MovieId),

    #[error("Cannot train: {0}")]
    Training(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Artifact(#[from] ArtifactError),

    #[error(transparent)]
    Data(#[from] DataLoadError),
}

pub type Result<T> = std::result::Result<T, SourceError>;
