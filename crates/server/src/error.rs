//! Error type for the recommender facade.

use crate::config::ConfigError;
use data_loader::{DataLoadError, MovieId};
use pipeline::ArtifactError;
use sources::SourceError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RecommendError {
    #[error("Movie {0} not found")]
    MovieNotFound(MovieId),

    #[error(transparent)]
    Artifact(#[from] ArtifactError),

    #[error(transparent)]
    Source(SourceError),

    #[error(transparent)]
    Data(#[from] DataLoadError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl From<SourceError> for RecommendError {
    fn from(e: SourceError) -> Self {
        match e {
            SourceError::UnknownMovie(id) => Self::MovieNotFound(id),
            SourceError::Artifact(e) => Self::Artifact(e),
            SourceError::Data(e) => Self::Data(e),
            other => Self::Source(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, RecommendError>;
