//! Offline build pipeline: features, similarity and artifacts.
//!
//! This crate provides:
//! - TfidfVectorizer for plot overviews
//! - GenreEncoder and MinMaxScaler for genres and vote statistics
//! - FeatureBuilder combining the three blocks into one vector per movie
//! - TruncatedSvd for optionally shrinking those vectors
//! - SimilarityMatrix holding all-pairs cosine similarity
//! - ArtifactSet for persisting and reloading everything above
//!
//! ## Architecture
//! The build runs in stages:
//! 1. Fit transformers over the whole catalog
//! 2. Transform every movie into a feature row (parallel)
//! 3. Optionally project the rows onto their top singular vectors
//! 4. Compute the similarity matrix (parallel over rows)
//! 5. Save the artifact set as JSON
//!
//! ## Example Usage
//! ```ignore
//! use data_loader::MovieCatalog;
//! use pipeline::{ArtifactSet, FeatureConfig};
//!
//! let catalog = MovieCatalog::load_from_file(Path::new("data/movies_dataset.json"))?;
//! let artifacts = ArtifactSet::build(catalog, FeatureConfig::default())?;
//! artifacts.save(Path::new("artifacts"))?;
//!
//! // Later, at serve time
//! let artifacts = ArtifactSet::load(Path::new("artifacts"))?;
//! ```

pub mod error;
pub mod tfidf;
pub mod encoders;
pub mod features;
pub mod reduction;
pub mod similarity;
pub mod artifacts;

// Re-export main types
pub use error::{ArtifactError, Result};
pub use tfidf::{TfidfConfig, TfidfVectorizer};
pub use encoders::{ColumnStats, GenreEncoder, MinMaxScaler};
pub use features::{FeatureBuilder, FeatureConfig, FeatureDimensions, FeatureMatrix, FeatureWeights};
pub use reduction::{ReductionConfig, TruncatedSvd};
pub use similarity::{cosine_similarity, SimilarityMatrix};
pub use artifacts::{ArtifactMetadata, ArtifactSet};
