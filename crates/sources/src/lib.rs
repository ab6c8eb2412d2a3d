//! # Sources Crate
//!
//! This crate turns the precomputed artifacts into ranked candidates.
//!
//! ## Components
//!
//! ### Content Source
//! Nearest neighbors of a movie in the similarity matrix.
//!
//! ### Discovery Source
//! Browsing without a query movie:
//! - Genre search, best rated first
//! - Uniform random sampling
//!
//! ### Collaborative model and Hybrid Source
//! A matrix factorization fitted on the rating store predicts a user's score
//! for movies they have not rated. Neighbor scores from users with similar
//! ratings are computed live from the store and averaged with it. The hybrid
//! source blends that prediction with content similarity using configurable
//! weights, and falls back to discovery for users with no content signal.
//!
//! ### Evaluation
//! Precision, recall and F1 of a recommendation list against held-out ratings.
//!
//! ### Filters
//! Composable `Filter` implementations chained by a `FilterPipeline`.
//!
//! ## Example Usage
//!
//! ```ignore
//! use sources::{ContentSource, HybridSource, HybridWeights, user_context::build_user_context};
//! use pipeline::ArtifactSet;
//! use std::sync::Arc;
//!
//! let artifacts = Arc::new(ArtifactSet::load(Path::new("artifacts"))?);
//!
//! let content = ContentSource::new(artifacts.clone());
//! let similar = content.similar_to(157336, 10)?;
//!
//! let context = build_user_context(&store, &artifacts.catalog, "alice");
//! let hybrid = HybridSource::new(artifacts.clone(), None, HybridWeights::default())?;
//! let picks = hybrid.get_candidates(&context, None, 10)?;
//! ```

// Public modules
pub mod error;
pub mod types;
pub mod traits;
pub mod filters;
pub mod filter_pipeline;
pub mod user_context;
pub mod content;
pub mod discovery;
pub mod collaborative;
pub mod neighbors;
pub mod hybrid;
pub mod evaluation;

// Re-export commonly used types
pub use error::{Result, SourceError};
pub use types::{Candidate, CandidateMetadata, CandidateSource, UserContext};
pub use traits::Filter;
pub use filter_pipeline::FilterPipeline;
pub use user_context::{GenreAffinity, RatedMovie, UserProfile};
pub use content::ContentSource;
pub use discovery::DiscoverySource;
pub use collaborative::{FactorizationConfig, MatrixFactorization};
pub use neighbors::neighbor_scores;
pub use hybrid::{HybridSource, HybridWeights};
pub use evaluation::EvaluationReport;
