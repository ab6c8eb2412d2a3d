//! Server crate for the Cinematch recommender.
//!
//! This crate contains the recommender facade that coordinates the candidate
//! sources, the offline build and training jobs, configuration, and the REST
//! API served by the `cinematch-server` binary.

pub mod api;
pub mod config;
pub mod error;
pub mod offline;
pub mod recommender;

pub use api::{router, AppState};
pub use config::{Config, ConfigError};
pub use error::{RecommendError, Result};
pub use offline::{build_artifacts, train_collaborative, TrainingReport};
pub use recommender::{
    Analytics, CatalogStats, RatedMovieStats, Recommendation, Recommender, TitleOutcome,
};
