//! Offline jobs: the artifact build and collaborative model training.
//!
//! Both are run explicitly from the CLI. Serving never triggers them.

use std::time::Instant;

use serde::Serialize;
use tracing::info;

use crate::config::Config;
use crate::error::Result;
use data_loader::{MovieCatalog, RatingStore};
use pipeline::ArtifactSet;
use sources::MatrixFactorization;

/// Load the dataset, build every artifact and save the set
pub fn build_artifacts(config: &Config) -> Result<ArtifactSet> {
    let start = Instant::now();

    let catalog = MovieCatalog::load_from_file(&config.paths.dataset)?;
    let artifacts = ArtifactSet::build(catalog, config.feature_config())?;
    artifacts.save(&config.paths.artifacts)?;

    info!(
        "Built artifacts for {} movies ({} features) in {:.2?}",
        artifacts.catalog.len(),
        artifacts.metadata.feature_dim,
        start.elapsed()
    );
    Ok(artifacts)
}

/// Outcome of a training run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrainingReport {
    pub users: usize,
    pub movies: usize,
    pub ratings: usize,
    pub rank: usize,
    /// Error on the training ratings
    pub rmse: f32,
}

/// Fit the factorization on the rating store and save it next to the artifacts
pub fn train_collaborative(config: &Config, store: &RatingStore) -> Result<TrainingReport> {
    let start = Instant::now();

    let model = MatrixFactorization::fit(store, &config.factorization)?;
    model.save(&config.paths.artifacts)?;

    let report = TrainingReport {
        users: model.user_count(),
        movies: model.movie_count(),
        ratings: store.len(),
        rank: model.rank(),
        rmse: model.rmse(store),
    };
    info!(
        "Trained collaborative model on {} ratings in {:.2?} (rmse {:.3})",
        report.ratings,
        start.elapsed(),
        report.rmse
    );
    Ok(report)
}
