//! Hybrid Source - content similarity blended with factorization predictions
//!
//! ## Scoring
//! For candidate movie `m` and user `u`:
//! - content `c`: similarity to the seed movie, or the user's rating-weighted
//!   affinity when there is no seed; scaled to 0-10
//! - predicted `p`: the mean of the factorization prediction (if the model
//!   knows `(u, m)`) and the neighbor score (if similar users rated `m`)
//! - `score = content_weight * c + collaborative_weight * p`, or just `c`
//!   when neither prediction exists
//!
//! Candidates exclude the seed movie and everything the user already rated.
//!
//! ## Cold start
//! With no seed and no rated catalog movie there is no content signal. The
//! source then browses instead: the user's best-liked genre if they have
//! one, otherwise a random sample.

use crate::collaborative::MatrixFactorization;
use crate::content::ContentSource;
use crate::discovery::DiscoverySource;
use crate::error::{Result, SourceError};
use crate::filter_pipeline::FilterPipeline;
use crate::filters::{AlreadyRatedFilter, ExcludeMoviesFilter};
use crate::types::{rank, Candidate, CandidateMetadata, CandidateSource, UserContext};
use data_loader::{MovieId, MAX_RATING};
use pipeline::ArtifactSet;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Blend weights for the two signals
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HybridWeights {
    pub content: f32,
    pub collaborative: f32,
}

impl Default for HybridWeights {
    fn default() -> Self {
        Self {
            content: 0.7,
            collaborative: 0.3,
        }
    }
}

impl HybridWeights {
    pub fn validate(&self) -> Result<()> {
        let finite = self.content.is_finite() && self.collaborative.is_finite();
        if !finite || self.content < 0.0 || self.collaborative < 0.0 {
            return Err(SourceError::InvalidConfig(format!(
                "hybrid weights must be non-negative, got {self:?}"
            )));
        }
        if self.content + self.collaborative == 0.0 {
            return Err(SourceError::InvalidConfig(
                "hybrid weights must not both be zero".to_string(),
            ));
        }
        Ok(())
    }
}

pub struct HybridSource {
    artifacts: Arc<ArtifactSet>,
    content: ContentSource,
    discovery: DiscoverySource,
    model: Option<Arc<MatrixFactorization>>,
    weights: HybridWeights,
}

impl HybridSource {
    pub fn new(
        artifacts: Arc<ArtifactSet>,
        model: Option<Arc<MatrixFactorization>>,
        weights: HybridWeights,
    ) -> Result<Self> {
        weights.validate()?;
        if model.is_none() {
            warn!("No collaborative model loaded; hybrid scores are content-only");
        }
        Ok(Self {
            content: ContentSource::new(artifacts.clone()),
            discovery: DiscoverySource::new(artifacts.catalog.clone()),
            artifacts,
            model,
            weights,
        })
    }

    /// Combine the two signals into one 0-10 score
    pub fn blend(&self, content: f32, predicted: Option<f32>) -> f32 {
        match predicted {
            Some(p) => self.weights.content * content + self.weights.collaborative * p,
            None => content,
        }
    }

    /// Mean of the model prediction and the neighbor score, whichever exist
    pub fn collaborative_prediction(&self, model: Option<f32>, neighbor: Option<f32>) -> Option<f32> {
        match (model, neighbor) {
            (Some(m), Some(n)) => Some((m + n) / 2.0),
            (m, n) => m.or(n),
        }
    }

    /// Ranked hybrid recommendations for a user, optionally anchored on a seed
    #[instrument(skip(self, context), fields(user_id = %context.user_id))]
    pub fn get_candidates(
        &self,
        context: &UserContext,
        seed: Option<MovieId>,
        limit: usize,
    ) -> Result<Vec<Candidate>> {
        let affinity: Vec<f32> = match seed {
            Some(id) => self.content.seed_row(id)?.to_vec(),
            None => match self.content.user_affinity(context) {
                Some(affinity) => affinity,
                None => return self.cold_start(context, limit),
            },
        };

        let scored: Vec<Candidate> = self
            .artifacts
            .catalog
            .movies()
            .par_iter()
            .zip(&affinity)
            .map(|(movie, &sim)| {
                let content = sim * MAX_RATING;
                let model = self
                    .model
                    .as_ref()
                    .and_then(|m| m.predict(&context.user_id, movie.id));
                let neighbor = context.neighbor_scores.get(&movie.id).copied();
                let predicted = self.collaborative_prediction(model, neighbor);
                let mut candidate =
                    Candidate::new(movie.id, CandidateSource::Hybrid, self.blend(content, predicted));
                candidate.metadata = CandidateMetadata {
                    content_score: Some(content),
                    predicted_score: predicted,
                    neighbor_score: neighbor,
                };
                candidate
            })
            .collect();

        let pipeline = FilterPipeline::new()
            .add_filter(ExcludeMoviesFilter::new(seed))
            .add_filter(AlreadyRatedFilter);
        let mut candidates = pipeline.apply(scored, context)?;

        rank(&mut candidates);
        candidates.truncate(limit);

        debug!("Generated {} hybrid candidates", candidates.len());
        Ok(candidates)
    }

    /// Discovery results for a user with nothing to compare against
    fn cold_start(&self, context: &UserContext, limit: usize) -> Result<Vec<Candidate>> {
        let pipeline = FilterPipeline::new().add_filter(AlreadyRatedFilter);

        if let Some(genre) = context.top_genres(1).first() {
            let by_genre = self.discovery.by_genre(genre.name(), self.artifacts.catalog.len())?;
            let mut candidates = pipeline.apply(by_genre, context)?;
            if !candidates.is_empty() {
                candidates.truncate(limit);
                info!(
                    "No content signal for '{}'; browsing top genre {}",
                    context.user_id,
                    genre.name()
                );
                return Ok(candidates);
            }
        }

        info!("No content signal for '{}'; sampling at random", context.user_id);
        let sampled = self
            .discovery
            .random(limit.saturating_add(context.rated_movies.len()));
        let mut candidates = pipeline.apply(sampled, context)?;
        candidates.truncate(limit);
        Ok(candidates)
    }
}
