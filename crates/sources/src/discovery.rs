//! Discovery Source - browsing without a query movie
//!
//! Two strategies:
//! - Genre search: movies whose genre names contain a query, best rated first
//! - Random: a uniform sample without replacement

use crate::filter_pipeline::FilterPipeline;
use crate::filters::GenreMatchFilter;
use crate::error::Result;
use crate::types::{Candidate, CandidateSource, UserContext};
use data_loader::{Movie, MovieCatalog};
use rand::Rng;
use std::cmp::Ordering;
use std::sync::Arc;
use tracing::{debug, instrument};

#[derive(Clone)]
pub struct DiscoverySource {
    catalog: Arc<MovieCatalog>,
}

impl DiscoverySource {
    pub fn new(catalog: Arc<MovieCatalog>) -> Self {
        Self { catalog }
    }

    /// Movies matching `query`, ordered by `vote_average` desc, then
    /// `vote_count` desc, then dataset order.
    ///
    /// A blank query returns an empty list.
    #[instrument(skip(self))]
    pub fn by_genre(&self, query: &str, limit: usize) -> Result<Vec<Candidate>> {
        let all: Vec<Candidate> = self
            .catalog
            .movies()
            .iter()
            .map(|m| Candidate::new(m.id, CandidateSource::Genre, m.vote_average.unwrap_or(0.0)))
            .collect();

        let pipeline =
            FilterPipeline::new().add_filter(GenreMatchFilter::new(self.catalog.clone(), query));
        let mut candidates = pipeline.apply(all, &UserContext::default())?;

        candidates.sort_by(|a, b| {
            match (self.catalog.get_movie(a.movie_id), self.catalog.get_movie(b.movie_id)) {
                (Some(a), Some(b)) => by_popularity(a, b),
                _ => Ordering::Equal,
            }
        });
        candidates.truncate(limit);

        debug!("Found {} movies for genre query '{}'", candidates.len(), query);
        Ok(candidates)
    }

    /// `min(limit, n)` distinct movies drawn uniformly
    pub fn random(&self, limit: usize) -> Vec<Candidate> {
        self.random_with(&mut rand::rng(), limit)
    }

    /// Same as [`Self::random`] with a caller-provided generator
    pub fn random_with<R: Rng + ?Sized>(&self, rng: &mut R, limit: usize) -> Vec<Candidate> {
        let n = self.catalog.len();
        let amount = limit.min(n);

        rand::seq::index::sample(rng, n, amount)
            .into_iter()
            .filter_map(|idx| self.catalog.movie_at(idx))
            .map(|m| Candidate::new(m.id, CandidateSource::Random, 0.0))
            .collect()
    }
}

/// Higher `vote_average` first, then higher `vote_count`; missing values last
fn by_popularity(a: &Movie, b: &Movie) -> Ordering {
    let avg = |m: &Movie| m.vote_average.unwrap_or(f32::NEG_INFINITY);
    let count = |m: &Movie| m.vote_count.unwrap_or(0);
    avg(b)
        .total_cmp(&avg(a))
        .then_with(|| count(b).cmp(&count(a)))
}
