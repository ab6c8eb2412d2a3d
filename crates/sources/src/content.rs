//! Content Source - nearest neighbors in the similarity matrix
//!
//! ## Algorithm
//! 1. Look up the query movie's row in the similarity matrix
//! 2. Drop the query movie itself
//! 3. Sort by similarity descending (stable, so ties keep dataset order)
//! 4. Return the top `limit`
//!
//! The same matrix also provides the content component of hybrid scores,
//! either from one seed movie or averaged over a user's rated movies.

use crate::error::{Result, SourceError};
use crate::types::{rank, Candidate, CandidateSource, UserContext};
use data_loader::MovieId;
use pipeline::ArtifactSet;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Content-based source over precomputed similarities
#[derive(Clone)]
pub struct ContentSource {
    artifacts: Arc<ArtifactSet>,
}

impl ContentSource {
    pub fn new(artifacts: Arc<ArtifactSet>) -> Self {
        Self { artifacts }
    }

    /// The `limit` movies most similar to `movie_id`, excluding itself
    #[instrument(skip(self))]
    pub fn similar_to(&self, movie_id: MovieId, limit: usize) -> Result<Vec<Candidate>> {
        let row = self.seed_row(movie_id)?;

        let mut candidates: Vec<Candidate> = self
            .artifacts
            .catalog
            .movies()
            .iter()
            .zip(row)
            .filter(|(movie, _)| movie.id != movie_id)
            .map(|(movie, &sim)| Candidate::new(movie.id, CandidateSource::Content, sim))
            .collect();

        rank(&mut candidates);
        candidates.truncate(limit);

        debug!("Generated {} content candidates", candidates.len());
        Ok(candidates)
    }

    /// Similarity of every catalog movie to `movie_id`, in dataset order
    pub fn seed_row(&self, movie_id: MovieId) -> Result<&[f32]> {
        self.artifacts
            .catalog
            .position(movie_id)
            .and_then(|idx| self.artifacts.similarity.row(idx))
            .ok_or(SourceError::UnknownMovie(movie_id))
    }

    /// Rating-weighted mean similarity of every catalog movie to the movies
    /// the user rated, in dataset order.
    ///
    /// Returns `None` when none of the user's rated movies are in the catalog.
    /// If every rating is 0 the plain mean is used instead.
    pub fn user_affinity(&self, context: &UserContext) -> Option<Vec<f32>> {
        let rows: Vec<(&[f32], f32)> = context
            .ratings
            .iter()
            .filter_map(|&(movie_id, score)| {
                let idx = self.artifacts.catalog.position(movie_id)?;
                Some((self.artifacts.similarity.row(idx)?, score))
            })
            .collect();
        if rows.is_empty() {
            return None;
        }

        let total_weight: f32 = rows.iter().map(|(_, w)| w).sum();
        let n = self.artifacts.catalog.len();
        let mut affinity = vec![0.0f32; n];

        if total_weight > 0.0 {
            for (row, weight) in &rows {
                for (acc, sim) in affinity.iter_mut().zip(row.iter()) {
                    *acc += weight * sim;
                }
            }
            affinity.iter_mut().for_each(|a| *a /= total_weight);
        } else {
            for (row, _) in &rows {
                for (acc, sim) in affinity.iter_mut().zip(row.iter()) {
                    *acc += sim;
                }
            }
            let count = rows.len() as f32;
            affinity.iter_mut().for_each(|a| *a /= count);
        }
        Some(affinity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use data_loader::{Genre, Movie, MovieCatalog};
    use pipeline::FeatureConfig;

    fn movie(id: MovieId, overview: &str, genres: Vec<Genre>) -> Movie {
        Movie {
            id,
            title: format!("Movie {id}"),
            genres,
            overview: overview.to_string(),
            vote_average: Some(7.0),
            vote_count: Some(100),
            release_date: None,
        }
    }

    fn create_source() -> ContentSource {
        let catalog = MovieCatalog::from_movies(vec![
            movie(10, "space crew wormhole", vec![Genre::ScienceFiction]),
            movie(20, "space crew mars", vec![Genre::ScienceFiction]),
            movie(30, "bank heist crew", vec![Genre::Crime]),
            movie(40, "bank heist city", vec![Genre::Crime]),
        ]);
        let artifacts = ArtifactSet::build(catalog, FeatureConfig::default()).unwrap();
        ContentSource::new(Arc::new(artifacts))
    }

    #[test]
    fn test_similar_to_excludes_query() {
        let source = create_source();
        let candidates = source.similar_to(10, 10).unwrap();

        assert_eq!(candidates.len(), 3);
        assert!(candidates.iter().all(|c| c.movie_id != 10));
        assert_eq!(candidates[0].movie_id, 20);
        assert!(candidates.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[test]
    fn test_limit_and_unknown_movie() {
        let source = create_source();
        assert_eq!(source.similar_to(30, 1).unwrap().len(), 1);
        assert!(source.similar_to(30, 0).unwrap().is_empty());
        assert!(matches!(
            source.similar_to(999, 5),
            Err(SourceError::UnknownMovie(999))
        ));
    }

    #[test]
    fn test_user_affinity() {
        let source = create_source();
        let mut context = UserContext::new("alice");
        context.ratings = vec![(10, 8.0), (30, 2.0)];

        let affinity = source.user_affinity(&context).unwrap();
        let row_10 = source.seed_row(10).unwrap();
        let row_30 = source.seed_row(30).unwrap();
        for i in 0..affinity.len() {
            let expected = (8.0 * row_10[i] + 2.0 * row_30[i]) / 10.0;
            assert!((affinity[i] - expected).abs() < 1e-6);
        }

        context.ratings = vec![(999, 9.0)];
        assert!(source.user_affinity(&context).is_none());
    }
}
