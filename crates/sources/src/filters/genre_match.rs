//! Filter to keep only movies whose genres match a free-text query.

use crate::error::Result;
use crate::traits::Filter;
use crate::types::{Candidate, UserContext};
use data_loader::MovieCatalog;
use std::sync::Arc;

/// Keeps candidates with at least one genre whose name contains the query,
/// case-insensitively. A blank query matches nothing.
pub struct GenreMatchFilter {
    catalog: Arc<MovieCatalog>,
    query: String,
}

impl GenreMatchFilter {
    pub fn new(catalog: Arc<MovieCatalog>, query: &str) -> Self {
        Self {
            catalog,
            query: query.to_string(),
        }
    }
}

impl Filter for GenreMatchFilter {
    fn name(&self) -> &str {
        "GenreMatchFilter"
    }

    fn apply(&self, candidates: Vec<Candidate>, _context: &UserContext) -> Result<Vec<Candidate>> {
        Ok(candidates
            .into_iter()
            .filter(|candidate| {
                self.catalog
                    .get_movie(candidate.movie_id)
                    .is_some_and(|movie| movie.matches_genre(&self.query))
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CandidateSource;
    use data_loader::{Genre, Movie};

    fn create_test_catalog() -> MovieCatalog {
        let movie = |id, genres| Movie {
            id,
            title: format!("Movie {id}"),
            genres,
            overview: String::new(),
            vote_average: None,
            vote_count: None,
            release_date: None,
        };
        MovieCatalog::from_movies(vec![
            movie(1, vec![Genre::Action, Genre::Adventure]),
            movie(2, vec![Genre::Drama]),
            movie(3, vec![Genre::ScienceFiction]),
        ])
    }

    #[test]
    fn test_genre_match_filter() {
        let catalog = Arc::new(create_test_catalog());
        let candidates = || {
            vec![
                Candidate::new(1, CandidateSource::Genre, 0.0),
                Candidate::new(2, CandidateSource::Genre, 0.0),
                Candidate::new(3, CandidateSource::Genre, 0.0),
                Candidate::new(4, CandidateSource::Genre, 0.0), // not in catalog
            ]
        };
        let context = UserContext::default();

        let filtered = GenreMatchFilter::new(catalog.clone(), "fiction")
            .apply(candidates(), &context)
            .unwrap();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].movie_id, 3);

        let blank = GenreMatchFilter::new(catalog, "  ")
            .apply(candidates(), &context)
            .unwrap();
        assert!(blank.is_empty());
    }
}
