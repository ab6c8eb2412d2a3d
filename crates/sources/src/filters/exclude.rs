//! Filter to drop a fixed set of movies, typically the query movie.

use crate::error::Result;
use crate::traits::Filter;
use crate::types::{Candidate, UserContext};
use data_loader::MovieId;
use std::collections::HashSet;

pub struct ExcludeMoviesFilter {
    excluded: HashSet<MovieId>,
}

impl ExcludeMoviesFilter {
    pub fn new(excluded: impl IntoIterator<Item = MovieId>) -> Self {
        Self {
            excluded: excluded.into_iter().collect(),
        }
    }
}

impl Filter for ExcludeMoviesFilter {
    fn name(&self) -> &str {
        "ExcludeMoviesFilter"
    }

    fn apply(&self, candidates: Vec<Candidate>, _context: &UserContext) -> Result<Vec<Candidate>> {
        Ok(candidates
            .into_iter()
            .filter(|candidate| !self.excluded.contains(&candidate.movie_id))
            .collect())
    }
}
