//! MovieCatalog building and title lookup.
//!
//! This module builds the catalog from parsed movies and resolves free-text
//! titles to ids.

use crate::error::{DataLoadError, Result};
use crate::parser;
use crate::types::*;
use serde::Serialize;
use std::collections::HashSet;
use std::path::Path;
use tracing::{info, warn};

/// Minimum bigram similarity for a title to be offered as a suggestion
const SUGGESTION_CUTOFF: f32 = 0.3;
const MAX_SUGGESTIONS: usize = 5;

/// A candidate title for a lookup, with its string similarity to the query
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TitleMatch {
    pub movie_id: MovieId,
    pub title: String,
    /// Similarity in [0, 1]; 1.0 for an exact match
    pub score: f32,
}

/// Outcome of resolving a title query
#[derive(Debug, Clone, PartialEq)]
pub enum TitleLookup {
    /// Exactly one movie matches
    Resolved(MovieId),
    /// Several movies match; the caller has to pick one
    Ambiguous(Vec<TitleMatch>),
    /// Nothing matches; close titles are offered instead (possibly none)
    NotFound(Vec<TitleMatch>),
}

impl MovieCatalog {
    /// Load the dataset file and build the catalog
    pub fn load_from_file(path: &Path) -> Result<Self> {
        info!("Loading movie dataset from {}", path.display());

        let movies = parser::parse_movies(path)?;
        let parsed = movies.len();
        let catalog = Self::from_movies(movies);

        info!(
            "Loaded {} movies ({} rows kept after de-duplication)",
            parsed,
            catalog.len()
        );
        catalog.validate()?;
        Ok(catalog)
    }

    /// Build a catalog from movies in dataset order.
    ///
    /// A repeated id keeps its first occurrence; later ones are dropped with a
    /// warning.
    pub fn from_movies(movies: impl IntoIterator<Item = Movie>) -> Self {
        let mut catalog = Self::new();
        for movie in movies {
            let (id, title) = (movie.id, movie.title.clone());
            if !catalog.insert_movie(movie) {
                warn!("Skipping duplicate movie id {} ({})", id, title);
            }
        }
        catalog
    }

    /// Validate data integrity
    ///
    /// Check that:
    /// - The catalog is not empty
    /// - Every stored `vote_average` is within 0-10
    pub fn validate(&self) -> Result<()> {
        if self.movies.is_empty() {
            return Err(DataLoadError::ValidationError(
                "dataset contains no usable movies".to_string(),
            ));
        }
        for movie in &self.movies {
            if let Some(v) = movie.vote_average {
                if !(0.0..=MAX_RATING).contains(&v) {
                    return Err(DataLoadError::InvalidValue {
                        field: "vote_average".to_string(),
                        value: v.to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Resolve a title query.
    ///
    /// ## Algorithm
    /// 1. Case-insensitive exact match on the trimmed title
    /// 2. Otherwise titles containing the query as a substring
    /// 3. Otherwise fuzzy suggestions by character-bigram similarity
    ///
    /// Multiple matches at step 1 or 2 are reported as ambiguous, best
    /// similarity first, then dataset order.
    pub fn find_by_title(&self, query: &str) -> TitleLookup {
        let query = normalize_title(query);
        if query.is_empty() {
            return TitleLookup::NotFound(Vec::new());
        }

        let exact: Vec<&Movie> = self
            .movies
            .iter()
            .filter(|m| normalize_title(&m.title) == query)
            .collect();
        if let Some(outcome) = self.resolve(&query, exact) {
            return outcome;
        }

        let partial: Vec<&Movie> = self
            .movies
            .iter()
            .filter(|m| normalize_title(&m.title).contains(&query))
            .collect();
        if let Some(outcome) = self.resolve(&query, partial) {
            return outcome;
        }

        let mut suggestions: Vec<TitleMatch> = self
            .movies
            .iter()
            .map(|m| title_match(&query, m))
            .filter(|t| t.score >= SUGGESTION_CUTOFF)
            .collect();
        // Stable sort keeps dataset order among equal scores
        suggestions.sort_by(|a, b| b.score.total_cmp(&a.score));
        suggestions.truncate(MAX_SUGGESTIONS);
        TitleLookup::NotFound(suggestions)
    }

    fn resolve(&self, query: &str, matches: Vec<&Movie>) -> Option<TitleLookup> {
        match matches.as_slice() {
            [] => None,
            [single] => Some(TitleLookup::Resolved(single.id)),
            _ => {
                let mut candidates: Vec<TitleMatch> =
                    matches.iter().map(|m| title_match(query, m)).collect();
                candidates.sort_by(|a, b| b.score.total_cmp(&a.score));
                Some(TitleLookup::Ambiguous(candidates))
            }
        }
    }
}

fn normalize_title(title: &str) -> String {
    title.trim().to_lowercase()
}

fn title_match(query: &str, movie: &Movie) -> TitleMatch {
    TitleMatch {
        movie_id: movie.id,
        title: movie.title.clone(),
        score: bigram_similarity(query, &normalize_title(&movie.title)),
    }
}

/// Dice coefficient over character bigrams, in [0, 1]
///
/// Strings too short to have bigrams only score 1.0 when equal.
fn bigram_similarity(a: &str, b: &str) -> f32 {
    fn bigrams(s: &str) -> HashSet<(char, char)> {
        let chars: Vec<char> = s.chars().collect();
        chars.windows(2).map(|w| (w[0], w[1])).collect()
    }

    let (ga, gb) = (bigrams(a), bigrams(b));
    if ga.is_empty() || gb.is_empty() {
        return if a == b { 1.0 } else { 0.0 };
    }
    let shared = ga.intersection(&gb).count() as f32;
    2.0 * shared / (ga.len() + gb.len()) as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn movie(id: MovieId, title: &str) -> Movie {
        Movie {
            id,
            title: title.to_string(),
            genres: vec![],
            overview: String::new(),
            vote_average: None,
            vote_count: None,
            release_date: None,
        }
    }

    fn create_test_catalog() -> MovieCatalog {
        MovieCatalog::from_movies(vec![
            movie(1, "Interstellar"),
            movie(2, "The Dark Knight"),
            movie(3, "The Dark Knight Rises"),
            movie(4, "Inception"),
        ])
    }

    #[test]
    fn test_exact_match_wins_over_substring() {
        let catalog = create_test_catalog();
        assert_eq!(
            catalog.find_by_title("  the dark KNIGHT "),
            TitleLookup::Resolved(2)
        );
    }

    #[test]
    fn test_unique_substring_resolves() {
        let catalog = create_test_catalog();
        assert_eq!(catalog.find_by_title("stellar"), TitleLookup::Resolved(1));
    }

    #[test]
    fn test_multiple_substrings_are_ambiguous() {
        let catalog = create_test_catalog();
        match catalog.find_by_title("dark") {
            TitleLookup::Ambiguous(candidates) => {
                let ids: Vec<MovieId> = candidates.iter().map(|c| c.movie_id).collect();
                assert_eq!(ids.len(), 2);
                assert!(ids.contains(&2) && ids.contains(&3));
            }
            other => panic!("expected ambiguous lookup, got {:?}", other),
        }
    }

    #[test]
    fn test_not_found_offers_suggestions() {
        let catalog = create_test_catalog();
        match catalog.find_by_title("Interstelar") {
            TitleLookup::NotFound(suggestions) => {
                assert_eq!(suggestions[0].movie_id, 1);
            }
            other => panic!("expected not found, got {:?}", other),
        }
        assert_eq!(catalog.find_by_title("zzzz"), TitleLookup::NotFound(vec![]));
        assert_eq!(catalog.find_by_title("   "), TitleLookup::NotFound(vec![]));
    }

    #[test]
    fn test_duplicate_ids_keep_first() {
        let catalog = MovieCatalog::from_movies(vec![movie(7, "First"), movie(7, "Second")]);
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.get_movie(7).unwrap().title, "First");
    }

    #[test]
    fn test_empty_catalog_fails_validation() {
        assert!(MovieCatalog::new().validate().is_err());
    }

    #[test]
    fn test_bigram_similarity_bounds() {
        assert_eq!(bigram_similarity("abc", "abc"), 1.0);
        assert_eq!(bigram_similarity("abc", "xyz"), 0.0);
        assert_eq!(bigram_similarity("a", "a"), 1.0);
    }
}
