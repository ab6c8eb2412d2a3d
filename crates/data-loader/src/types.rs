//! Core domain types for the movie catalog.
//!
//! The catalog keeps movies in dataset order. That order is significant: row
//! `i` of every feature and similarity matrix built downstream belongs to the
//! movie at position `i`, and ties in ranked results fall back to it.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

// =============================================================================
// Type Aliases
// =============================================================================

/// Unique identifier for a movie (TMDB id)
pub type MovieId = u32;

/// Identifier for a user of the rating store (free-form name, e.g. "alice")
pub type UserId = String;

/// Upper bound of both `vote_average` and user ratings
pub const MAX_RATING: f32 = 10.0;

// =============================================================================
// Movie-related Types
// =============================================================================

/// Represents a movie in the dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Movie {
    pub id: MovieId,
    pub title: String,
    /// Genre set, deduplicated, in the order the dataset listed them
    pub genres: Vec<Genre>,
    /// Plot synopsis; empty when the dataset had none
    pub overview: String,
    /// Average vote on a 0-10 scale, `None` when absent from the dataset
    pub vote_average: Option<f32>,
    pub vote_count: Option<u32>,
    pub release_date: Option<NaiveDate>,
}

impl Movie {
    /// Release year, when the release date is known
    pub fn year(&self) -> Option<i32> {
        self.release_date.map(|d| d.year())
    }

    /// Whether any of this movie's genres contains `query` (case-insensitive)
    pub fn matches_genre(&self, query: &str) -> bool {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return false;
        }
        self.genres
            .iter()
            .any(|g| g.name().to_lowercase().contains(&query))
    }

    /// Comma separated genre names, for display
    pub fn genre_names(&self) -> String {
        self.genres
            .iter()
            .map(|g| g.name())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Movie genres used by TMDB
///
/// Serialized by display name so datasets and artifacts read naturally
/// (`"Science Fiction"`, not `"ScienceFiction"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Genre {
    Action,
    Adventure,
    Animation,
    Comedy,
    Crime,
    Documentary,
    Drama,
    Family,
    Fantasy,
    History,
    Horror,
    Music,
    Mystery,
    Romance,
    #[serde(rename = "Science Fiction")]
    ScienceFiction,
    #[serde(rename = "TV Movie")]
    TvMovie,
    Thriller,
    War,
    Western,
}

impl Genre {
    /// Every genre, in declaration order
    pub const ALL: [Genre; 19] = [
        Genre::Action,
        Genre::Adventure,
        Genre::Animation,
        Genre::Comedy,
        Genre::Crime,
        Genre::Documentary,
        Genre::Drama,
        Genre::Family,
        Genre::Fantasy,
        Genre::History,
        Genre::Horror,
        Genre::Music,
        Genre::Mystery,
        Genre::Romance,
        Genre::ScienceFiction,
        Genre::TvMovie,
        Genre::Thriller,
        Genre::War,
        Genre::Western,
    ];

    /// Display name, as it appears in TMDB data
    pub fn name(&self) -> &'static str {
        match self {
            Genre::Action => "Action",
            Genre::Adventure => "Adventure",
            Genre::Animation => "Animation",
            Genre::Comedy => "Comedy",
            Genre::Crime => "Crime",
            Genre::Documentary => "Documentary",
            Genre::Drama => "Drama",
            Genre::Family => "Family",
            Genre::Fantasy => "Fantasy",
            Genre::History => "History",
            Genre::Horror => "Horror",
            Genre::Music => "Music",
            Genre::Mystery => "Mystery",
            Genre::Romance => "Romance",
            Genre::ScienceFiction => "Science Fiction",
            Genre::TvMovie => "TV Movie",
            Genre::Thriller => "Thriller",
            Genre::War => "War",
            Genre::Western => "Western",
        }
    }

    /// Parse a genre name, ignoring case and surrounding whitespace.
    ///
    /// Accepts the common "Sci-Fi" spelling as an alias.
    pub fn parse(s: &str) -> Option<Genre> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("sci-fi") || s.eq_ignore_ascii_case("scifi") {
            return Some(Genre::ScienceFiction);
        }
        Genre::ALL
            .iter()
            .copied()
            .find(|g| g.name().eq_ignore_ascii_case(s))
    }
}

impl fmt::Display for Genre {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// Rating Type
// =============================================================================

/// A single rating from a user for a movie, on the 0-10 scale
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRating {
    pub user_id: UserId,
    pub movie_id: MovieId,
    pub score: f32,
    /// Unix timestamp of the last write
    pub timestamp: i64,
}

// =============================================================================
// MovieCatalog - the in-memory movie set
// =============================================================================

/// All movies, in dataset order, with lookup indices.
#[derive(Debug, Clone, Default)]
pub struct MovieCatalog {
    pub(crate) movies: Vec<Movie>,
    /// Movie id -> position in `movies`
    pub(crate) id_index: HashMap<MovieId, usize>,
    /// Genre -> positions of movies tagged with it, ascending
    pub(crate) genre_index: HashMap<Genre, Vec<usize>>,
}

impl MovieCatalog {
    /// Creates a new, empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a movie by ID
    pub fn get_movie(&self, id: MovieId) -> Option<&Movie> {
        self.id_index.get(&id).map(|&idx| &self.movies[idx])
    }

    /// Dataset position of a movie
    pub fn position(&self, id: MovieId) -> Option<usize> {
        self.id_index.get(&id).copied()
    }

    /// Movie at a dataset position
    pub fn movie_at(&self, idx: usize) -> Option<&Movie> {
        self.movies.get(idx)
    }

    /// All movies in dataset order
    pub fn movies(&self) -> &[Movie] {
        &self.movies
    }

    /// Positions of movies tagged with `genre`
    pub fn get_movies_by_genre(&self, genre: Genre) -> &[usize] {
        self.genre_index
            .get(&genre)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Genres present in the catalog, sorted by display name
    pub fn genres(&self) -> Vec<Genre> {
        let mut genres: Vec<Genre> = self.genre_index.keys().copied().collect();
        genres.sort_by_key(|g| g.name());
        genres
    }

    /// Mean `vote_average` over movies that have one
    pub fn average_rating(&self) -> f32 {
        let (sum, count) = self
            .movies
            .iter()
            .filter_map(|m| m.vote_average)
            .fold((0.0f32, 0u32), |(s, c), v| (s + v, c + 1));
        if count == 0 { 0.0 } else { sum / count as f32 }
    }

    /// Append a movie. Returns `false` (and stores nothing) for a duplicate id.
    pub fn insert_movie(&mut self, movie: Movie) -> bool {
        if self.id_index.contains_key(&movie.id) {
            return false;
        }
        let idx = self.movies.len();
        for &genre in &movie.genres {
            self.genre_index.entry(genre).or_default().push(idx);
        }
        self.id_index.insert(movie.id, idx);
        self.movies.push(movie);
        true
    }

    pub fn len(&self) -> usize {
        self.movies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.movies.is_empty()
    }
}
