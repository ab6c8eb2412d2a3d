//! Types shared by all candidate sources.

use data_loader::{Genre, MovieId, UserId};
use serde::Serialize;
use std::collections::{HashMap, HashSet};

/// Where a candidate came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateSource {
    /// Nearest neighbors in the similarity matrix
    Content,
    /// Content score blended with a factorization prediction
    Hybrid,
    /// Genre search
    Genre,
    /// Uniform random sample
    Random,
}

/// Per-candidate details beyond the final score
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CandidateMetadata {
    /// Content component on the 0-10 scale (hybrid only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_score: Option<f32>,
    /// Collaborative prediction on the 0-10 scale: the mean of the
    /// factorization prediction and the neighbor score, whichever exist
    #[serde(skip_serializing_if = "Option::is_none")]
    pub predicted_score: Option<f32>,
    /// Similarity-weighted score from users with similar ratings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub neighbor_score: Option<f32>,
}

/// A recommended movie with its ranking score.
///
/// The score scale depends on the source: cosine similarity in [0, 1] for
/// content, 0-10 for hybrid, `vote_average` for genre search, 0 for random.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candidate {
    pub movie_id: MovieId,
    pub source: CandidateSource,
    pub score: f32,
    pub metadata: CandidateMetadata,
}

impl Candidate {
    pub fn new(movie_id: MovieId, source: CandidateSource, score: f32) -> Self {
        Self {
            movie_id,
            source,
            score,
            metadata: CandidateMetadata::default(),
        }
    }
}

/// Sort by score descending. The sort is stable, so equal scores keep the
/// order they came in (dataset order for every source).
pub fn rank(candidates: &mut [Candidate]) {
    candidates.sort_by(|a, b| b.score.total_cmp(&a.score));
}

/// Everything known about a user, gathered once per request
#[derive(Debug, Clone, Default)]
pub struct UserContext {
    pub user_id: UserId,
    /// (movie, score) for every rating, ordered by movie id
    pub ratings: Vec<(MovieId, f32)>,
    pub rated_movies: HashSet<MovieId>,
    pub avg_rating: f32,
    /// Average score the user gives each genre
    pub genre_preferences: HashMap<Genre, f32>,
    /// Scores for unrated movies from similar users
    pub neighbor_scores: HashMap<MovieId, f32>,
}

impl UserContext {
    pub fn new(user_id: impl Into<UserId>) -> Self {
        Self {
            user_id: user_id.into(),
            ..Self::default()
        }
    }

    pub fn has_ratings(&self) -> bool {
        !self.ratings.is_empty()
    }

    /// The user's `n` best-liked genres, highest average first
    pub fn top_genres(&self, n: usize) -> Vec<Genre> {
        let mut genres: Vec<(Genre, f32)> =
            self.genre_preferences.iter().map(|(&g, &s)| (g, s)).collect();
        genres.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.name().cmp(b.0.name())));
        genres.into_iter().take(n).map(|(g, _)| g).collect()
    }
}
