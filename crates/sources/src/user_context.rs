//! Helper functions to build UserContext and UserProfile from the rating store
//!
//! Ratings for movies that are not in the catalog are kept in the context
//! (they still count as rated) but contribute nothing to genre statistics.

use crate::neighbors::neighbor_scores;
use crate::types::UserContext;
use data_loader::{normalize_user, Genre, MovieCatalog, MovieId, RatingStore};
use serde::Serialize;
use std::collections::HashMap;

/// How many movies a profile lists as top rated
const TOP_RATED_LIMIT: usize = 5;

/// Build a UserContext for `user_id`.
///
/// A user without ratings gets an empty context, not an error.
pub fn build_user_context(store: &RatingStore, catalog: &MovieCatalog, user_id: &str) -> UserContext {
    let user_id = normalize_user(user_id);
    let mut context = UserContext::new(user_id);

    let ratings = store.user_ratings(user_id);
    if ratings.is_empty() {
        return context;
    }

    let total: f32 = ratings.iter().map(|r| r.score).sum();
    context.avg_rating = total / ratings.len() as f32;

    for rating in &ratings {
        context.rated_movies.insert(rating.movie_id);
        context.ratings.push((rating.movie_id, rating.score));
    }

    context.genre_preferences = genre_stats(catalog, &context.ratings)
        .into_iter()
        .map(|(genre, (sum, count))| (genre, sum / count as f32))
        .collect();
    context.neighbor_scores = neighbor_scores(store, user_id);

    context
}

/// (sum, count) of scores per genre
fn genre_stats(catalog: &MovieCatalog, ratings: &[(MovieId, f32)]) -> HashMap<Genre, (f32, u32)> {
    let mut stats: HashMap<Genre, (f32, u32)> = HashMap::new();
    for &(movie_id, score) in ratings {
        if let Some(movie) = catalog.get_movie(movie_id) {
            for genre in &movie.genres {
                let entry = stats.entry(*genre).or_insert((0.0, 0));
                entry.0 += score;
                entry.1 += 1;
            }
        }
    }
    stats
}

/// A rated movie as shown in a profile
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RatedMovie {
    pub movie_id: MovieId,
    /// Empty when the movie is not in the catalog
    pub title: String,
    pub score: f32,
}

/// A user's taste for one genre
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenreAffinity {
    pub genre: Genre,
    pub average_rating: f32,
    pub count: u32,
    /// `average_rating * count / rated catalog movies`
    pub preference_score: f32,
}

/// Summary of one user's ratings
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserProfile {
    pub user_id: String,
    pub rating_count: usize,
    pub mean_rating: f32,
    /// Highest scores first, then by movie id
    pub top_rated: Vec<RatedMovie>,
    /// Highest preference score first, then by genre name
    pub genres: Vec<GenreAffinity>,
}

/// Summarize a user's ratings against the catalog
pub fn build_user_profile(store: &RatingStore, catalog: &MovieCatalog, user_id: &str) -> UserProfile {
    let context = build_user_context(store, catalog, user_id);

    let mut top_rated: Vec<RatedMovie> = context
        .ratings
        .iter()
        .map(|&(movie_id, score)| RatedMovie {
            movie_id,
            title: catalog
                .get_movie(movie_id)
                .map(|m| m.title.clone())
                .unwrap_or_default(),
            score,
        })
        .collect();
    // Ratings arrive ordered by movie id, so the stable sort breaks ties by id
    top_rated.sort_by(|a, b| b.score.total_cmp(&a.score));
    top_rated.truncate(TOP_RATED_LIMIT);

    let in_catalog = context
        .ratings
        .iter()
        .filter(|(id, _)| catalog.get_movie(*id).is_some())
        .count();

    let mut genres: Vec<GenreAffinity> = genre_stats(catalog, &context.ratings)
        .into_iter()
        .map(|(genre, (sum, count))| {
            let average_rating = sum / count as f32;
            GenreAffinity {
                genre,
                average_rating,
                count,
                preference_score: average_rating * count as f32 / in_catalog as f32,
            }
        })
        .collect();
    genres.sort_by(|a, b| {
        b.preference_score
            .total_cmp(&a.preference_score)
            .then_with(|| a.genre.name().cmp(b.genre.name()))
    });

    UserProfile {
        user_id: context.user_id.clone(),
        rating_count: context.ratings.len(),
        mean_rating: context.avg_rating,
        top_rated,
        genres,
    }
}
