//! User rating store.
//!
//! Ratings are keyed by (user, movie) and kept in a single JSON file. The
//! store is a plain in-memory map: callers mutate it and call `save()`. There
//! is one writer at a time; the file is replaced atomically via rename so a
//! crash mid-write leaves the previous version intact.

use crate::error::{DataLoadError, Result};
use crate::types::{MAX_RATING, MovieId, UserId, UserRating};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Score and write time of one rating
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
struct StoredRating {
    score: f32,
    timestamp: i64,
}

/// Aggregate counts over the whole store
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RatingSummary {
    pub users: usize,
    pub ratings: usize,
    pub mean_score: f32,
}

/// Average score and rating count of one movie
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MovieRatingStats {
    pub movie_id: MovieId,
    pub average: f32,
    pub count: usize,
}

/// Ratings for every user, persisted at `path`
#[derive(Debug, Clone)]
pub struct RatingStore {
    path: PathBuf,
    ratings: BTreeMap<UserId, BTreeMap<MovieId, StoredRating>>,
}

impl RatingStore {
    /// An empty store that will be saved to `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ratings: BTreeMap::new(),
        }
    }

    /// Open the store at `path`; a missing file yields an empty store
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let ratings = match std::fs::read_to_string(&path) {
            Ok(content) => {
                serde_json::from_str(&content).map_err(|e| DataLoadError::MalformedFile {
                    file: path.display().to_string(),
                    reason: e.to_string(),
                })?
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No rating store at {}, starting empty", path.display());
                BTreeMap::new()
            }
            Err(e) => return Err(e.into()),
        };
        Ok(Self { path, ratings })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Add or replace a user's rating for a movie
    ///
    /// Returns the previous score, if there was one.
    pub fn upsert(&mut self, user_id: &str, movie_id: MovieId, score: f32) -> Result<Option<f32>> {
        if !score.is_finite() || !(0.0..=MAX_RATING).contains(&score) {
            return Err(DataLoadError::InvalidRating {
                score,
                min: 0.0,
                max: MAX_RATING,
            });
        }
        let user_id = normalize_user(user_id);
        if user_id.is_empty() {
            return Err(DataLoadError::InvalidValue {
                field: "user_id".to_string(),
                value: String::new(),
            });
        }

        let previous = self
            .ratings
            .entry(user_id.to_string())
            .or_default()
            .insert(
                movie_id,
                StoredRating {
                    score,
                    timestamp: Utc::now().timestamp(),
                },
            );
        Ok(previous.map(|r| r.score))
    }

    /// Remove a rating. Returns whether one existed.
    pub fn remove(&mut self, user_id: &str, movie_id: MovieId) -> bool {
        let user_id = normalize_user(user_id);
        let Some(user) = self.ratings.get_mut(user_id) else {
            return false;
        };
        let removed = user.remove(&movie_id).is_some();
        if user.is_empty() {
            self.ratings.remove(user_id);
        }
        removed
    }

    /// A user's ratings, ordered by movie id
    pub fn user_ratings(&self, user_id: &str) -> Vec<UserRating> {
        let user_id = normalize_user(user_id);
        self.ratings
            .get(user_id)
            .map(|movies| {
                movies
                    .iter()
                    .map(|(&movie_id, r)| UserRating {
                        user_id: user_id.to_string(),
                        movie_id,
                        score: r.score,
                        timestamp: r.timestamp,
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn get(&self, user_id: &str, movie_id: MovieId) -> Option<f32> {
        self.ratings
            .get(normalize_user(user_id))?
            .get(&movie_id)
            .map(|r| r.score)
    }

    /// Users with at least one rating, sorted
    pub fn users(&self) -> impl Iterator<Item = &str> {
        self.ratings.keys().map(String::as_str)
    }

    /// Every (user, movie, score) triple, ordered by user then movie
    pub fn iter(&self) -> impl Iterator<Item = (&str, MovieId, f32)> {
        self.ratings.iter().flat_map(|(user, movies)| {
            movies
                .iter()
                .map(move |(&movie_id, r)| (user.as_str(), movie_id, r.score))
        })
    }

    pub fn len(&self) -> usize {
        self.ratings.values().map(|m| m.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.ratings.is_empty()
    }

    pub fn summary(&self) -> RatingSummary {
        let ratings = self.len();
        let total: f32 = self.iter().map(|(_, _, score)| score).sum();
        RatingSummary {
            users: self.ratings.len(),
            ratings,
            mean_score: if ratings == 0 { 0.0 } else { total / ratings as f32 },
        }
    }

    /// The `limit` best rated movies: highest average first, then most
    /// ratings, then lowest movie id
    pub fn top_movies(&self, limit: usize) -> Vec<MovieRatingStats> {
        let mut totals: BTreeMap<MovieId, (f32, usize)> = BTreeMap::new();
        for (_, movie_id, score) in self.iter() {
            let entry = totals.entry(movie_id).or_insert((0.0, 0));
            entry.0 += score;
            entry.1 += 1;
        }

        let mut stats: Vec<MovieRatingStats> = totals
            .into_iter()
            .map(|(movie_id, (sum, count))| MovieRatingStats {
                movie_id,
                average: sum / count as f32,
                count,
            })
            .collect();
        stats.sort_by(|a, b| {
            b.average
                .total_cmp(&a.average)
                .then_with(|| b.count.cmp(&a.count))
        });
        stats.truncate(limit);
        stats
    }

    /// Write the store to its path
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&self.ratings).map_err(|e| {
            DataLoadError::ValidationError(format!("cannot serialize ratings: {e}"))
        })?;

        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &self.path)?;

        info!(
            "Saved {} ratings from {} users to {}",
            self.len(),
            self.ratings.len(),
            self.path.display()
        );
        Ok(())
    }
}

/// User ids are compared without surrounding whitespace
pub fn normalize_user(user_id: &str) -> &str {
    user_id.trim()
}
