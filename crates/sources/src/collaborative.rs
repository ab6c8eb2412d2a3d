//! Collaborative signal - low-rank matrix factorization
//!
//! The sparse user x movie matrix from the rating store is approximated as
//! `P * Q^T` with `rank` latent factors per user (`P`) and per movie (`Q`).
//!
//! ## Algorithm
//! 1. Index users and movies with at least one rating (sorted, so stable)
//! 2. Initialize every factor near `sqrt(mean / rank)`, so the first
//!    predictions sit close to the global mean, plus small seeded noise
//! 3. For each epoch, visit the observed ratings in a seeded random order and
//!    take an SGD step with L2 regularization:
//!    `p += lr * (err * q - reg * p)`, `q += lr * (err * p - reg * q)`
//! 4. Predict with `dot(p_u, q_m)`, clipped to [0, 10]
//!
//! Only observed entries are visited; missing ratings are unknown, not zero.

use crate::error::{Result, SourceError};
use data_loader::{MovieId, RatingStore, UserId, MAX_RATING};
use pipeline::artifacts::{read_json, write_json};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info};

/// File name of the persisted model inside the artifact directory
pub const COLLABORATIVE_FILE: &str = "collaborative_model.json";

/// Training settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FactorizationConfig {
    /// Latent factors; capped at `min(#users, #movies)`
    pub rank: usize,
    pub epochs: usize,
    pub learning_rate: f32,
    pub regularization: f32,
    pub seed: u64,
}

impl Default for FactorizationConfig {
    fn default() -> Self {
        Self {
            rank: 20,
            epochs: 100,
            learning_rate: 0.01,
            regularization: 0.02,
            seed: 42,
        }
    }
}

impl FactorizationConfig {
    pub fn validate(&self) -> Result<()> {
        if self.rank == 0 || self.epochs == 0 {
            return Err(SourceError::InvalidConfig(
                "factorization rank and epochs must be positive".to_string(),
            ));
        }
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(SourceError::InvalidConfig(format!(
                "learning rate must be positive, got {}",
                self.learning_rate
            )));
        }
        if !(self.regularization.is_finite() && self.regularization >= 0.0) {
            return Err(SourceError::InvalidConfig(format!(
                "regularization must be non-negative, got {}",
                self.regularization
            )));
        }
        Ok(())
    }
}

/// A fitted factorization model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatrixFactorization {
    rank: usize,
    global_mean: f32,
    users: Vec<UserId>,
    movies: Vec<MovieId>,
    /// One row of `rank` factors per entry of `users`
    user_factors: Vec<Vec<f32>>,
    /// One row of `rank` factors per entry of `movies`
    movie_factors: Vec<Vec<f32>>,
    #[serde(skip)]
    user_index: HashMap<UserId, usize>,
    #[serde(skip)]
    movie_index: HashMap<MovieId, usize>,
}

impl MatrixFactorization {
    /// Fit a model on every rating in the store
    pub fn fit(store: &RatingStore, config: &FactorizationConfig) -> Result<Self> {
        config.validate()?;
        if store.is_empty() {
            return Err(SourceError::Training(
                "the rating store is empty; add ratings with `cinematch rate add`".to_string(),
            ));
        }

        let users: Vec<UserId> = store.users().map(str::to_string).collect();
        let mut movies: Vec<MovieId> = store.iter().map(|(_, m, _)| m).collect();
        movies.sort_unstable();
        movies.dedup();

        let user_index = index_of(&users);
        let movie_index = index_of(&movies);
        let observed: Vec<(usize, usize, f32)> = store
            .iter()
            .map(|(u, m, score)| (user_index[u], movie_index[&m], score))
            .collect();

        let rank = config.rank.min(users.len()).min(movies.len());
        let global_mean = observed.iter().map(|o| o.2).sum::<f32>() / observed.len() as f32;

        let mut rng = StdRng::seed_from_u64(config.seed);
        let base = (global_mean / rank as f32).sqrt();
        let mut init = |count: usize| -> Vec<Vec<f32>> {
            (0..count)
                .map(|_| {
                    (0..rank)
                        .map(|_| base + rng.random_range(-0.01..0.01))
                        .collect()
                })
                .collect()
        };
        let user_factors = init(users.len());
        let movie_factors = init(movies.len());

        let mut model = Self {
            rank,
            global_mean,
            users,
            movies,
            user_factors,
            movie_factors,
            user_index,
            movie_index,
        };

        info!(
            "Training rank-{} factorization on {} ratings ({} users x {} movies)",
            rank,
            observed.len(),
            model.users.len(),
            model.movies.len()
        );

        let mut order: Vec<usize> = (0..observed.len()).collect();
        for epoch in 0..config.epochs {
            order.shuffle(&mut rng);
            for &i in &order {
                let (u, m, score) = observed[i];
                model.sgd_step(u, m, score, config.learning_rate, config.regularization);
            }
            if (epoch + 1) % 25 == 0 {
                debug!("epoch {}: training rmse {:.4}", epoch + 1, model.rmse(store));
            }
        }

        info!("Training finished, rmse {:.4}", model.rmse(store));
        Ok(model)
    }

    fn sgd_step(&mut self, u: usize, m: usize, score: f32, lr: f32, reg: f32) {
        let p = &mut self.user_factors[u];
        let q = &mut self.movie_factors[m];
        let err = score - dot(&p[..], &q[..]);
        for k in 0..self.rank {
            let (pk, qk) = (p[k], q[k]);
            p[k] += lr * (err * qk - reg * pk);
            q[k] += lr * (err * pk - reg * qk);
        }
    }

    /// Predicted score on the 0-10 scale, or `None` if the user or movie
    /// had no ratings when the model was fitted
    pub fn predict(&self, user_id: &str, movie_id: MovieId) -> Option<f32> {
        let u = *self.user_index.get(user_id)?;
        let m = *self.movie_index.get(&movie_id)?;
        Some(dot(&self.user_factors[u], &self.movie_factors[m]).clamp(0.0, MAX_RATING))
    }

    /// Root mean squared error of the predictions over the store's ratings
    /// that the model knows about
    pub fn rmse(&self, store: &RatingStore) -> f32 {
        let (sum, count) = store
            .iter()
            .filter_map(|(u, m, score)| self.predict(u, m).map(|p| (p - score).powi(2)))
            .fold((0.0f32, 0usize), |(s, c), e| (s + e, c + 1));
        if count == 0 { 0.0 } else { (sum / count as f32).sqrt() }
    }

    pub fn rank(&self) -> usize {
        self.rank
    }

    pub fn global_mean(&self) -> f32 {
        self.global_mean
    }

    pub fn user_count(&self) -> usize {
        self.users.len()
    }

    pub fn movie_count(&self) -> usize {
        self.movies.len()
    }

    /// Write the model to `dir/collaborative_model.json`
    pub fn save(&self, dir: &Path) -> Result<()> {
        std::fs::create_dir_all(dir).map_err(|source| pipeline::ArtifactError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        write_json(&dir.join(COLLABORATIVE_FILE), self)?;
        info!("Saved collaborative model to {}", dir.display());
        Ok(())
    }

    /// Load a model saved by [`Self::save`]
    pub fn load(dir: &Path) -> Result<Self> {
        let mut model: Self = read_json(dir, COLLABORATIVE_FILE)?;
        let shapes_ok = model.user_factors.len() == model.users.len()
            && model.movie_factors.len() == model.movies.len()
            && model
                .user_factors
                .iter()
                .chain(&model.movie_factors)
                .all(|f| f.len() == model.rank);
        if !shapes_ok {
            return Err(pipeline::ArtifactError::Inconsistent(
                "collaborative model factor shapes do not match".to_string(),
            )
            .into());
        }
        model.user_index = index_of(&model.users);
        model.movie_index = index_of(&model.movies);
        Ok(model)
    }
}

fn index_of<K: Clone + Eq + std::hash::Hash>(keys: &[K]) -> HashMap<K, usize> {
    keys.iter().cloned().enumerate().map(|(i, k)| (k, i)).collect()
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}
