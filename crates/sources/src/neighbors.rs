//! User-based collaborative scores, computed from the live rating store.
//!
//! ## Algorithm
//! 1. Treat each user's ratings as a sparse vector over movies
//! 2. Cosine similarity between the target user and every other user
//! 3. Keep the `NEIGHBOR_COUNT` most similar users above `MIN_SIMILARITY`
//! 4. For each movie the target has not rated, the similarity-weighted
//!    average of the neighbors' scores (0-10 scale)
//!
//! Unlike the factorization model this needs no training step, so a rating
//! added a moment ago already shapes the next query.

use data_loader::{normalize_user, MovieId, RatingStore};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

pub const NEIGHBOR_COUNT: usize = 10;
pub const MIN_SIMILARITY: f32 = 0.1;

/// Movie id to neighbor-weighted score for movies `user_id` has not rated
pub fn neighbor_scores(store: &RatingStore, user_id: &str) -> HashMap<MovieId, f32> {
    let user_id = normalize_user(user_id);
    let mut by_user: BTreeMap<&str, HashMap<MovieId, f32>> = BTreeMap::new();
    for (user, movie_id, score) in store.iter() {
        by_user.entry(user).or_default().insert(movie_id, score);
    }

    let Some(target) = by_user.get(user_id) else {
        return HashMap::new();
    };

    // Users iterate sorted, so the stable sort breaks ties by user id
    let mut neighbors: Vec<(&HashMap<MovieId, f32>, f32)> = by_user
        .iter()
        .filter(|(other, _)| **other != user_id)
        .map(|(_, ratings)| (ratings, cosine(target, ratings)))
        .filter(|(_, sim)| *sim > MIN_SIMILARITY)
        .collect();
    neighbors.sort_by(|a, b| b.1.total_cmp(&a.1));
    neighbors.truncate(NEIGHBOR_COUNT);

    let mut sums: HashMap<MovieId, (f32, f32)> = HashMap::new();
    for (ratings, sim) in &neighbors {
        for (&movie_id, &score) in ratings.iter() {
            if target.contains_key(&movie_id) {
                continue;
            }
            let entry = sums.entry(movie_id).or_insert((0.0, 0.0));
            entry.0 += sim * score;
            entry.1 += sim;
        }
    }

    debug!(
        "{} neighbors of '{}' score {} unrated movies",
        neighbors.len(),
        user_id,
        sums.len()
    );
    sums.into_iter()
        .map(|(movie_id, (weighted, weight))| (movie_id, weighted / weight))
        .collect()
}

/// Cosine similarity of two sparse rating vectors
fn cosine(a: &HashMap<MovieId, f32>, b: &HashMap<MovieId, f32>) -> f32 {
    let dot: f32 = a
        .iter()
        .filter_map(|(movie_id, x)| b.get(movie_id).map(|y| x * y))
        .sum();
    let norm = |m: &HashMap<MovieId, f32>| m.values().map(|v| v * v).sum::<f32>().sqrt();
    let (na, nb) = (norm(a), norm(b));
    if na == 0.0 || nb == 0.0 {
        return 0.0;
    }
    dot / (na * nb)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> RatingStore {
        let mut store = RatingStore::new("unused.json");
        // ann and bea agree on 1 and 2; bea has also seen 3
        store.upsert("ann", 1, 9.0).unwrap();
        store.upsert("ann", 2, 8.0).unwrap();
        store.upsert("bea", 1, 9.0).unwrap();
        store.upsert("bea", 2, 7.0).unwrap();
        store.upsert("bea", 3, 6.0).unwrap();
        // cat only overlaps with nobody
        store.upsert("cat", 4, 10.0).unwrap();
        store
    }

    #[test]
    fn test_scores_unrated_movies_from_neighbors() {
        let scores = neighbor_scores(&store(), "ann");
        assert_eq!(scores.len(), 1);
        // One neighbor, so the weighted average is bea's own score
        assert!((scores[&3] - 6.0).abs() < 1e-5);
        assert!(!scores.contains_key(&4));
    }

    #[test]
    fn test_weighted_by_similarity() {
        let mut store = store();
        store.upsert("dan", 1, 9.0).unwrap();
        store.upsert("dan", 3, 2.0).unwrap();

        let scores = neighbor_scores(&store, "ann");
        let bea = cosine(
            &HashMap::from([(1, 9.0), (2, 8.0)]),
            &HashMap::from([(1, 9.0), (2, 7.0), (3, 6.0)]),
        );
        let dan = cosine(
            &HashMap::from([(1, 9.0), (2, 8.0)]),
            &HashMap::from([(1, 9.0), (3, 2.0)]),
        );
        let expected = (bea * 6.0 + dan * 2.0) / (bea + dan);
        assert!((scores[&3] - expected).abs() < 1e-5);
    }

    #[test]
    fn test_unknown_or_isolated_user() {
        let store = store();
        assert!(neighbor_scores(&store, "zoe").is_empty());
        assert!(neighbor_scores(&store, "cat").is_empty());
        assert_eq!(neighbor_scores(&store, " ann "), neighbor_scores(&store, "ann"));
    }

    #[test]
    fn test_cosine() {
        let a = HashMap::from([(1, 1.0), (2, 0.0)]);
        let b = HashMap::from([(1, 2.0)]);
        assert!((cosine(&a, &b) - 1.0).abs() < 1e-6);
        assert_eq!(cosine(&a, &HashMap::from([(3, 5.0)])), 0.0);
        assert_eq!(cosine(&HashMap::new(), &b), 0.0);
    }
}
