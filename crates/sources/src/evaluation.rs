//! Offline quality metrics for a recommendation list.
//!
//! A hit is a recommended movie the user is known to like but that was
//! hidden from the recommender. Precision is hits over the list length,
//! recall is hits over the held-out set, F1 their harmonic mean. All three
//! are 0 when their denominator is empty.

use data_loader::MovieId;
use serde::Serialize;
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EvaluationReport {
    pub precision: f32,
    pub recall: f32,
    pub f1_score: f32,
    pub hits: usize,
    pub total_recommendations: usize,
    /// Distinct held-out movies
    pub total_held_out: usize,
}

/// Score `recommended` against the movies in `held_out`
///
/// # Examples
///
/// ```
/// use sources::evaluation::evaluate;
///
/// let report = evaluate(&[1, 2, 3, 4], &[2, 9]);
/// assert_eq!(report.hits, 1);
/// assert!((report.precision - 0.25).abs() < 1e-6);
/// assert!((report.recall - 0.5).abs() < 1e-6);
/// ```
#[must_use]
pub fn evaluate(recommended: &[MovieId], held_out: &[MovieId]) -> EvaluationReport {
    let recommended_set: HashSet<MovieId> = recommended.iter().copied().collect();
    let held_out_set: HashSet<MovieId> = held_out.iter().copied().collect();
    let hits = recommended_set.intersection(&held_out_set).count();

    let precision = ratio(hits, recommended_set.len());
    let recall = ratio(hits, held_out_set.len());
    let f1_score = if precision + recall > 0.0 {
        2.0 * precision * recall / (precision + recall)
    } else {
        0.0
    };

    EvaluationReport {
        precision,
        recall,
        f1_score,
        hits,
        total_recommendations: recommended_set.len(),
        total_held_out: held_out_set.len(),
    }
}

fn ratio(part: usize, whole: usize) -> f32 {
    if whole == 0 {
        0.0
    } else {
        part as f32 / whole as f32
    }
}
