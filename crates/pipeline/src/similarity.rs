//! Dense all-pairs cosine similarity.

use crate::features::FeatureMatrix;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Cosine similarity of two vectors; 0 when either has zero norm
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let (mut dot, mut norm_a, mut norm_b) = (0.0f64, 0.0f64, 0.0f64);
    for (&x, &y) in a.iter().zip(b) {
        dot += x as f64 * y as f64;
        norm_a += x as f64 * x as f64;
        norm_b += y as f64 * y as f64;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    (dot / (norm_a.sqrt() * norm_b.sqrt())) as f32
}

/// Symmetric `n x n` similarity matrix stored row-major.
///
/// Invariants:
/// - `get(i, j) == get(j, i)` exactly
/// - every entry is in [0, 1]
/// - `get(i, i)` is 1 for a non-zero feature row and 0 otherwise, so it is
///   never below another entry of row `i`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarityMatrix {
    n: usize,
    values: Vec<f32>,
}

impl SimilarityMatrix {
    /// Compute the upper triangle in parallel and mirror it
    pub fn compute(features: &FeatureMatrix) -> Self {
        let n = features.len();
        let rows = &features.rows;
        let has_norm: Vec<bool> = rows.iter().map(|r| r.iter().any(|&v| v != 0.0)).collect();

        // Each task owns the tail of its row, so output is independent of scheduling
        let upper: Vec<Vec<f32>> = (0..n)
            .into_par_iter()
            .map(|i| {
                (i + 1..n)
                    .map(|j| cosine_similarity(&rows[i], &rows[j]).clamp(0.0, 1.0))
                    .collect()
            })
            .collect();

        let mut values = vec![0.0f32; n * n];
        for (i, tail) in upper.iter().enumerate() {
            values[i * n + i] = if has_norm[i] { 1.0 } else { 0.0 };
            for (offset, &sim) in tail.iter().enumerate() {
                let j = i + 1 + offset;
                values[i * n + j] = sim;
                values[j * n + i] = sim;
            }
        }

        info!("Computed {n}x{n} similarity matrix");
        Self { n, values }
    }

    /// Row `i`, or `None` out of range
    pub fn row(&self, i: usize) -> Option<&[f32]> {
        (i < self.n).then(|| &self.values[i * self.n..(i + 1) * self.n])
    }

    pub fn get(&self, i: usize, j: usize) -> Option<f32> {
        (i < self.n && j < self.n).then(|| self.values[i * self.n + j])
    }

    pub fn len(&self) -> usize {
        self.n
    }

    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    /// Check the stored shape after deserialization
    pub fn is_well_formed(&self) -> bool {
        self.values.len() == self.n * self.n
    }
}
