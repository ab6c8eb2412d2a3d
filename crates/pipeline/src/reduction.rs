//! Truncated SVD for shrinking the combined feature matrix.
//!
//! Off by default. When enabled, the build replaces every feature row `x`
//! with its projection `[x . v_1, ..., x . v_k]` onto the top `k` right
//! singular vectors of the feature matrix `A`, and similarity is computed on
//! the projections.
//!
//! ## Algorithm
//! Power iteration on `A^T A` with deflation, one component at a time:
//! 1. Start from a seeded random unit vector, orthogonal to the components
//!    found so far
//! 2. Repeat `v <- normalize(A^T (A v))`, re-orthogonalizing each step,
//!    until `v` stops turning or `max_iter` is reached
//! 3. Flip the sign so the largest entry is positive
//!
//! The matrix is never centered, so sparse TF-IDF rows stay sparse in
//! meaning and the zero vector still projects to zero.

use crate::error::{ArtifactError, Result};
use crate::features::FeatureMatrix;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Below this norm a deflated vector is treated as zero
const RANK_EPSILON: f64 = 1e-10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReductionConfig {
    pub enabled: bool,
    /// Target width; only applied when smaller than the feature width
    pub components: usize,
    pub max_iter: usize,
    /// Convergence threshold on `1 - |cos|` between successive iterates
    pub tolerance: f64,
    pub seed: u64,
}

impl Default for ReductionConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            components: 100,
            max_iter: 100,
            tolerance: 1e-9,
            seed: 42,
        }
    }
}

impl ReductionConfig {
    pub fn validate(&self) -> Result<()> {
        if self.components == 0 || self.max_iter == 0 {
            return Err(ArtifactError::InvalidConfig(
                "reduction components and max_iter must be positive".to_string(),
            ));
        }
        if !(self.tolerance.is_finite() && self.tolerance >= 0.0) {
            return Err(ArtifactError::InvalidConfig(format!(
                "reduction tolerance must be non-negative, got {}",
                self.tolerance
            )));
        }
        Ok(())
    }

    /// Whether a build over `width`-wide features should reduce them
    pub fn applies_to(&self, width: usize) -> bool {
        self.enabled && self.components < width
    }
}

/// Fitted projection onto the top right singular vectors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TruncatedSvd {
    input_dim: usize,
    /// Unit vectors of length `input_dim`, strongest first
    components: Vec<Vec<f32>>,
    singular_values: Vec<f32>,
}

impl TruncatedSvd {
    /// Fit up to `config.components` components; fewer when the matrix rank
    /// is lower
    pub fn fit(matrix: &FeatureMatrix, config: &ReductionConfig) -> Result<Self> {
        config.validate()?;
        let rows: Vec<Vec<f64>> = matrix
            .rows
            .iter()
            .map(|r| r.iter().map(|&v| v as f64).collect())
            .collect();
        let input_dim = matrix.dims.total();
        let target = config.components.min(rows.len()).min(input_dim);

        let mut rng = StdRng::seed_from_u64(config.seed);
        let mut found: Vec<Vec<f64>> = Vec::with_capacity(target);
        let mut singular_values = Vec::with_capacity(target);

        for c in 0..target {
            let start: Vec<f64> = (0..input_dim).map(|_| rng.random_range(-1.0..1.0)).collect();
            let Some(mut v) = orthonormalize(start, &found) else {
                break;
            };

            let mut iterations = 0;
            let mut exhausted = false;
            while iterations < config.max_iter {
                iterations += 1;
                let Some(next) = orthonormalize(gram_product(&rows, &v, input_dim), &found) else {
                    exhausted = true;
                    break;
                };
                let turn = 1.0 - dot(&next, &v).abs();
                v = next;
                if turn < config.tolerance {
                    break;
                }
            }
            if exhausted {
                debug!("Feature matrix rank exhausted after {} components", c);
                break;
            }

            flip_sign(&mut v);
            let sigma = project_all(&rows, &v).iter().map(|x| x * x).sum::<f64>().sqrt();
            debug!("Component {}: sigma {:.4} after {} iterations", c + 1, sigma, iterations);
            singular_values.push(sigma as f32);
            found.push(v);
        }

        if found.is_empty() {
            return Err(ArtifactError::InvalidConfig(
                "cannot reduce an all-zero feature matrix".to_string(),
            ));
        }
        info!(
            "Fitted truncated SVD: {} -> {} dimensions",
            input_dim,
            found.len()
        );

        Ok(Self {
            input_dim,
            components: found
                .into_iter()
                .map(|v| v.into_iter().map(|x| x as f32).collect())
                .collect(),
            singular_values,
        })
    }

    /// Project one feature row
    pub fn transform(&self, row: &[f32]) -> Vec<f32> {
        self.components
            .iter()
            .map(|comp| {
                comp.iter()
                    .zip(row)
                    .map(|(&c, &x)| c as f64 * x as f64)
                    .sum::<f64>() as f32
            })
            .collect()
    }

    /// Project every row; `dims` keeps describing the unreduced blocks
    pub fn transform_matrix(&self, matrix: &FeatureMatrix) -> FeatureMatrix {
        FeatureMatrix {
            dims: matrix.dims,
            rows: matrix.rows.par_iter().map(|r| self.transform(r)).collect(),
        }
    }

    pub fn input_dim(&self) -> usize {
        self.input_dim
    }

    pub fn output_dim(&self) -> usize {
        self.components.len()
    }

    /// Strongest first
    pub fn singular_values(&self) -> &[f32] {
        &self.singular_values
    }
}

/// `A v` with one entry per row
fn project_all(rows: &[Vec<f64>], v: &[f64]) -> Vec<f64> {
    rows.par_iter().map(|row| dot(row, v)).collect()
}

/// `A^T (A v)`, accumulated in row order
fn gram_product(rows: &[Vec<f64>], v: &[f64], dim: usize) -> Vec<f64> {
    let av = project_all(rows, v);
    let mut out = vec![0.0; dim];
    for (row, a) in rows.iter().zip(av) {
        if a == 0.0 {
            continue;
        }
        for (o, x) in out.iter_mut().zip(row) {
            *o += a * x;
        }
    }
    out
}

/// Remove the projections onto `basis` (twice, for round-off) and normalize.
/// `None` when nothing is left.
fn orthonormalize(mut v: Vec<f64>, basis: &[Vec<f64>]) -> Option<Vec<f64>> {
    for _ in 0..2 {
        for b in basis {
            let p = dot(&v, b);
            v.iter_mut().zip(b).for_each(|(x, y)| *x -= p * y);
        }
    }
    let norm = dot(&v, &v).sqrt();
    if norm < RANK_EPSILON {
        return None;
    }
    v.iter_mut().for_each(|x| *x /= norm);
    Some(v)
}

fn flip_sign(v: &mut [f64]) {
    let largest = v
        .iter()
        .copied()
        .fold(0.0f64, |best, x| if x.abs() > best.abs() { x } else { best });
    if largest < 0.0 {
        v.iter_mut().for_each(|x| *x = -*x);
    }
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::FeatureDimensions;

    fn matrix(rows: Vec<Vec<f32>>) -> FeatureMatrix {
        let width = rows.first().map_or(0, Vec::len);
        FeatureMatrix {
            dims: FeatureDimensions {
                text: width,
                genre: 0,
                numeric: 0,
            },
            rows,
        }
    }

    fn enabled(components: usize) -> ReductionConfig {
        ReductionConfig {
            enabled: true,
            components,
            ..ReductionConfig::default()
        }
    }

    #[test]
    fn test_diagonal_matrix_singular_values() {
        let m = matrix(vec![
            vec![3.0, 0.0, 0.0],
            vec![0.0, 2.0, 0.0],
            vec![0.0, 0.0, 1.0],
        ]);
        let svd = TruncatedSvd::fit(&m, &enabled(2)).unwrap();

        assert_eq!(svd.output_dim(), 2);
        assert!((svd.singular_values()[0] - 3.0).abs() < 1e-3);
        assert!((svd.singular_values()[1] - 2.0).abs() < 1e-3);
        // Strongest direction is the first axis, sign-normalized
        let projected = svd.transform(&[1.0, 0.0, 0.0]);
        assert!((projected[0] - 1.0).abs() < 1e-3);
        assert!(projected[1].abs() < 1e-3);
    }

    #[test]
    fn test_components_are_orthonormal() {
        let m = matrix(vec![
            vec![1.0, 2.0, 0.0, 1.0],
            vec![0.5, 0.0, 3.0, 1.0],
            vec![2.0, 1.0, 1.0, 0.0],
            vec![0.0, 1.0, 2.0, 2.0],
        ]);
        let svd = TruncatedSvd::fit(&m, &enabled(3)).unwrap();
        for (i, a) in svd.components.iter().enumerate() {
            for (j, b) in svd.components.iter().enumerate() {
                let d: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
                let expected = if i == j { 1.0 } else { 0.0 };
                assert!((d - expected).abs() < 1e-4, "({i}, {j}) = {d}");
            }
        }
    }

    #[test]
    fn test_rank_caps_component_count() {
        // Rank 1: every row is a multiple of the first
        let m = matrix(vec![vec![1.0, 1.0, 0.0], vec![2.0, 2.0, 0.0], vec![3.0, 3.0, 0.0]]);
        let svd = TruncatedSvd::fit(&m, &enabled(2)).unwrap();
        assert_eq!(svd.output_dim(), 1);

        let reduced = svd.transform_matrix(&m);
        assert_eq!(reduced.dims, m.dims);
        assert!(reduced.rows.iter().all(|r| r.len() == 1));
    }

    #[test]
    fn test_fit_is_reproducible() {
        let m = matrix(vec![vec![1.0, 0.2, 0.0], vec![0.1, 1.0, 0.4], vec![0.0, 0.3, 1.0]]);
        let a = TruncatedSvd::fit(&m, &enabled(2)).unwrap();
        let b = TruncatedSvd::fit(&m, &enabled(2)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_zero_matrix_and_bad_config() {
        let zero = matrix(vec![vec![0.0, 0.0], vec![0.0, 0.0]]);
        assert!(TruncatedSvd::fit(&zero, &enabled(1)).is_err());
        assert!(TruncatedSvd::fit(&matrix(vec![vec![1.0, 0.0]]), &enabled(0)).is_err());
    }

    #[test]
    fn test_applies_only_when_narrower() {
        let config = enabled(10);
        assert!(config.applies_to(11));
        assert!(!config.applies_to(10));
        assert!(!ReductionConfig::default().applies_to(1000));
    }
}
