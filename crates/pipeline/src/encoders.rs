//! Genre and numeric encoders.

use data_loader::{Genre, Movie};
use serde::{Deserialize, Serialize};

/// Multi-hot encoder over the genres present when it was fitted.
///
/// Columns are ordered by genre display name. Genres unseen during fitting
/// are ignored at transform time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenreEncoder {
    genres: Vec<Genre>,
}

impl GenreEncoder {
    pub fn fit(movies: &[Movie]) -> Self {
        let mut genres: Vec<Genre> = movies.iter().flat_map(|m| m.genres.iter().copied()).collect();
        genres.sort_by_key(|g| g.name());
        genres.dedup();
        Self { genres }
    }

    pub fn transform(&self, genres: &[Genre]) -> Vec<f32> {
        self.genres
            .iter()
            .map(|g| if genres.contains(g) { 1.0 } else { 0.0 })
            .collect()
    }

    /// Column order
    pub fn genres(&self) -> &[Genre] {
        &self.genres
    }

    pub fn len(&self) -> usize {
        self.genres.len()
    }

    pub fn is_empty(&self) -> bool {
        self.genres.is_empty()
    }
}

/// Range and mean of one numeric column
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColumnStats {
    pub min: f32,
    pub max: f32,
    /// Imputation value for missing entries
    pub mean: f32,
}

impl ColumnStats {
    fn fit(values: impl Iterator<Item = Option<f32>>) -> Self {
        let present: Vec<f32> = values.flatten().filter(|v| v.is_finite()).collect();
        if present.is_empty() {
            return Self {
                min: 0.0,
                max: 0.0,
                mean: 0.0,
            };
        }
        let min = present.iter().copied().fold(f32::INFINITY, f32::min);
        let max = present.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        let mean = present.iter().sum::<f32>() / present.len() as f32;
        Self { min, max, mean }
    }

    /// Scale into [0, 1]; a constant column maps everything to 0
    fn scale(&self, value: Option<f32>) -> f32 {
        let value = value.filter(|v| v.is_finite()).unwrap_or(self.mean);
        let range = self.max - self.min;
        if range <= f32::EPSILON {
            return 0.0;
        }
        ((value - self.min) / range).clamp(0.0, 1.0)
    }
}

/// Min-max scaler for `vote_average` and `vote_count`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MinMaxScaler {
    pub vote_average: ColumnStats,
    pub vote_count: ColumnStats,
}

impl MinMaxScaler {
    /// Number of output columns
    pub const WIDTH: usize = 2;

    pub fn fit(movies: &[Movie]) -> Self {
        Self {
            vote_average: ColumnStats::fit(movies.iter().map(|m| m.vote_average)),
            vote_count: ColumnStats::fit(movies.iter().map(|m| m.vote_count.map(|c| c as f32))),
        }
    }

    /// `[vote_average, vote_count]` scaled to [0, 1], missing values imputed
    /// with the fitted mean
    pub fn transform(&self, movie: &Movie) -> [f32; 2] {
        [
            self.vote_average.scale(movie.vote_average),
            self.vote_count.scale(movie.vote_count.map(|c| c as f32)),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn movie(genres: Vec<Genre>, vote_average: Option<f32>, vote_count: Option<u32>) -> Movie {
        Movie {
            id: 1,
            title: "T".to_string(),
            genres,
            overview: String::new(),
            vote_average,
            vote_count,
            release_date: None,
        }
    }

    #[test]
    fn test_genre_encoder_orders_by_name() {
        let movies = vec![
            movie(vec![Genre::War, Genre::Drama], None, None),
            movie(vec![Genre::Action, Genre::Drama], None, None),
        ];
        let encoder = GenreEncoder::fit(&movies);
        assert_eq!(encoder.genres(), &[Genre::Action, Genre::Drama, Genre::War]);
        assert_eq!(encoder.transform(&[Genre::War, Genre::Horror]), vec![0.0, 0.0, 1.0]);
        assert_eq!(encoder.transform(&[]), vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_min_max_scaling() {
        let movies = vec![
            movie(vec![], Some(6.0), Some(100)),
            movie(vec![], Some(8.0), Some(300)),
            movie(vec![], None, None),
        ];
        let scaler = MinMaxScaler::fit(&movies);
        assert_eq!(scaler.transform(&movies[0]), [0.0, 0.0]);
        assert_eq!(scaler.transform(&movies[1]), [1.0, 1.0]);
        // Imputed with the mean: 7.0 and 200
        assert_eq!(scaler.transform(&movies[2]), [0.5, 0.5]);
    }

    #[test]
    fn test_constant_column_scales_to_zero() {
        let movies = vec![
            movie(vec![], Some(7.0), Some(50)),
            movie(vec![], Some(7.0), Some(80)),
        ];
        let scaler = MinMaxScaler::fit(&movies);
        assert_eq!(scaler.transform(&movies[0])[0], 0.0);
        assert_eq!(scaler.transform(&movies[1])[0], 0.0);
    }

    #[test]
    fn test_out_of_range_is_clamped() {
        let scaler = MinMaxScaler::fit(&[
            movie(vec![], Some(5.0), Some(10)),
            movie(vec![], Some(7.0), Some(20)),
        ]);
        let outlier = movie(vec![], Some(9.5), Some(1000));
        assert_eq!(scaler.transform(&outlier), [1.0, 1.0]);
    }

    #[test]
    fn test_all_missing_column() {
        let scaler = MinMaxScaler::fit(&[movie(vec![], None, None)]);
        assert_eq!(scaler.vote_average.mean, 0.0);
        assert_eq!(scaler.transform(&movie(vec![], None, None)), [0.0, 0.0]);
    }
}
