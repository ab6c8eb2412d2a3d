//! Feature building for movies.
//!
//! Each movie becomes one dense vector made of three weighted blocks:
//!
//! ```text
//! [ tfidf(overview) * text | multi-hot(genres) * genre | minmax(votes) * numeric ]
//! ```
//!
//! Every block is non-negative, so cosine similarity between any two rows
//! lies in [0, 1].

use crate::encoders::{GenreEncoder, MinMaxScaler};
use crate::error::{ArtifactError, Result};
use crate::reduction::ReductionConfig;
use crate::tfidf::{TfidfConfig, TfidfVectorizer};
use data_loader::Movie;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Multipliers applied to each feature block
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureWeights {
    pub text: f32,
    pub genre: f32,
    pub numeric: f32,
}

impl Default for FeatureWeights {
    fn default() -> Self {
        Self {
            text: 1.0,
            genre: 1.0,
            numeric: 1.0,
        }
    }
}

impl FeatureWeights {
    pub fn validate(&self) -> Result<()> {
        let all = [self.text, self.genre, self.numeric];
        if all.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(ArtifactError::InvalidConfig(format!(
                "feature weights must be finite and non-negative, got {self:?}"
            )));
        }
        if all.iter().all(|w| *w == 0.0) {
            return Err(ArtifactError::InvalidConfig(
                "at least one feature weight must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Everything that controls a feature build
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    pub weights: FeatureWeights,
    pub tfidf: TfidfConfig,
    /// Optional truncated SVD applied after the blocks are combined
    pub reduction: ReductionConfig,
}

/// Width of each block of a feature vector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureDimensions {
    pub text: usize,
    pub genre: usize,
    pub numeric: usize,
}

impl FeatureDimensions {
    pub fn total(&self) -> usize {
        self.text + self.genre + self.numeric
    }
}

/// One feature vector per movie, in catalog order.
///
/// `dims` always describes the combined blocks; after a truncated SVD the
/// rows are narrower than `dims.total()`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureMatrix {
    pub dims: FeatureDimensions,
    pub rows: Vec<Vec<f32>>,
}

impl FeatureMatrix {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row(&self, idx: usize) -> Option<&[f32]> {
        self.rows.get(idx).map(Vec::as_slice)
    }
}

/// Fitted transformers that turn a movie into its feature vector.
///
/// ## Example
/// ```ignore
/// let builder = FeatureBuilder::fit(catalog.movies(), FeatureConfig::default())?;
/// let matrix = builder.build_matrix(catalog.movies());
/// let single = builder.transform(&new_movie);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureBuilder {
    weights: FeatureWeights,
    vectorizer: TfidfVectorizer,
    genre_encoder: GenreEncoder,
    scaler: MinMaxScaler,
}

impl FeatureBuilder {
    /// Fit the vectorizer, genre encoder and scaler over the whole corpus
    pub fn fit(movies: &[Movie], config: FeatureConfig) -> Result<Self> {
        config.weights.validate()?;

        let overviews: Vec<&str> = movies.iter().map(|m| m.overview.as_str()).collect();
        let vectorizer = TfidfVectorizer::fit(&overviews, config.tfidf);
        let genre_encoder = GenreEncoder::fit(movies);
        let scaler = MinMaxScaler::fit(movies);

        let builder = Self {
            weights: config.weights,
            vectorizer,
            genre_encoder,
            scaler,
        };
        let dims = builder.dimensions();
        info!(
            "Fitted feature builder on {} movies: {} text, {} genre, {} numeric columns",
            movies.len(),
            dims.text,
            dims.genre,
            dims.numeric
        );
        Ok(builder)
    }

    /// Reassemble a builder from persisted parts
    pub fn from_parts(
        weights: FeatureWeights,
        vectorizer: TfidfVectorizer,
        genre_encoder: GenreEncoder,
        scaler: MinMaxScaler,
    ) -> Self {
        Self {
            weights,
            vectorizer,
            genre_encoder,
            scaler,
        }
    }

    /// Feature vector of a single movie, using the fitted parameters
    pub fn transform(&self, movie: &Movie) -> Vec<f32> {
        let mut vector = Vec::with_capacity(self.dimensions().total());

        let text = self.vectorizer.transform(&movie.overview);
        vector.extend(text.into_iter().map(|v| v * self.weights.text));

        let genres = self.genre_encoder.transform(&movie.genres);
        vector.extend(genres.into_iter().map(|v| v * self.weights.genre));

        let numeric = self.scaler.transform(movie);
        vector.extend(numeric.into_iter().map(|v| v * self.weights.numeric));

        vector
    }

    /// Feature vectors for all movies, computed in parallel
    pub fn build_matrix(&self, movies: &[Movie]) -> FeatureMatrix {
        let rows: Vec<Vec<f32>> = movies.par_iter().map(|m| self.transform(m)).collect();
        debug!("Built feature matrix: {} rows", rows.len());
        FeatureMatrix {
            dims: self.dimensions(),
            rows,
        }
    }

    pub fn dimensions(&self) -> FeatureDimensions {
        FeatureDimensions {
            text: self.vectorizer.vocabulary_size(),
            genre: self.genre_encoder.len(),
            numeric: MinMaxScaler::WIDTH,
        }
    }

    pub fn weights(&self) -> FeatureWeights {
        self.weights
    }

    pub fn vectorizer(&self) -> &TfidfVectorizer {
        &self.vectorizer
    }

    pub fn genre_encoder(&self) -> &GenreEncoder {
        &self.genre_encoder
    }

    pub fn scaler(&self) -> &MinMaxScaler {
        &self.scaler
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use data_loader::Genre;

    fn movie(id: u32, overview: &str, genres: Vec<Genre>, vote_average: f32) -> Movie {
        Movie {
            id,
            title: format!("Movie {id}"),
            genres,
            overview: overview.to_string(),
            vote_average: Some(vote_average),
            vote_count: Some(100 * id),
            release_date: None,
        }
    }

    fn corpus() -> Vec<Movie> {
        vec![
            movie(1, "astronauts travel through a wormhole", vec![Genre::ScienceFiction], 8.4),
            movie(2, "a thief enters dreams through a wormhole", vec![Genre::Action, Genre::ScienceFiction], 8.3),
            movie(3, "a thief plans one last heist", vec![Genre::Crime], 7.1),
            movie(4, "astronauts stranded on mars", vec![Genre::ScienceFiction, Genre::Drama], 7.7),
        ]
    }

    #[test]
    fn test_dimensions_match_rows() {
        let movies = corpus();
        let builder = FeatureBuilder::fit(&movies, FeatureConfig::default()).unwrap();
        let matrix = builder.build_matrix(&movies);

        let dims = builder.dimensions();
        assert_eq!(dims.genre, 4);
        assert_eq!(dims.numeric, 2);
        assert_eq!(matrix.len(), 4);
        assert!(matrix.rows.iter().all(|r| r.len() == dims.total()));
    }

    #[test]
    fn test_transform_matches_matrix_row() {
        let movies = corpus();
        let builder = FeatureBuilder::fit(&movies, FeatureConfig::default()).unwrap();
        let matrix = builder.build_matrix(&movies);
        assert_eq!(builder.transform(&movies[2]), matrix.rows[2]);
    }

    #[test]
    fn test_weights_scale_blocks() {
        let movies = corpus();
        let config = FeatureConfig {
            weights: FeatureWeights {
                text: 1.0,
                genre: 2.0,
                numeric: 0.0,
            },
            ..FeatureConfig::default()
        };
        let builder = FeatureBuilder::fit(&movies, config).unwrap();
        let dims = builder.dimensions();
        let row = builder.transform(&movies[3]);

        let genre_block = &row[dims.text..dims.text + dims.genre];
        assert!(genre_block.iter().all(|&v| v == 0.0 || v == 2.0));
        assert!(row[dims.text + dims.genre..].iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_blank_overviews_give_empty_text_block() {
        let movies: Vec<Movie> = corpus()
            .into_iter()
            .map(|mut m| {
                m.overview.clear();
                m
            })
            .collect();
        let builder = FeatureBuilder::fit(&movies, FeatureConfig::default()).unwrap();
        assert_eq!(builder.dimensions().text, 0);
        assert_eq!(builder.transform(&movies[0]).len(), builder.dimensions().total());
    }

    #[test]
    fn test_invalid_weights_rejected() {
        let negative = FeatureConfig {
            weights: FeatureWeights {
                text: -1.0,
                ..FeatureWeights::default()
            },
            ..FeatureConfig::default()
        };
        assert!(FeatureBuilder::fit(&corpus(), negative).is_err());

        let zero = FeatureConfig {
            weights: FeatureWeights {
                text: 0.0,
                genre: 0.0,
                numeric: 0.0,
            },
            ..FeatureConfig::default()
        };
        assert!(matches!(
            FeatureBuilder::fit(&corpus(), zero),
            Err(ArtifactError::InvalidConfig(_))
        ));
    }
}
