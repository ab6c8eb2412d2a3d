//! The artifact set: everything the offline build produces.
//!
//! Artifacts live as JSON files in one directory. Serving only ever reads
//! them; a missing file is reported as [`ArtifactError::Missing`] and never
//! triggers a rebuild.
//!
//! Output is deterministic: building twice from the same dataset and
//! configuration writes byte-identical files.

use crate::encoders::{GenreEncoder, MinMaxScaler};
use crate::error::{ArtifactError, Result};
use crate::features::{FeatureBuilder, FeatureConfig, FeatureDimensions, FeatureMatrix, FeatureWeights};
use crate::reduction::{ReductionConfig, TruncatedSvd};
use crate::similarity::SimilarityMatrix;
use crate::tfidf::{TfidfConfig, TfidfVectorizer};
use data_loader::{Movie, MovieCatalog};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

pub const MOVIES_FILE: &str = "movies.json";
pub const VECTORIZER_FILE: &str = "tfidf_vectorizer.json";
pub const GENRE_ENCODER_FILE: &str = "genre_encoder.json";
pub const SCALER_FILE: &str = "rating_scaler.json";
pub const FEATURES_FILE: &str = "features.json";
pub const SIMILARITY_FILE: &str = "similarity_matrix.json";
pub const METADATA_FILE: &str = "metadata.json";
/// Only written when the build applied a truncated SVD
pub const SVD_FILE: &str = "svd_transformer.json";

/// Files a complete build writes
pub const REQUIRED_FILES: [&str; 7] = [
    MOVIES_FILE,
    VECTORIZER_FILE,
    GENRE_ENCODER_FILE,
    SCALER_FILE,
    FEATURES_FILE,
    SIMILARITY_FILE,
    METADATA_FILE,
];

const FORMAT_VERSION: u32 = 1;

/// Summary of a build, stored alongside the artifacts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactMetadata {
    pub format_version: u32,
    pub movie_count: usize,
    pub dimensions: FeatureDimensions,
    pub feature_dim: usize,
    /// Genre vocabulary, in encoder column order
    pub genres: Vec<String>,
    pub weights: FeatureWeights,
    pub tfidf: TfidfConfig,
    /// Width after truncated SVD; `None` when the build did not reduce
    #[serde(default)]
    pub svd_components: Option<usize>,
}

/// Loaded or freshly built artifacts
#[derive(Debug, Clone)]
pub struct ArtifactSet {
    /// Shared with candidate sources and filters
    pub catalog: Arc<MovieCatalog>,
    pub builder: FeatureBuilder,
    /// Rows similarity was computed from, reduced when `reducer` is set
    pub features: FeatureMatrix,
    pub reducer: Option<TruncatedSvd>,
    pub similarity: SimilarityMatrix,
    pub metadata: ArtifactMetadata,
}

impl ArtifactSet {
    /// Run the full build: fit features, build the matrix, compute similarity
    pub fn build(catalog: MovieCatalog, config: FeatureConfig) -> Result<Self> {
        if catalog.is_empty() {
            return Err(ArtifactError::InvalidConfig(
                "cannot build artifacts from an empty catalog".to_string(),
            ));
        }
        info!("Building artifacts for {} movies", catalog.len());

        let tfidf = config.tfidf.clone();
        let reduction: ReductionConfig = config.reduction.clone();
        let builder = FeatureBuilder::fit(catalog.movies(), config)?;
        let combined = builder.build_matrix(catalog.movies());

        let dimensions = builder.dimensions();
        let (features, reducer) = if reduction.applies_to(dimensions.total()) {
            let svd = TruncatedSvd::fit(&combined, &reduction)?;
            (svd.transform_matrix(&combined), Some(svd))
        } else {
            if reduction.enabled {
                info!(
                    "Skipping truncated SVD: {} components is not below {} features",
                    reduction.components,
                    dimensions.total()
                );
            }
            (combined, None)
        };
        let similarity = SimilarityMatrix::compute(&features);

        let metadata = ArtifactMetadata {
            format_version: FORMAT_VERSION,
            movie_count: catalog.len(),
            dimensions,
            feature_dim: reducer
                .as_ref()
                .map_or(dimensions.total(), TruncatedSvd::output_dim),
            genres: builder
                .genre_encoder()
                .genres()
                .iter()
                .map(|g| g.name().to_string())
                .collect(),
            weights: builder.weights(),
            tfidf,
            svd_components: reducer.as_ref().map(TruncatedSvd::output_dim),
        };

        Ok(Self {
            catalog: Arc::new(catalog),
            builder,
            features,
            reducer,
            similarity,
            metadata,
        })
    }

    /// Write every artifact into `dir`, creating it if needed
    pub fn save(&self, dir: &Path) -> Result<()> {
        std::fs::create_dir_all(dir).map_err(|source| ArtifactError::Io {
            path: dir.to_path_buf(),
            source,
        })?;

        write_json(&dir.join(MOVIES_FILE), self.catalog.movies())?;
        write_json(&dir.join(VECTORIZER_FILE), self.builder.vectorizer())?;
        write_json(&dir.join(GENRE_ENCODER_FILE), self.builder.genre_encoder())?;
        write_json(&dir.join(SCALER_FILE), self.builder.scaler())?;
        write_json_compact(&dir.join(FEATURES_FILE), &self.features)?;
        write_json_compact(&dir.join(SIMILARITY_FILE), &self.similarity)?;
        write_json(&dir.join(METADATA_FILE), &self.metadata)?;
        match &self.reducer {
            Some(svd) => write_json_compact(&dir.join(SVD_FILE), svd)?,
            None => remove_stale(&dir.join(SVD_FILE))?,
        }

        info!("Saved artifact set to {}", dir.display());
        Ok(())
    }

    /// Load a previously saved artifact set and check it is consistent
    pub fn load(dir: &Path) -> Result<Self> {
        info!("Loading artifacts from {}", dir.display());

        let movies: Vec<Movie> = read_json(dir, MOVIES_FILE)?;
        let vectorizer: TfidfVectorizer = read_json(dir, VECTORIZER_FILE)?;
        let genre_encoder: GenreEncoder = read_json(dir, GENRE_ENCODER_FILE)?;
        let scaler: MinMaxScaler = read_json(dir, SCALER_FILE)?;
        let features: FeatureMatrix = read_json(dir, FEATURES_FILE)?;
        let similarity: SimilarityMatrix = read_json(dir, SIMILARITY_FILE)?;
        let metadata: ArtifactMetadata = read_json(dir, METADATA_FILE)?;
        let reducer: Option<TruncatedSvd> = match metadata.svd_components {
            Some(_) => Some(read_json(dir, SVD_FILE)?),
            None => None,
        };

        let builder = FeatureBuilder::from_parts(metadata.weights, vectorizer, genre_encoder, scaler);
        let catalog = Arc::new(MovieCatalog::from_movies(movies));

        let set = Self {
            catalog,
            builder,
            features,
            reducer,
            similarity,
            metadata,
        };
        set.check_consistency()?;

        debug!(
            "Loaded {} movies with {}-dimensional features",
            set.catalog.len(),
            set.metadata.feature_dim
        );
        Ok(set)
    }

    /// Feature row of any movie, catalog member or not, in the space the
    /// similarity matrix was computed in
    pub fn embed(&self, movie: &Movie) -> Vec<f32> {
        let row = self.builder.transform(movie);
        match &self.reducer {
            Some(svd) => svd.transform(&row),
            None => row,
        }
    }

    /// Whether every required artifact file is present in `dir`
    pub fn exists(dir: &Path) -> bool {
        REQUIRED_FILES.iter().all(|f| dir.join(f).is_file())
    }

    fn check_consistency(&self) -> Result<()> {
        let n = self.catalog.len();
        if self.metadata.format_version != FORMAT_VERSION {
            return Err(ArtifactError::Inconsistent(format!(
                "format version {} is not supported (expected {})",
                self.metadata.format_version, FORMAT_VERSION
            )));
        }
        if self.metadata.movie_count != n || self.features.len() != n || self.similarity.len() != n {
            return Err(ArtifactError::Inconsistent(format!(
                "{} movies, {} feature rows, {}x{} similarity matrix, metadata says {}",
                n,
                self.features.len(),
                self.similarity.len(),
                self.similarity.len(),
                self.metadata.movie_count
            )));
        }
        if !self.similarity.is_well_formed() {
            return Err(ArtifactError::Inconsistent(
                "similarity matrix has the wrong number of entries".to_string(),
            ));
        }
        if self.builder.dimensions() != self.metadata.dimensions
            || self.features.dims != self.metadata.dimensions
        {
            return Err(ArtifactError::Inconsistent(
                "feature dimensions do not match the fitted transformers".to_string(),
            ));
        }
        let expected_width = match &self.reducer {
            Some(svd) if svd.input_dim() == self.metadata.dimensions.total() => svd.output_dim(),
            Some(_) => {
                return Err(ArtifactError::Inconsistent(
                    "truncated SVD was fitted on features of another width".to_string(),
                ));
            }
            None => self.metadata.dimensions.total(),
        };
        if self.metadata.feature_dim != expected_width
            || self.metadata.svd_components != self.reducer.as_ref().map(TruncatedSvd::output_dim)
        {
            return Err(ArtifactError::Inconsistent(format!(
                "metadata says {} features, transformers produce {}",
                self.metadata.feature_dim, expected_width
            )));
        }
        let width = self.metadata.feature_dim;
        if self.features.rows.iter().any(|r| r.len() != width) {
            return Err(ArtifactError::Inconsistent(format!(
                "feature rows are not all {width} wide"
            )));
        }
        Ok(())
    }
}

/// Serialize `value` as pretty JSON to `path`
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).map_err(|source| ArtifactError::Serde {
        path: path.to_path_buf(),
        source,
    })?;
    write_file(path, json)
}

fn write_json_compact<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string(value).map_err(|source| ArtifactError::Serde {
        path: path.to_path_buf(),
        source,
    })?;
    write_file(path, json)
}

fn write_file(path: &Path, content: String) -> Result<()> {
    std::fs::write(path, content).map_err(|source| ArtifactError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    debug!("Wrote {}", path.display());
    Ok(())
}

fn remove_stale(path: &Path) -> Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => {
            debug!("Removed stale {}", path.display());
            Ok(())
        }
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(source) => Err(ArtifactError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Read artifact `file` from `dir`; a missing file is [`ArtifactError::Missing`]
pub fn read_json<T: DeserializeOwned>(dir: &Path, file: &str) -> Result<T> {
    let path: PathBuf = dir.join(file);
    let content = match std::fs::read_to_string(&path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(ArtifactError::Missing {
                dir: dir.to_path_buf(),
                file: file.to_string(),
            });
        }
        Err(source) => return Err(ArtifactError::Io { path, source }),
    };
    serde_json::from_str(&content).map_err(|source| ArtifactError::Serde { path, source })
}

#[cfg(test)]
mod tests {
    use super::*;
    use data_loader::Genre;

    fn catalog() -> MovieCatalog {
        let movie = |id: u32, overview: &str, genres: Vec<Genre>| Movie {
            id,
            title: format!("Movie {id}"),
            genres,
            overview: overview.to_string(),
            vote_average: Some(6.0 + id as f32 / 2.0),
            vote_count: Some(1000 * id),
            release_date: None,
        };
        MovieCatalog::from_movies(vec![
            movie(1, "a crew crosses a wormhole in space", vec![Genre::ScienceFiction]),
            movie(2, "a crew robs a bank in the city", vec![Genre::Crime]),
            movie(3, "space pirates rob a cargo ship", vec![Genre::ScienceFiction, Genre::Action]),
        ])
    }

    #[test]
    fn test_build_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let built = ArtifactSet::build(catalog(), FeatureConfig::default()).unwrap();
        assert!(!ArtifactSet::exists(dir.path()));
        built.save(dir.path()).unwrap();
        assert!(ArtifactSet::exists(dir.path()));

        let loaded = ArtifactSet::load(dir.path()).unwrap();
        assert_eq!(loaded.catalog.movies(), built.catalog.movies());
        assert_eq!(loaded.metadata, built.metadata);
        assert_eq!(loaded.similarity, built.similarity);
        assert_eq!(loaded.builder, built.builder);
        assert_eq!(loaded.metadata.genres, vec!["Action", "Crime", "Science Fiction"]);
    }

    #[test]
    fn test_missing_artifacts_are_actionable() {
        let dir = tempfile::tempdir().unwrap();
        let err = ArtifactSet::load(dir.path()).unwrap_err();
        assert!(matches!(err, ArtifactError::Missing { .. }));
        assert!(err.to_string().contains("cinematch build"));
    }

    #[test]
    fn test_mismatched_artifacts_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let built = ArtifactSet::build(catalog(), FeatureConfig::default()).unwrap();
        built.save(dir.path()).unwrap();

        // Simulate a partial rebuild with fewer movies
        let fewer: Vec<&Movie> = built.catalog.movies().iter().take(2).collect();
        write_json(&dir.path().join(MOVIES_FILE), &fewer).unwrap();

        assert!(matches!(
            ArtifactSet::load(dir.path()),
            Err(ArtifactError::Inconsistent(_))
        ));
    }

    #[test]
    fn test_svd_build_reload_and_embed() {
        let dir = tempfile::tempdir().unwrap();
        let config = FeatureConfig {
            reduction: ReductionConfig {
                enabled: true,
                components: 2,
                ..ReductionConfig::default()
            },
            ..FeatureConfig::default()
        };
        let built = ArtifactSet::build(catalog(), config).unwrap();
        assert_eq!(built.metadata.svd_components, Some(2));
        assert_eq!(built.metadata.feature_dim, 2);
        assert!(built.features.rows.iter().all(|r| r.len() == 2));
        for i in 0..built.similarity.len() {
            for j in 0..built.similarity.len() {
                assert_eq!(built.similarity.get(i, j), built.similarity.get(j, i));
            }
        }

        built.save(dir.path()).unwrap();
        assert!(dir.path().join(SVD_FILE).exists());
        let loaded = ArtifactSet::load(dir.path()).unwrap();
        assert_eq!(loaded.reducer, built.reducer);
        let first = loaded.catalog.movie_at(0).unwrap();
        assert_eq!(loaded.embed(first), built.features.rows[0]);

        // A later unreduced build into the same directory drops the transformer
        ArtifactSet::build(catalog(), FeatureConfig::default())
            .unwrap()
            .save(dir.path())
            .unwrap();
        assert!(!dir.path().join(SVD_FILE).exists());
        assert!(ArtifactSet::load(dir.path()).unwrap().reducer.is_none());
    }

    #[test]
    fn test_svd_skipped_when_not_narrower() {
        let config = FeatureConfig {
            reduction: ReductionConfig {
                enabled: true,
                components: 10_000,
                ..ReductionConfig::default()
            },
            ..FeatureConfig::default()
        };
        let built = ArtifactSet::build(catalog(), config).unwrap();
        assert!(built.reducer.is_none());
        assert_eq!(built.metadata.svd_components, None);
        assert_eq!(built.metadata.feature_dim, built.metadata.dimensions.total());
    }

    #[test]
    fn test_empty_catalog_cannot_build() {
        assert!(ArtifactSet::build(MovieCatalog::new(), FeatureConfig::default()).is_err());
    }
}
