//! Configuration for the build, the recommender and the API server.
//!
//! Loaded from an optional TOML file. Every field has a default, so an empty
//! file (or no file at all) is a valid configuration:
//!
//! ```toml
//! [paths]
//! dataset = "data/movies_dataset.json"
//! artifacts = "artifacts"
//! ratings = "data/user_ratings.json"
//!
//! [features]
//! text = 1.0
//! genre = 1.0
//! numeric = 1.0
//!
//! [tfidf]
//! min_df = 2
//! max_df = 0.8
//! max_features = 5000
//!
//! [reduction]
//! enabled = false
//! components = 100
//!
//! [factorization]
//! rank = 20
//!
//! [hybrid]
//! content = 0.7
//! collaborative = 0.3
//!
//! [server]
//! host = "127.0.0.1"
//! port = 8000
//! ```

use pipeline::{FeatureConfig, FeatureWeights, ReductionConfig, TfidfConfig};
use serde::{Deserialize, Serialize};
use sources::{FactorizationConfig, HybridWeights};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Cannot read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub dataset: PathBuf,
    pub artifacts: PathBuf,
    pub ratings: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            dataset: PathBuf::from("data/movies_dataset.json"),
            artifacts: PathBuf::from("artifacts"),
            ratings: PathBuf::from("data/user_ratings.json"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub paths: PathsConfig,
    pub features: FeatureWeights,
    pub tfidf: TfidfConfig,
    pub reduction: ReductionConfig,
    pub factorization: FactorizationConfig,
    pub hybrid: HybridWeights,
    pub server: ServerConfig,
}

impl Config {
    /// Load from `path`, or defaults when `path` is `None`
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) => {
                info!("Loading configuration from {}", path.display());
                let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })?;
                Self::from_toml(&content).map_err(|source| ConfigError::Parse {
                    path: path.to_path_buf(),
                    source,
                })?
            }
            None => {
                debug!("No config file given, using defaults");
                Self::default()
            }
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Reject weights and settings no build or query could use
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.features
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        self.hybrid
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        self.factorization
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        self.reduction
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;

        let tfidf = &self.tfidf;
        if !(tfidf.max_df > 0.0 && tfidf.max_df <= 1.0) {
            return Err(ConfigError::Invalid(format!(
                "tfidf.max_df must be in (0, 1], got {}",
                tfidf.max_df
            )));
        }
        if tfidf.max_features == 0 {
            return Err(ConfigError::Invalid(
                "tfidf.max_features must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Settings for a feature build
    pub fn feature_config(&self) -> FeatureConfig {
        FeatureConfig {
            weights: self.features,
            tfidf: self.tfidf.clone(),
            reduction: self.reduction.clone(),
        }
    }
}
