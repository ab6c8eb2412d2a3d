//! # Recommender
//!
//! Facade over the loaded artifact set. Every query is read-only, so one
//! `Arc<Recommender>` serves all requests:
//! 1. Resolve the query (id, title, genre or user)
//! 2. Ask the matching candidate source for ranked candidates
//! 3. Join candidates back to full movie records
//!
//! Unknown movies surface as [`RecommendError::MovieNotFound`]; title
//! lookups that do not resolve to one movie are reported through
//! [`TitleOutcome`] instead of an error.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use rand::Rng;
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::config::Config;
use crate::error::{RecommendError, Result};
use data_loader::{
    normalize_user, Movie, MovieId, MovieRatingStats, RatingStore, RatingSummary, TitleLookup,
    TitleMatch,
};
use pipeline::{ArtifactError, ArtifactSet, FeatureDimensions};
use sources::evaluation::evaluate;
use sources::user_context::{build_user_context, build_user_profile};
use sources::{
    Candidate, CandidateMetadata, CandidateSource, ContentSource, DiscoverySource,
    EvaluationReport, HybridSource, HybridWeights, MatrixFactorization, SourceError, UserContext,
    UserProfile,
};

/// How many movies the analytics report lists
const ANALYTICS_TOP_MOVIES: usize = 10;

/// A recommended movie with the score that ranked it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
    #[serde(flatten)]
    pub movie: Movie,
    pub score: f32,
    pub source: CandidateSource,
    #[serde(flatten)]
    pub metadata: CandidateMetadata,
}

/// Result of a title query
#[derive(Debug, Clone, PartialEq)]
pub enum TitleOutcome {
    Matched {
        movie: Movie,
        recommendations: Vec<Recommendation>,
    },
    /// Several titles match; pick one and query by id
    Ambiguous(Vec<TitleMatch>),
    NotFound { suggestions: Vec<TitleMatch> },
}

/// Catalog and build summary
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatalogStats {
    pub total_movies: usize,
    pub genres: Vec<String>,
    pub average_rating: f32,
    /// Width similarity is computed on; the reduced width when SVD applied
    pub feature_dim: usize,
    pub dimensions: FeatureDimensions,
    pub svd_components: Option<usize>,
    pub collaborative_model: bool,
}

/// A movie in the analytics ranking
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RatedMovieStats {
    #[serde(flatten)]
    pub stats: MovieRatingStats,
    /// Empty when the movie is not in the catalog
    pub title: String,
}

/// Usage summary of the rating store
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Analytics {
    pub total_users: usize,
    pub total_ratings: usize,
    pub average_rating: f32,
    pub top_rated_movies: Vec<RatedMovieStats>,
}

pub struct Recommender {
    artifacts: Arc<ArtifactSet>,
    content: ContentSource,
    discovery: DiscoverySource,
    hybrid: HybridSource,
    model: Option<Arc<MatrixFactorization>>,
}

impl Recommender {
    /// Load artifacts (and the collaborative model, if trained) from the
    /// configured artifact directory.
    ///
    /// Missing artifacts are an error; a missing model is not.
    pub fn load(config: &Config) -> Result<Self> {
        let start = Instant::now();
        let dir = &config.paths.artifacts;

        let artifacts = Arc::new(ArtifactSet::load(dir)?);
        let model = load_model(dir)?;

        let recommender = Self::from_parts(artifacts, model, config.hybrid)?;
        info!(
            "Recommender ready with {} movies in {:.2?}",
            recommender.artifacts.catalog.len(),
            start.elapsed()
        );
        Ok(recommender)
    }

    pub fn from_parts(
        artifacts: Arc<ArtifactSet>,
        model: Option<Arc<MatrixFactorization>>,
        weights: HybridWeights,
    ) -> Result<Self> {
        let hybrid = HybridSource::new(artifacts.clone(), model.clone(), weights)?;
        Ok(Self {
            content: ContentSource::new(artifacts.clone()),
            discovery: DiscoverySource::new(artifacts.catalog.clone()),
            hybrid,
            model,
            artifacts,
        })
    }

    pub fn artifacts(&self) -> &ArtifactSet {
        &self.artifacts
    }

    pub fn has_model(&self) -> bool {
        self.model.is_some()
    }

    /// The `k` movies most similar to `movie_id`
    #[instrument(skip(self))]
    pub fn recommend_by_id(&self, movie_id: MovieId, k: usize) -> Result<Vec<Recommendation>> {
        let candidates = self.content.similar_to(movie_id, k)?;
        Ok(self.join_movies(candidates))
    }

    /// Resolve `title`, then recommend as [`Self::recommend_by_id`]
    #[instrument(skip(self))]
    pub fn recommend_by_title(&self, title: &str, k: usize) -> Result<TitleOutcome> {
        match self.artifacts.catalog.find_by_title(title) {
            TitleLookup::Resolved(id) => {
                let movie = self.movie(id).ok_or(RecommendError::MovieNotFound(id))?;
                debug!("Resolved '{}' to {} ({})", title, movie.title, id);
                Ok(TitleOutcome::Matched {
                    recommendations: self.recommend_by_id(id, k)?,
                    movie,
                })
            }
            TitleLookup::Ambiguous(matches) => {
                debug!("Title '{}' is ambiguous ({} matches)", title, matches.len());
                Ok(TitleOutcome::Ambiguous(matches))
            }
            TitleLookup::NotFound(suggestions) => Ok(TitleOutcome::NotFound { suggestions }),
        }
    }

    /// Best rated movies whose genre names contain `genre`
    pub fn search_by_genre(&self, genre: &str, k: usize) -> Result<Vec<Recommendation>> {
        let candidates = self.discovery.by_genre(genre, k)?;
        Ok(self.join_movies(candidates))
    }

    /// `min(k, n)` distinct movies, uniformly at random
    pub fn random(&self, k: usize) -> Vec<Movie> {
        self.random_with(&mut rand::rng(), k)
    }

    pub fn random_with<R: Rng + ?Sized>(&self, rng: &mut R, k: usize) -> Vec<Movie> {
        self.join_movies(self.discovery.random_with(rng, k))
            .into_iter()
            .map(|r| r.movie)
            .collect()
    }

    pub fn movie(&self, movie_id: MovieId) -> Option<Movie> {
        self.artifacts.catalog.get_movie(movie_id).cloned()
    }

    pub fn stats(&self) -> CatalogStats {
        let catalog = &self.artifacts.catalog;
        let metadata = &self.artifacts.metadata;
        CatalogStats {
            total_movies: catalog.len(),
            genres: catalog.genres().iter().map(|g| g.name().to_string()).collect(),
            average_rating: catalog.average_rating(),
            feature_dim: metadata.feature_dim,
            dimensions: metadata.dimensions,
            svd_components: metadata.svd_components,
            collaborative_model: self.has_model(),
        }
    }

    /// Genre vocabulary the build encoded
    pub fn genres(&self) -> Vec<String> {
        self.artifacts.metadata.genres.clone()
    }

    pub fn user_context(&self, store: &RatingStore, user_id: &str) -> UserContext {
        build_user_context(store, &self.artifacts.catalog, user_id)
    }

    pub fn user_profile(&self, store: &RatingStore, user_id: &str) -> UserProfile {
        build_user_profile(store, &self.artifacts.catalog, user_id)
    }

    /// Hybrid recommendations for a user, optionally anchored on `seed`
    #[instrument(skip(self, context), fields(user_id = %context.user_id))]
    pub fn hybrid(
        &self,
        context: &UserContext,
        seed: Option<MovieId>,
        k: usize,
    ) -> Result<Vec<Recommendation>> {
        let start = Instant::now();
        let candidates = self.hybrid.get_candidates(context, seed, k)?;
        let recommendations = self.join_movies(candidates);
        debug!(
            "Hybrid recommendations for {} in {:.2?}",
            context.user_id,
            start.elapsed()
        );
        Ok(recommendations)
    }

    /// Store totals and the best rated movies
    pub fn analytics(&self, store: &RatingStore) -> Analytics {
        let RatingSummary {
            users,
            ratings,
            mean_score,
        } = store.summary();
        let top_rated_movies = store
            .top_movies(ANALYTICS_TOP_MOVIES)
            .into_iter()
            .map(|stats| RatedMovieStats {
                title: self
                    .movie(stats.movie_id)
                    .map(|m| m.title)
                    .unwrap_or_default(),
                stats,
            })
            .collect();
        Analytics {
            total_users: users,
            total_ratings: ratings,
            average_rating: mean_score,
            top_rated_movies,
        }
    }

    /// Hide `held_out` from the user's ratings, ask for `k` hybrid
    /// recommendations and score how many of the hidden movies come back.
    ///
    /// Only the rating store is masked; a loaded factorization model still
    /// reflects the ratings it was trained on.
    #[instrument(skip(self, store, held_out))]
    pub fn evaluate(
        &self,
        store: &RatingStore,
        user_id: &str,
        held_out: &[MovieId],
        k: usize,
    ) -> Result<EvaluationReport> {
        let user_id = normalize_user(user_id);
        let mut masked = store.clone();
        let hidden = held_out
            .iter()
            .filter(|&&movie_id| masked.remove(user_id, movie_id))
            .count();
        debug!("Hid {} of {} held-out ratings", hidden, held_out.len());

        let context = self.user_context(&masked, user_id);
        let recommended: Vec<MovieId> = self
            .hybrid(&context, None, k)?
            .iter()
            .map(|r| r.movie.id)
            .collect();
        let report = evaluate(&recommended, held_out);
        info!(
            "Evaluation for '{}': precision {:.3}, recall {:.3}, f1 {:.3}",
            user_id, report.precision, report.recall, report.f1_score
        );
        Ok(report)
    }

    fn join_movies(&self, candidates: Vec<Candidate>) -> Vec<Recommendation> {
        candidates
            .into_iter()
            .filter_map(|c| {
                let movie = self.artifacts.catalog.get_movie(c.movie_id)?.clone();
                Some(Recommendation {
                    movie,
                    score: c.score,
                    source: c.source,
                    metadata: c.metadata,
                })
            })
            .collect()
    }
}

/// The trained model in `dir`, or `None` when nothing was trained yet
fn load_model(dir: &Path) -> Result<Option<Arc<MatrixFactorization>>> {
    match MatrixFactorization::load(dir) {
        Ok(model) => {
            info!(
                "Loaded collaborative model ({} users, {} movies, rank {})",
                model.user_count(),
                model.movie_count(),
                model.rank()
            );
            Ok(Some(Arc::new(model)))
        }
        Err(SourceError::Artifact(ArtifactError::Missing { .. })) => {
            warn!(
                "No collaborative model in {}; run `cinematch train` to enable hybrid blending",
                dir.display()
            );
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use data_loader::{Genre, MovieCatalog};
    use pipeline::FeatureConfig;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;
    use std::path::PathBuf;

    const INTERSTELLAR: MovieId = 157336;

    fn dataset_path() -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("../../data/movies_dataset.json")
    }

    fn recommender() -> Recommender {
        let catalog = MovieCatalog::load_from_file(&dataset_path()).unwrap();
        let artifacts = ArtifactSet::build(catalog, FeatureConfig::default()).unwrap();
        Recommender::from_parts(Arc::new(artifacts), None, HybridWeights::default()).unwrap()
    }

    #[test]
    fn test_recommend_by_title() {
        let recommender = recommender();
        let TitleOutcome::Matched { movie, recommendations } =
            recommender.recommend_by_title("  interstellar ", 5).unwrap()
        else {
            panic!("expected a match");
        };

        assert_eq!(movie.id, INTERSTELLAR);
        assert_eq!(recommendations.len(), 5);
        let ids: HashSet<MovieId> = recommendations.iter().map(|r| r.movie.id).collect();
        assert_eq!(ids.len(), 5);
        assert!(!ids.contains(&INTERSTELLAR));
        assert!(recommendations.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[test]
    fn test_title_not_found_and_ambiguous() {
        let recommender = recommender();
        assert!(matches!(
            recommender.recommend_by_title("zzzz qqqq", 5).unwrap(),
            TitleOutcome::NotFound { .. }
        ));
        // "The Dark Knight" and "The Dark Knight Rises" both contain "dark knight"
        match recommender.recommend_by_title("dark knight", 5).unwrap() {
            TitleOutcome::Ambiguous(matches) => assert!(matches.len() >= 2),
            other => panic!("expected ambiguous, got {other:?}"),
        }
    }

    #[test]
    fn test_recommend_by_unknown_id() {
        let recommender = recommender();
        assert!(matches!(
            recommender.recommend_by_id(1, 5),
            Err(RecommendError::MovieNotFound(1))
        ));
    }

    #[test]
    fn test_search_by_genre() {
        let recommender = recommender();
        let results = recommender.search_by_genre("Action", 10).unwrap();

        assert!(!results.is_empty());
        assert!(results.len() <= 10);
        assert!(results.iter().all(|r| r.movie.genres.contains(&Genre::Action)));
        let averages: Vec<f32> = results
            .iter()
            .map(|r| r.movie.vote_average.unwrap_or(f32::NEG_INFINITY))
            .collect();
        assert!(averages.windows(2).all(|w| w[0] >= w[1]));
    }

    #[test]
    fn test_random_movies() {
        let recommender = recommender();
        let movies = recommender.random_with(&mut StdRng::seed_from_u64(3), 5);
        let ids: HashSet<MovieId> = movies.iter().map(|m| m.id).collect();
        assert_eq!(ids.len(), 5);
        assert!(ids.iter().all(|id| recommender.movie(*id).is_some()));
    }

    #[test]
    fn test_unseeded_random_varies() {
        let recommender = recommender();
        let draws: Vec<Vec<MovieId>> = (0..8)
            .map(|_| recommender.random(5).iter().map(|m| m.id).collect())
            .collect();
        assert!(draws.iter().all(|d| d.len() == 5));
        // 8 identical draws of 5 from 32 movies would mean the generator is stuck
        assert!(draws.windows(2).any(|w| w[0] != w[1]));
    }

    #[test]
    fn test_cold_start_hybrid_still_recommends() {
        let recommender = recommender();
        let store = RatingStore::new("unused.json");
        let context = recommender.user_context(&store, "newcomer");

        let results = recommender.hybrid(&context, None, 5).unwrap();
        assert_eq!(results.len(), 5);
        assert!(results.iter().all(|r| r.source == CandidateSource::Random));
    }

    #[test]
    fn test_analytics() {
        let recommender = recommender();
        let mut store = RatingStore::new("unused.json");
        store.upsert("alice", INTERSTELLAR, 9.0).unwrap();
        store.upsert("bob", INTERSTELLAR, 10.0).unwrap();
        store.upsert("bob", 238, 7.0).unwrap();
        store.upsert("bob", 424242, 8.0).unwrap();

        let analytics = recommender.analytics(&store);
        assert_eq!(analytics.total_users, 2);
        assert_eq!(analytics.total_ratings, 4);
        assert!((analytics.average_rating - 8.5).abs() < 1e-5);

        let top = &analytics.top_rated_movies;
        assert_eq!(top.len(), 3);
        assert_eq!(top[0].stats.movie_id, INTERSTELLAR);
        assert_eq!(top[0].stats.count, 2);
        assert_eq!(top[0].title, "Interstellar");
        // Unknown to the catalog, still ranked
        assert_eq!(top[1].stats.movie_id, 424242);
        assert_eq!(top[1].title, "");
    }

    #[test]
    fn test_evaluate_hides_held_out_ratings() {
        let recommender = recommender();
        let mut store = RatingStore::new("unused.json");
        store.upsert("alice", INTERSTELLAR, 9.0).unwrap();
        store.upsert("alice", 238, 7.0).unwrap();
        let held_out = [INTERSTELLAR];

        let report = recommender.evaluate(&store, " alice ", &held_out, 50).unwrap();
        // With Interstellar hidden every catalog movie but 238 is a
        // candidate, so the held-out movie must come back
        assert_eq!(report.total_recommendations, 31);
        assert_eq!(report.hits, 1);
        assert_eq!(report.recall, 1.0);
        assert!((report.precision - 1.0 / 31.0).abs() < 1e-6);
        // The caller's store is untouched
        assert_eq!(store.get("alice", INTERSTELLAR), Some(9.0));
    }

    #[test]
    fn test_stats_and_genres() {
        let recommender = recommender();
        let stats = recommender.stats();

        assert_eq!(stats.total_movies, 32);
        assert_eq!(stats.feature_dim, stats.dimensions.total());
        assert_eq!(stats.svd_components, None);
        assert!(!stats.collaborative_model);
        let mut sorted = stats.genres.clone();
        sorted.sort();
        assert_eq!(stats.genres, sorted);
        assert_eq!(recommender.genres().len(), stats.dimensions.genre);
    }

    #[test]
    fn test_hybrid_excludes_rated() {
        let recommender = recommender();
        let mut store = RatingStore::new("unused.json");
        store.upsert("alice", INTERSTELLAR, 9.0).unwrap();
        store.upsert("alice", 238, 7.0).unwrap();

        let context = recommender.user_context(&store, "alice");
        let results = recommender.hybrid(&context, None, 10).unwrap();
        assert_eq!(results.len(), 10);
        assert!(results
            .iter()
            .all(|r| r.movie.id != INTERSTELLAR && r.movie.id != 238));
        assert!(results.iter().all(|r| r.source == CandidateSource::Hybrid));

        let profile = recommender.user_profile(&store, "alice");
        assert_eq!(profile.rating_count, 2);
        assert_eq!(profile.top_rated[0].movie_id, INTERSTELLAR);
    }

    #[test]
    fn test_load_without_model() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = MovieCatalog::load_from_file(&dataset_path()).unwrap();
        ArtifactSet::build(catalog, FeatureConfig::default())
            .unwrap()
            .save(dir.path())
            .unwrap();

        let mut config = Config::default();
        config.paths.artifacts = dir.path().to_path_buf();
        let recommender = Recommender::load(&config).unwrap();
        assert!(!recommender.has_model());

        config.paths.artifacts = dir.path().join("empty");
        assert!(matches!(
            Recommender::load(&config),
            Err(RecommendError::Artifact(ArtifactError::Missing { .. }))
        ));
    }
}
