//! REST API over the recommender.
//!
//! All bodies are JSON. Failures use `{ "error": "..." }` with:
//! - 404 for unknown movies, unresolved titles and missing ratings
//! - 300 for ambiguous titles, listing the candidates
//! - 400 for invalid input, including bodies, paths and query strings that
//!   do not parse
//! - 500 for anything else
//!
//! Rating writes are applied to a copy of the store, which replaces the live
//! store only once it is saved, so a failed save leaves no trace.

use std::sync::Arc;

use axum::{
    async_trait,
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        FromRequest, FromRequestParts, Request, State,
    },
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{delete, get},
    Router,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::error::RecommendError;
use crate::recommender::{Analytics, CatalogStats, Recommendation, Recommender, TitleOutcome};
use data_loader::{
    normalize_user, DataLoadError, Movie, MovieId, RatingStore, TitleMatch, UserRating,
};
use sources::{SourceError, UserProfile};

const MAX_LIMIT: usize = 100;

#[derive(Clone)]
pub struct AppState {
    pub recommender: Arc<Recommender>,
    /// Single write path; readers build user contexts under the read lock
    pub ratings: Arc<RwLock<RatingStore>>,
}

impl AppState {
    pub fn new(recommender: Recommender, ratings: RatingStore) -> Self {
        Self {
            recommender: Arc::new(recommender),
            ratings: Arc::new(RwLock::new(ratings)),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .route("/recommendations/title/:title", get(recommend_by_title_handler))
        .route("/recommendations/id/:movie_id", get(recommend_by_id_handler))
        .route("/movies/genre/:genre", get(genre_handler))
        .route("/movies/random", get(random_handler))
        .route("/movies/:movie_id", get(movie_handler))
        .route("/stats", get(stats_handler))
        .route("/genres", get(genres_handler))
        .route("/analytics", get(analytics_handler))
        .route(
            "/users/:user_id/ratings",
            get(list_ratings_handler).post(add_rating_handler),
        )
        .route("/users/:user_id/ratings/:movie_id", delete(remove_rating_handler))
        .route("/users/:user_id/profile", get(user_profile_handler))
        .route("/users/:user_id/recommendations", get(hybrid_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// =============================================================================
// Errors
// =============================================================================

#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    TitleNotFound {
        title: String,
        suggestions: Vec<TitleMatch>,
    },
    Ambiguous {
        title: String,
        candidates: Vec<TitleMatch>,
    },
    BadRequest(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, json!({ "error": message })),
            ApiError::TitleNotFound { title, suggestions } => (
                StatusCode::NOT_FOUND,
                json!({
                    "error": format!("No movie titled '{title}'"),
                    "suggestions": suggestions,
                }),
            ),
            ApiError::Ambiguous { title, candidates } => (
                StatusCode::MULTIPLE_CHOICES,
                json!({
                    "error": format!("'{title}' matches several movies"),
                    "candidates": candidates,
                }),
            ),
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, json!({ "error": message })),
            ApiError::Internal(message) => {
                error!("Request failed: {}", message);
                (StatusCode::INTERNAL_SERVER_ERROR, json!({ "error": message }))
            }
        };
        (status, Json(body)).into_response()
    }
}

impl From<RecommendError> for ApiError {
    fn from(e: RecommendError) -> Self {
        match e {
            RecommendError::MovieNotFound(_) => ApiError::NotFound(e.to_string()),
            RecommendError::Source(SourceError::InvalidConfig(_)) => {
                ApiError::BadRequest(e.to_string())
            }
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<DataLoadError> for ApiError {
    fn from(e: DataLoadError) -> Self {
        match e {
            DataLoadError::InvalidRating { .. } | DataLoadError::InvalidValue { .. } => {
                ApiError::BadRequest(e.to_string())
            }
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

// =============================================================================
// Extractors
// =============================================================================

/// `Json` whose rejections use the API error body
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(Self(value))
    }
}

/// `Path` whose rejections use the API error body
pub struct ApiPath<T>(pub T);

#[async_trait]
impl<T, S> FromRequestParts<S> for ApiPath<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let axum::extract::Path(value) =
            axum::extract::Path::<T>::from_request_parts(parts, state).await?;
        Ok(Self(value))
    }
}

/// `Query` whose rejections use the API error body
pub struct ApiQuery<T>(pub T);

#[async_trait]
impl<T, S> FromRequestParts<S> for ApiQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let axum::extract::Query(value) =
            axum::extract::Query::<T>::from_request_parts(parts, state).await?;
        Ok(Self(value))
    }
}

// =============================================================================
// Requests and responses
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct LimitQuery {
    limit: Option<usize>,
}

impl LimitQuery {
    fn resolve(&self, default: usize) -> Result<usize, ApiError> {
        let limit = self.limit.unwrap_or(default);
        if limit == 0 || limit > MAX_LIMIT {
            return Err(ApiError::BadRequest(format!(
                "limit must be between 1 and {MAX_LIMIT}, got {limit}"
            )));
        }
        Ok(limit)
    }
}

#[derive(Debug, Deserialize)]
pub struct HybridQuery {
    limit: Option<usize>,
    seed_id: Option<MovieId>,
}

#[derive(Debug, Deserialize)]
pub struct RateRequest {
    pub movie_id: MovieId,
    pub score: f32,
}

#[derive(Serialize)]
struct SimilarResponse {
    movie: Movie,
    recommendations: Vec<Recommendation>,
}

#[derive(Serialize)]
struct GenreResponse {
    genre: String,
    count: usize,
    movies: Vec<Recommendation>,
}

#[derive(Serialize)]
struct RatingsResponse {
    user_id: String,
    ratings: Vec<UserRating>,
}

#[derive(Serialize)]
struct RateResponse {
    user_id: String,
    movie_id: MovieId,
    score: f32,
    previous: Option<f32>,
}

#[derive(Serialize)]
struct HybridResponse {
    user_id: String,
    seed_id: Option<MovieId>,
    collaborative_model: bool,
    recommendations: Vec<Recommendation>,
}

// =============================================================================
// Handlers
// =============================================================================

async fn root_handler() -> Json<serde_json::Value> {
    Json(json!({
        "name": "cinematch",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": [
            "/health",
            "/recommendations/title/:title",
            "/recommendations/id/:movie_id",
            "/movies/genre/:genre",
            "/movies/random",
            "/movies/:movie_id",
            "/stats",
            "/genres",
            "/analytics",
            "/users/:user_id/ratings",
            "/users/:user_id/profile",
            "/users/:user_id/recommendations",
        ],
    }))
}

async fn health_handler(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "healthy",
        "movies": state.recommender.artifacts().catalog.len(),
        "collaborative_model": state.recommender.has_model(),
    }))
}

async fn recommend_by_title_handler(
    State(state): State<AppState>,
    ApiPath(title): ApiPath<String>,
    ApiQuery(query): ApiQuery<LimitQuery>,
) -> Result<Json<SimilarResponse>, ApiError> {
    let limit = query.resolve(10)?;
    match state.recommender.recommend_by_title(&title, limit)? {
        TitleOutcome::Matched {
            movie,
            recommendations,
        } => Ok(Json(SimilarResponse {
            movie,
            recommendations,
        })),
        TitleOutcome::Ambiguous(candidates) => Err(ApiError::Ambiguous { title, candidates }),
        TitleOutcome::NotFound { suggestions } => {
            Err(ApiError::TitleNotFound { title, suggestions })
        }
    }
}

async fn recommend_by_id_handler(
    State(state): State<AppState>,
    ApiPath(movie_id): ApiPath<MovieId>,
    ApiQuery(query): ApiQuery<LimitQuery>,
) -> Result<Json<SimilarResponse>, ApiError> {
    let limit = query.resolve(10)?;
    let movie = state
        .recommender
        .movie(movie_id)
        .ok_or_else(|| ApiError::NotFound(format!("Movie {movie_id} not found")))?;
    let recommendations = state.recommender.recommend_by_id(movie_id, limit)?;
    Ok(Json(SimilarResponse {
        movie,
        recommendations,
    }))
}

async fn genre_handler(
    State(state): State<AppState>,
    ApiPath(genre): ApiPath<String>,
    ApiQuery(query): ApiQuery<LimitQuery>,
) -> Result<Json<GenreResponse>, ApiError> {
    let limit = query.resolve(20)?;
    let movies = state.recommender.search_by_genre(&genre, limit)?;
    Ok(Json(GenreResponse {
        genre,
        count: movies.len(),
        movies,
    }))
}

async fn random_handler(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<LimitQuery>,
) -> Result<Json<Vec<Movie>>, ApiError> {
    let limit = query.resolve(5)?;
    Ok(Json(state.recommender.random(limit)))
}

async fn movie_handler(
    State(state): State<AppState>,
    ApiPath(movie_id): ApiPath<MovieId>,
) -> Result<Json<Movie>, ApiError> {
    state
        .recommender
        .movie(movie_id)
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Movie {movie_id} not found")))
}

async fn stats_handler(State(state): State<AppState>) -> Json<CatalogStats> {
    Json(state.recommender.stats())
}

async fn genres_handler(State(state): State<AppState>) -> Json<Vec<String>> {
    Json(state.recommender.genres())
}

async fn analytics_handler(State(state): State<AppState>) -> Json<Analytics> {
    let store = state.ratings.read().await;
    Json(state.recommender.analytics(&store))
}

async fn list_ratings_handler(
    State(state): State<AppState>,
    ApiPath(user_id): ApiPath<String>,
) -> Json<RatingsResponse> {
    let ratings = state.ratings.read().await.user_ratings(&user_id);
    Json(RatingsResponse {
        user_id: normalize_user(&user_id).to_string(),
        ratings,
    })
}

async fn add_rating_handler(
    State(state): State<AppState>,
    ApiPath(user_id): ApiPath<String>,
    ApiJson(request): ApiJson<RateRequest>,
) -> Result<Json<RateResponse>, ApiError> {
    if state.recommender.movie(request.movie_id).is_none() {
        return Err(ApiError::NotFound(format!(
            "Movie {} not found",
            request.movie_id
        )));
    }

    let user_id = normalize_user(&user_id).to_string();
    let mut store = state.ratings.write().await;
    let mut updated = store.clone();
    let previous = updated.upsert(&user_id, request.movie_id, request.score)?;
    updated.save()?;
    *store = updated;
    info!(
        "User {} rated movie {} with {}",
        user_id, request.movie_id, request.score
    );

    Ok(Json(RateResponse {
        user_id,
        movie_id: request.movie_id,
        score: request.score,
        previous,
    }))
}

async fn remove_rating_handler(
    State(state): State<AppState>,
    ApiPath((user_id, movie_id)): ApiPath<(String, MovieId)>,
) -> Result<StatusCode, ApiError> {
    let user_id = normalize_user(&user_id);
    let mut store = state.ratings.write().await;
    let mut updated = store.clone();
    if !updated.remove(user_id, movie_id) {
        return Err(ApiError::NotFound(format!(
            "User {user_id} has no rating for movie {movie_id}"
        )));
    }
    updated.save()?;
    *store = updated;
    info!("Removed rating of movie {} by user {}", movie_id, user_id);
    Ok(StatusCode::NO_CONTENT)
}

async fn user_profile_handler(
    State(state): State<AppState>,
    ApiPath(user_id): ApiPath<String>,
) -> Json<UserProfile> {
    let store = state.ratings.read().await;
    Json(state.recommender.user_profile(&store, &user_id))
}

async fn hybrid_handler(
    State(state): State<AppState>,
    ApiPath(user_id): ApiPath<String>,
    ApiQuery(query): ApiQuery<HybridQuery>,
) -> Result<Json<HybridResponse>, ApiError> {
    let limit = LimitQuery { limit: query.limit }.resolve(10)?;
    let context = {
        let store = state.ratings.read().await;
        state.recommender.user_context(&store, &user_id)
    };

    let recommender = state.recommender.clone();
    let seed = query.seed_id;
    let recommendations =
        tokio::task::spawn_blocking(move || recommender.hybrid(&context, seed, limit))
            .await
            .map_err(|e| ApiError::Internal(format!("hybrid task failed: {e}")))??;

    Ok(Json(HybridResponse {
        user_id: normalize_user(&user_id).to_string(),
        seed_id: seed,
        collaborative_model: state.recommender.has_model(),
        recommendations,
    }))
}
