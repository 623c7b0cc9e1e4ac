use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::{
    error::{AppError, AppResult},
    models::{
        ExternalRatings, FilterCriteria, InteractionKind, ListKind, MovieDetails, MovieId,
        MoviePage, Provider, WatchProviders,
    },
    services::{history::HistorySummary, DiscoveryMode, Recommendation},
};

use super::AppState;

/// Highest page number the catalog serves
const MAX_PAGE: u32 = 500;

// Request/Response types

#[derive(Debug, Deserialize)]
pub struct NextRecommendationRequest {
    #[serde(default)]
    pub criteria: FilterCriteria,
    #[serde(default)]
    pub mode: DiscoveryMode,
    /// Clear the shown set and retry once when nothing unseen is left
    #[serde(default)]
    pub recycle_history: bool,
}

#[derive(Debug, Deserialize)]
pub struct InteractionRequest {
    pub kind: InteractionKind,
}

#[derive(Debug, Deserialize)]
pub struct RegionQuery {
    pub region: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: String,
    pub page: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub region: Option<String>,
    pub page: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct AvailabilityResponse {
    pub movie_id: MovieId,
    pub region: String,
    pub providers: WatchProviders,
}

#[derive(Debug, Serialize)]
pub struct ClearShownResponse {
    pub cleared: u64,
}

fn page_param(page: Option<u32>) -> AppResult<u32> {
    match page.unwrap_or(1) {
        page @ 1..=MAX_PAGE => Ok(page),
        page => Err(AppError::InvalidInput(format!(
            "Page must be between 1 and {}, got {}",
            MAX_PAGE, page
        ))),
    }
}

fn movie_id_param(movie_id: MovieId) -> AppResult<MovieId> {
    if movie_id <= 0 {
        return Err(AppError::InvalidInput(format!(
            "Invalid movie id: {}",
            movie_id
        )));
    }
    Ok(movie_id)
}

// Handlers

pub async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}

/// Next unseen movie for the given criteria and mode
///
/// Recycling the shown set is opt-in per request: the engine itself never
/// clears history.
pub async fn next_recommendation(
    State(state): State<AppState>,
    Json(request): Json<NextRecommendationRequest>,
) -> AppResult<Json<Recommendation>> {
    let result = state
        .engine
        .next_recommendation(&request.criteria, request.mode)
        .await;

    let recommendation = match result {
        Err(e) if e.is_no_candidates() && request.recycle_history => {
            let cleared = state.history.clear_shown().await?;
            tracing::info!(cleared, "Shown history recycled, retrying discovery");
            state
                .engine
                .next_recommendation(&request.criteria, request.mode)
                .await?
        }
        other => other?,
    };

    Ok(Json(recommendation))
}

pub async fn record_interaction(
    State(state): State<AppState>,
    Path(movie_id): Path<MovieId>,
    Json(request): Json<InteractionRequest>,
) -> AppResult<StatusCode> {
    let movie_id = movie_id_param(movie_id)?;
    state.history.mark(request.kind, movie_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn movie_details(
    State(state): State<AppState>,
    Path(movie_id): Path<MovieId>,
) -> AppResult<Json<MovieDetails>> {
    let movie_id = movie_id_param(movie_id)?;
    let details = state.catalog.movie_details(movie_id).await?;
    Ok(Json(details))
}

pub async fn movie_availability(
    State(state): State<AppState>,
    Path(movie_id): Path<MovieId>,
    Query(params): Query<RegionQuery>,
) -> AppResult<Json<AvailabilityResponse>> {
    let movie_id = movie_id_param(movie_id)?;
    let region = state.region_or_default(params.region.as_deref())?;
    let providers = state.availability.resolve_movie(movie_id, &region).await?;

    Ok(Json(AvailabilityResponse {
        movie_id,
        region: region.to_string(),
        providers,
    }))
}

/// IMDb and Rotten Tomatoes scores; empty when ratings are unavailable for the movie
pub async fn movie_ratings(
    State(state): State<AppState>,
    Path(movie_id): Path<MovieId>,
) -> AppResult<Json<ExternalRatings>> {
    let movie_id = movie_id_param(movie_id)?;

    let Some(ratings) = state.ratings.as_ref() else {
        tracing::debug!(movie_id, "Ratings service not configured");
        return Ok(Json(ExternalRatings::default()));
    };

    let details = state.catalog.movie_details(movie_id).await?;
    let Some(imdb_id) = details.imdb_id.filter(|id| !id.is_empty()) else {
        return Ok(Json(ExternalRatings::default()));
    };

    match ratings.ratings(&imdb_id).await {
        Ok(found) => Ok(Json(found)),
        Err(AppError::NotFound(message)) => {
            tracing::debug!(movie_id, imdb_id = %imdb_id, message = %message, "No ratings found");
            Ok(Json(ExternalRatings::default()))
        }
        Err(e) => Err(e),
    }
}

pub async fn region_providers(
    State(state): State<AppState>,
    Path(region): Path<String>,
) -> AppResult<Json<Vec<Provider>>> {
    let region = state.region_or_default(Some(&region))?;
    let providers = state.availability.resolve_region_catalog(&region).await?;
    Ok(Json(providers))
}

pub async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchQuery>,
) -> AppResult<Json<MoviePage>> {
    let page = page_param(params.page)?;
    let results = state.catalog.search(&params.q, page).await?;
    Ok(Json(results))
}

pub async fn list(
    State(state): State<AppState>,
    Path(kind): Path<ListKind>,
    Query(params): Query<ListQuery>,
) -> AppResult<Json<MoviePage>> {
    let page = page_param(params.page)?;
    let region = state.region_or_default(params.region.as_deref())?;
    let results = state.catalog.list(kind, &region, page).await?;
    Ok(Json(results))
}

pub async fn history_summary(State(state): State<AppState>) -> AppResult<Json<HistorySummary>> {
    Ok(Json(state.history.summary().await?))
}

pub async fn clear_shown(State(state): State<AppState>) -> AppResult<Json<ClearShownResponse>> {
    let cleared = state.history.clear_shown().await?;
    Ok(Json(ClearShownResponse { cleared }))
}
