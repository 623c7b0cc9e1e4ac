use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use super::handlers;
use super::AppState;
use crate::middleware::{make_span_with_request_id, request_id_middleware};

/// Creates the application router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .nest("/api/v1", api_routes())
        .with_state(state)
        .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(CorsLayer::permissive())
}

/// API routes under /api/v1
fn api_routes() -> Router<AppState> {
    Router::new()
        // Discovery
        .route("/recommendations/next", post(handlers::next_recommendation))
        // Movies
        .route("/movies/:id", get(handlers::movie_details))
        .route("/movies/:id/availability", get(handlers::movie_availability))
        .route("/movies/:id/ratings", get(handlers::movie_ratings))
        .route("/movies/:id/interactions", post(handlers::record_interaction))
        // Catalog browsing
        .route("/regions/:region/providers", get(handlers::region_providers))
        .route("/search", get(handlers::search))
        .route("/lists/:kind", get(handlers::list))
        // History
        .route("/history", get(handlers::history_summary))
        .route("/history/shown/clear", post(handlers::clear_shown))
}
