use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::middleware::request_id::{make_span_with_request_id, request_id_middleware};

use super::handlers;
use super::AppState;

/// Creates the main API router with all routes
///
/// Layer order matters: the request id middleware sits outside the trace
/// layer so every request span carries the correlation id.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        // Session
        .route("/session", get(handlers::get_session))
        .route("/auth/login", post(handlers::login))
        .route("/auth/logout", post(handlers::logout))
        // Trending feed
        .route("/filters", get(handlers::get_filters))
        .route("/filters/category", put(handlers::set_category))
        .route("/filters/time-range", put(handlers::set_time_range))
        .route("/trending", get(handlers::get_trending))
        // Search
        .route(
            "/search",
            get(handlers::get_search).post(handlers::run_search),
        )
        .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
