use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde::{Deserialize, Serialize};

use crate::error::AppResult;
use crate::middleware::request_id::RequestId;
use crate::models::{AuthState, CategoryFilter, FilterState, PipelineState, Session, TimeRange};
use crate::services::SearchOutcome;

use super::AppState;

// Request/Response types

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub user: Option<Session>,
    pub is_loading: bool,
}

impl From<AuthState> for SessionResponse {
    fn from(state: AuthState) -> Self {
        Self {
            user: state.session,
            is_loading: state.is_loading,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SetCategoryRequest {
    pub category: CategoryFilter,
}

#[derive(Debug, Deserialize)]
pub struct SetTimeRangeRequest {
    pub time_range: TimeRange,
}

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    pub query: String,
}

#[derive(Debug, Serialize)]
pub struct SearchRunResponse {
    pub query: String,
    pub found: usize,
}

// Handlers

/// Health check endpoint
pub async fn health_check() -> StatusCode {
    StatusCode::OK
}

/// Get the current authentication state
pub async fn get_session(State(state): State<AppState>) -> Json<SessionResponse> {
    Json(SessionResponse::from(state.coordinator.auth_state()))
}

/// Begin a sign-in
///
/// Returns 202: the resulting session, if any, is observed via
/// `GET /session`, never in this response.
pub async fn login(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
) -> AppResult<StatusCode> {
    tracing::info!(request_id = %request_id, "Processing login request");
    state.coordinator.login().await?;
    Ok(StatusCode::ACCEPTED)
}

/// Sign out, discarding all pipeline state
pub async fn logout(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
) -> AppResult<StatusCode> {
    tracing::info!(request_id = %request_id, "Processing logout request");
    state.coordinator.logout().await?;
    Ok(StatusCode::ACCEPTED)
}

/// Get the current trending feed selection
pub async fn get_filters(State(state): State<AppState>) -> Json<FilterState> {
    Json(state.coordinator.filter_state().await)
}

/// Apply a category selection and reload the trending feed
pub async fn set_category(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Json(request): Json<SetCategoryRequest>,
) -> AppResult<Json<PipelineState>> {
    tracing::info!(
        request_id = %request_id,
        category = %request.category,
        "Processing category change"
    );

    let snapshot = state.coordinator.set_category(request.category).await?;
    Ok(Json(snapshot))
}

/// Apply a time range selection and reload the trending feed
pub async fn set_time_range(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Json(request): Json<SetTimeRangeRequest>,
) -> AppResult<Json<PipelineState>> {
    tracing::info!(
        request_id = %request_id,
        time_range = %request.time_range,
        "Processing time range change"
    );

    let snapshot = state.coordinator.set_time_range(request.time_range).await?;
    Ok(Json(snapshot))
}

/// Get the trending pipeline snapshot
pub async fn get_trending(State(state): State<AppState>) -> Json<PipelineState> {
    Json(state.coordinator.trending_snapshot().await)
}

/// Get the search pipeline snapshot
pub async fn get_search(State(state): State<AppState>) -> Json<PipelineState> {
    Json(state.coordinator.search_snapshot().await)
}

/// Run a search against the web search provider
///
/// 200 with the applied query and result count, or 204 when the command ran
/// to no effect (blank query, or superseded by a newer search).
pub async fn run_search(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Json(request): Json<SearchRequest>,
) -> AppResult<Response> {
    tracing::info!(
        request_id = %request_id,
        query = %request.query,
        "Processing search request"
    );

    match state.coordinator.run_search(&request.query).await? {
        SearchOutcome::Applied { query, found } => {
            tracing::info!(request_id = %request_id, found, "Search completed");
            Ok((StatusCode::OK, Json(SearchRunResponse { query, found })).into_response())
        }
        SearchOutcome::Skipped | SearchOutcome::Superseded => {
            Ok(StatusCode::NO_CONTENT.into_response())
        }
    }
}
