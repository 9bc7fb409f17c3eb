use axum::{
    extract::{Path, Query, State},
    http::{Method, StatusCode},
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use aggregator::{StatusService, DEFAULT_CACHE_TTL};
use common::models::{ApiResponse, Platform};

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<StatusService>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CacheParams {
    cache: Option<String>,
}

impl CacheParams {
    /// `?cache=N` in seconds; anything unparseable or negative means 60s.
    pub fn ttl(&self) -> Duration {
        self.cache
            .as_deref()
            .and_then(|raw| raw.trim().parse::<i64>().ok())
            .filter(|secs| *secs >= 0)
            .map_or(DEFAULT_CACHE_TTL, |secs| Duration::from_secs(secs as u64))
    }
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/api/streams", get(list_streams))
        .route("/api/streams/:platform", get(list_platform_streams))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn list_streams(State(state): State<AppState>, Query(params): Query<CacheParams>) -> Json<ApiResponse> {
    let statuses = state.service.all_statuses(params.ttl()).await;
    Json(ApiResponse::success(statuses))
}

async fn list_platform_streams(
    State(state): State<AppState>,
    Path(platform): Path<String>,
    Query(params): Query<CacheParams>,
) -> impl IntoResponse {
    let platform = Platform::from(platform);
    if !platform.is_valid() {
        return (StatusCode::BAD_REQUEST, Json(ApiResponse::error("invalid platform")));
    }

    let statuses = state.service.statuses_for_platform(&platform, params.ttl()).await;
    (StatusCode::OK, Json(ApiResponse::success(statuses)))
}
