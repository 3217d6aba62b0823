use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::core::error::SearchError;
use crate::core::types::{CseResponse, ErrorResponse, RankingMode, SearchMode, SearchRequest, SearchResponse};
use crate::AppState;

type ApiError = (StatusCode, Json<ErrorResponse>);

/// HTTP surface: health checks, ranked search and raw provider hits.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(health_check))
        .route("/health", get(health_check))
        .route("/api/ping", get(ping))
        .route("/api/search", get(search_handler))
        .route("/api/cse", get(cse_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn error_response(err: SearchError) -> ApiError {
    let status = match &err {
        SearchError::Configuration(_) => StatusCode::PRECONDITION_FAILED,
        SearchError::InvalidQuery(_) => StatusCode::BAD_REQUEST,
        SearchError::Provider(_) => StatusCode::BAD_GATEWAY,
    };
    warn!("search failed ({}): {}", err.kind(), err);
    (
        status,
        Json(ErrorResponse {
            error: err.to_string(),
            kind: err.kind().to_string(),
        }),
    )
}

fn bad_request(message: String) -> ApiError {
    error_response(SearchError::InvalidQuery(message))
}

async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "siterank",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

async fn ping() -> &'static str {
    "pong"
}

async fn search_handler(
    State(state): State<Arc<AppState>>,
    Query(request): Query<SearchRequest>,
) -> Result<Json<SearchResponse>, ApiError> {
    let mode = request
        .mode
        .as_deref()
        .unwrap_or_default()
        .parse::<SearchMode>()
        .map_err(bad_request)?;

    let mut pipeline = state.pipeline();
    if let Some(ranking) = request.ranking.as_deref().filter(|r| !r.trim().is_empty()) {
        let ranking = ranking.parse::<RankingMode>().map_err(bad_request)?;
        pipeline = pipeline.with_ranking_mode(ranking);
    }

    pipeline
        .execute(&request.q, mode)
        .await
        .map(Json)
        .map_err(error_response)
}

async fn cse_handler(
    State(state): State<Arc<AppState>>,
    Query(request): Query<SearchRequest>,
) -> Result<Json<CseResponse>, ApiError> {
    let query = request.q.trim();
    if query.is_empty() {
        return Err(bad_request("query has no keywords".to_string()));
    }

    let limit = state.config.iterative.resolve().final_results;
    let hits = state
        .provider
        .query(query, limit)
        .await
        .map_err(|e| error_response(e.into()))?;

    Ok(Json(CseResponse {
        query: query.to_string(),
        count: hits.len(),
        hits,
    }))
}
