use anyhow::Result;
use axum::{extract::{Query, State}, http::StatusCode, routing::get, Json, Router};
use parking_lot::Mutex;
use ranker_core::engine::{QueryConfig, QueryEngine};
use ranker_core::persist::IndexPaths;
use ranker_core::topk::DEFAULT_K;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Largest `k` a single request may ask for.
pub const MAX_K: usize = 100;

#[derive(Deserialize)]
pub struct SearchParams {
    pub q: String,
    #[serde(default = "default_k")]
    pub k: usize,
}
fn default_k() -> usize { DEFAULT_K }

#[derive(Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub took_s: f64,
    pub results: Vec<SearchHit>,
}

#[derive(Serialize)]
pub struct SearchHit {
    pub doc_id: u32,
    pub score: f64,
}

/// The postings handle has a single cursor, so requests take turns on it.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<Mutex<QueryEngine<File>>>,
}

pub fn build_app(paths: &IndexPaths, timing: bool) -> Result<Router> {
    let engine = QueryEngine::open(paths, QueryConfig { top_k: DEFAULT_K, timing })?;
    tracing::info!(terms = engine.meta().dictionary.len(), documents = engine.meta().lengths.len(), "index loaded");
    let app_state = AppState { engine: Arc::new(Mutex::new(engine)) };

    // CORS: read CORS_ALLOW_ORIGIN (comma-separated) or allow Any by default
    let cors = match std::env::var("CORS_ALLOW_ORIGIN") {
        Ok(val) => {
            let origins: Vec<_> = val
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect();
            if origins.is_empty() {
                CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
            } else {
                CorsLayer::new().allow_origin(AllowOrigin::list(origins)).allow_methods(Any).allow_headers(Any)
            }
        }
        Err(_) => CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any),
    };

    let app = Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/search", get(search_handler))
        .with_state(app_state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());
    Ok(app)
}

pub async fn search_handler(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>, (StatusCode, String)> {
    let start = std::time::Instant::now();
    let k = params.k.clamp(1, MAX_K);
    let engine = Arc::clone(&state.engine);
    let query = params.q.clone();
    // postings reads are blocking file I/O
    let ranked = tokio::task::spawn_blocking(move || {
        let mut guard = engine.lock();
        guard.search_k(&query, k)
    })
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?
        .map_err(|e| {
            tracing::warn!(query = %params.q, error = %e, "search failed");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        })?;

    let results = ranked.into_iter().map(|d| SearchHit { doc_id: d.doc_id, score: d.score }).collect();
    let elapsed = start.elapsed();
    Ok(Json(SearchResponse { query: params.q, took_s: elapsed.as_secs_f64(), results }))
}
