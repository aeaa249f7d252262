use axum::{
    extract::{Query, State},
    http::{header, HeaderValue, Method},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use sitesearch_core::{Document, SearchEngine};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

#[derive(Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: String,
    /// Kept as text so a malformed value means "no limit" instead of a rejection.
    pub limit: Option<String>,
}

impl SearchParams {
    fn limit(&self) -> Option<usize> {
        self.limit.as_deref()?.trim().parse().ok().filter(|n| *n > 0)
    }
}

/// Router answering `GET /?q=..&limit=..` from `engine`.
///
/// `cors_allow_origin` is a comma separated origin list; `None` or an empty
/// list allows any origin.
pub fn build_app(engine: Arc<SearchEngine>, cors_allow_origin: Option<&str>) -> Router {
    let origins: Vec<HeaderValue> = cors_allow_origin
        .unwrap_or_default()
        .split(',')
        .filter_map(|s| s.trim().parse().ok())
        .collect();
    let allow_origin = if origins.is_empty() { AllowOrigin::from(Any) } else { AllowOrigin::list(origins) };
    let cors = CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/", get(search_handler))
        .route("/health", get(|| async { "ok" }))
        .with_state(engine)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

pub async fn search_handler(
    State(engine): State<Arc<SearchEngine>>,
    Query(params): Query<SearchParams>,
) -> Json<Vec<Document>> {
    let start = std::time::Instant::now();
    let mut results = engine.search(&params.q);
    if let Some(limit) = params.limit() {
        results.truncate(limit);
    }
    tracing::info!(
        query = %params.q,
        took_s = start.elapsed().as_secs_f64(),
        hits = results.len(),
        "processed query"
    );
    Json(results)
}
