use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;
use tower_http::cors::CorsLayer;

use crate::analytics::{summarize, AnalyticsSummary};
use crate::config::FeedConfig;
use crate::filter::FilterContext;
use crate::item::Item;
use crate::retrieval::{ContentStore, RetrievalError, RetrievalService};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<ContentStore>,
    pub config: Arc<FeedConfig>,
}

impl AppState {
    pub fn new(store: Arc<ContentStore>, config: FeedConfig) -> Self {
        Self {
            store,
            config: Arc::new(config),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(|| async { "ok" }))
        .route("/api/v1/health", get(health_v1))
        .route("/api/articles", get(list_articles))
        .route("/api/summary", get(summary))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

/// Raw query parameters. Kept as strings so bad numbers produce our own
/// JSON error instead of the extractor's plain-text rejection.
#[derive(Debug, Default, serde::Deserialize)]
struct ArticlesParams {
    page: Option<String>,
    limit: Option<String>,
    q: Option<String>,
    category: Option<String>,
}

#[derive(serde::Serialize)]
struct ArticlesResp {
    articles: Vec<Item>,
}

#[derive(serde::Serialize)]
struct SummaryResp {
    #[serde(flatten)]
    summary: AnalyticsSummary,
    verified_ratio: f64,
    q: String,
    category: String,
}

struct ApiError(RetrievalError);

impl From<RetrievalError> for ApiError {
    fn from(e: RetrievalError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            e if e.is_bad_request() => StatusCode::BAD_REQUEST,
            RetrievalError::Rejected { .. } => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

fn parse_positive(raw: Option<&str>, err: RetrievalError) -> Result<Option<u32>, RetrievalError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(s) => s.parse::<u32>().map(Some).map_err(|_| err),
    }
}

async fn root() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok", "message": "AI News Aggregator API is running" }))
}

async fn health_v1() -> Json<serde_json::Value> {
    Json(json!({ "status": "healthy" }))
}

async fn list_articles(
    State(state): State<AppState>,
    Query(p): Query<ArticlesParams>,
) -> Result<Json<ArticlesResp>, ApiError> {
    let page = parse_positive(p.page.as_deref(), RetrievalError::InvalidPage)?.unwrap_or(1);
    let requested = parse_positive(p.limit.as_deref(), RetrievalError::InvalidPageSize)?;
    let limit = state
        .config
        .effective_limit(requested)
        .ok_or(RetrievalError::InvalidPageSize)?;
    let ctx = FilterContext::from_params(p.q.as_deref(), p.category.as_deref());

    let articles = state.store.fetch(&ctx, page, limit).await?;
    Ok(Json(ArticlesResp { articles }))
}

/// Summary of page 1 for a context, matching what the first screen shows.
async fn summary(
    State(state): State<AppState>,
    Query(p): Query<ArticlesParams>,
) -> Result<Json<SummaryResp>, ApiError> {
    let ctx = FilterContext::from_params(p.q.as_deref(), p.category.as_deref());
    let first = state.store.fetch(&ctx, 1, state.config.page_size).await?;
    let summary = summarize(&first);
    Ok(Json(SummaryResp {
        verified_ratio: summary.verified_ratio(),
        summary,
        q: ctx.query().to_string(),
        category: ctx.category().to_string(),
    }))
}
