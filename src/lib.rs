// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod analytics;
pub mod api;
pub mod config;
pub mod feed;
pub mod filter;
pub mod item;
pub mod retrieval;
pub mod telemetry;

// ---- Re-exports for stable public API ----
pub use crate::analytics::{summarize, AnalyticsSummary};
pub use crate::api::{router, AppState};
pub use crate::config::FeedConfig;
pub use crate::feed::{FeedAggregator, FeedHandle, FeedState, FeedWindow, LoadOutcome};
pub use crate::filter::FilterContext;
pub use crate::item::{Credibility, Item, Sentiment};
pub use crate::retrieval::{
    ContentStore, HttpRetrieval, RetrievalError, RetrievalService, DEFAULT_PAGE_SIZE,
};

use std::sync::Arc;

use axum::Router;
use tracing::{info, warn};

/// Build the full in-process app from config: seeded store + query routes.
/// `/metrics` is merged in when a recorder handle is supplied.
pub fn app(config: FeedConfig, metrics: Option<&telemetry::Metrics>) -> anyhow::Result<Router> {
    let store = match config.seed_path.as_deref() {
        Some(path) => ContentStore::load_json(path)?,
        None => {
            warn!("no seed_path configured; starting with an empty content store");
            ContentStore::new()
        }
    };
    info!(
        items = store.len(),
        page_size = config.page_size,
        max_page_size = config.max_page_size,
        "content store ready"
    );

    let state = AppState::new(Arc::new(store), config);
    let mut router = api::router(state);
    if let Some(m) = metrics {
        router = router.merge(m.router());
    }
    Ok(router)
}

/// Feed reading from the configured remote query endpoint, starting unfiltered
/// at page 1. `Ok(None)` when no `upstream_url` is set.
pub fn upstream_feed(config: &FeedConfig) -> anyhow::Result<Option<FeedHandle>> {
    if config.upstream_url.is_none() {
        return Ok(None);
    }
    let client = HttpRetrieval::from_config(config)?;
    Ok(Some(FeedHandle::new(
        Arc::new(client),
        FilterContext::all(),
        config.page_size,
    )))
}
