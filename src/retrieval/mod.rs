// src/retrieval/mod.rs
//! Retrieval service: filtered, offset-paginated reads ordered by recency.
//!
//! Every call is self-contained. Implementations either return a complete
//! page (at most `page_size` items, `created_at` desc then `id` desc) or a
//! [`RetrievalError`]; they never hand back a partial page.
//!
//! Pages are computed against the store as it is at call time. Items
//! appended after page 1 of a session was read can shift later page
//! boundaries by up to one page width; consumers deduplicate by id and
//! otherwise accept that drift.

pub mod http;
pub mod store;

use std::time::Instant;

use async_trait::async_trait;
use metrics::{counter, describe_counter, describe_histogram, histogram};
use once_cell::sync::OnceCell;
use thiserror::Error;

use crate::filter::FilterContext;
use crate::item::Item;

pub use http::HttpRetrieval;
pub use store::ContentStore;

/// Page size used by the feed and the initial render.
pub const DEFAULT_PAGE_SIZE: u32 = 50;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RetrievalError {
    #[error("page must be a positive integer")]
    InvalidPage,

    #[error("page size must be between 1 and the endpoint maximum")]
    InvalidPageSize,

    #[error("page offset out of range")]
    OffsetOverflow,

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("query rejected (status {status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("malformed page: {0}")]
    Decode(String),
}

impl RetrievalError {
    /// True when the caller sent bad pagination arguments (as opposed to a store failure).
    pub fn is_bad_request(&self) -> bool {
        matches!(
            self,
            RetrievalError::InvalidPage
                | RetrievalError::InvalidPageSize
                | RetrievalError::OffsetOverflow
        )
    }
}

/// Validated pagination arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub page_size: u32,
}

impl PageRequest {
    pub fn new(page: u32, page_size: u32) -> Result<Self, RetrievalError> {
        if page == 0 {
            return Err(RetrievalError::InvalidPage);
        }
        if page_size == 0 {
            return Err(RetrievalError::InvalidPageSize);
        }
        Ok(Self { page, page_size })
    }

    /// `(page - 1) * page_size`, rejecting offsets that do not fit.
    pub fn offset(&self) -> Result<usize, RetrievalError> {
        (self.page as usize - 1)
            .checked_mul(self.page_size as usize)
            .ok_or(RetrievalError::OffsetOverflow)
    }
}

#[async_trait]
pub trait RetrievalService: Send + Sync {
    async fn fetch(
        &self,
        ctx: &FilterContext,
        page: u32,
        page_size: u32,
    ) -> Result<Vec<Item>, RetrievalError>;

    fn name(&self) -> &'static str;
}

/// One-time metrics registration (so series show up on /metrics).
pub(crate) fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("retrieval_queries_total", "Page queries served.");
        describe_counter!(
            "retrieval_errors_total",
            "Page queries that ended in a RetrievalError."
        );
        describe_histogram!("retrieval_query_ms", "Page query time in milliseconds.");
    });
}

/// Short anonymized id for a query string. Raw search text is never logged.
pub(crate) fn query_fingerprint(query: &str) -> String {
    use sha2::{Digest, Sha256};
    if query.is_empty() {
        return "-".to_string();
    }
    let digest = Sha256::digest(query.as_bytes());
    let mut out = String::with_capacity(12);
    for b in digest.iter().take(6) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

/// Shared telemetry for both backends.
pub(crate) fn record_query(
    backend: &'static str,
    ctx: &FilterContext,
    page: u32,
    started: Instant,
    outcome: &Result<Vec<Item>, RetrievalError>,
) {
    ensure_metrics_described();
    let ms = started.elapsed().as_secs_f64() * 1_000.0;
    histogram!("retrieval_query_ms").record(ms);
    counter!("retrieval_queries_total").increment(1);

    let q = query_fingerprint(ctx.query());
    match outcome {
        Ok(items) => tracing::debug!(
            target: "retrieval",
            backend, page, q = %q, category = ctx.category(),
            filtered = !ctx.is_unfiltered(), returned = items.len(),
            "page served"
        ),
        Err(e) => {
            counter!("retrieval_errors_total").increment(1);
            tracing::warn!(
                target: "retrieval",
                backend, page, q = %q, category = ctx.category(), error = %e,
                "page query failed"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offset_follows_page_arithmetic() {
        assert_eq!(PageRequest::new(1, 50).unwrap().offset(), Ok(0));
        assert_eq!(PageRequest::new(3, 50).unwrap().offset(), Ok(100));
    }

    #[test]
    fn zero_arguments_are_rejected() {
        assert_eq!(PageRequest::new(0, 50), Err(RetrievalError::InvalidPage));
        assert_eq!(PageRequest::new(1, 0), Err(RetrievalError::InvalidPageSize));
        assert!(RetrievalError::InvalidPage.is_bad_request());
        assert!(!RetrievalError::Unavailable("down".into()).is_bad_request());
    }

    #[test]
    fn fingerprint_hides_query_text() {
        let id = query_fingerprint("climate");
        assert_eq!(id.len(), 12);
        assert!(!id.contains("climate"));
        assert_eq!(query_fingerprint(""), "-");
    }
}
