// tests/api_http.rs
//
// HTTP-level tests for the public API Router without opening sockets.
// We exercise the router directly via tower::ServiceExt::oneshot.
//
// Covered:
// - GET /health, GET /, GET /api/v1/health
// - GET /api/articles (filters, pagination, limit bounds, error payloads)
// - GET /api/summary

use std::sync::Arc;

use axum::{
    body::{self, Body},
    http::{Request, StatusCode},
    Router,
};
use chrono::{DateTime, Duration, Utc};
use serde_json::Value as Json;
use tower::ServiceExt as _; // for `oneshot`

use ai_news_feed::{api, AppState, ContentStore, FeedConfig, Item, Sentiment};

const BODY_LIMIT: usize = 1024 * 1024; // 1MB, safe for tests

fn base() -> DateTime<Utc> {
    "2025-04-01T00:00:00Z".parse().unwrap()
}

/// 120 items, newest first by id number; every third is tech, titles alternate.
fn seeded_store() -> Arc<ContentStore> {
    let items = (0..120).map(|i| {
        let cat = if i % 3 == 0 { "Tech" } else { "politics" };
        let title = if i % 2 == 0 {
            format!("Climate talks round {i}")
        } else {
            format!("Budget vote {i}")
        };
        Item::new(format!("{i:04}"), title, base() + Duration::minutes(i))
            .with_category(cat)
            .with_summary("wire copy")
            .with_sentiment(if i % 5 == 0 {
                Sentiment::Negative
            } else {
                Sentiment::Positive
            })
            .with_credibility(if i % 4 == 0 { 0.3 } else { 0.8 }, false)
    });
    Arc::new(ContentStore::with_items(items))
}

fn test_router(store: Arc<ContentStore>) -> Router {
    api::router(AppState::new(store, FeedConfig::default()))
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Vec<u8>) {
    let req = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .expect("build GET");
    let resp = app.clone().oneshot(req).await.expect("oneshot");
    let status = resp.status();
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body")
        .to_vec();
    (status, bytes)
}

async fn get_json(app: &Router, uri: &str) -> (StatusCode, Json) {
    let (status, bytes) = get(app, uri).await;
    let v = serde_json::from_slice(&bytes).expect("json body");
    (status, v)
}

fn ids(v: &Json) -> Vec<String> {
    v["articles"]
        .as_array()
        .expect("articles array")
        .iter()
        .map(|a| a["id"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn health_routes_answer() {
    let app = test_router(seeded_store());

    let (status, body) = get(&app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(String::from_utf8(body).unwrap().trim(), "ok");

    let (status, v) = get_json(&app, "/api/v1/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["status"], "healthy");

    let (_, v) = get_json(&app, "/").await;
    assert_eq!(v["status"], "ok");
}

#[tokio::test]
async fn default_page_is_fifty_newest() {
    let app = test_router(seeded_store());
    let (status, v) = get_json(&app, "/api/articles").await;
    assert_eq!(status, StatusCode::OK);
    let got = ids(&v);
    assert_eq!(got.len(), 50);
    assert_eq!(got.first().map(String::as_str), Some("0119"));
    assert_eq!(got.last().map(String::as_str), Some("0070"));
}

#[tokio::test]
async fn pages_tile_without_gaps_or_overlap() {
    let app = test_router(seeded_store());
    let mut all = Vec::new();
    for page in 1..=3 {
        let (_, v) = get_json(&app, &format!("/api/articles?page={page}&limit=50")).await;
        all.extend(ids(&v));
    }
    assert_eq!(all.len(), 120);
    let expected: Vec<String> = (0..120).rev().map(|i| format!("{i:04}")).collect();
    assert_eq!(all, expected);

    let (_, v) = get_json(&app, "/api/articles?page=4&limit=50").await;
    assert!(ids(&v).is_empty());
}

#[tokio::test]
async fn query_and_category_filters_are_anded_and_normalized() {
    let app = test_router(seeded_store());
    let (status, v) =
        get_json(&app, "/api/articles?q=%20%20CLIMATE%20%20&category=Tech&limit=100").await;
    assert_eq!(status, StatusCode::OK);
    let got = ids(&v);
    // even AND multiple of three -> multiple of six
    assert_eq!(got.len(), 20);
    for a in v["articles"].as_array().unwrap() {
        assert_eq!(a["category"], "tech");
        assert!(a["title"].as_str().unwrap().contains("Climate"));
    }

    let (_, everything) = get_json(&app, "/api/articles?category=All&limit=100").await;
    assert_eq!(ids(&everything).len(), 100);
}

#[tokio::test]
async fn query_matches_summary_when_title_does_not() {
    let store = seeded_store();
    store.insert(
        Item::new("glacier", "Regional roundup", base() - Duration::days(1))
            .with_summary("Scientists track a retreating GLACIER in the Alps"),
    );
    let app = test_router(store);

    let (status, v) = get_json(&app, "/api/articles?q=Glacier").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ids(&v), vec!["glacier".to_string()]);
    assert_eq!(
        v["articles"][0]["content_summary"],
        "Scientists track a retreating GLACIER in the Alps"
    );

    // needle in neither title nor summary
    let (status, v) = get_json(&app, "/api/articles?q=moraine").await;
    assert_eq!(status, StatusCode::OK);
    assert!(ids(&v).is_empty());
}

#[tokio::test]
async fn limit_above_max_is_rejected_so_pages_keep_their_offsets() {
    let app = test_router(seeded_store());
    for uri in ["/api/articles?limit=101", "/api/articles?page=2&limit=150"] {
        let (status, v) = get_json(&app, uri).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert!(v.get("articles").is_none(), "{uri}");
        assert!(v["error"].as_str().unwrap().contains("page size"), "{uri}");
    }

    // at the max, page 2 starts exactly at offset 100
    let (status, v) = get_json(&app, "/api/articles?page=2&limit=100").await;
    assert_eq!(status, StatusCode::OK);
    let got = ids(&v);
    assert_eq!(got.len(), 20);
    assert_eq!(got[0], "0019");
}

#[tokio::test]
async fn malformed_pagination_is_a_bad_request() {
    let app = test_router(seeded_store());
    for uri in [
        "/api/articles?page=0",
        "/api/articles?page=abc",
        "/api/articles?page=-2",
        "/api/articles?limit=0",
    ] {
        let (status, v) = get_json(&app, uri).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert!(v["error"].is_string(), "{uri} must carry an error message");
    }
}

#[tokio::test]
async fn store_outage_is_a_server_error_payload() {
    let store = seeded_store();
    store.set_offline(true);
    let app = test_router(store);
    let (status, v) = get_json(&app, "/api/articles").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(v.get("articles").is_none(), "no partial page on failure");
    assert!(v["error"].as_str().unwrap().contains("unavailable"));
}

#[tokio::test]
async fn summary_covers_first_page_of_context() {
    let app = test_router(seeded_store());
    let (status, v) = get_json(&app, "/api/summary?category=TECH").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["category"], "tech");
    assert_eq!(v["total"], 40);
    let s = &v["sentiment"];
    let sum = s["positive"].as_u64().unwrap()
        + s["neutral"].as_u64().unwrap()
        + s["negative"].as_u64().unwrap();
    assert_eq!(sum, 40);
    let c = &v["credibility"];
    assert_eq!(
        c["verified"].as_u64().unwrap() + c["suspicious"].as_u64().unwrap(),
        40
    );
    // every twelfth item is tech with credibility 0.3
    assert_eq!(c["suspicious"], 10);
    assert_eq!(v["verified_ratio"], 0.75);
}
