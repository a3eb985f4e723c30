// tests/app_boot.rs
//
// Boot the app the way the binary does, from config/feed.toml and the
// bundled seed file.

use std::path::Path;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
};
use serde_json::Value;
use tower::ServiceExt;

use ai_news_feed::FeedConfig;

#[tokio::test]
async fn seeded_app_serves_newest_first_with_defaults_applied() {
    let cfg = FeedConfig::load_from(Path::new("config/feed.toml")).expect("load feed config");
    assert_eq!(cfg.page_size, 50);
    let app = ai_news_feed::app(cfg, None).expect("build app");

    let resp = app
        .clone()
        .oneshot(Request::get("/api/articles").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let v: Value = serde_json::from_slice(&bytes).unwrap();
    let arts = v["articles"].as_array().unwrap();
    assert_eq!(arts.len(), 5);
    assert_eq!(arts[0]["id"], "a1f3c2e0-0005");
    assert_eq!(arts[0]["sentiment"], "neutral");
    assert_eq!(arts[0]["credibility_score"], 0.5);
    assert_eq!(arts[0]["is_fake"], false);

    let resp = app
        .oneshot(
            Request::get("/api/summary")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let s: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(s["total"], 5);
    assert_eq!(s["credibility"]["suspicious"], 2);
    assert_eq!(s["credibility"]["verified"], 3);
    assert_eq!(s["sentiment"]["positive"], 2);
    assert_eq!(s["sentiment"]["negative"], 1);
    assert_eq!(s["sentiment"]["neutral"], 2);
}

#[test]
fn missing_seed_file_is_a_boot_error() {
    let cfg = FeedConfig {
        seed_path: Some("data/does-not-exist.json".into()),
        ..FeedConfig::default()
    };
    let err = ai_news_feed::app(cfg, None).unwrap_err();
    assert!(format!("{err:#}").contains("does-not-exist"));
}
