// src/retrieval/http.rs
//! Client for the query endpoint (`GET /api/articles`).

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Url;
use serde::Deserialize;

use anyhow::Context;

use super::{record_query, PageRequest, RetrievalError, RetrievalService};
use crate::config::FeedConfig;
use crate::filter::FilterContext;
use crate::item::Item;

const ARTICLES_PATH: &str = "api/articles";

pub struct HttpRetrieval {
    endpoint: Url,
    client: reqwest::Client,
    max_page_size: Option<u32>,
}

#[derive(Deserialize)]
struct ArticlesBody {
    articles: Vec<Item>,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

impl HttpRetrieval {
    /// `base_url` is the service root, e.g. `http://127.0.0.1:8000/`.
    pub fn new(base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let mut base = Url::parse(base_url)?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let endpoint = base.join(ARTICLES_PATH)?;
        let client = reqwest::Client::builder()
            .user_agent("ai-news-feed/0.1")
            .connect_timeout(Duration::from_secs(4))
            .timeout(timeout)
            .build()?;
        Ok(Self {
            endpoint,
            client,
            max_page_size: None,
        })
    }

    /// Client for `config.upstream_url`, with the configured timeout. Page
    /// sizes above `max_page_size` are refused before any request is sent,
    /// since the endpoint would reject them anyway.
    pub fn from_config(config: &FeedConfig) -> anyhow::Result<Self> {
        let base = config
            .upstream_url
            .as_deref()
            .context("upstream_url is not configured")?;
        let client = Self::new(base, config.request_timeout())
            .with_context(|| format!("building query client for {base}"))?
            .with_max_page_size(config.max_page_size);
        tracing::info!(
            target: "retrieval",
            endpoint = %client.endpoint,
            timeout_ms = config.request_timeout_ms,
            "query client ready"
        );
        Ok(client)
    }

    pub fn with_max_page_size(mut self, max: u32) -> Self {
        self.max_page_size = Some(max);
        self
    }

    /// Query URL for one page; `q`/`category` only when they filter.
    pub fn page_url(&self, ctx: &FilterContext, req: PageRequest) -> Url {
        let mut url = self.endpoint.clone();
        {
            let mut qp = url.query_pairs_mut();
            qp.append_pair("page", &req.page.to_string());
            qp.append_pair("limit", &req.page_size.to_string());
            for (k, v) in ctx.to_query_pairs() {
                qp.append_pair(k, &v);
            }
        }
        url
    }

    async fn fetch_page(
        &self,
        ctx: &FilterContext,
        req: PageRequest,
    ) -> Result<Vec<Item>, RetrievalError> {
        let url = self.page_url(ctx, req);
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| RetrievalError::Unavailable(e.to_string()))?;
        let status = resp.status();
        let body = resp
            .bytes()
            .await
            .map_err(|e| RetrievalError::Unavailable(e.to_string()))?;

        if !status.is_success() {
            let message = serde_json::from_slice::<ErrorBody>(&body)
                .map(|b| b.error)
                .unwrap_or_else(|_| String::from_utf8_lossy(&body).trim().to_string());
            return Err(RetrievalError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: ArticlesBody =
            serde_json::from_slice(&body).map_err(|e| RetrievalError::Decode(e.to_string()))?;
        if parsed.articles.len() > req.page_size as usize {
            return Err(RetrievalError::Decode(format!(
                "page holds {} items, limit was {}",
                parsed.articles.len(),
                req.page_size
            )));
        }
        Ok(parsed.articles)
    }
}

#[async_trait]
impl RetrievalService for HttpRetrieval {
    async fn fetch(
        &self,
        ctx: &FilterContext,
        page: u32,
        page_size: u32,
    ) -> Result<Vec<Item>, RetrievalError> {
        let started = Instant::now();
        let out = match PageRequest::new(page, page_size) {
            Ok(req) if self.max_page_size.is_some_and(|max| req.page_size > max) => {
                Err(RetrievalError::InvalidPageSize)
            }
            Ok(req) => self.fetch_page(ctx, req).await,
            Err(e) => Err(e),
        };
        record_query(self.name(), ctx, page, started, &out);
        out
    }

    fn name(&self) -> &'static str {
        "http"
    }
}
