// src/config/feed.rs
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::retrieval::DEFAULT_PAGE_SIZE;

pub const ENV_FEED_CONFIG_PATH: &str = "FEED_CONFIG_PATH";
pub const DEFAULT_MAX_PAGE_SIZE: u32 = 100;

fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}
fn default_max_page_size() -> u32 {
    DEFAULT_MAX_PAGE_SIZE
}
fn default_request_timeout_ms() -> u64 {
    10_000
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedConfig {
    /// Page size used by the feed and the initial render.
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    /// Largest `limit` the query endpoint honors; larger requests are refused.
    #[serde(default = "default_max_page_size")]
    pub max_page_size: u32,
    /// JSON file the content store is seeded from at boot.
    #[serde(default)]
    pub seed_path: Option<PathBuf>,
    /// Root URL of a remote query endpoint. When set, feeds read through
    /// [`crate::HttpRetrieval`] instead of the local store.
    #[serde(default)]
    pub upstream_url: Option<String>,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            max_page_size: default_max_page_size(),
            seed_path: None,
            upstream_url: None,
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

impl FeedConfig {
    /// Load from an explicit path. Supports TOML or JSON formats.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading feed config from {}", path.display()))?;
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        let cfg: FeedConfig = if ext == "json" {
            serde_json::from_str(&content).context("parsing feed config json")?
        } else {
            toml::from_str(&content).context("parsing feed config toml")?
        };
        Ok(cfg.sanitized())
    }

    /// Load using env var + fallbacks:
    /// 1) $FEED_CONFIG_PATH
    /// 2) config/feed.toml
    /// 3) config/feed.json
    /// 4) built-in defaults
    pub fn load_default() -> Result<Self> {
        if let Ok(p) = std::env::var(ENV_FEED_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if pb.exists() {
                return Self::load_from(&pb);
            } else {
                return Err(anyhow!("{ENV_FEED_CONFIG_PATH} points to non-existent path"));
            }
        }
        for candidate in ["config/feed.toml", "config/feed.json"] {
            let p = PathBuf::from(candidate);
            if p.exists() {
                return Self::load_from(&p);
            }
        }
        Ok(Self::default())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Page size for a requested `limit`; `None` means the default page size.
    /// Zero and anything above `max_page_size` are refused, so `page` always
    /// tiles the result set in steps of the caller's own limit.
    pub fn effective_limit(&self, requested: Option<u32>) -> Option<u32> {
        match requested {
            None => Some(self.page_size),
            Some(n) if n == 0 || n > self.max_page_size => None,
            Some(n) => Some(n),
        }
    }

    fn sanitized(mut self) -> Self {
        if self.max_page_size == 0 {
            self.max_page_size = default_max_page_size();
        }
        if self.page_size == 0 {
            self.page_size = default_page_size();
        }
        if self.page_size > self.max_page_size {
            self.page_size = self.max_page_size;
        }
        if self.request_timeout_ms == 0 {
            self.request_timeout_ms = default_request_timeout_ms();
        }
        self
    }
}
