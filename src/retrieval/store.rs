// src/retrieval/store.rs
//! In-memory content store kept in recency order.
//!
//! The analysis pipeline appends; the retrieval path only reads. Items are
//! held sorted by `created_at` desc with `id` desc as tie-break, so a page is
//! a filtered scan from the front.

use std::cmp::Ordering;
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Instant;

use anyhow::{Context, Result};
use async_trait::async_trait;

use super::{record_query, PageRequest, RetrievalError, RetrievalService};
use crate::filter::FilterContext;
use crate::item::Item;

#[derive(Debug, Default)]
pub struct ContentStore {
    inner: RwLock<Inner>,
    offline: AtomicBool,
}

#[derive(Debug, Default)]
struct Inner {
    items: Vec<Item>,
    ids: HashSet<String>,
}

/// Feed order: newest first, ties broken by id descending.
pub fn recency_order(a: &Item, b: &Item) -> Ordering {
    b.created_at
        .cmp(&a.created_at)
        .then_with(|| b.id.cmp(&a.id))
}

impl ContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_items<I: IntoIterator<Item = Item>>(items: I) -> Self {
        let store = Self::new();
        store.extend(items);
        store
    }

    /// Seed from a JSON file holding either an array of items or `{"articles": [...]}`.
    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading seed items from {}", path.display()))?;
        let items = parse_seed(&raw).with_context(|| format!("parsing {}", path.display()))?;
        let store = Self::with_items(items);
        tracing::info!(target: "retrieval", path = %path.display(), items = store.len(), "store seeded");
        Ok(store)
    }

    /// Insert one item. An id already present is left as first written; returns false.
    pub fn insert(&self, item: Item) -> bool {
        let mut inner = self.write();
        if !inner.ids.insert(item.id.clone()) {
            return false;
        }
        let pos = inner
            .items
            .partition_point(|x| recency_order(x, &item) == Ordering::Less);
        inner.items.insert(pos, item);
        true
    }

    /// Insert many; returns how many were new.
    pub fn extend<I: IntoIterator<Item = Item>>(&self, items: I) -> usize {
        let mut added = 0;
        for it in items {
            if self.insert(it) {
                added += 1;
            }
        }
        added
    }

    pub fn len(&self) -> usize {
        self.read().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Simulate the backing store going away (maintenance, failover).
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, AtomicOrdering::SeqCst);
    }

    /// Synchronous page query shared by the trait impl and the HTTP handler.
    pub fn query(&self, ctx: &FilterContext, req: PageRequest) -> Result<Vec<Item>, RetrievalError> {
        if self.offline.load(AtomicOrdering::SeqCst) {
            return Err(RetrievalError::Unavailable("content store offline".into()));
        }
        let offset = req.offset()?;
        let inner = self.read();

        let needle = ctx.query_lower();
        let category = ctx.category();
        let page = inner
            .items
            .iter()
            .filter(|it| category.is_empty() || it.category == category)
            .filter(|it| it.matches_query(&needle))
            .skip(offset)
            .take(req.page_size as usize)
            .cloned()
            .collect();
        Ok(page)
    }

    // Poisoned guards are recovered on every path, as in `FeedHandle::lock`.
    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        match self.inner.read() {
            Ok(g) => g,
            Err(poison) => poison.into_inner(),
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        match self.inner.write() {
            Ok(g) => g,
            Err(poison) => poison.into_inner(),
        }
    }
}

#[async_trait]
impl RetrievalService for ContentStore {
    async fn fetch(
        &self,
        ctx: &FilterContext,
        page: u32,
        page_size: u32,
    ) -> Result<Vec<Item>, RetrievalError> {
        let started = Instant::now();
        let out = PageRequest::new(page, page_size).and_then(|req| self.query(ctx, req));
        record_query(self.name(), ctx, page, started, &out);
        out
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

fn parse_seed(raw: &str) -> Result<Vec<Item>> {
    #[derive(serde::Deserialize)]
    #[serde(untagged)]
    enum Seed {
        List(Vec<Item>),
        Wrapped { articles: Vec<Item> },
    }
    let seed: Seed = serde_json::from_str(raw)?;
    Ok(match seed {
        Seed::List(v) | Seed::Wrapped { articles: v } => v,
    })
}
