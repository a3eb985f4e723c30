//! # Feed Aggregator
//! Client-side controller owning one accumulated window of items for a
//! filter context.
//!
//! The core [`FeedAggregator`] is synchronous: a load is split into
//! [`FeedAggregator::begin_load`], which hands out a [`PendingFetch`] ticket
//! tagged with the window generation, and [`FeedAggregator::complete_load`],
//! which applies the result only if the ticket is still current. Every
//! context activation bumps the generation, so a fetch that resolves after
//! the filter changed is dropped instead of being appended to the wrong
//! window.
//!
//! [`FeedHandle`] wraps the core for async callers. The lock is never held
//! across the fetch, so `change_context` can run while a `load_more` is in
//! flight.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use metrics::{counter, describe_counter};
use once_cell::sync::OnceCell;
use serde::Serialize;

use crate::analytics::{summarize, AnalyticsSummary};
use crate::filter::FilterContext;
use crate::item::Item;
use crate::retrieval::{RetrievalError, RetrievalService};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedState {
    Idle,
    Loading,
    Loaded,
    Exhausted,
    Failed,
}

/// What a load or context change did to the window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// A page was appended. `duplicates` counts ids already in the window.
    Applied {
        page: u32,
        added: usize,
        duplicates: usize,
        exhausted: bool,
    },
    /// Another fetch is in flight; nothing was started.
    Busy,
    /// No further pages exist; nothing was started.
    Exhausted,
    /// Context change to an equal context.
    Unchanged,
    /// The fetch resolved for a window that has since been replaced.
    Stale,
}

/// An issued fetch. Carries the context and generation it was issued for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingFetch {
    pub context: FilterContext,
    pub page: u32,
    pub page_size: u32,
    generation: u64,
}

/// Read-only snapshot of the window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedWindow {
    pub context: FilterContext,
    pub items: Vec<Item>,
    pub next_page: u32,
    pub exhausted: bool,
    pub state: FeedState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

#[derive(Debug)]
pub struct FeedAggregator {
    context: FilterContext,
    items: Vec<Item>,
    seen: HashSet<String>,
    next_page: u32,
    exhausted: bool,
    state: FeedState,
    page_size: u32,
    generation: u64,
    last_error: Option<RetrievalError>,
}

fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("feed_pages_applied_total", "Pages appended to feed windows.");
        describe_counter!(
            "feed_stale_discarded_total",
            "Fetch results dropped because the filter context changed."
        );
        describe_counter!("feed_load_failures_total", "Page loads that failed.");
    });
}

impl FeedAggregator {
    /// Empty window in `Idle`; the first `load_more` fetches page 1.
    pub fn new(context: FilterContext, page_size: u32) -> Self {
        ensure_metrics_described();
        Self {
            context,
            items: Vec::new(),
            seen: HashSet::new(),
            next_page: 1,
            exhausted: false,
            state: FeedState::Idle,
            page_size: page_size.max(1),
            generation: 0,
            last_error: None,
        }
    }

    /// Seed the window with an already fetched page 1 for `context`.
    pub fn initialize(&mut self, context: FilterContext, initial_page: Vec<Item>) {
        self.reset(context);
        let returned = initial_page.len();
        self.append_unseen(initial_page);
        self.finish_page(1, returned);
        tracing::debug!(
            target: "feed",
            generation = self.generation,
            items = self.items.len(),
            exhausted = self.exhausted,
            "window initialized"
        );
    }

    /// Start the next page fetch, or `None` when a fetch is in flight or the
    /// window is exhausted (see [`FeedAggregator::skip_reason`]).
    pub fn begin_load(&mut self) -> Option<PendingFetch> {
        if self.state == FeedState::Loading || self.exhausted {
            return None;
        }
        self.state = FeedState::Loading;
        Some(self.ticket())
    }

    /// Why `begin_load` declined.
    pub fn skip_reason(&self) -> LoadOutcome {
        if self.exhausted {
            LoadOutcome::Exhausted
        } else {
            LoadOutcome::Busy
        }
    }

    /// Replace the window for a different context and issue the page-1 fetch.
    /// Returns `None` when `context` equals the current one.
    pub fn begin_change_context(&mut self, context: FilterContext) -> Option<PendingFetch> {
        if context == self.context {
            return None;
        }
        self.reset(context);
        self.state = FeedState::Loading;
        tracing::debug!(target: "feed", generation = self.generation, "context changed");
        Some(self.ticket())
    }

    /// Apply a fetch result. Stale tickets are dropped without touching the
    /// window; errors leave items and `next_page` as they were.
    pub fn complete_load(
        &mut self,
        ticket: PendingFetch,
        result: Result<Vec<Item>, RetrievalError>,
    ) -> Result<LoadOutcome, RetrievalError> {
        if ticket.generation != self.generation || self.state != FeedState::Loading {
            counter!("feed_stale_discarded_total").increment(1);
            tracing::debug!(
                target: "feed",
                ticket_generation = ticket.generation,
                generation = self.generation,
                page = ticket.page,
                "stale fetch discarded"
            );
            return Ok(LoadOutcome::Stale);
        }

        match result {
            Ok(page) => {
                let returned = page.len();
                let added = self.append_unseen(page);
                self.finish_page(ticket.page, returned);
                counter!("feed_pages_applied_total").increment(1);
                Ok(LoadOutcome::Applied {
                    page: ticket.page,
                    added,
                    duplicates: returned - added,
                    exhausted: self.exhausted,
                })
            }
            Err(e) => {
                counter!("feed_load_failures_total").increment(1);
                tracing::warn!(target: "feed", page = ticket.page, error = %e, "page load failed");
                self.state = FeedState::Failed;
                self.last_error = Some(e.clone());
                Err(e)
            }
        }
    }

    /// Fetch and apply the next page in one step.
    pub async fn load_more(
        &mut self,
        service: &dyn RetrievalService,
    ) -> Result<LoadOutcome, RetrievalError> {
        let Some(ticket) = self.begin_load() else {
            return Ok(self.skip_reason());
        };
        let result = service
            .fetch(&ticket.context, ticket.page, ticket.page_size)
            .await;
        self.complete_load(ticket, result)
    }

    /// Reset to `context` and load its first page; equal contexts are a no-op.
    pub async fn change_context(
        &mut self,
        context: FilterContext,
        service: &dyn RetrievalService,
    ) -> Result<LoadOutcome, RetrievalError> {
        let Some(ticket) = self.begin_change_context(context) else {
            return Ok(LoadOutcome::Unchanged);
        };
        let result = service
            .fetch(&ticket.context, ticket.page, ticket.page_size)
            .await;
        self.complete_load(ticket, result)
    }

    pub fn window(&self) -> FeedWindow {
        FeedWindow {
            context: self.context.clone(),
            items: self.items.clone(),
            next_page: self.next_page,
            exhausted: self.exhausted,
            state: self.state,
            last_error: self.last_error.as_ref().map(|e| e.to_string()),
        }
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn context(&self) -> &FilterContext {
        &self.context
    }

    pub fn state(&self) -> FeedState {
        self.state
    }

    pub fn next_page(&self) -> u32 {
        self.next_page
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn last_error(&self) -> Option<&RetrievalError> {
        self.last_error.as_ref()
    }

    fn ticket(&self) -> PendingFetch {
        PendingFetch {
            context: self.context.clone(),
            page: self.next_page,
            page_size: self.page_size,
            generation: self.generation,
        }
    }

    fn reset(&mut self, context: FilterContext) {
        self.generation += 1;
        self.context = context;
        self.items.clear();
        self.seen.clear();
        self.next_page = 1;
        self.exhausted = false;
        self.state = FeedState::Idle;
        self.last_error = None;
    }

    fn append_unseen(&mut self, page: Vec<Item>) -> usize {
        let before = self.items.len();
        for it in page {
            if self.seen.insert(it.id.clone()) {
                self.items.push(it);
            }
        }
        self.items.len() - before
    }

    fn finish_page(&mut self, page: u32, returned: usize) {
        self.next_page = page + 1;
        self.exhausted = returned < self.page_size as usize;
        self.last_error = None;
        self.state = if self.exhausted {
            FeedState::Exhausted
        } else {
            FeedState::Loaded
        };
    }
}

/// Shareable async front for one aggregator.
#[derive(Clone)]
pub struct FeedHandle {
    inner: Arc<Mutex<FeedAggregator>>,
    service: Arc<dyn RetrievalService>,
}

impl FeedHandle {
    pub fn new(service: Arc<dyn RetrievalService>, context: FilterContext, page_size: u32) -> Self {
        Self {
            inner: Arc::new(Mutex::new(FeedAggregator::new(context, page_size))),
            service,
        }
    }

    fn lock(&self) -> MutexGuard<'_, FeedAggregator> {
        match self.inner.lock() {
            Ok(g) => g,
            Err(poison) => poison.into_inner(),
        }
    }

    pub fn initialize(&self, context: FilterContext, initial_page: Vec<Item>) {
        self.lock().initialize(context, initial_page);
    }

    pub async fn load_more(&self) -> Result<LoadOutcome, RetrievalError> {
        let ticket = {
            let mut feed = self.lock();
            match feed.begin_load() {
                Some(t) => t,
                None => return Ok(feed.skip_reason()),
            }
        };
        let result = self
            .service
            .fetch(&ticket.context, ticket.page, ticket.page_size)
            .await;
        self.lock().complete_load(ticket, result)
    }

    pub async fn change_context(
        &self,
        context: FilterContext,
    ) -> Result<LoadOutcome, RetrievalError> {
        let ticket = {
            let mut feed = self.lock();
            match feed.begin_change_context(context) {
                Some(t) => t,
                None => return Ok(LoadOutcome::Unchanged),
            }
        };
        let result = self
            .service
            .fetch(&ticket.context, ticket.page, ticket.page_size)
            .await;
        self.lock().complete_load(ticket, result)
    }

    pub fn window(&self) -> FeedWindow {
        self.lock().window()
    }

    /// Analytics over the current window.
    pub fn summary(&self) -> AnalyticsSummary {
        summarize(self.lock().items())
    }
}
