//! State owned by one mounted view, and the guarded handle to it.

use crate::highlight::HighlightTracker;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;
use vitrine_types::{CategoryId, Product, ProductId};

#[derive(Debug)]
pub(crate) struct ViewState {
    pub(crate) alive: bool,
    pub(crate) highlights: HighlightTracker,
    pub(crate) products: Vec<Product>,
    pub(crate) category: Option<CategoryId>,
    /// Bumped on every mutation; lets observers detect change cheaply.
    pub(crate) revision: u64,
    /// Generation of the newest re-fetch started.
    pub(crate) fetch_generation: u64,
}

/// Shared, read-mostly access to a view's state.
///
/// Cloning is cheap. The handle stays readable after the view is torn down,
/// but no mutation is applied once the view is dead: every write goes
/// through a liveness check under the same lock that teardown takes.
///
/// Locks are never held across an `.await`.
#[derive(Debug, Clone)]
pub struct ViewHandle {
    inner: Arc<Mutex<ViewState>>,
}

impl ViewHandle {
    pub(crate) fn new(ttl: Duration, category: Option<CategoryId>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(ViewState {
                alive: true,
                highlights: HighlightTracker::new(ttl),
                products: Vec::new(),
                category,
                revision: 0,
                fetch_generation: 0,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ViewState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Applies `change` if the view is still alive. `change` reports whether
    /// it modified anything; the revision is bumped only then.
    ///
    /// Returns `None` when the view is dead and nothing ran.
    pub(crate) fn mutate<F>(&self, change: F) -> Option<bool>
    where
        F: FnOnce(&mut ViewState) -> bool,
    {
        let mut state = self.lock();
        if !state.alive {
            return None;
        }
        let changed = change(&mut state);
        if changed {
            state.revision += 1;
        }
        Some(changed)
    }

    /// Marks `id` recent at `now`. Returns `true` if it was newly inserted.
    pub(crate) fn mark_recent(&self, id: ProductId, now: Instant) -> bool {
        self.mutate(|state| state.highlights.mark_recent(id, now))
            .unwrap_or(false)
    }

    /// Sweeps expired highlights. Returns the removed ids.
    pub(crate) fn expire_highlights(&self, now: Instant) -> Vec<ProductId> {
        let mut expired = Vec::new();
        self.mutate(|state| {
            expired = state.highlights.expire(now);
            !expired.is_empty()
        });
        expired
    }

    /// Sets the category filter. Returns `false` if the view is dead.
    pub(crate) fn set_category(&self, category: Option<CategoryId>) -> bool {
        self.mutate(|state| {
            if state.category == category {
                false
            } else {
                state.category = category;
                true
            }
        })
        .is_some()
    }

    /// Starts a re-fetch: returns its generation and the category to filter
    /// by, or `None` if the view is dead.
    pub(crate) fn begin_fetch(&self) -> Option<(u64, Option<CategoryId>)> {
        let mut state = self.lock();
        if !state.alive {
            return None;
        }
        state.fetch_generation += 1;
        Some((state.fetch_generation, state.category.clone()))
    }

    /// Replaces the product list with the result of fetch `generation`.
    ///
    /// Returns `false` (and changes nothing) if the view is dead or a newer
    /// fetch has started since.
    pub(crate) fn finish_fetch(&self, generation: u64, products: Vec<Product>) -> bool {
        self.mutate(|state| {
            if state.fetch_generation != generation {
                return false;
            }
            state.products = products;
            true
        })
        .unwrap_or(false)
    }

    /// Marks the view dead and drops its highlights. Idempotent.
    pub(crate) fn kill(&self) {
        let mut state = self.lock();
        if state.alive {
            state.alive = false;
            state.highlights.clear();
            state.revision += 1;
        }
    }

    pub(crate) fn next_expiry(&self) -> Option<Instant> {
        self.lock().highlights.next_expiry()
    }

    /// Returns `true` if `id` is highlighted right now.
    pub fn is_recent(&self, id: &ProductId) -> bool {
        self.lock().highlights.is_recent(id, Instant::now())
    }

    /// Ids highlighted right now, sorted.
    pub fn highlighted(&self) -> Vec<ProductId> {
        self.lock().highlights.highlighted(Instant::now())
    }

    /// The displayed product list.
    pub fn products(&self) -> Vec<Product> {
        self.lock().products.clone()
    }

    /// The category filter in effect.
    pub fn selected_category(&self) -> Option<CategoryId> {
        self.lock().category.clone()
    }

    /// Mutation counter.
    pub fn revision(&self) -> u64 {
        self.lock().revision
    }

    /// Returns `false` once the view has been torn down.
    pub fn is_alive(&self) -> bool {
        self.lock().alive
    }
}
