//! Applies dispatched actions to a view: notifications, highlights, re-fetches.

use crate::catalog::ProductSource;
use crate::dispatch::Action;
use crate::notify::Notifier;
use crate::state::ViewHandle;
use std::sync::Arc;
use tokio::task::JoinSet;
use tokio::time::Instant;
use vitrine_types::{CategoryId, StoreId};

/// Side-effect half of a mounted view.
///
/// Owned by the view's event loop. Re-fetches run as tasks in a [`JoinSet`]
/// so the loop never waits on HTTP; dropping the coordinator aborts them.
pub(crate) struct Coordinator<N, P> {
    store_id: StoreId,
    notifier: N,
    products: Arc<P>,
    view: ViewHandle,
    fetches: JoinSet<()>,
}

impl<N: Notifier, P: ProductSource> Coordinator<N, P> {
    pub(crate) fn new(store_id: StoreId, notifier: N, products: P, view: ViewHandle) -> Self {
        Self {
            store_id,
            notifier,
            products: Arc::new(products),
            view,
            fetches: JoinSet::new(),
        }
    }

    /// The view this coordinator writes to.
    pub(crate) fn view(&self) -> &ViewHandle {
        &self.view
    }

    /// Applies one action, synchronously except for the spawned re-fetch.
    pub(crate) fn apply(&mut self, action: Action, now: Instant) {
        if !self.view.is_alive() {
            return;
        }
        if let Some(notification) = action.notification {
            self.notifier.notify(notification);
        }
        if let Some(id) = action.highlight {
            if self.view.mark_recent(id.clone(), now) {
                tracing::debug!(product_id = %id, "product highlighted");
            }
        }
        if action.refetch {
            self.refetch();
        }
    }

    /// Removes highlights whose expiry has passed.
    pub(crate) fn expire(&mut self, now: Instant) {
        for id in self.view.expire_highlights(now) {
            tracing::debug!(product_id = %id, "highlight expired");
        }
    }

    /// Changes the category filter and reloads the list for it.
    pub(crate) fn select_category(&mut self, category: Option<CategoryId>) {
        if self.view.set_category(category) {
            self.refetch();
        }
    }

    /// Starts a re-fetch of the displayed product list.
    ///
    /// Best effort: the result replaces the list wholesale if the view is
    /// still alive and no newer re-fetch was started; failures are logged and
    /// the previous list stays.
    pub(crate) fn refetch(&mut self) {
        let Some((generation, category)) = self.view.begin_fetch() else {
            return;
        };
        let products = Arc::clone(&self.products);
        let store_id = self.store_id.clone();
        let view = self.view.clone();

        self.fetches.spawn(async move {
            match products.fetch_products(&store_id, category.as_ref()).await {
                Ok(list) => {
                    let count = list.len();
                    if view.finish_fetch(generation, list) {
                        tracing::debug!(store_id = %store_id, generation, count, "product list replaced");
                    } else {
                        tracing::debug!(store_id = %store_id, generation, "discarding superseded product list");
                    }
                }
                Err(e) => {
                    tracing::warn!(store_id = %store_id, generation, error = %e, "product re-fetch failed; keeping previous list");
                }
            }
        });
    }

    /// Waits for the next re-fetch task to finish. Pending forever when none
    /// are running, so it can sit in a `select!`.
    pub(crate) async fn reap(&mut self) {
        match self.fetches.join_next().await {
            Some(Err(e)) if e.is_panic() => {
                tracing::warn!(error = %e, "product re-fetch task panicked");
            }
            Some(_) => {}
            None => std::future::pending::<()>().await,
        }
    }

    /// Aborts every running re-fetch.
    pub(crate) fn abort_fetches(&mut self) {
        self.fetches.abort_all();
    }
}
