//! The mounted live view: one event loop per store connection.

use crate::catalog::ProductSource;
use crate::coordinator::Coordinator;
use crate::dispatch::Dispatcher;
use crate::highlight::HIGHLIGHT_TTL;
use crate::notify::Notifier;
use crate::state::ViewHandle;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use vitrine_stream::StreamConnection;
use vitrine_types::{CategoryId, Product, ProductId, StoreId};

/// Collaborators and settings for mounting a [`LiveView`].
pub struct LiveViewDeps<N, P> {
    /// Store the view displays.
    pub store_id: StoreId,
    /// Where notifications go.
    pub notifier: N,
    /// Where product lists come from.
    pub products: P,
    /// Initial category filter.
    pub category: Option<CategoryId>,
    /// Highlight time-to-live.
    pub highlight_ttl: Duration,
}

impl<N, P> LiveViewDeps<N, P> {
    /// Dependencies with no category filter and the default highlight TTL.
    pub fn new(store_id: StoreId, notifier: N, products: P) -> Self {
        Self {
            store_id,
            notifier,
            products,
            category: None,
            highlight_ttl: HIGHLIGHT_TTL,
        }
    }

    /// Sets the initial category filter.
    pub fn with_category(mut self, category: Option<CategoryId>) -> Self {
        self.category = category;
        self
    }
}

enum Command {
    SelectCategory(Option<CategoryId>),
    Refresh,
}

/// A store's live view: its event connection, highlights and product list.
///
/// Mounting spawns one task that consumes the connection in arrival order,
/// handles each envelope to completion before the next, expires highlights
/// on time and reaps re-fetches. The view exclusively owns its state; read it
/// through this type or a cloned [`ViewHandle`].
///
/// [`teardown`](Self::teardown) (or dropping the view) closes the stream,
/// aborts pending re-fetches and guarantees no state is written afterwards.
/// To switch stores, tear the view down and mount a new one.
pub struct LiveView {
    store_id: StoreId,
    handle: ViewHandle,
    commands: mpsc::UnboundedSender<Command>,
    task: Option<JoinHandle<()>>,
}

impl LiveView {
    /// Mounts a view over `connection`. Must be called from within a Tokio runtime.
    pub fn mount<N, P>(connection: StreamConnection, deps: LiveViewDeps<N, P>) -> Self
    where
        N: Notifier,
        P: ProductSource,
    {
        let handle = ViewHandle::new(deps.highlight_ttl, deps.category);
        let coordinator = Coordinator::new(
            deps.store_id.clone(),
            deps.notifier,
            deps.products,
            handle.clone(),
        );
        let (commands, command_rx) = mpsc::unbounded_channel();

        tracing::info!(store_id = %deps.store_id, "mounting live view");
        let task = tokio::spawn(run_loop(connection, coordinator, command_rx));

        Self {
            store_id: deps.store_id,
            handle,
            commands,
            task: Some(task),
        }
    }

    /// The store this view displays.
    pub fn store_id(&self) -> &StoreId {
        &self.store_id
    }

    /// A cloneable read handle to this view's state.
    pub fn handle(&self) -> ViewHandle {
        self.handle.clone()
    }

    /// Returns `true` if `id` is highlighted right now.
    pub fn is_recent(&self, id: &ProductId) -> bool {
        self.handle.is_recent(id)
    }

    /// Ids highlighted right now, sorted.
    pub fn highlighted(&self) -> Vec<ProductId> {
        self.handle.highlighted()
    }

    /// The displayed product list.
    pub fn products(&self) -> Vec<Product> {
        self.handle.products()
    }

    /// The category filter in effect.
    pub fn selected_category(&self) -> Option<CategoryId> {
        self.handle.selected_category()
    }

    /// Changes the category filter; the list is re-fetched for it.
    pub fn select_category(&self, category: Option<CategoryId>) {
        self.send(Command::SelectCategory(category));
    }

    /// Re-fetches the product list now.
    pub fn refresh(&self) {
        self.send(Command::Refresh);
    }

    fn send(&self, command: Command) {
        if self.commands.send(command).is_err() {
            tracing::debug!(store_id = %self.store_id, "live view loop has stopped; command dropped");
        }
    }

    /// Tears the view down and waits for its loop to stop.
    ///
    /// After this returns no highlight, product or category write will be
    /// applied, even by re-fetches that were in flight.
    pub async fn teardown(mut self) {
        self.handle.kill();
        if let Some(task) = self.task.take() {
            task.abort();
            if let Err(e) = task.await {
                if e.is_panic() {
                    tracing::warn!(store_id = %self.store_id, error = %e, "live view loop panicked");
                }
            }
        }
        tracing::info!(store_id = %self.store_id, "live view torn down");
    }
}

impl Drop for LiveView {
    fn drop(&mut self) {
        self.handle.kill();
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

async fn sleep_until_opt(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending::<()>().await,
    }
}

async fn run_loop<N, P>(
    mut connection: StreamConnection,
    mut coordinator: Coordinator<N, P>,
    mut commands: mpsc::UnboundedReceiver<Command>,
) where
    N: Notifier,
    P: ProductSource,
{
    let mut dispatcher = Dispatcher::new();
    let mut stream_open = true;

    // Initial load of the displayed list.
    coordinator.refetch();

    loop {
        let next_expiry = coordinator.view().next_expiry();

        tokio::select! {
            received = connection.next(), if stream_open => {
                let Some(received) = received else {
                    tracing::info!(cursor = dispatcher.cursor(), "event stream ended");
                    stream_open = false;
                    continue;
                };
                tracing::debug!(seq = received.seq, kind = %received.envelope.kind(), "envelope received");
                if let Some(action) = dispatcher.accept(&received) {
                    coordinator.apply(action, Instant::now());
                }
            }
            () = sleep_until_opt(next_expiry) => {
                coordinator.expire(Instant::now());
            }
            command = commands.recv() => match command {
                Some(Command::SelectCategory(category)) => coordinator.select_category(category),
                Some(Command::Refresh) => coordinator.refetch(),
                None => break,
            },
            () = coordinator.reap() => {}
        }

        if !coordinator.view().is_alive() {
            break;
        }
    }

    coordinator.abort_fetches();
    connection.close();
}
