//! Live storefront view: turns a store's push events into notifications,
//! expiring product highlights and catalog re-fetches.
//!
//! Data flows one way:
//!
//! ```text
//! StreamConnection -> Dispatcher -> Coordinator -> { Notifier, HighlightTracker, ProductSource }
//! ```
//!
//! | Envelope | Notification | Highlight | Re-fetch |
//! |----------|--------------|-----------|----------|
//! | `store.viewed` | "Nova visita na loja!" | | |
//! | `store.product_viewed` | "Produto visualizado" + name | product id, 15 s | yes |
//! | `order.created` | "Novo pedido realizado!" + order summary | | yes |
//! | `notification` | the message | | |
//! | anything else | | | |
//!
//! A [`LiveView`] owns all of it for one store. Its event loop is the only
//! writer of view state and handles one envelope at a time; teardown closes
//! the stream, cancels highlight expiry and makes late re-fetch results
//! no-ops.
//!
//! # Usage
//!
//! ```rust,ignore
//! use vitrine_live::{HttpCatalog, LiveView, LiveViewDeps, TracingNotifier};
//!
//! let connection = StreamConnection::open(stream_config)?;
//! let catalog = HttpCatalog::new(api_url, token)?;
//! let view = LiveView::mount(
//!     connection,
//!     LiveViewDeps::new(store_id, TracingNotifier, catalog),
//! );
//! // ...
//! view.teardown().await;
//! ```

mod catalog;
mod coordinator;
mod dispatch;
mod error;
mod highlight;
mod notify;
mod state;
mod view;

pub use catalog::{HttpCatalog, ProductSource};
pub use dispatch::{
    classify, Action, Dispatcher, TITLE_ORDER_CREATED, TITLE_PRODUCT_VIEWED, TITLE_STORE_VIEWED,
};
pub use error::FetchError;
pub use highlight::{HighlightTracker, HIGHLIGHT_TTL};
pub use notify::{ChannelNotifier, Notifier, TracingNotifier};
pub use state::ViewHandle;
pub use view::{LiveView, LiveViewDeps};
