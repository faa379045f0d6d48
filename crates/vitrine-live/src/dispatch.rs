//! Envelope classification and the at-most-once consumer cursor.

use vitrine_stream::Received;
use vitrine_types::{Envelope, EventName, Notification, ProductId};

/// Title shown when a customer opens the storefront.
pub const TITLE_STORE_VIEWED: &str = "Nova visita na loja!";
/// Title shown when a customer opens a product page.
pub const TITLE_PRODUCT_VIEWED: &str = "Produto visualizado";
/// Title shown when an order is placed.
pub const TITLE_ORDER_CREATED: &str = "Novo pedido realizado!";

/// What the view should do in response to one envelope.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Action {
    /// Notification to show, if any.
    pub notification: Option<Notification>,
    /// Product to highlight, if any.
    pub highlight: Option<ProductId>,
    /// Whether the displayed product list is stale and must be re-fetched.
    pub refetch: bool,
}

impl Action {
    /// An action that does nothing.
    pub fn none() -> Self {
        Self::default()
    }

    /// Returns `true` if applying this action has no effect.
    pub fn is_noop(&self) -> bool {
        self.notification.is_none() && self.highlight.is_none() && !self.refetch
    }
}

/// Maps an envelope to its action.
///
/// | kind | event | effect |
/// |---|---|---|
/// | webhook | `store.viewed` | notify |
/// | webhook | `store.product_viewed` | notify, highlight product, re-fetch |
/// | webhook | `order.created` | notify, re-fetch |
/// | notification | | notify with the message |
/// | anything else | | nothing |
///
/// A product view without a product id still notifies and re-fetches; only
/// the highlight is skipped.
pub fn classify(envelope: &Envelope) -> Action {
    match envelope {
        Envelope::Webhook { event, .. } => match event {
            EventName::StoreViewed => Action {
                notification: Some(Notification::new(TITLE_STORE_VIEWED)),
                ..Action::none()
            },
            EventName::ProductViewed => {
                let viewed = envelope.product_viewed().unwrap_or_default();
                Action {
                    notification: Some(
                        Notification::new(TITLE_PRODUCT_VIEWED)
                            .with_description(viewed.product_name),
                    ),
                    highlight: viewed.product_id,
                    refetch: true,
                }
            }
            EventName::OrderCreated => {
                let order = envelope.order_created().unwrap_or_default();
                Action {
                    notification: Some(
                        Notification::new(TITLE_ORDER_CREATED).with_description(order.summary()),
                    ),
                    highlight: None,
                    refetch: true,
                }
            }
            EventName::Other(_) => Action::none(),
        },
        Envelope::Notification { message } => Action {
            notification: Some(Notification::new(message.clone())),
            ..Action::none()
        },
        Envelope::Unknown { .. } => Action::none(),
    }
}

/// Consumes a connection's sequence exactly once, in order.
///
/// Holds the highest sequence number handled so far; anything at or below
/// it has already been acted on and is refused.
#[derive(Debug, Default)]
pub struct Dispatcher {
    cursor: u64,
}

impl Dispatcher {
    /// Creates a dispatcher that has handled nothing yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sequence number of the last handled envelope (0 before the first).
    pub fn cursor(&self) -> u64 {
        self.cursor
    }

    /// Advances past `received` and returns its action, or `None` if it was
    /// already handled.
    pub fn accept(&mut self, received: &Received) -> Option<Action> {
        if received.seq <= self.cursor {
            tracing::debug!(
                seq = received.seq,
                cursor = self.cursor,
                "skipping already handled envelope"
            );
            return None;
        }
        self.cursor = received.seq;

        let action = classify(&received.envelope);
        if action.is_noop() {
            tracing::debug!(
                seq = received.seq,
                kind = %received.envelope.kind(),
                event = ?received.envelope.event_name().map(|e| e.as_str()),
                "ignoring unclassified envelope"
            );
        }
        Some(action)
    }
}
