//! Push-event envelope, its kind discriminator and webhook event names.

use crate::error::EnvelopeError;
use crate::payload::{OrderCreated, ProductViewed};
use serde_json::Value;

/// Envelope kinds carried in the frame's `type` field.
///
/// The set is open: kinds this build does not know about are preserved in
/// [`EventKind::Other`] so they can be logged and ignored.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// A store webhook relayed to the operator (`webhook_event`).
    WebhookEvent,
    /// A plain display message (`notification`).
    Notification,
    /// Any other kind.
    Other(String),
}

impl EventKind {
    /// Maps a wire label to a kind. Unknown labels become [`EventKind::Other`].
    pub fn from_label(label: &str) -> Self {
        match label {
            "webhook_event" => Self::WebhookEvent,
            "notification" => Self::Notification,
            other => Self::Other(other.to_string()),
        }
    }

    /// Returns the wire label for this kind.
    pub fn as_str(&self) -> &str {
        match self {
            Self::WebhookEvent => "webhook_event",
            Self::Notification => "notification",
            Self::Other(kind) => kind,
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EventKind {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from_label(s))
    }
}

/// Dotted webhook event names.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventName {
    /// A customer opened the storefront (`store.viewed`).
    StoreViewed,
    /// A customer opened a product page (`store.product_viewed`).
    ProductViewed,
    /// A customer placed an order (`order.created`).
    OrderCreated,
    /// Any other webhook event.
    Other(String),
}

impl EventName {
    /// Maps a dotted name to an event. Unknown names become [`EventName::Other`].
    pub fn from_label(label: &str) -> Self {
        match label {
            "store.viewed" => Self::StoreViewed,
            "store.product_viewed" => Self::ProductViewed,
            "order.created" => Self::OrderCreated,
            other => Self::Other(other.to_string()),
        }
    }

    /// Returns the dotted wire name.
    pub fn as_str(&self) -> &str {
        match self {
            Self::StoreViewed => "store.viewed",
            Self::ProductViewed => "store.product_viewed",
            Self::OrderCreated => "order.created",
            Self::Other(name) => name,
        }
    }
}

impl std::fmt::Display for EventName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EventName {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from_label(s))
    }
}

/// One discrete message delivered over a store's push channel.
///
/// Envelopes are read-only once parsed.
#[derive(Debug, Clone, PartialEq)]
pub enum Envelope {
    /// `{"type":"webhook_event","event":"…","data":{…}}`
    Webhook {
        /// The dotted event name.
        event: EventName,
        /// Event-specific payload; `Null` when the frame carried none.
        data: Value,
    },
    /// `{"type":"notification","message":"…"}`
    Notification {
        /// Display string.
        message: String,
    },
    /// A frame whose `type` is not recognised.
    Unknown {
        /// The raw `type` value.
        kind: String,
    },
}

impl Envelope {
    /// Parses a frame body.
    ///
    /// # Errors
    ///
    /// Returns [`EnvelopeError`] when the body is not a JSON object, has no
    /// string `type`, or lacks the field its kind requires (`event` for
    /// webhooks, `message` for notifications).
    pub fn parse(raw: &str) -> Result<Self, EnvelopeError> {
        let value: Value = serde_json::from_str(raw)?;
        Self::from_value(value)
    }

    /// Builds an envelope from an already-decoded JSON value.
    ///
    /// # Errors
    ///
    /// Same conditions as [`Envelope::parse`].
    pub fn from_value(value: Value) -> Result<Self, EnvelopeError> {
        let Value::Object(mut object) = value else {
            return Err(EnvelopeError::NotAnObject);
        };

        let kind = match object.get("type") {
            Some(Value::String(kind)) => EventKind::from_label(kind),
            _ => return Err(EnvelopeError::MissingField("type")),
        };

        match kind {
            EventKind::WebhookEvent => {
                let event = match object.get("event") {
                    Some(Value::String(name)) => EventName::from_label(name),
                    _ => return Err(EnvelopeError::MissingField("event")),
                };
                let data = object.remove("data").unwrap_or(Value::Null);
                Ok(Self::Webhook { event, data })
            }
            EventKind::Notification => match object.remove("message") {
                Some(Value::String(message)) => Ok(Self::Notification { message }),
                _ => Err(EnvelopeError::MissingField("message")),
            },
            EventKind::Other(kind) => Ok(Self::Unknown { kind }),
        }
    }

    /// Returns the envelope's kind.
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Webhook { .. } => EventKind::WebhookEvent,
            Self::Notification { .. } => EventKind::Notification,
            Self::Unknown { kind } => EventKind::Other(kind.clone()),
        }
    }

    /// Returns the webhook event name, if this is a webhook envelope.
    pub fn event_name(&self) -> Option<&EventName> {
        match self {
            Self::Webhook { event, .. } => Some(event),
            _ => None,
        }
    }

    /// Typed view of a `store.product_viewed` payload.
    pub fn product_viewed(&self) -> Option<ProductViewed> {
        match self {
            Self::Webhook {
                event: EventName::ProductViewed,
                data,
            } => Some(ProductViewed::from_data(data)),
            _ => None,
        }
    }

    /// Typed view of an `order.created` payload.
    pub fn order_created(&self) -> Option<OrderCreated> {
        match self {
            Self::Webhook {
                event: EventName::OrderCreated,
                data,
            } => Some(OrderCreated::from_data(data)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_webhook_envelope() {
        let env = Envelope::parse(
            r#"{"type":"webhook_event","event":"store.viewed","data":{"visitor":"x"}}"#,
        )
        .unwrap();
        assert_eq!(env.kind(), EventKind::WebhookEvent);
        assert_eq!(env.event_name(), Some(&EventName::StoreViewed));
        match env {
            Envelope::Webhook { data, .. } => assert_eq!(data, json!({"visitor": "x"})),
            other => panic!("expected webhook, got {other:?}"),
        }
    }

    #[test]
    fn webhook_without_data_gets_null_payload() {
        let env = Envelope::parse(r#"{"type":"webhook_event","event":"order.created"}"#).unwrap();
        assert_eq!(
            env,
            Envelope::Webhook {
                event: EventName::OrderCreated,
                data: Value::Null
            }
        );
    }

    #[test]
    fn unknown_event_name_is_preserved() {
        let env = Envelope::parse(r#"{"type":"webhook_event","event":"cart.abandoned"}"#).unwrap();
        assert_eq!(
            env.event_name(),
            Some(&EventName::Other("cart.abandoned".to_string()))
        );
    }

    #[test]
    fn parses_notification_envelope() {
        let env = Envelope::parse(r#"{"type":"notification","message":"Sistema em manutenção"}"#)
            .unwrap();
        assert_eq!(
            env,
            Envelope::Notification {
                message: "Sistema em manutenção".to_string()
            }
        );
    }

    #[test]
    fn unknown_kind_is_tolerated() {
        let env = Envelope::parse(r#"{"type":"something_unknown","foo":1}"#).unwrap();
        assert_eq!(
            env.kind(),
            EventKind::Other("something_unknown".to_string())
        );
    }

    #[test]
    fn malformed_frames_are_errors() {
        assert!(matches!(
            Envelope::parse("not json"),
            Err(EnvelopeError::Json(_))
        ));
        assert!(matches!(
            Envelope::parse("[1,2]"),
            Err(EnvelopeError::NotAnObject)
        ));
        assert!(matches!(
            Envelope::parse(r#"{"event":"store.viewed"}"#),
            Err(EnvelopeError::MissingField("type"))
        ));
        assert!(matches!(
            Envelope::parse(r#"{"type":"webhook_event"}"#),
            Err(EnvelopeError::MissingField("event"))
        ));
        assert!(matches!(
            Envelope::parse(r#"{"type":"notification","message":3}"#),
            Err(EnvelopeError::MissingField("message"))
        ));
    }

    #[test]
    fn kind_and_name_labels_round_trip() {
        for label in ["webhook_event", "notification", "heartbeat"] {
            let kind: EventKind = label.parse().unwrap();
            assert_eq!(kind.as_str(), label);
        }
        for label in ["store.viewed", "store.product_viewed", "order.created", "x.y"] {
            let name: EventName = label.parse().unwrap();
            assert_eq!(name.to_string(), label);
        }
    }
}
