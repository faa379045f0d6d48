//! Shared types for the Vitrine live storefront subsystem.
//!
//! This crate holds the vocabulary every other crate speaks: store, product
//! and category identifiers, the push-event [`Envelope`] received from a
//! store's event channel, the typed views over webhook payloads, the
//! [`Notification`] shown to the operator and the [`Product`] rows that make
//! up the displayed catalog.
//!
//! Nothing here performs I/O. Parsing is total: a frame either becomes an
//! [`Envelope`] (possibly of an unknown kind) or an [`EnvelopeError`] that the
//! caller is expected to drop.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

mod envelope;
mod error;
mod notification;
mod payload;
mod product;

pub use envelope::{Envelope, EventKind, EventName};
pub use error::EnvelopeError;
pub use notification::Notification;
pub use payload::{OrderCreated, ProductViewed};
pub use product::Product;

/// Identifier of a storefront. Scopes the event channel and every catalog call.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StoreId(pub String);

/// Identifier of a product in a store's catalog.
///
/// The remote API emits product ids both as JSON strings and as integers,
/// so deserialisation accepts either and normalises to a string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ProductId(pub String);

/// Identifier of a catalog category, used as the product list filter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct CategoryId(pub String);

macro_rules! string_id {
    ($ty:ident) => {
        impl $ty {
            /// Returns the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $ty {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $ty {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

string_id!(StoreId);
string_id!(ProductId);
string_id!(CategoryId);

/// Renders a scalar JSON value as an identifier string.
///
/// Strings are taken verbatim (empty strings are rejected), integers are
/// rendered in decimal. Everything else has no identifier form.
pub(crate) fn scalar_to_string(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        serde_json::Value::Number(n) if n.is_i64() || n.is_u64() => Some(n.to_string()),
        _ => None,
    }
}

fn deserialize_scalar_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    scalar_to_string(&value)
        .ok_or_else(|| serde::de::Error::custom("expected a string or integer identifier"))
}

impl<'de> Deserialize<'de> for ProductId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserialize_scalar_id(deserializer).map(Self)
    }
}

impl<'de> Deserialize<'de> for CategoryId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserialize_scalar_id(deserializer).map(Self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn product_id_accepts_string_and_integer() {
        let from_str: ProductId = serde_json::from_value(json!("sku-9")).unwrap();
        let from_int: ProductId = serde_json::from_value(json!(42)).unwrap();
        assert_eq!(from_str, ProductId::from("sku-9"));
        assert_eq!(from_int, ProductId::from("42"));
    }

    #[test]
    fn product_id_rejects_non_scalar() {
        assert!(serde_json::from_value::<ProductId>(json!({"id": 1})).is_err());
        assert!(serde_json::from_value::<ProductId>(json!(1.5)).is_err());
        assert!(serde_json::from_value::<ProductId>(json!("")).is_err());
    }

    #[test]
    fn ids_display_their_inner_value() {
        assert_eq!(StoreId::from("loja-1").to_string(), "loja-1");
        assert_eq!(CategoryId::from("7").as_str(), "7");
    }

    #[test]
    fn ids_serialize_transparently() {
        let value = serde_json::to_value(ProductId::from("p1")).unwrap();
        assert_eq!(value, json!("p1"));
    }
}
