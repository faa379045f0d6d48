//! Typed, lenient views over webhook payloads.
//!
//! Webhook `data` objects come from several producers and use both English
//! and Portuguese keys. Extraction never fails: a missing or mistyped field
//! simply comes back as `None`, and callers decide what to skip.

use crate::{scalar_to_string, ProductId};
use serde_json::Value;

/// Looks up the first present key among `keys` in a JSON object.
fn field<'a>(value: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    let object = value.as_object()?;
    keys.iter().find_map(|key| object.get(*key))
}

fn text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        _ => None,
    }
}

/// Payload of `store.product_viewed`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductViewed {
    /// The viewed product, when the payload names one.
    pub product_id: Option<ProductId>,
    /// The viewed product's display name.
    pub product_name: Option<String>,
}

impl ProductViewed {
    /// Extracts the product reference from `data.product` (or `data.produto`).
    pub fn from_data(data: &Value) -> Self {
        let Some(product) = field(data, &["product", "produto"]) else {
            return Self::default();
        };
        Self {
            product_id: field(product, &["id"])
                .and_then(scalar_to_string)
                .map(ProductId),
            product_name: text(field(product, &["name", "nome"])),
        }
    }
}

/// Payload of `order.created`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderCreated {
    /// Human-facing order number.
    pub order_number: Option<String>,
    /// Name of the customer who placed the order.
    pub customer_name: Option<String>,
}

impl OrderCreated {
    /// Extracts the order summary from `data.order` (or `data.pedido`).
    pub fn from_data(data: &Value) -> Self {
        let Some(order) = field(data, &["order", "pedido"]) else {
            return Self::default();
        };
        Self {
            order_number: field(order, &["numero_pedido", "number"]).and_then(scalar_to_string),
            customer_name: text(field(order, &["cliente_nome", "customer_name"])),
        }
    }

    /// Renders the notification description: `Pedido #<number> de <customer>`.
    ///
    /// Degrades to whichever half is known, or `None` when neither is.
    pub fn summary(&self) -> Option<String> {
        match (&self.order_number, &self.customer_name) {
            (Some(number), Some(customer)) => Some(format!("Pedido #{number} de {customer}")),
            (Some(number), None) => Some(format!("Pedido #{number}")),
            (None, Some(customer)) => Some(format!("Pedido de {customer}")),
            (None, None) => None,
        }
    }
}
