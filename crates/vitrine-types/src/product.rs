//! Catalog rows as returned by the remote store API.

use crate::{CategoryId, ProductId};
use serde::{Deserialize, Serialize};

/// One product in the displayed catalog list.
///
/// Only the fields the live view reasons about are typed; everything else
/// the API sends is kept in `extra` untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    /// Product identifier, matched against highlight ids.
    pub id: ProductId,
    /// Display name.
    #[serde(alias = "nome", default)]
    pub name: String,
    /// Category the product belongs to, if any.
    #[serde(alias = "categoria_id", default)]
    pub category_id: Option<CategoryId>,
    /// Remaining API fields.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}
