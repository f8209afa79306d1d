use std::collections::BTreeMap;
use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct CartId(pub String);

impl CartId {
    /// Fresh, collision-improbable identifier for a cart that has none yet.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the supplied id, or generates one when the caller had none.
    pub fn or_generate(cart_id: Option<CartId>) -> Self {
        cart_id.unwrap_or_else(Self::generate)
    }
}

impl fmt::Display for CartId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CartId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for CartId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

fn default_quantity() -> u32 {
    1
}

/// One named line in a cart. `name` is the identity key and is compared
/// case-sensitively; anything else the caller sends rides along in `extra`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CartItem {
    #[schemars(description = "Name of the item to show in the cart.", length(min = 1))]
    pub name: String,

    #[schemars(description = "How many units of the item. Defaults to 1.")]
    #[serde(default = "default_quantity")]
    pub quantity: u32,

    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl CartItem {
    pub fn new(name: impl Into<String>, quantity: u32) -> Self {
        Self { name: name.into(), quantity, extra: BTreeMap::new() }
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }
}

/// A complete snapshot of one cart at one instant.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Cart {
    #[serde(rename = "cartId")]
    pub id: CartId,
    pub items: Vec<CartItem>,
}

impl Cart {
    pub fn new(id: CartId, items: Vec<CartItem>) -> Self {
        Self { id, items }
    }
}
