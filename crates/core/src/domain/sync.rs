//! Wire shapes shared by the backend adapter and the widget.

use serde::{Deserialize, Serialize};

use crate::domain::cart::{CartId, CartItem};

/// Body of a widget synchronization push: "this is now the definitive state".
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cart_id: Option<CartId>,
    pub items: Vec<CartItem>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    Updated,
    CheckedOut,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncResponse {
    pub status: SyncStatus,
    pub cart_id: CartId,
}

/// `structuredContent` of a cart tool result, which is what the widget
/// receives as a delta.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartToolOutput {
    #[serde(default)]
    pub cart_id: Option<CartId>,
    #[serde(default)]
    pub items: Vec<CartItem>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub checkout: bool,
}
