//! JSON-RPC 2.0 envelopes and the widget metadata attached to results.

use cartsync_core::domain::cart::CartId;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Value};

use crate::{McpError, McpResult};

pub const JSONRPC_VERSION: &str = "2.0";
pub const PROTOCOL_VERSION: &str = "2024-11-05";
pub const SERVER_NAME: &str = "cartsync";

pub const WIDGET_TEMPLATE_URI: &str = "ui://widget/shopping-cart.html";
pub const WIDGET_MIME_TYPE: &str = "text/html+skybridge";
pub const WIDGET_RESOURCE_NAME: &str = "Start shopping cart";

const INVOKING_TEXT: &str = "Preparing shopping cart";
const INVOKED_TEXT: &str = "Shopping cart ready";

/// An inbound call. A request without an `id` member is a notification and
/// gets no reply. An explicit `"id": null` is kept as `Some(Value::Null)`.
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcRequest {
    #[serde(default)]
    pub jsonrpc: Option<String>,
    #[serde(default, deserialize_with = "present_id")]
    pub id: Option<Value>,
    pub method: String,
    #[serde(default)]
    pub params: Option<Value>,
}

// Only runs when the member exists, so a missing `id` stays `None`.
fn present_id<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

impl JsonRpcRequest {
    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl From<&McpError> for JsonRpcError {
    fn from(error: &McpError) -> Self {
        Self {
            code: error.error_code(),
            message: error.to_string(),
            data: Some(json!({ "kind": error.kind() })),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub id: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    pub fn success(id: Value, result: Value) -> Self {
        Self { jsonrpc: JSONRPC_VERSION.to_string(), id, result: Some(result), error: None }
    }

    pub fn failure(id: Value, error: &McpError) -> Self {
        Self { jsonrpc: JSONRPC_VERSION.to_string(), id, result: None, error: Some(error.into()) }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Parses a raw body in two stages so that unparseable bytes and
/// well-formed JSON with the wrong shape are classified differently.
pub fn parse_request(body: &[u8]) -> McpResult<JsonRpcRequest> {
    let value: Value =
        serde_json::from_slice(body).map_err(|error| McpError::Parse(error.to_string()))?;

    if value.is_array() {
        return Err(McpError::InvalidRequest("batch requests are not supported".to_string()));
    }
    if !value.is_object() {
        return Err(McpError::InvalidRequest("request must be a JSON object".to_string()));
    }

    let request: JsonRpcRequest =
        serde_json::from_value(value).map_err(|error| McpError::InvalidRequest(error.to_string()))?;

    match request.jsonrpc.as_deref() {
        None | Some(JSONRPC_VERSION) => Ok(request),
        Some(other) => Err(McpError::InvalidRequest(format!("unsupported jsonrpc version `{other}`"))),
    }
}

/// Metadata the host uses to render the cart widget. Tool results also carry
/// the session binding so a later turn can find the same cart.
pub fn widget_meta(session: Option<&CartId>) -> Value {
    let mut meta = json!({
        "openai/outputTemplate": WIDGET_TEMPLATE_URI,
        "openai/toolInvocation/invoking": INVOKING_TEXT,
        "openai/toolInvocation/invoked": INVOKED_TEXT,
        "openai/widgetAccessible": true,
    });
    if let Some(cart_id) = session {
        meta["openai/widgetSessionId"] = json!(cart_id);
    }
    meta
}
