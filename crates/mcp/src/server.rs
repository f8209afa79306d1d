//! MCP Server Implementation
//!
//! Dispatches JSON-RPC methods onto the cart store and the asset source.

use std::sync::Arc;

use cartsync_core::domain::cart::CartId;
use cartsync_core::domain::sync::CartToolOutput;
use cartsync_core::merge::format_item_summary;
use cartsync_store::CartRepository;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::assets::{AssetSource, WIDGET_ASSET};
use crate::protocol::{
    parse_request, widget_meta, JsonRpcRequest, JsonRpcResponse, PROTOCOL_VERSION, SERVER_NAME,
    WIDGET_MIME_TYPE, WIDGET_RESOURCE_NAME, WIDGET_TEMPLATE_URI,
};
use crate::tools::{tool_descriptors, AddToCartInput, CartTool, CheckoutInput};
use crate::{McpError, McpResult};

/// Protocol adapter over an injected store and asset source.
#[derive(Clone)]
pub struct CartMcpServer {
    store: Arc<dyn CartRepository>,
    assets: Arc<dyn AssetSource>,
}

impl CartMcpServer {
    pub fn new(store: Arc<dyn CartRepository>, assets: Arc<dyn AssetSource>) -> Self {
        Self { store, assets }
    }

    /// Handles one raw request body. `None` means the body was a
    /// notification and nothing should be written back.
    pub async fn handle_body(&self, body: &[u8]) -> Option<JsonRpcResponse> {
        match parse_request(body) {
            Ok(request) => self.handle_request(request).await,
            Err(error) => {
                warn!(event_name = "mcp.request.rejected", kind = error.kind(), error = %error, "malformed request");
                Some(JsonRpcResponse::failure(Value::Null, &error))
            }
        }
    }

    pub async fn handle_request(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        debug!(event_name = "mcp.request.received", method = %request.method, id = ?request.id, "mcp call");

        let outcome = self.dispatch(&request.method, request.params.unwrap_or(Value::Null)).await;
        let id = request.id?;

        Some(match outcome {
            Ok(result) => JsonRpcResponse::success(id, result),
            Err(error) => {
                warn!(
                    event_name = "mcp.request.failed",
                    method = %request.method,
                    kind = error.kind(),
                    code = error.error_code(),
                    error = %error,
                    "mcp call failed"
                );
                JsonRpcResponse::failure(id, &error)
            }
        })
    }

    async fn dispatch(&self, method: &str, params: Value) -> McpResult<Value> {
        match method {
            "initialize" => Ok(initialize_result()),
            "notifications/initialized" | "ping" => Ok(json!({})),
            "tools/list" => Ok(tool_descriptors()),
            "tools/call" => {
                let name = params.get("name").and_then(Value::as_str).ok_or_else(|| {
                    McpError::InvalidArguments("tools/call requires a string `name`".to_string())
                })?;
                let arguments = params.get("arguments").cloned().unwrap_or(Value::Null);
                self.call_tool(name, arguments).await
            }
            "resources/list" => Ok(resources_list()),
            "resources/read" => self.read_resource(&params).await,
            other => Err(McpError::MethodNotFound(other.to_string())),
        }
    }

    /// Runs a cart tool. Arguments are fully validated before the store is
    /// touched.
    pub async fn call_tool(&self, name: &str, arguments: Value) -> McpResult<Value> {
        let tool = CartTool::parse(name, arguments)?;
        info!(event_name = "mcp.tool.called", tool = tool.name(), "tool call");

        match tool {
            CartTool::AddToCart(input) => self.add_to_cart(input).await,
            CartTool::Checkout(input) => self.checkout(input).await,
        }
    }

    async fn add_to_cart(&self, input: AddToCartInput) -> McpResult<Value> {
        let cart = self.store.add_items(input.cart_id, input.items).await?;
        let text = format!("Cart {} now has {} item(s).", cart.id, cart.items.len());
        let output = CartToolOutput { cart_id: Some(cart.id.clone()), items: cart.items, checkout: false };
        tool_result(&cart.id, text, output)
    }

    async fn checkout(&self, input: CheckoutInput) -> McpResult<Value> {
        let items = self.store.checkout(&input.cart_id).await?;
        let text = if items.is_empty() {
            "Cart is empty.".to_string()
        } else {
            format!("Checked out now: {}", format_item_summary(&items))
        };
        info!(event_name = "mcp.tool.checkout", cart_id = %input.cart_id, receipt = %text, "checkout");

        let output = CartToolOutput { cart_id: Some(input.cart_id.clone()), items, checkout: true };
        tool_result(&input.cart_id, text, output)
    }

    async fn read_resource(&self, params: &Value) -> McpResult<Value> {
        let uri = params.get("uri").and_then(Value::as_str).unwrap_or(WIDGET_TEMPLATE_URI);
        if uri != WIDGET_TEMPLATE_URI {
            return Err(McpError::ResourceNotFound(uri.to_string()));
        }

        let asset = self.assets.load(WIDGET_ASSET).await?;
        Ok(json!({
            "contents": [{
                "uri": WIDGET_TEMPLATE_URI,
                "mimeType": asset.mime_type,
                "text": asset.content,
                "_meta": widget_meta(None),
            }],
            "_meta": widget_meta(None),
        }))
    }
}

fn initialize_result() -> Value {
    json!({
        "protocolVersion": PROTOCOL_VERSION,
        "capabilities": {
            "tools": { "listChanged": true },
            "resources": { "listChanged": true, "subscribe": true },
        },
        "serverInfo": {
            "name": SERVER_NAME,
            "version": env!("CARGO_PKG_VERSION"),
        },
    })
}

fn resources_list() -> Value {
    json!({
        "resources": [{
            "name": WIDGET_RESOURCE_NAME,
            "uri": WIDGET_TEMPLATE_URI,
            "mimeType": WIDGET_MIME_TYPE,
            "_meta": widget_meta(None),
        }],
        "_meta": widget_meta(None),
    })
}

fn tool_result(cart_id: &CartId, text: String, output: CartToolOutput) -> McpResult<Value> {
    let structured =
        serde_json::to_value(&output).map_err(|error| McpError::Internal(error.to_string()))?;
    Ok(json!({
        "content": [{ "type": "text", "text": text }],
        "structuredContent": structured,
        "_meta": widget_meta(Some(cart_id)),
    }))
}
