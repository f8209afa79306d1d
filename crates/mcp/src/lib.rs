//! Cartsync MCP (Model Context Protocol) adapter
//!
//! Exposes the cart store to a tool-calling model through JSON-RPC 2.0
//! requests, and to the widget through the synchronization entry point.
//!
//! ## Architecture
//!
//! - `CartMcpServer`: method dispatch (`initialize`, `tools/*`, `resources/*`, `ping`)
//! - `tools`: the `add_to_cart` and `checkout` tool catalog and argument types
//! - `assets`: the widget markup collaborator
//! - `protocol`: JSON-RPC envelopes and widget metadata
//! - `sync`: the widget's replace-style synchronization and REST checkout
//!
//! ## Example Usage
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use cartsync_mcp::{assets::FsAssetSource, CartMcpServer};
//! use cartsync_store::InMemoryCartStore;
//!
//! # async fn demo() {
//! let server = CartMcpServer::new(
//!     Arc::new(InMemoryCartStore::new()),
//!     Arc::new(FsAssetSource::locate(None)),
//! );
//! let reply = server.handle_body(br#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#).await;
//! assert!(reply.is_some());
//! # }
//! ```

pub mod assets;
pub mod protocol;
mod server;
pub mod sync;
pub mod tools;

pub use server::CartMcpServer;

use cartsync_store::StoreError;
use thiserror::Error;

use crate::assets::AssetError;

/// Errors surfaced to JSON-RPC callers. Each variant has a stable numeric
/// code and a stable symbolic kind.
#[derive(Error, Debug)]
pub enum McpError {
    #[error("parse error: {0}")]
    Parse(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("method not found: {0}")]
    MethodNotFound(String),

    #[error("unknown tool: {0}")]
    UnknownTool(String),

    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("resource not found: {0}")]
    ResourceNotFound(String),

    #[error("asset unavailable: {0}")]
    AssetUnavailable(#[from] AssetError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl McpError {
    /// Convert to JSON-RPC error code
    pub fn error_code(&self) -> i32 {
        match self {
            McpError::Parse(_) => -32700,
            McpError::InvalidRequest(_) => -32600,
            McpError::MethodNotFound(_) => -32601,
            McpError::UnknownTool(_) | McpError::InvalidArguments(_) => -32602, // Invalid params
            McpError::ResourceNotFound(_) => -32002,
            McpError::AssetUnavailable(_) => -32001, // Server error (collaborator)
            McpError::Internal(_) => -32603,
        }
    }

    /// Symbolic classification, distinct per variant even where codes are shared.
    pub fn kind(&self) -> &'static str {
        match self {
            McpError::Parse(_) => "parse_error",
            McpError::InvalidRequest(_) => "invalid_request",
            McpError::MethodNotFound(_) => "method_not_found",
            McpError::UnknownTool(_) => "unknown_tool",
            McpError::InvalidArguments(_) => "invalid_arguments",
            McpError::ResourceNotFound(_) => "resource_not_found",
            McpError::AssetUnavailable(_) => "asset_unavailable",
            McpError::Internal(_) => "internal_error",
        }
    }
}

impl From<StoreError> for McpError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::Domain(error) => McpError::InvalidArguments(error.to_string()),
        }
    }
}

/// Result type for MCP operations
pub type McpResult<T> = Result<T, McpError>;
