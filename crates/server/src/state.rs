use std::sync::Arc;

use cartsync_mcp::assets::AssetSource;
use cartsync_mcp::CartMcpServer;
use cartsync_store::InMemoryCartStore;

/// Shared by every handler. The store is created once by bootstrap and
/// injected here; there is no process-wide default instance.
#[derive(Clone)]
pub struct AppState {
    pub mcp: CartMcpServer,
    pub store: Arc<InMemoryCartStore>,
    pub assets: Arc<dyn AssetSource>,
}

impl AppState {
    pub fn new(store: Arc<InMemoryCartStore>, assets: Arc<dyn AssetSource>) -> Self {
        let mcp = CartMcpServer::new(store.clone(), Arc::clone(&assets));
        Self { mcp, store, assets }
    }
}
