use std::sync::Arc;

use async_trait::async_trait;
use cartsync_core::domain::sync::{SyncRequest, SyncResponse, SyncStatus};
use cartsync_store::{CartRepository, StoreError};
use reqwest::Client;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("sync request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("sync endpoint returned {0}")]
    Status(reqwest::StatusCode),

    #[error("sync response could not be decoded: {0}")]
    Decode(#[source] reqwest::Error),

    #[error("sync rejected by store: {0}")]
    Store(#[from] StoreError),
}

/// Outbound half of the widget: pushes a full snapshot as the definitive
/// cart state.
#[async_trait]
pub trait CartSyncClient: Send + Sync {
    async fn push(&self, request: SyncRequest) -> Result<SyncResponse, SyncError>;
}

/// Posts snapshots to `<base_url>/sync_cart`.
#[derive(Clone, Debug)]
pub struct HttpCartSync {
    client: Client,
    endpoint: String,
}

impl HttpCartSync {
    pub fn new(base_url: &str) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(client: Client, base_url: &str) -> Self {
        Self { client, endpoint: format!("{}/sync_cart", base_url.trim_end_matches('/')) }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl CartSyncClient for HttpCartSync {
    async fn push(&self, request: SyncRequest) -> Result<SyncResponse, SyncError> {
        let response =
            self.client.post(&self.endpoint).json(&request).send().await.map_err(|error| {
                error!(event_name = "widget.sync.transport", error = %error, "sync request failed");
                SyncError::Transport(error)
            })?;

        if !response.status().is_success() {
            return Err(SyncError::Status(response.status()));
        }

        response.json().await.map_err(SyncError::Decode)
    }
}

/// Replaces carts directly in an in-process store.
#[derive(Clone)]
pub struct StoreCartSync {
    store: Arc<dyn CartRepository>,
}

impl StoreCartSync {
    pub fn new(store: Arc<dyn CartRepository>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl CartSyncClient for StoreCartSync {
    async fn push(&self, request: SyncRequest) -> Result<SyncResponse, SyncError> {
        let cart = self.store.replace_items(request.cart_id, request.items).await?;
        Ok(SyncResponse { status: SyncStatus::Updated, cart_id: cart.id })
    }
}
