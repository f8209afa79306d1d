use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

use cartsync_core::domain::cart::{Cart, CartId, CartItem};
use cartsync_core::merge::{aggregate_items, drop_empty_lines, validate_items, validate_snapshot};

use super::{CartRepository, StoreError};

type CartSlot = Arc<Mutex<Vec<CartItem>>>;

/// Process-lifetime cart storage. The outer map is only write-locked to
/// create a slot; each cart's read-modify-write runs under its own mutex.
#[derive(Default)]
pub struct InMemoryCartStore {
    carts: RwLock<HashMap<CartId, CartSlot>>,
}

impl InMemoryCartStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of cart ids created so far. Checked-out carts still count.
    pub async fn cart_count(&self) -> usize {
        self.carts.read().await.len()
    }

    async fn existing_slot(&self, cart_id: &CartId) -> Option<CartSlot> {
        self.carts.read().await.get(cart_id).cloned()
    }

    async fn slot(&self, cart_id: &CartId) -> CartSlot {
        if let Some(slot) = self.existing_slot(cart_id).await {
            return slot;
        }

        let mut carts = self.carts.write().await;
        carts.entry(cart_id.clone()).or_default().clone()
    }
}

#[async_trait::async_trait]
impl CartRepository for InMemoryCartStore {
    async fn get(&self, cart_id: &CartId) -> Result<Vec<CartItem>, StoreError> {
        match self.existing_slot(cart_id).await {
            Some(slot) => Ok(slot.lock().await.clone()),
            None => Ok(Vec::new()),
        }
    }

    async fn add_items(
        &self,
        cart_id: Option<CartId>,
        items: Vec<CartItem>,
    ) -> Result<Cart, StoreError> {
        validate_items(&items)?;
        let cart_id = CartId::or_generate(cart_id);
        let slot = self.slot(&cart_id).await;

        let mut cart_items = slot.lock().await;
        let incoming = items.len();
        aggregate_items(&mut cart_items, items);
        let snapshot = Cart::new(cart_id, cart_items.clone());
        drop(cart_items);

        debug!(
            event_name = "cart.store.add_items",
            cart_id = %snapshot.id,
            incoming,
            line_count = snapshot.items.len(),
            "items aggregated into cart"
        );
        Ok(snapshot)
    }

    async fn replace_items(
        &self,
        cart_id: Option<CartId>,
        mut items: Vec<CartItem>,
    ) -> Result<Cart, StoreError> {
        validate_snapshot(&items)?;
        drop_empty_lines(&mut items);
        let cart_id = CartId::or_generate(cart_id);
        let slot = self.slot(&cart_id).await;

        let mut cart_items = slot.lock().await;
        *cart_items = items;
        let snapshot = Cart::new(cart_id, cart_items.clone());
        drop(cart_items);

        debug!(
            event_name = "cart.store.replace_items",
            cart_id = %snapshot.id,
            line_count = snapshot.items.len(),
            "cart overwritten with client snapshot"
        );
        Ok(snapshot)
    }

    async fn checkout(&self, cart_id: &CartId) -> Result<Vec<CartItem>, StoreError> {
        let Some(slot) = self.existing_slot(cart_id).await else {
            debug!(event_name = "cart.store.checkout_unknown", cart_id = %cart_id, "nothing to check out");
            return Ok(Vec::new());
        };

        let checked_out = std::mem::take(&mut *slot.lock().await);
        info!(
            event_name = "cart.store.checkout",
            cart_id = %cart_id,
            line_count = checked_out.len(),
            "cart checked out and cleared"
        );
        Ok(checked_out)
    }
}
