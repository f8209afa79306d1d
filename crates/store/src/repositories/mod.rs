use async_trait::async_trait;
use thiserror::Error;

use cartsync_core::domain::cart::{Cart, CartId, CartItem};
use cartsync_core::errors::{ApplicationError, DomainError};

pub mod memory;

pub use memory::InMemoryCartStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Domain(#[from] DomainError),
}

impl From<StoreError> for ApplicationError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::Domain(error) => ApplicationError::Domain(error),
        }
    }
}

/// The authoritative cart state. Every operation addressing one cart id is
/// linearizable with every other operation on that id; operations on
/// different ids do not wait on each other.
#[async_trait]
pub trait CartRepository: Send + Sync {
    /// Items of the cart, or an empty list for an id the store has never seen.
    async fn get(&self, cart_id: &CartId) -> Result<Vec<CartItem>, StoreError>;

    /// Aggregating add. Generates an id when none is supplied.
    async fn add_items(
        &self,
        cart_id: Option<CartId>,
        items: Vec<CartItem>,
    ) -> Result<Cart, StoreError>;

    /// Unconditional overwrite with exactly `items`. Generates an id when none
    /// is supplied.
    async fn replace_items(
        &self,
        cart_id: Option<CartId>,
        items: Vec<CartItem>,
    ) -> Result<Cart, StoreError>;

    /// Returns the items held immediately before clearing. The id stays valid.
    async fn checkout(&self, cart_id: &CartId) -> Result<Vec<CartItem>, StoreError>;
}
