//! Widget-facing synchronization. A sync push replaces the stored cart
//! outright; it never aggregates.

use cartsync_core::domain::cart::CartId;
use cartsync_core::domain::sync::{SyncRequest, SyncResponse, SyncStatus};
use cartsync_core::errors::ApplicationError;
use cartsync_store::CartRepository;
use tracing::info;

/// Stores `request.items` as the definitive state of the cart. `fallback`
/// is used when the request names no cart; a fresh id is generated when
/// neither is present.
pub async fn sync_cart(
    store: &dyn CartRepository,
    request: SyncRequest,
    fallback: Option<CartId>,
) -> Result<SyncResponse, ApplicationError> {
    let cart = store.replace_items(request.cart_id.or(fallback), request.items).await?;
    info!(
        event_name = "cart.sync.replaced",
        cart_id = %cart.id,
        item_count = cart.items.len(),
        "widget sync replaced cart"
    );
    Ok(SyncResponse { status: SyncStatus::Updated, cart_id: cart.id })
}

pub async fn checkout_cart(
    store: &dyn CartRepository,
    cart_id: CartId,
) -> Result<SyncResponse, ApplicationError> {
    let items = store.checkout(&cart_id).await?;
    info!(
        event_name = "cart.sync.checked_out",
        cart_id = %cart_id,
        item_count = items.len(),
        "cart checked out over http"
    );
    Ok(SyncResponse { status: SyncStatus::CheckedOut, cart_id })
}

#[cfg(test)]
mod tests {
    use cartsync_core::domain::cart::{CartId, CartItem};
    use cartsync_core::domain::sync::{SyncRequest, SyncStatus};
    use cartsync_core::errors::{ApplicationError, DomainError};
    use cartsync_store::{CartRepository, InMemoryCartStore};

    use super::{checkout_cart, sync_cart};

    #[tokio::test]
    async fn sync_replaces_rather_than_merges() {
        let store = InMemoryCartStore::new();
        let id = CartId::from("C1");
        store
            .add_items(Some(id.clone()), vec![CartItem::new("Eggs", 2), CartItem::new("Bread", 1)])
            .await
            .expect("seed");

        let request = SyncRequest { cart_id: Some(id.clone()), items: vec![CartItem::new("Eggs", 1)] };
        let response = sync_cart(&store, request, None).await.expect("sync");

        assert_eq!(response.status, SyncStatus::Updated);
        assert_eq!(response.cart_id, id);
        assert_eq!(store.get(&id).await.expect("get"), vec![CartItem::new("Eggs", 1)]);
    }

    #[tokio::test]
    async fn request_id_beats_fallback_and_fallback_beats_generation() {
        let store = InMemoryCartStore::new();

        let explicit = SyncRequest { cart_id: Some(CartId::from("explicit")), items: vec![] };
        let response = sync_cart(&store, explicit, Some(CartId::from("cookie"))).await.expect("sync");
        assert_eq!(response.cart_id, CartId::from("explicit"));

        let implicit = SyncRequest { cart_id: None, items: vec![] };
        let response = sync_cart(&store, implicit, Some(CartId::from("cookie"))).await.expect("sync");
        assert_eq!(response.cart_id, CartId::from("cookie"));

        let fresh = SyncRequest { cart_id: None, items: vec![] };
        let response = sync_cart(&store, fresh, None).await.expect("sync");
        assert!(!response.cart_id.as_str().is_empty());
    }

    #[tokio::test]
    async fn duplicate_names_are_rejected() {
        let store = InMemoryCartStore::new();
        let request = SyncRequest {
            cart_id: Some(CartId::from("C1")),
            items: vec![CartItem::new("Eggs", 1), CartItem::new("Eggs", 2)],
        };

        let error = sync_cart(&store, request, None).await.expect_err("duplicate");
        assert_eq!(
            error,
            ApplicationError::Domain(DomainError::DuplicateItemName("Eggs".to_string()))
        );
    }

    #[tokio::test]
    async fn checkout_reports_checked_out_status() {
        let store = InMemoryCartStore::new();
        let id = CartId::from("C1");
        store.add_items(Some(id.clone()), vec![CartItem::new("Milk", 1)]).await.expect("seed");

        let response = checkout_cart(&store, id.clone()).await.expect("checkout");
        assert_eq!(response.status, SyncStatus::CheckedOut);
        assert!(store.get(&id).await.expect("get").is_empty());
    }
}
