//! REST surface used by the widget: full-snapshot sync and checkout.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, HeaderMap, HeaderValue},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use cartsync_core::domain::cart::CartId;
use cartsync_core::domain::sync::{SyncRequest, SyncResponse};
use cartsync_mcp::sync::{checkout_cart, sync_cart};
use serde::Deserialize;
use tracing::warn;

use crate::routes::ApiError;
use crate::state::AppState;

pub const SESSION_COOKIE: &str = "cart_session";

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    #[serde(default)]
    pub cart_id: Option<CartId>,
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/sync_cart", post(sync)).route("/checkout", post(checkout))
}

/// Sticky default cart for callers that send no `cartId`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartSession {
    pub id: CartId,
    pub is_new: bool,
}

impl CartSession {
    pub fn resolve(headers: &HeaderMap) -> Self {
        match session_cookie(headers) {
            Some(id) => Self { id, is_new: false },
            None => Self { id: CartId::generate(), is_new: true },
        }
    }

    fn attach(&self, response: SyncResponse) -> Response {
        let mut response = Json(response).into_response();
        if self.is_new {
            match HeaderValue::from_str(&format!("{SESSION_COOKIE}={}; Path=/; HttpOnly", self.id)) {
                Ok(value) => {
                    response.headers_mut().insert(header::SET_COOKIE, value);
                }
                Err(error) => {
                    warn!(event_name = "http.session.cookie_invalid", error = %error, "session cookie not set")
                }
            }
        }
        response
    }
}

fn session_cookie(headers: &HeaderMap) -> Option<CartId> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.trim())
        .filter(|value| !value.is_empty())
        .map(CartId::from)
}

async fn sync(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<SyncRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = body?;
    let session = CartSession::resolve(&headers);
    let response = sync_cart(state.store.as_ref(), request, Some(session.id.clone())).await?;
    Ok(session.attach(response))
}

async fn checkout(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<CheckoutRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = body?;
    let session = CartSession::resolve(&headers);
    let cart_id = request.cart_id.unwrap_or_else(|| session.id.clone());
    let response = checkout_cart(state.store.as_ref(), cart_id).await?;
    Ok(session.attach(response))
}
