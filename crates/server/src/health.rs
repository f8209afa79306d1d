use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use cartsync_mcp::assets::WIDGET_ASSET;
use chrono::Utc;
use serde::Serialize;

use crate::state::AppState;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: HealthCheck,
    pub store: HealthCheck,
    pub assets: HealthCheck,
    pub checked_at: String,
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/health", get(health))
}

pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let carts = state.store.cart_count().await;
    let assets = match state.assets.load(WIDGET_ASSET).await {
        Ok(asset) => HealthCheck {
            status: "ready",
            detail: format!("widget template loaded ({} bytes)", asset.content.len()),
        },
        Err(error) => HealthCheck { status: "degraded", detail: error.to_string() },
    };
    let ready = assets.status == "ready";

    let payload = HealthResponse {
        status: if ready { "ready" } else { "degraded" },
        service: HealthCheck { status: "ready", detail: "cartsync-server runtime initialized".to_string() },
        store: HealthCheck { status: "ready", detail: format!("{carts} cart(s) held in memory") },
        assets,
        checked_at: Utc::now().to_rfc3339(),
    };

    let status_code = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status_code, Json(payload))
}
