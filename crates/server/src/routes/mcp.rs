use axum::{
    body::Bytes,
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};

use crate::state::AppState;

const SSE_ENDPOINT_EVENT: &str = "event: endpoint\ndata: /mcp\n\n";

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", post(handle_mcp).get(handle_mcp_sse))
        .route("/mcp", post(handle_mcp).get(handle_mcp_sse))
        .route("/mcp/", post(handle_mcp).get(handle_mcp_sse))
}

/// Tells SSE-capable clients where to POST.
async fn handle_mcp_sse() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "text/event-stream")], SSE_ENDPOINT_EVENT)
}

async fn handle_mcp(State(state): State<AppState>, body: Bytes) -> Response {
    match state.mcp.handle_body(&body).await {
        Some(reply) => {
            // Envelope failures never reached dispatch.
            let malformed =
                reply.error.as_ref().is_some_and(|error| matches!(error.code, -32700 | -32600));
            let status = if malformed { StatusCode::BAD_REQUEST } else { StatusCode::OK };
            (status, Json(reply)).into_response()
        }
        None => StatusCode::ACCEPTED.into_response(),
    }
}
