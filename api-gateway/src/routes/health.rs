use axum::{Json, extract::State, http::StatusCode};
use serde_json::json;

use ledger::{BlockRegistry, WalletResolver};

use crate::routes::ApiEnvelope;
use crate::state::SharedState;

/// `GET /health`
///
/// Returns a basic envelope indicating liveness.
pub async fn health() -> (StatusCode, Json<ApiEnvelope>) {
    (
        StatusCode::OK,
        Json(ApiEnvelope::ok(json!({"status": "ok"}), None)),
    )
}

/// `GET /status`
///
/// Reports the node's wallet address and the current registry tip.
pub async fn status(State(state): State<SharedState>) -> (StatusCode, Json<ApiEnvelope>) {
    let registry = state.registry.lock().await;
    let body = json!({
        "address": hex::encode(state.wallets.primary_address()),
        "tip": registry.tip(),
        "blocks": registry.len(),
    });
    (StatusCode::OK, Json(ApiEnvelope::ok(body, None)))
}
