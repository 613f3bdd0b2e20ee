use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Deserialize;
use serde_json::json;

use ledger::{Block, BlockRegistry};

use crate::routes::ApiEnvelope;
use crate::state::SharedState;

/// `GET /block/{block_num}`
///
/// Returns a summary of the stored block at the given height.
pub async fn get_block(
    State(state): State<SharedState>,
    Path(block_num): Path<u64>,
) -> (StatusCode, Json<ApiEnvelope>) {
    let registry = state.registry.lock().await;
    match registry.get_block(block_num) {
        Some(block) => (
            StatusCode::OK,
            Json(ApiEnvelope::ok(block_details(&block), None)),
        ),
        None => (
            StatusCode::NOT_FOUND,
            Json(ApiEnvelope::fail(
                404,
                format!("block {block_num} not found"),
                None,
            )),
        ),
    }
}

fn block_details(block: &Block) -> serde_json::Value {
    json!({
        "version": block.version,
        "block_num": block.block_num,
        "checksum": block.block_checksum.as_deref().map(hex::encode),
        "last_block_checksum": block.last_block_checksum_display(),
        "wallet_state_checksum": block.wallet_state_checksum.as_deref().map(hex::encode),
        "signature_freeze_checksum": block.signature_freeze_checksum.as_deref().map(hex::encode),
        "transaction_count": block.transactions.len(),
        "signature_count": block.signatures.len(),
        "unique_signature_count": block.get_unique_signature_count(),
        "difficulty": block.difficulty,
        "timestamp": block.timestamp,
        "is_genesis": block.is_genesis(),
    })
}

/// Request body for `POST /block`.
///
/// The block travels as the hex encoding of its canonical byte form; the
/// optional `id` is echoed back in the response envelope.
#[derive(Debug, Deserialize)]
pub struct SubmitBlockRequest {
    pub block_hex: String,
    pub id: Option<String>,
}

/// `POST /block`
///
/// Decodes a canonical block payload, re-verifies its signature set, and
/// stores it in the registry. Payloads that fail to decode or retain no
/// valid signature are rejected.
pub async fn submit_block(
    State(state): State<SharedState>,
    Json(body): Json<SubmitBlockRequest>,
) -> (StatusCode, Json<ApiEnvelope>) {
    let id = body.id.clone();

    let bytes = match hex::decode(&body.block_hex) {
        Ok(bytes) => bytes,
        Err(_) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ApiEnvelope::fail(400, "invalid hex encoding", id)),
            );
        }
    };

    let block = match Block::from_bytes(&bytes) {
        Ok(block) => {
            state.metrics.blocks.decoded_total.inc();
            block
        }
        Err(e) => {
            state.metrics.blocks.decode_failures_total.inc();
            return (
                StatusCode::BAD_REQUEST,
                Json(ApiEnvelope::fail(400, format!("invalid block payload: {e}"), id)),
            );
        }
    };

    let before = block.signatures.len() as u64;
    let start = std::time::Instant::now();
    let valid = block.verify_signatures(&state.crypto, &state.wallets);
    state
        .metrics
        .blocks
        .verify_seconds
        .observe(start.elapsed().as_secs_f64());

    let after = block.signatures.len() as u64;
    state.metrics.blocks.signatures_verified_total.inc_by(after);
    state
        .metrics
        .blocks
        .signatures_rejected_total
        .inc_by(before - after);

    if !valid {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(ApiEnvelope::fail(
                422,
                "block retains no valid signature",
                id,
            )),
        );
    }

    let block_num = block.block_num;
    state.registry.lock().await.put_block(block);
    tracing::info!(block_num, "accepted block via API");

    (
        StatusCode::ACCEPTED,
        Json(ApiEnvelope::ok(
            json!({"status": "accepted", "block_num": block_num}),
            id,
        )),
    )
}
