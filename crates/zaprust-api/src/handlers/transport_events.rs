//! Inbound webhook for transport bridge events
//!
//! The bridge signs each delivery with the shared webhook secret; anything
//! that fails verification is dropped before the payload is even parsed.

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
};
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;
use zaprust_core::session::bridge::verify_signature;
use zaprust_core::TransportEvent;

use crate::state::AppState;

const SIGNATURE_HEADER: &str = "x-webhook-signature";

/// Receive a transport event for one account
///
/// POST /transport/events/:account_id
pub async fn receive_event(
    State(state): State<Arc<AppState>>,
    Path(account_id): Path<Uuid>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    if !verify_signature(state.bridge.secret(), &body, signature) {
        warn!(%account_id, "Rejected transport event with a bad signature");
        return StatusCode::UNAUTHORIZED;
    }

    let event: TransportEvent = match serde_json::from_slice(&body) {
        Ok(event) => event,
        Err(e) => {
            warn!(%account_id, "Malformed transport event: {}", e);
            return StatusCode::BAD_REQUEST;
        }
    };

    if state.bridge.deliver_event(account_id, event).await {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}
