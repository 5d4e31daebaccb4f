//! Axum WebSocket upgrade handler.

use std::sync::Arc;

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{Query, State};
use axum::response::Response;
use serde::Deserialize;

use crate::app_state::AppState;
use crate::error::{BrokerError, RelayError};

/// Query parameters accepted on `GET /ws`.
#[derive(Debug, Default, Deserialize)]
pub struct ConnectParams {
    /// Display name the client chats under. Not authenticated.
    pub username: Option<String>,
}

/// `GET /ws?username=<name>` — Upgrade HTTP connection to WebSocket and
/// relay it to the chat channel until either side goes away.
///
/// # Errors
///
/// Refuses the upgrade with `503` once shutdown has begun
/// ([`RelayError::ShuttingDown`]) or while the broker is not connected
/// ([`BrokerError::NotConnected`]).
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<ConnectParams>,
    State(state): State<AppState>,
) -> Result<Response, RelayError> {
    let supervisor = Arc::clone(&state.supervisor);
    if supervisor.is_shutting_down() {
        return Err(RelayError::ShuttingDown);
    }
    if !supervisor.broker().is_connected() {
        return Err(BrokerError::NotConnected.into());
    }

    Ok(ws.on_upgrade(move |socket| async move {
        supervisor.on_connect(socket, params.username).await;
    }))
}
