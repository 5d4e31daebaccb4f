//! System endpoints: health check.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use serde::Serialize;
use utoipa::ToSchema;

use crate::app_state::AppState;

/// Health check response.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// `"healthy"` when the broker is connected and the relay is not
    /// shutting down, `"degraded"` otherwise.
    pub status: String,
    /// Whether the broker connection is open.
    pub broker_connected: bool,
    /// Channel all sessions relay on.
    pub channel: String,
    /// RFC 3339 timestamp of the check.
    pub timestamp: String,
    /// Crate version.
    pub version: String,
}

/// `GET /health` — Service health status.
#[utoipa::path(
    get,
    path = "/health",
    tag = "System",
    summary = "Health check",
    description = "Reports whether the broker connection backing the chat relay is open and the relay accepts connections.",
    responses(
        (status = 200, description = "Relay is healthy", body = HealthResponse),
        (status = 503, description = "Broker is not connected or relay is shutting down", body = HealthResponse),
    )
)]
pub async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let supervisor = &state.supervisor;
    let broker_connected = supervisor.broker().is_connected();
    let (status_code, status) = if broker_connected && !supervisor.is_shutting_down() {
        (StatusCode::OK, "healthy")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded")
    };

    (
        status_code,
        Json(HealthResponse {
            status: status.to_string(),
            broker_connected,
            channel: supervisor.channel().to_string(),
            timestamp: Utc::now().to_rfc3339(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }),
    )
}

/// System routes mounted at the root level.
pub fn routes() -> Router<AppState> {
    Router::new().route("/health", get(health_handler))
}
