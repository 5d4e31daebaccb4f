//! OpenAPI document for the relay's HTTP routes.
//!
//! The `/ws` endpoint is an upgrade, not a REST call, so only the plain HTTP
//! routes are described here.

use utoipa::OpenApi;

use super::handlers::system::{self, HealthResponse};

/// Aggregated OpenAPI schema.
#[derive(Debug, OpenApi)]
#[openapi(
    info(
        title = "chat-relay",
        description = "WebSocket chat relay. Connect to `GET /ws?username=<name>` to chat."
    ),
    paths(system::health_handler),
    components(schemas(HealthResponse)),
    tags((name = "System", description = "Service health"))
)]
pub struct ApiDoc;
