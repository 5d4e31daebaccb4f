//! Relay error types with HTTP status code mapping.
//!
//! [`RelayError`] is the central error type for the relay. Inside a
//! connection session it only ever describes why a duty ended; it never
//! escapes the session. On the HTTP surface each variant maps to a status
//! code and a structured JSON error response.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

/// Structured JSON error response body.
///
/// All error responses follow this shape:
/// ```json
/// {
///   "error": {
///     "code": 2001,
///     "message": "broker error: broker is not connected",
///     "details": null
///   }
/// }
/// ```
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Structured error payload.
    pub error: ErrorBody,
}

/// Inner error body with numeric code and human-readable message.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Numeric error code.
    pub code: u32,
    /// Human-readable error message.
    pub message: String,
    /// Optional additional details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Failures reported by a [`crate::broker::Broker`] implementation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BrokerError {
    /// The broker handle has not been connected, or was disconnected.
    #[error("broker is not connected")]
    NotConnected,

    /// Publishing a payload to a channel failed.
    #[error("publish to channel {channel} failed: {reason}")]
    Publish {
        /// Channel the payload was addressed to.
        channel: String,
        /// Broker-specific failure description.
        reason: String,
    },

    /// Opening or reading a subscription failed.
    #[error("subscription to channel {channel} failed: {reason}")]
    Subscribe {
        /// Channel the subscription targets.
        channel: String,
        /// Broker-specific failure description.
        reason: String,
    },
}

/// Relay error enum with HTTP status code mapping.
///
/// # Error Code Ranges
///
/// | Range     | Category  | HTTP Status               |
/// |-----------|-----------|---------------------------|
/// | 1000–1999 | Transport | 400 Bad Request           |
/// | 2000–2999 | Broker    | 503 Service Unavailable   |
/// | 3000–3999 | Server    | 500 / 503                 |
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// Reading from or writing to the client transport failed.
    #[error("transport error: {0}")]
    Transport(String),

    /// The broker collaborator failed.
    #[error("broker error: {0}")]
    Broker(#[from] BrokerError),

    /// A chat message could not be encoded or decoded.
    #[error("codec error: {0}")]
    Codec(#[from] serde_json::Error),

    /// Internal error (e.g. a relay task panicked).
    #[error("internal error: {0}")]
    Internal(String),

    /// The relay is shutting down and accepts no new connections.
    #[error("relay is shutting down")]
    ShuttingDown,
}

impl RelayError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::Transport(_) => 1001,
            Self::Broker(BrokerError::NotConnected) => 2001,
            Self::Broker(BrokerError::Publish { .. }) => 2002,
            Self::Broker(BrokerError::Subscribe { .. }) => 2003,
            Self::Codec(_) => 3001,
            Self::Internal(_) => 3000,
            Self::ShuttingDown => 3002,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::Transport(_) => StatusCode::BAD_REQUEST,
            Self::Broker(_) | Self::ShuttingDown => StatusCode::SERVICE_UNAVAILABLE,
            Self::Codec(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns `true` for failures that are an ordinary way for a client
    /// connection to end (the peer went away), as opposed to relay faults.
    #[must_use]
    pub const fn is_disconnect(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

impl From<axum::Error> for RelayError {
    fn from(err: axum::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.error_code(),
                message: self.to_string(),
                details: None,
            },
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
    }
}
