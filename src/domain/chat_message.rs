//! Chat message record published on the broker channel.
//!
//! The wire shape is a compact JSON object with exactly two fields:
//!
//! ```json
//! {"username": "alice", "message": "hello"}
//! ```
//!
//! Both relay directions agree on this shape: the inbound duty encodes it,
//! the outbound duty checks received payloads against it.

use serde::{Deserialize, Serialize};

use crate::error::RelayError;

/// Sender identity used when a client connects without a `username`.
pub const ANONYMOUS: &str = "Anonymous";

/// One chat line tagged with the identity of the connection that sent it.
///
/// The sender is whatever the client supplied at connect time. It is not
/// authenticated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Identity of the publishing connection.
    #[serde(rename = "username")]
    pub sender: String,
    /// Opaque text body.
    #[serde(rename = "message")]
    pub body: String,
}

impl ChatMessage {
    /// Creates a message from a sender identity and a body.
    #[must_use]
    pub fn new(sender: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            sender: sender.into(),
            body: body.into(),
        }
    }

    /// Serializes the message into its channel payload.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Codec`] if serialization fails.
    pub fn encode(&self) -> Result<String, RelayError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parses a channel payload back into a message.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Codec`] if the payload is not a JSON object
    /// with string `username` and `message` fields.
    pub fn decode(payload: &str) -> Result<Self, RelayError> {
        Ok(serde_json::from_str(payload)?)
    }
}
