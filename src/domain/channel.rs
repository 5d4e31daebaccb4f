//! Broker channel name.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Name of the channel every session publishes to when none is configured.
pub const DEFAULT_CHANNEL: &str = "chatroom";

/// A named publish/subscribe topic on the broker.
///
/// The relay uses a single process-wide channel shared by every
/// connection. Its lifetime is independent of any session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Channel(String);

impl Channel {
    /// Creates a channel handle for the given topic name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the topic name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Channel {
    fn default() -> Self {
        Self::new(DEFAULT_CHANNEL)
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Channel {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}
