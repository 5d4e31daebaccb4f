//! Broker client contract.
//!
//! The relay does not implement a message broker; it consumes one through
//! the [`Broker`] trait. A broker handle is constructed once, connected at
//! startup, shared by every session as `Arc<dyn Broker>`, and disconnected
//! at shutdown.
//!
//! [`InMemoryBroker`] is the in-process implementation used by the default
//! binary and by the tests.

pub mod memory;

use std::fmt;
use std::pin::Pin;

use async_trait::async_trait;
use futures_util::{Stream, StreamExt};

use crate::domain::Channel;
use crate::error::BrokerError;

pub use memory::InMemoryBroker;

/// Stream of raw payloads delivered to one subscription.
pub type PayloadStream = Pin<Box<dyn Stream<Item = Result<String, BrokerError>> + Send>>;

/// Channel-based publish/subscribe store.
///
/// Implementations must be safe for concurrent use by many publishers and
/// subscribers on the same channel.
#[async_trait]
pub trait Broker: Send + Sync + fmt::Debug {
    /// Opens the process-wide broker connection.
    async fn connect(&self) -> Result<(), BrokerError>;

    /// Closes the broker connection. Live subscriptions end.
    async fn disconnect(&self) -> Result<(), BrokerError>;

    /// Returns `true` while the broker connection is open.
    fn is_connected(&self) -> bool;

    /// Publishes a payload to every live subscriber of `channel`.
    async fn publish(&self, channel: &Channel, payload: String) -> Result<(), BrokerError>;

    /// Subscribes to payloads published on `channel` from now on.
    ///
    /// Dropping the returned [`Subscription`] ends it.
    async fn subscribe(&self, channel: &Channel) -> Result<Subscription, BrokerError>;
}

/// A live subscription to one channel.
///
/// Owned by exactly one consumer. The underlying broker resources are
/// released when the value is dropped, on every exit path of its owner.
pub struct Subscription {
    channel: Channel,
    stream: PayloadStream,
}

impl Subscription {
    /// Wraps a broker payload stream for `channel`.
    #[must_use]
    pub fn new(channel: Channel, stream: PayloadStream) -> Self {
        Self { channel, stream }
    }

    /// Returns the channel this subscription listens on.
    #[must_use]
    pub const fn channel(&self) -> &Channel {
        &self.channel
    }

    /// Waits for the next payload. `None` means the subscription ended.
    ///
    /// Cancel-safe: dropping the returned future loses no payload.
    pub async fn next(&mut self) -> Option<Result<String, BrokerError>> {
        self.stream.next().await
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("channel", &self.channel)
            .finish_non_exhaustive()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        tracing::debug!(channel = %self.channel, "subscription released");
    }
}
