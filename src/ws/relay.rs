//! The two relay duties of a connection session.
//!
//! - [`InboundRelay`] moves chat lines from the client to the broker.
//! - [`OutboundRelay`] moves broker payloads to the client.
//!
//! Each duty watches a [`CancellationToken`] at every suspension point so a
//! blocked read, write, publish or receive is interrupted as soon as the
//! sibling duty ends.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{Sink, SinkExt, Stream, StreamExt};
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

use super::transport::ClientFrame;
use crate::broker::{Broker, Subscription};
use crate::domain::{Channel, ChatMessage};
use crate::error::RelayError;

/// Identifies one of the two duties of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Duty {
    /// Client → broker.
    Inbound,
    /// Broker → client.
    Outbound,
}

impl fmt::Display for Duty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Inbound => f.write_str("inbound"),
            Self::Outbound => f.write_str("outbound"),
        }
    }
}

/// Terminal state of a duty. Every duty ends in exactly one of these.
#[derive(Debug)]
pub enum DutyOutcome {
    /// The duty reached its natural end (client closed, stream ended).
    Finished,
    /// The duty stopped because a transport or broker operation failed.
    Failed(RelayError),
    /// The duty was interrupted by its session's cancellation token.
    Cancelled,
}

impl DutyOutcome {
    /// Returns `true` if the duty was cancelled.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Returns the failure, if the duty failed.
    #[must_use]
    pub const fn error(&self) -> Option<&RelayError> {
        match self {
            Self::Failed(err) => Some(err),
            Self::Finished | Self::Cancelled => None,
        }
    }
}

/// Client → broker duty.
#[derive(Debug)]
pub struct InboundRelay {
    broker: Arc<dyn Broker>,
    channel: Channel,
    sender: String,
    subscribed: Option<oneshot::Receiver<()>>,
}

impl InboundRelay {
    /// Creates an inbound duty publishing as `sender` on `channel`.
    #[must_use]
    pub fn new(broker: Arc<dyn Broker>, channel: Channel, sender: String) -> Self {
        Self {
            broker,
            channel,
            sender,
            subscribed: None,
        }
    }

    /// Holds off reading until `subscribed` fires, so the connection's own
    /// first lines are not published before it listens to the channel.
    ///
    /// If the signal is dropped unsent the duty idles until cancelled.
    #[must_use]
    pub fn after_subscribed(mut self, subscribed: oneshot::Receiver<()>) -> Self {
        self.subscribed = Some(subscribed);
        self
    }

    /// Reads frames until the client goes away, publishing each text frame
    /// as a [`ChatMessage`] in the order it was read.
    pub async fn run<R>(mut self, mut reader: R, token: CancellationToken) -> DutyOutcome
    where
        R: Stream<Item = Result<ClientFrame, RelayError>> + Unpin,
    {
        if let Some(subscribed) = self.subscribed.take() {
            let ready = tokio::select! {
                biased;
                () = token.cancelled() => return DutyOutcome::Cancelled,
                ready = subscribed => ready.is_ok(),
            };
            if !ready {
                token.cancelled().await;
                return DutyOutcome::Cancelled;
            }
        }

        loop {
            let frame = tokio::select! {
                biased;
                () = token.cancelled() => return DutyOutcome::Cancelled,
                frame = reader.next() => frame,
            };

            let body = match frame {
                Some(Ok(ClientFrame::Text(body))) => body,
                Some(Ok(ClientFrame::Close)) | None => {
                    tracing::debug!("client closed connection");
                    return DutyOutcome::Finished;
                }
                Some(Err(err)) => return DutyOutcome::Failed(err),
            };

            let payload = match ChatMessage::new(self.sender.as_str(), body).encode() {
                Ok(payload) => payload,
                Err(err) => return DutyOutcome::Failed(err),
            };

            tokio::select! {
                biased;
                () = token.cancelled() => return DutyOutcome::Cancelled,
                result = self.broker.publish(&self.channel, payload) => {
                    if let Err(err) = result {
                        return DutyOutcome::Failed(err.into());
                    }
                }
            }
        }
    }
}

/// Broker → client duty.
#[derive(Debug)]
pub struct OutboundRelay {
    broker: Arc<dyn Broker>,
    channel: Channel,
    close_timeout: Duration,
    on_subscribed: Option<oneshot::Sender<()>>,
}

impl OutboundRelay {
    /// Creates an outbound duty forwarding `channel` to the client.
    ///
    /// `close_timeout` bounds the transport close issued when the duty
    /// ends.
    #[must_use]
    pub fn new(broker: Arc<dyn Broker>, channel: Channel, close_timeout: Duration) -> Self {
        Self {
            broker,
            channel,
            close_timeout,
            on_subscribed: None,
        }
    }

    /// Fires `on_subscribed` once the channel subscription is open.
    #[must_use]
    pub fn notify_subscribed(mut self, on_subscribed: oneshot::Sender<()>) -> Self {
        self.on_subscribed = Some(on_subscribed);
        self
    }

    /// Subscribes to the channel and forwards every payload to the client,
    /// its own echoes included, until the subscription ends, a write fails
    /// or the duty is cancelled. The subscription is released and the
    /// writer closed on every exit path.
    pub async fn run<W>(mut self, mut writer: W, token: CancellationToken) -> DutyOutcome
    where
        W: Sink<String, Error = RelayError> + Unpin,
    {
        let subscribed = tokio::select! {
            biased;
            () = token.cancelled() => None,
            result = self.broker.subscribe(&self.channel) => Some(result),
        };

        let outcome = match subscribed {
            None => DutyOutcome::Cancelled,
            Some(Err(err)) => DutyOutcome::Failed(err.into()),
            Some(Ok(subscription)) => {
                if let Some(on_subscribed) = self.on_subscribed.take() {
                    // The inbound side may already be gone.
                    let _ = on_subscribed.send(());
                }
                forward(subscription, &mut writer, &token).await
            }
        };

        match tokio::time::timeout(self.close_timeout, writer.close()).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => tracing::debug!(error = %err, "transport already closed"),
            Err(_) => tracing::debug!("transport close timed out"),
        }

        outcome
    }
}

/// Drains `subscription` into `writer`. The subscription is dropped, and
/// therefore released, when this returns.
async fn forward<W>(
    mut subscription: Subscription,
    writer: &mut W,
    token: &CancellationToken,
) -> DutyOutcome
where
    W: Sink<String, Error = RelayError> + Unpin,
{
    loop {
        let item = tokio::select! {
            biased;
            () = token.cancelled() => return DutyOutcome::Cancelled,
            item = subscription.next() => item,
        };

        let payload = match item {
            Some(Ok(payload)) => payload,
            Some(Err(err)) => return DutyOutcome::Failed(err.into()),
            None => {
                tracing::debug!(channel = %subscription.channel(), "subscription ended");
                return DutyOutcome::Finished;
            }
        };

        if let Err(err) = ChatMessage::decode(&payload) {
            tracing::warn!(error = %err, "dropping malformed broker payload");
            continue;
        }

        tokio::select! {
            biased;
            () = token.cancelled() => return DutyOutcome::Cancelled,
            result = writer.send(payload) => {
                if let Err(err) = result {
                    return DutyOutcome::Failed(err);
                }
            }
        }
    }
}
