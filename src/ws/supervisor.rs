//! Connection supervisor: turns accepted sockets into sessions.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::WebSocket;
use futures_util::{Sink, Stream};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use super::session::{ConnectionSession, DEFAULT_CLOSE_TIMEOUT, SessionReport};
use super::transport::{ClientFrame, split_socket};
use crate::broker::Broker;
use crate::config::RelayConfig;
use crate::domain::{ANONYMOUS, Channel, SessionId};
use crate::error::RelayError;

/// Derives the sender identity from the optional `username` parameter.
///
/// An absent parameter becomes [`ANONYMOUS`]. A present value, even an
/// empty one, is used as given: identities are not validated.
#[must_use]
pub fn resolve_sender(username: Option<String>) -> String {
    username.unwrap_or_else(|| ANONYMOUS.to_string())
}

/// Accepts client connections and runs one [`ConnectionSession`] each.
///
/// Sessions share nothing but the broker handle and the channel name.
/// Every session's cancellation token is a child of the supervisor's, so
/// [`Supervisor::shutdown`] reaches all of them.
#[derive(Debug)]
pub struct Supervisor {
    broker: Arc<dyn Broker>,
    channel: Channel,
    close_timeout: Duration,
    shutdown: CancellationToken,
}

impl Supervisor {
    /// Creates a supervisor relaying on `channel` through `broker`.
    #[must_use]
    pub fn new(broker: Arc<dyn Broker>, channel: Channel) -> Self {
        Self {
            broker,
            channel,
            close_timeout: DEFAULT_CLOSE_TIMEOUT,
            shutdown: CancellationToken::new(),
        }
    }

    /// Creates a supervisor using the channel and timeouts from `config`.
    #[must_use]
    pub fn from_config(broker: Arc<dyn Broker>, config: &RelayConfig) -> Self {
        Self::new(broker, config.channel.clone()).with_close_timeout(config.session_close_timeout)
    }

    /// Sets the bound on each session's transport close.
    #[must_use]
    pub const fn with_close_timeout(mut self, close_timeout: Duration) -> Self {
        self.close_timeout = close_timeout;
        self
    }

    /// Returns the broker handle shared by all sessions.
    #[must_use]
    pub const fn broker(&self) -> &Arc<dyn Broker> {
        &self.broker
    }

    /// Returns the channel all sessions relay on.
    #[must_use]
    pub const fn channel(&self) -> &Channel {
        &self.channel
    }

    /// Cancels every live session and any session started afterwards.
    pub fn shutdown(&self) {
        tracing::info!("cancelling all sessions");
        self.shutdown.cancel();
    }

    /// Returns `true` once [`Supervisor::shutdown`] has been called.
    #[must_use]
    pub fn is_shutting_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// Runs a session over a socket the HTTP layer has already upgraded.
    pub async fn on_connect(&self, socket: WebSocket, username: Option<String>) -> SessionReport {
        let (reader, writer) = split_socket(socket);
        self.run_session(reader, writer, username).await
    }

    /// Runs a session over any frame reader and text writer.
    ///
    /// Returns when both duties have stopped.
    pub async fn run_session<R, W>(
        &self,
        reader: R,
        writer: W,
        username: Option<String>,
    ) -> SessionReport
    where
        R: Stream<Item = Result<ClientFrame, RelayError>> + Send + Unpin + 'static,
        W: Sink<String, Error = RelayError> + Send + Unpin + 'static,
    {
        let sender = resolve_sender(username);
        let id = SessionId::new();
        let span = tracing::info_span!("session", session_id = %id, username = %sender);

        let session = ConnectionSession::new(id, sender, Arc::clone(&self.broker), self.channel.clone())
            .with_close_timeout(self.close_timeout)
            .with_cancellation(self.shutdown.child_token());

        async move {
            tracing::info!("client connected");
            session.start(reader, writer).await
        }
        .instrument(span)
        .await
    }
}
