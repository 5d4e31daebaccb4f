//! Connection session: runs one client's two relay duties as a unit.
//!
//! Both duties are spawned into a [`JoinSet`] sharing one
//! [`CancellationToken`]. The first duty to end cancels the token; the
//! session then joins the other one before returning. Dropping a session
//! future mid-flight aborts both duties.
//!
//! The inbound duty starts reading only once the outbound subscription is
//! open, so a client always receives its own first line.

use std::sync::Arc;
use std::time::Duration;

use futures_util::{Sink, Stream};
use tokio::sync::oneshot;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use super::relay::{Duty, DutyOutcome, InboundRelay, OutboundRelay};
use super::transport::ClientFrame;
use crate::broker::Broker;
use crate::domain::{Channel, SessionId};
use crate::error::RelayError;

/// Close timeout used when none is configured.
pub const DEFAULT_CLOSE_TIMEOUT: Duration = Duration::from_secs(1);

/// How both duties of a finished session ended.
#[derive(Debug)]
pub struct SessionReport {
    /// Session the report belongs to.
    pub session_id: SessionId,
    /// The duty whose end triggered teardown.
    pub ended_first: Duty,
    /// Terminal state of the client → broker duty.
    pub inbound: DutyOutcome,
    /// Terminal state of the broker → client duty.
    pub outbound: DutyOutcome,
}

impl SessionReport {
    fn outcome(&self, duty: Duty) -> &DutyOutcome {
        match duty {
            Duty::Inbound => &self.inbound,
            Duty::Outbound => &self.outbound,
        }
    }

    /// Returns the failure that ended the session, if it was not an
    /// ordinary disconnect or cancellation.
    #[must_use]
    pub fn fault(&self) -> Option<&RelayError> {
        self.outcome(self.ended_first)
            .error()
            .filter(|err| !err.is_disconnect())
    }
}

/// One accepted client connection and its sender identity.
#[derive(Debug)]
pub struct ConnectionSession {
    id: SessionId,
    sender: String,
    broker: Arc<dyn Broker>,
    channel: Channel,
    close_timeout: Duration,
    token: CancellationToken,
}

impl ConnectionSession {
    /// Creates a session that will publish as `sender` on `channel`.
    #[must_use]
    pub fn new(id: SessionId, sender: String, broker: Arc<dyn Broker>, channel: Channel) -> Self {
        Self {
            id,
            sender,
            broker,
            channel,
            close_timeout: DEFAULT_CLOSE_TIMEOUT,
            token: CancellationToken::new(),
        }
    }

    /// Sets the bound on the transport close performed at teardown.
    #[must_use]
    pub const fn with_close_timeout(mut self, close_timeout: Duration) -> Self {
        self.close_timeout = close_timeout;
        self
    }

    /// Uses `token` as the session's cancellation token. Pass a child of a
    /// process-wide token so shutdown reaches every session.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.token = token;
        self
    }

    /// Returns the session identifier.
    #[must_use]
    pub const fn id(&self) -> SessionId {
        self.id
    }

    /// Returns the sender identity bound to this session.
    #[must_use]
    pub fn sender(&self) -> &str {
        &self.sender
    }

    /// Runs both relay duties over an already-upgraded transport.
    ///
    /// Returns once both duties have stopped, the broker subscription has
    /// been released and the writer has been closed. Client frames are not
    /// read before the subscription is open. A client disconnect
    /// is an ordinary outcome, reported rather than raised.
    pub async fn start<R, W>(self, reader: R, writer: W) -> SessionReport
    where
        R: Stream<Item = Result<ClientFrame, RelayError>> + Send + Unpin + 'static,
        W: Sink<String, Error = RelayError> + Send + Unpin + 'static,
    {
        let span = tracing::Span::current();
        let (subscribed_tx, subscribed_rx) = oneshot::channel();
        let inbound = InboundRelay::new(
            Arc::clone(&self.broker),
            self.channel.clone(),
            self.sender.clone(),
        )
        .after_subscribed(subscribed_rx);
        let outbound = OutboundRelay::new(
            Arc::clone(&self.broker),
            self.channel.clone(),
            self.close_timeout,
        )
        .notify_subscribed(subscribed_tx);

        let mut duties = JoinSet::new();
        let inbound_task = {
            let token = self.token.clone();
            duties.spawn(
                async move { (Duty::Inbound, inbound.run(reader, token).await) }
                    .instrument(span.clone()),
            )
        };
        let outbound_task = {
            let token = self.token.clone();
            duties.spawn(
                async move { (Duty::Outbound, outbound.run(writer, token).await) }
                    .instrument(span),
            )
        };

        let mut ended_first = None;
        let mut inbound_outcome = None;
        let mut outbound_outcome = None;

        while let Some(joined) = duties.join_next_with_id().await {
            let (duty, outcome) = match joined {
                Ok((_, finished)) => finished,
                Err(err) => {
                    let duty = if err.id() == inbound_task.id() {
                        Duty::Inbound
                    } else if err.id() == outbound_task.id() {
                        Duty::Outbound
                    } else {
                        continue;
                    };
                    (
                        duty,
                        DutyOutcome::Failed(RelayError::Internal(format!(
                            "{duty} duty aborted: {err}"
                        ))),
                    )
                }
            };

            if ended_first.is_none() {
                ended_first = Some(duty);
                tracing::debug!(%duty, "duty ended, cancelling sibling");
                self.token.cancel();
            }
            match duty {
                Duty::Inbound => inbound_outcome = Some(outcome),
                Duty::Outbound => outbound_outcome = Some(outcome),
            }
        }

        let missing = || DutyOutcome::Failed(RelayError::Internal("duty never reported".into()));
        let report = SessionReport {
            session_id: self.id,
            ended_first: ended_first.unwrap_or(Duty::Inbound),
            inbound: inbound_outcome.unwrap_or_else(missing),
            outbound: outbound_outcome.unwrap_or_else(missing),
        };
        log_report(&report);
        report
    }
}

fn log_report(report: &SessionReport) {
    match report.fault() {
        Some(err) => {
            tracing::warn!(ended_first = %report.ended_first, error = %err, "session ended with error");
        }
        None => {
            tracing::info!(ended_first = %report.ended_first, "session ended");
        }
    }
}
