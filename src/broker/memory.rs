//! In-process broker backed by tokio broadcast channels.
//!
//! [`InMemoryBroker`] keeps one [`tokio::sync::broadcast`] channel per
//! topic name. Every subscription gets its own receiver, so each live
//! subscriber sees every payload published after it subscribed. When a
//! receiver falls more than `capacity` payloads behind, the oldest ones are
//! skipped for that receiver.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::{RwLock, broadcast};

use super::{Broker, Subscription};
use crate::domain::Channel;
use crate::error::BrokerError;

/// Broker living inside the relay process.
///
/// Starts disconnected; [`Broker::connect`] must be called before use.
/// [`Broker::disconnect`] drops every channel, which ends all live
/// subscriptions.
#[derive(Debug)]
pub struct InMemoryBroker {
    capacity: usize,
    connected: AtomicBool,
    channels: RwLock<HashMap<Channel, broadcast::Sender<String>>>,
    active_subscriptions: Arc<AtomicUsize>,
}

impl InMemoryBroker {
    /// Creates a disconnected broker whose channels buffer up to
    /// `capacity` payloads per lagging subscriber.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            connected: AtomicBool::new(false),
            channels: RwLock::new(HashMap::new()),
            active_subscriptions: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Returns the number of subscriptions that have been opened and not
    /// yet released, across all channels.
    #[must_use]
    pub fn active_subscriptions(&self) -> usize {
        self.active_subscriptions.load(Ordering::SeqCst)
    }

    /// Returns the number of live receivers on `channel`.
    pub async fn receiver_count(&self, channel: &Channel) -> usize {
        self.channels
            .read()
            .await
            .get(channel)
            .map_or(0, broadcast::Sender::receiver_count)
    }

    fn ensure_connected(&self) -> Result<(), BrokerError> {
        if self.connected.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(BrokerError::NotConnected)
        }
    }
}

impl Default for InMemoryBroker {
    fn default() -> Self {
        Self::new(1024)
    }
}

#[async_trait]
impl Broker for InMemoryBroker {
    async fn connect(&self) -> Result<(), BrokerError> {
        self.connected.store(true, Ordering::SeqCst);
        tracing::debug!("in-memory broker connected");
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), BrokerError> {
        let mut channels = self.channels.write().await;
        self.connected.store(false, Ordering::SeqCst);
        channels.clear();
        drop(channels);
        tracing::debug!("in-memory broker disconnected");
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn publish(&self, channel: &Channel, payload: String) -> Result<(), BrokerError> {
        self.ensure_connected()?;
        let channels = self.channels.read().await;
        // No sender or no receivers means nobody is listening: the payload
        // is dropped, which is the pub/sub contract.
        let delivered = channels
            .get(channel)
            .map_or(0, |sender| sender.send(payload).unwrap_or(0));
        tracing::trace!(%channel, delivered, "payload published");
        Ok(())
    }

    async fn subscribe(&self, channel: &Channel) -> Result<Subscription, BrokerError> {
        let rx = {
            let mut channels = self.channels.write().await;
            // Checked under the lock so a concurrent disconnect cannot clear
            // the map between the check and the insert.
            self.ensure_connected()?;
            channels
                .entry(channel.clone())
                .or_insert_with(|| broadcast::channel(self.capacity).0)
                .subscribe()
        };

        let state = Receiving {
            rx,
            channel: channel.clone(),
            _guard: ActiveGuard::acquire(Arc::clone(&self.active_subscriptions)),
        };
        let stream = futures_util::stream::unfold(state, |mut state| async move {
            loop {
                match state.rx.recv().await {
                    Ok(payload) => return Some((Ok(payload), state)),
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!(
                            channel = %state.channel,
                            lagged = n,
                            "subscriber lagged behind broker channel"
                        );
                    }
                    Err(broadcast::error::RecvError::Closed) => return None,
                }
            }
        });

        Ok(Subscription::new(channel.clone(), Box::pin(stream)))
    }
}

/// Receiver state carried by a subscription stream.
struct Receiving {
    rx: broadcast::Receiver<String>,
    channel: Channel,
    _guard: ActiveGuard,
}

/// Counts one open subscription until dropped.
struct ActiveGuard(Arc<AtomicUsize>);

impl ActiveGuard {
    fn acquire(counter: Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}
