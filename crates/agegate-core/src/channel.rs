//! Named in-process channel carrying [`AgeEvent`]s from the sensor bridge
//! to the controller.
//!
//! Publishing with no listeners is a no-op. Each [`AgeEventSubscription`]
//! counts as one listener until it is dropped, so a torn-down controller
//! leaves [`AgeEventChannel::listener_count`] where it found it.

use std::sync::Arc;

use agegate_types::AgeEvent;
use tokio::sync::broadcast;
use tracing::warn;

/// Broadcast channel for age events, identified by name.
#[derive(Debug, Clone)]
pub struct AgeEventChannel {
    name: Arc<str>,
    tx: broadcast::Sender<AgeEvent>,
}

impl AgeEventChannel {
    /// Create a channel buffering up to `capacity` events per listener.
    ///
    /// A zero capacity is raised to one.
    pub fn new(name: &str, capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self {
            name: Arc::from(name),
            tx,
        }
    }

    /// The channel name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Deliver an event to every current listener.
    ///
    /// Returns the number of listeners reached; 0 when nobody listens.
    pub fn publish(&self, event: AgeEvent) -> usize {
        // send only fails when there are no receivers.
        self.tx.send(event).unwrap_or(0)
    }

    /// Register a new listener.
    pub fn subscribe(&self) -> AgeEventSubscription {
        AgeEventSubscription {
            channel: Arc::clone(&self.name),
            rx: self.tx.subscribe(),
            missed: 0,
        }
    }

    /// Number of live subscriptions.
    pub fn listener_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

/// One listener registration on an [`AgeEventChannel`].
///
/// Dropping the subscription removes the listener.
#[derive(Debug)]
pub struct AgeEventSubscription {
    channel: Arc<str>,
    rx: broadcast::Receiver<AgeEvent>,
    missed: u64,
}

impl AgeEventSubscription {
    /// Wait for the next event.
    ///
    /// If the listener fell behind, the skipped events are logged and
    /// counted and the next retained event is returned. Returns `None` once
    /// every publisher is gone. Cancel safe.
    pub async fn next(&mut self) -> Option<AgeEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    self.missed = self.missed.saturating_add(skipped);
                    warn!(
                        channel = %self.channel,
                        skipped,
                        "age event listener lagged, skipping ahead"
                    );
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Total events skipped because this listener lagged.
    pub const fn missed(&self) -> u64 {
        self.missed
    }

    /// Name of the channel this subscription listens on.
    pub fn channel(&self) -> &str {
        &self.channel
    }
}
