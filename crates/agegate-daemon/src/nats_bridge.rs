//! Bridge from the sensor's NATS subject into the in-process age event
//! channel.
//!
//! The sensor publishes one JSON payload per estimate. Payloads that are
//! JSON but do not match the expected shape still become events (with no
//! age); payloads that are not JSON at all are dropped with a warning.

use agegate_core::AgeEventChannel;
use agegate_types::AgeEvent;
use futures::{Stream, StreamExt as _};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::DaemonError;

/// NATS subscription feeding an [`AgeEventChannel`].
pub struct NatsBridge {
    client: async_nats::Client,
    subject: String,
}

impl NatsBridge {
    /// Connect to a NATS server.
    ///
    /// # Errors
    ///
    /// Returns [`DaemonError::Nats`] if the connection cannot be established.
    pub async fn connect(url: &str, subject: &str) -> Result<Self, DaemonError> {
        info!(url = url, "connecting to NATS server");
        let client = async_nats::connect(url)
            .await
            .map_err(|e| DaemonError::Nats {
                message: format!("failed to connect to {url}: {e}"),
            })?;
        info!("NATS connection established");
        Ok(Self {
            client,
            subject: subject.to_owned(),
        })
    }

    /// Subscribe to the sensor subject and forward every payload into
    /// `channel` on a background task.
    ///
    /// The subscription is active before this returns.
    ///
    /// # Errors
    ///
    /// Returns [`DaemonError::Nats`] if the subscription fails.
    pub async fn spawn(self, channel: AgeEventChannel) -> Result<JoinHandle<()>, DaemonError> {
        let subscriber = self
            .client
            .subscribe(self.subject.clone())
            .await
            .map_err(|e| DaemonError::Nats {
                message: format!("failed to subscribe to {}: {e}", self.subject),
            })?;
        info!(subject = %self.subject, channel = channel.name(), "sensor bridge subscribed");

        let subject = self.subject;
        // The client moves into the task so the connection lives as long
        // as the subscription.
        let client = self.client;
        Ok(tokio::spawn(async move {
            let forwarded = forward(subscriber.map(|msg| msg.payload), &channel).await;
            info!(subject = %subject, forwarded, "sensor subscription ended");
            drop(client);
        }))
    }
}

impl std::fmt::Debug for NatsBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NatsBridge")
            .field("subject", &self.subject)
            .finish_non_exhaustive()
    }
}

/// Decode one sensor payload. Returns `None` for bytes that are not JSON.
pub fn decode_payload(payload: &[u8]) -> Option<AgeEvent> {
    match AgeEvent::from_slice(payload) {
        Ok(event) => Some(event),
        Err(e) => {
            warn!(
                error = %e,
                payload_size = payload.len(),
                "dropping sensor payload that is not JSON"
            );
            None
        }
    }
}

/// Publish every decodable payload from `payloads` into `channel`.
///
/// Returns the number of events published once the stream ends.
pub async fn forward<S, P>(mut payloads: S, channel: &AgeEventChannel) -> u64
where
    S: Stream<Item = P> + Unpin,
    P: AsRef<[u8]>,
{
    let mut forwarded: u64 = 0;
    while let Some(payload) = payloads.next().await {
        let Some(event) = decode_payload(payload.as_ref()) else {
            continue;
        };
        let listeners = channel.publish(event);
        forwarded = forwarded.saturating_add(1);
        debug!(
            numeric_age = ?event.numeric_age,
            listeners,
            "forwarded sensor payload"
        );
    }
    forwarded
}
