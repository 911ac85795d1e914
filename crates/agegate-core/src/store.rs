//! Reading store abstraction and the in-memory implementation.
//!
//! A store appends [`NewReading`]s to the append-only readings collection
//! and reports the commit timestamp it assigned. The controller only ever
//! calls [`ReadingStore::append`]; it never reads back.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use agegate_types::{NewReading, Reading, ReadingAck};
use chrono::Utc;
use tokio::sync::Mutex;
use tracing::debug;

/// Errors a store reports for a failed append.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The store could not be reached.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// The store refused the write (constraint or permission failure).
    #[error("store rejected write: {0}")]
    Rejected(String),

    /// The write did not complete within the configured limit.
    #[error("store write timed out after {timeout_ms} ms")]
    Timeout {
        /// The limit that was exceeded, in milliseconds.
        timeout_ms: u64,
    },
}

/// Append-only persistence for accepted readings.
///
/// Implementations assign the commit timestamp themselves; the client clock
/// is never used for it.
pub trait ReadingStore: Send + Sync + 'static {
    /// Append one reading.
    fn append(
        &self,
        reading: NewReading,
    ) -> impl Future<Output = Result<ReadingAck, StoreError>> + Send;

    /// Short backend name for logs.
    fn backend(&self) -> &'static str;
}

/// In-process store used by tests and by deployments without `PostgreSQL`.
///
/// Failures and latency can be injected to exercise the controller's
/// write-completion paths.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<MemoryInner>,
}

#[derive(Debug, Default)]
struct MemoryInner {
    readings: Mutex<Vec<Reading>>,
    failing: AtomicBool,
    latency_ms: AtomicU64,
    attempts: AtomicU64,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent append fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.inner.failing.store(failing, Ordering::SeqCst);
    }

    /// Delay every subsequent append by `latency`.
    pub fn set_latency(&self, latency: Duration) {
        let millis = u64::try_from(latency.as_millis()).unwrap_or(u64::MAX);
        self.inner.latency_ms.store(millis, Ordering::SeqCst);
    }

    /// Number of appends attempted, successful or not.
    pub fn attempts(&self) -> u64 {
        self.inner.attempts.load(Ordering::SeqCst)
    }

    /// Snapshot of committed readings in commit order.
    pub async fn readings(&self) -> Vec<Reading> {
        self.inner.readings.lock().await.clone()
    }

    /// Number of committed readings.
    pub async fn len(&self) -> usize {
        self.inner.readings.lock().await.len()
    }

    /// Whether nothing has been committed.
    pub async fn is_empty(&self) -> bool {
        self.inner.readings.lock().await.is_empty()
    }
}

impl ReadingStore for MemoryStore {
    async fn append(&self, reading: NewReading) -> Result<ReadingAck, StoreError> {
        self.inner.attempts.fetch_add(1, Ordering::SeqCst);

        let latency = self.inner.latency_ms.load(Ordering::SeqCst);
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency)).await;
        }
        if self.inner.failing.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(
                "memory store is set to fail".to_owned(),
            ));
        }

        let timestamp = Utc::now();
        let ack = ReadingAck {
            id: reading.id,
            timestamp,
        };
        self.inner.readings.lock().await.push(Reading {
            id: reading.id,
            user_name: reading.user_name,
            age: reading.age,
            timestamp,
        });
        debug!(reading_id = %ack.id, "reading committed to memory store");
        Ok(ack)
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}
