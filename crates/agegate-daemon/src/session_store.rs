//! The reading store selected for this session.
//!
//! Enum dispatch over the concrete stores keeps the controller generic
//! over a single concrete type while the backend is chosen at runtime from
//! configuration.

use agegate_core::{MemoryStore, ReadingStore, StoreError};
use agegate_db::PgReadingStore;
use agegate_types::{NewReading, ReadingAck};

/// Reading store chosen by `store.backend`.
#[derive(Debug, Clone)]
pub enum SessionStore {
    /// `PostgreSQL` append-only table.
    Postgres(PgReadingStore),
    /// In-process store.
    Memory(MemoryStore),
}

impl ReadingStore for SessionStore {
    async fn append(&self, reading: NewReading) -> Result<ReadingAck, StoreError> {
        match self {
            Self::Postgres(store) => store.append(reading).await,
            Self::Memory(store) => store.append(reading).await,
        }
    }

    fn backend(&self) -> &'static str {
        match self {
            Self::Postgres(store) => store.backend(),
            Self::Memory(store) => store.backend(),
        }
    }
}
