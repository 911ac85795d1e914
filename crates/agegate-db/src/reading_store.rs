//! Append-only reading persistence in the `readings` table.
//!
//! The controller only appends. [`PgReadingStore::recent`] exists for
//! operators and integration tests.

use agegate_core::{ReadingStore, StoreError};
use agegate_types::{NewReading, Reading, ReadingAck, ReadingId};
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::DbError;
use crate::postgres::PostgresPool;

/// Operations on the `readings` table for one collection.
#[derive(Debug, Clone)]
pub struct PgReadingStore {
    pool: PgPool,
    collection: String,
}

impl PgReadingStore {
    /// Create a store that appends to `collection`.
    pub fn new(pool: &PostgresPool, collection: impl Into<String>) -> Self {
        Self {
            pool: pool.pool().clone(),
            collection: collection.into(),
        }
    }

    /// The collection every reading is appended under.
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Insert one reading and return the server-assigned commit time.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the insert fails.
    pub async fn insert(&self, reading: &NewReading) -> Result<ReadingAck, DbError> {
        let recorded_at: DateTime<Utc> = sqlx::query_scalar(
            r"INSERT INTO readings (id, collection, user_name, age)
              VALUES ($1, $2, $3, $4)
              RETURNING recorded_at",
        )
        .bind(reading.id.into_inner())
        .bind(&self.collection)
        .bind(reading.user_name.as_deref())
        .bind(reading.age)
        .fetch_one(&self.pool)
        .await?;

        tracing::debug!(
            reading_id = %reading.id,
            collection = %self.collection,
            "Inserted reading"
        );

        Ok(ReadingAck {
            id: reading.id,
            timestamp: recorded_at,
        })
    }

    /// The most recent readings in this collection, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn recent(&self, limit: u32) -> Result<Vec<Reading>, DbError> {
        let rows = sqlx::query_as::<_, ReadingRow>(
            r"SELECT id, collection, user_name, age, recorded_at
              FROM readings
              WHERE collection = $1
              ORDER BY recorded_at DESC, id DESC
              LIMIT $2",
        )
        .bind(&self.collection)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Reading::from).collect())
    }
}

impl ReadingStore for PgReadingStore {
    async fn append(&self, reading: NewReading) -> Result<ReadingAck, StoreError> {
        self.insert(&reading).await.map_err(StoreError::from)
    }

    fn backend(&self) -> &'static str {
        "postgres"
    }
}

/// A row from the `readings` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ReadingRow {
    /// Client-generated key.
    pub id: Uuid,
    /// Logical collection name.
    pub collection: String,
    /// Identity label, if any.
    pub user_name: Option<String>,
    /// The accepted age.
    pub age: i64,
    /// Server commit time.
    pub recorded_at: DateTime<Utc>,
}

impl From<ReadingRow> for Reading {
    fn from(row: ReadingRow) -> Self {
        Self {
            id: ReadingId::from(row.id),
            user_name: row.user_name,
            age: row.age,
            timestamp: row.recorded_at,
        }
    }
}
