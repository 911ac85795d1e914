//! `PostgreSQL` data layer for agegate.
//!
//! Accepted readings are appended to the `readings` table, one row per
//! reading, tagged with the logical collection they belong to. Rows are
//! never updated or deleted; a trigger installed by the migrations rejects
//! both.
//!
//! ```text
//! AgeController
//!     |
//!     +-- ReadingStore::append --> PgReadingStore --> readings (PostgresPool)
//! ```
//!
//! # Modules
//!
//! - [`postgres`] -- `PostgreSQL` connection pool, configuration and migrations
//! - [`reading_store`] -- Append and recent-reading queries, store trait impl
//! - [`error`] -- Error type and its mapping onto the store contract

pub mod error;
pub mod postgres;
pub mod reading_store;

pub use error::DbError;
pub use postgres::{PostgresConfig, PostgresPool};
pub use reading_store::{PgReadingStore, ReadingRow};
