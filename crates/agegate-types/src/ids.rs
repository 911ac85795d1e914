//! Type-safe identifier wrappers around [`Uuid`].
//!
//! Reading keys are generated on the client before the write is submitted
//! (push-style), so every key is a UUID v7: unique without coordination and
//! time-ordered for efficient indexing in the append-only store.

use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

/// Unique key of a persisted age reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ReadingId(pub Uuid);

impl ReadingId {
    /// Generate a fresh key using UUID v7 (time-ordered).
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Return the inner [`Uuid`] value.
    pub const fn into_inner(self) -> Uuid {
        self.0
    }
}

impl Default for ReadingId {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Display for ReadingId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for ReadingId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl From<ReadingId> for Uuid {
    fn from(id: ReadingId) -> Self {
        id.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_keys_are_unique() {
        let first = ReadingId::new();
        let second = ReadingId::new();
        assert_ne!(first, second);
        assert_eq!(first.into_inner().get_version_num(), 7);
    }

    #[test]
    fn display_matches_uuid() {
        let id = ReadingId::new();
        assert_eq!(id.to_string(), id.into_inner().to_string());
    }
}
