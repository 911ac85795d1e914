//! Diagnostics emitted by the controller for every observable decision.
//!
//! Every diagnostic is also logged. The broadcast copy exists so the panel
//! and tests can follow the controller without scraping logs.

use agegate_types::{DisplayBucket, NewReading, ReadingAck, ReadingId};

use crate::gate::RejectReason;
use crate::store::StoreError;

/// A single controller decision or outcome.
#[derive(Debug, Clone, PartialEq)]
pub enum Diagnostic {
    /// An event was dropped by the write gate.
    Rejected {
        /// Which gate rejected the event.
        reason: RejectReason,
        /// The estimate the event carried.
        numeric_age: Option<f64>,
    },

    /// An event was admitted; the display changed and a write started.
    Accepted {
        /// The bucket now on display.
        bucket: DisplayBucket,
        /// The reading handed to the store.
        reading: NewReading,
        /// Whether the payload carried no usable age.
        malformed: bool,
    },

    /// A write from the current window committed.
    WriteSucceeded {
        /// The store's acknowledgement.
        ack: ReadingAck,
    },

    /// A write from the current window failed. The display is unchanged
    /// and no cooldown starts.
    WriteFailed {
        /// Key of the reading that was not stored.
        reading_id: ReadingId,
        /// The store's error.
        error: StoreError,
    },

    /// A write finished after the window it was issued in had expired.
    /// Its outcome did not touch the display, cooldown or timer.
    StaleCompletion {
        /// Key of the reading.
        reading_id: ReadingId,
        /// Window the write was issued in.
        issued_window: u64,
        /// Window current when it finished.
        current_window: u64,
        /// Whether the store committed it.
        committed: bool,
    },

    /// The debounce window expired and the display reset.
    Expired {
        /// Number of the window that just closed, counting from 1.
        window: u64,
    },
}

impl Diagnostic {
    /// Stable snake-case kind, used as the `kind` log field.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Rejected { .. } => "rejected",
            Self::Accepted { .. } => "accepted",
            Self::WriteSucceeded { .. } => "write_succeeded",
            Self::WriteFailed { .. } => "write_failed",
            Self::StaleCompletion { .. } => "stale_completion",
            Self::Expired { .. } => "expired",
        }
    }
}
