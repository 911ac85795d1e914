//! Shared type definitions for the agegate reading pipeline.
//!
//! This crate is the single source of truth for the types that cross crate
//! boundaries: the sensor payload, the display bucket, persisted readings and
//! the session view served to the panel. Types flow downstream to
//! `TypeScript` via `ts-rs` for the panel front end.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe UUID wrapper for reading keys
//! - [`event`] -- Sensor age event and its permissive payload decoding
//! - [`structs`] -- Display bucket, readings, acknowledgements, session view

pub mod event;
pub mod ids;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use event::AgeEvent;
pub use ids::ReadingId;
pub use structs::{BUCKET_WIDTH, DisplayBucket, NewReading, Reading, ReadingAck, SessionView};

#[cfg(test)]
mod tests {
    //! `TypeScript` binding generation.

    #[test]
    fn export_bindings() {
        // Importing the types triggers generation into `bindings/`
        // relative to the crate root.
        use ts_rs::TS;

        let _ = crate::ids::ReadingId::export_all();
        let _ = crate::structs::DisplayBucket::export_all();
        let _ = crate::structs::NewReading::export_all();
        let _ = crate::structs::Reading::export_all();
        let _ = crate::structs::ReadingAck::export_all();
        let _ = crate::structs::SessionView::export_all();
    }
}
