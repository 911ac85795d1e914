//! Core of the agegate reading pipeline.
//!
//! Age estimates arrive on an [`AgeEventChannel`]. A single
//! [`AgeController`] task decides, per event, whether the session may
//! accept it (the write gate), turns accepted estimates into a decade
//! [`DisplayBucket`](agegate_types::DisplayBucket), appends a reading to a
//! [`ReadingStore`] and resets the display after a quiet period (the
//! debounce timer).
//!
//! # Modules
//!
//! - [`config`] -- YAML configuration and environment overrides
//! - [`bucket`] -- Decade bucket computation
//! - [`gate`] -- Write gate admission policy
//! - [`debounce`] -- Single-slot rearmable timer
//! - [`channel`] -- Named age event channel and subscriptions
//! - [`store`] -- Reading store trait and in-memory store
//! - [`diagnostic`] -- Controller decisions published for observers
//! - [`controller`] -- The controller actor and its handle

pub mod bucket;
pub mod channel;
pub mod config;
pub mod controller;
pub mod debounce;
pub mod diagnostic;
pub mod gate;
pub mod store;

pub use bucket::bucket;
pub use channel::{AgeEventChannel, AgeEventSubscription};
pub use config::{AgegateConfig, ConfigError};
pub use controller::{
    AgeController, ControllerConfig, ControllerError, ControllerHandle, WriteTicket,
};
pub use debounce::DebounceTimer;
pub use diagnostic::Diagnostic;
pub use gate::{Admission, GateDecision, GateInputs, RejectReason, WriteGate};
pub use store::{MemoryStore, ReadingStore, StoreError};
