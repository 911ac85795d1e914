//! Write gate: per-event admission based on the session's gating state.
//!
//! The gate keeps three kinds of readings out of the store:
//!
//! - anonymous readings, while identity gating is on and the label is empty;
//! - readings tagged with a half-typed label, while the identity field is
//!   being edited;
//! - bursts of near-identical readings, while the post-write cooldown runs.
//!
//! A rejection never changes state. The caller reports it once and drops
//! the event.

use core::fmt;

use agegate_types::AgeEvent;

use crate::config::GateConfig;

/// The gating inputs read at evaluation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GateInputs<'a> {
    /// Identity label, already trimmed.
    pub user_name: &'a str,
    /// Whether the identity field is being edited.
    pub typing: bool,
    /// Whether the post-write cooldown is active.
    pub cooldown: bool,
}

/// Why an event was not admitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RejectReason {
    /// Identity gating is on and no label has been entered.
    MissingIdentity,
    /// The identity label is being edited.
    Typing,
    /// A reading was stored recently and the window has not expired.
    Cooldown,
}

impl RejectReason {
    /// Stable snake-case name used in logs and diagnostics.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MissingIdentity => "missing_identity",
            Self::Typing => "typing",
            Self::Cooldown => "cooldown",
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An admitted event: what proceeds to bucketing and persistence.
#[derive(Debug, Clone, PartialEq)]
pub struct Admission {
    /// The raw estimate carried by the event.
    pub raw_age: Option<f64>,
    /// Label to attach to the reading, `None` when empty.
    pub user_name: Option<String>,
}

/// Outcome of [`WriteGate::evaluate`].
#[derive(Debug, Clone, PartialEq)]
pub enum GateDecision {
    /// The event may update the display and be written.
    Accept(Admission),
    /// The event must be dropped.
    Reject(RejectReason),
}

/// Stateless admission policy configured once per session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteGate {
    config: GateConfig,
}

impl WriteGate {
    /// Create a gate with the given policy.
    pub const fn new(config: GateConfig) -> Self {
        Self { config }
    }

    /// The gate's policy.
    pub const fn config(self) -> GateConfig {
        self.config
    }

    /// Decide whether `event` may proceed given the current `inputs`.
    ///
    /// Checks run in a fixed order (identity, typing, cooldown) so each
    /// rejection reports a single, deterministic reason.
    pub fn evaluate(&self, event: &AgeEvent, inputs: &GateInputs<'_>) -> GateDecision {
        if self.config.identity_required && inputs.user_name.is_empty() {
            return GateDecision::Reject(RejectReason::MissingIdentity);
        }
        if inputs.typing {
            return GateDecision::Reject(RejectReason::Typing);
        }
        if self.config.cooldown_enabled && inputs.cooldown {
            return GateDecision::Reject(RejectReason::Cooldown);
        }

        let user_name = (!inputs.user_name.is_empty()).then(|| inputs.user_name.to_owned());
        GateDecision::Accept(Admission {
            raw_age: event.numeric_age,
            user_name,
        })
    }
}
