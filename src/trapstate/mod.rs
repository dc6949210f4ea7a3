//! Trapstate machine
//!
//! A trapstate marks an exceptional processing state on a process:
//!
//! ```text
//!            fault / pause / watch / set
//!   NORMAL ───────────────────────────────▶ ERROR | PAUSED | PAUSE_ON_CONDITION
//!     ▲                                                      │
//!     │ clear (update without trapstate)      condition held │
//!     └──────────────────────────── ERROR | PAUSED ◀─────────┘
//! ```
//!
//! While `ERROR` or `PAUSED`, messages for the process are neither delivered
//! nor dropped: they are retried once `reschedule-delay` has passed since the
//! trapstate `timestamp`, until the trapstate clears or `discard-after` has
//! passed, at which point they are discarded without notice. That policy runs
//! on the server; this module models it so callers can reason about what
//! happened to a fire-and-forget send.

mod queue;
mod xml;

pub use queue::{HeldMessages, Release};
pub(crate) use xml::deserialize_xml_opt;

use crate::error::{Result, RubbleError};
use crate::term::{self, Term};
use std::fmt;
use std::str::FromStr;

/// Default `reschedule-delay`: one minute
pub const DEFAULT_RESCHEDULE_DELAY_MS: u64 = 60_000;

/// Default `discard-after`: two days
pub const DEFAULT_DISCARD_AFTER_MS: u64 = 172_800_000;

/// Why a process is trapped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cause {
    /// Syntax error or exception during rule execution
    Error,
    /// Halted on purpose, for administration or debugging
    Paused,
    /// Runs normally; pauses once the pause condition holds after a transition
    PauseOnCondition,
}

impl Cause {
    /// Spelling used in the trapstate XML
    pub fn as_str(&self) -> &'static str {
        match self {
            Cause::Error => "ERROR",
            Cause::Paused => "PAUSED",
            Cause::PauseOnCondition => "PAUSE-ON-CONDITION",
        }
    }
}

impl fmt::Display for Cause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Cause {
    type Err = RubbleError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "ERROR" => Ok(Cause::Error),
            "PAUSED" => Ok(Cause::Paused),
            "PAUSE-ON-CONDITION" | "PAUSE_ON_CONDITION" => Ok(Cause::PauseOnCondition),
            other => Err(RubbleError::MalformedTrapstate(format!(
                "unknown cause {:?}",
                other
            ))),
        }
    }
}

/// An exceptional processing state attached to a process
#[derive(Debug, Clone, PartialEq)]
pub struct Trapstate {
    /// When the trap was set, epoch milliseconds
    pub timestamp: i64,
    pub cause: Cause,
    pub description: String,
    /// Source text of the message that caused the trap, for display only.
    /// Kept verbatim since the server may write syntax this crate does not
    /// parse. Editing it has no effect on the pending message.
    pub triggering_message: String,
    pub reschedule_delay_ms: u64,
    pub discard_after_ms: u64,
    /// Rubble code evaluated after each transition under `PAUSE-ON-CONDITION`
    pub pause_condition: Option<String>,
}

impl Trapstate {
    pub fn new(cause: Cause, description: impl Into<String>, timestamp: i64) -> Self {
        Self {
            timestamp,
            cause,
            description: description.into(),
            triggering_message: String::new(),
            reschedule_delay_ms: DEFAULT_RESCHEDULE_DELAY_MS,
            discard_after_ms: DEFAULT_DISCARD_AFTER_MS,
            pause_condition: None,
        }
    }

    /// Administrative pause
    pub fn paused(description: impl Into<String>, timestamp: i64) -> Self {
        Self::new(Cause::Paused, description, timestamp)
    }

    /// Keep running, pause once `condition` holds
    pub fn pause_on(condition: impl Into<String>, timestamp: i64) -> Self {
        Self {
            pause_condition: Some(condition.into()),
            ..Self::new(Cause::PauseOnCondition, "", timestamp)
        }
    }

    pub fn with_triggering_message(mut self, terms: Vec<Term>) -> Self {
        self.triggering_message = term::encode_facts_source(&terms);
        self
    }

    /// Parse the triggering message; empty text yields no terms
    pub fn triggering_terms(&self) -> Result<Vec<Term>> {
        term::parse_source(&self.triggering_message)
    }

    pub fn with_reschedule_delay(mut self, ms: u64) -> Self {
        self.reschedule_delay_ms = ms;
        self
    }

    pub fn with_discard_after(mut self, ms: u64) -> Self {
        self.discard_after_ms = ms;
        self
    }

    pub fn state(&self) -> ProcessState {
        match self.cause {
            Cause::Error => ProcessState::Error,
            Cause::Paused => ProcessState::Paused,
            Cause::PauseOnCondition => ProcessState::PauseOnCondition,
        }
    }

    /// Instant after which held messages are discarded
    pub fn discard_at(&self) -> i64 {
        self.timestamp.saturating_add(ms_i64(self.discard_after_ms))
    }

    /// What happens to a message for this process at `now_ms`
    pub fn delivery_decision(&self, now_ms: i64) -> DeliveryDecision {
        if !self.state().blocks_delivery() {
            return DeliveryDecision::Deliver;
        }
        let elapsed = now_ms.saturating_sub(self.timestamp).max(0);
        if elapsed > ms_i64(self.discard_after_ms) {
            DeliveryDecision::Discard
        } else if elapsed >= ms_i64(self.reschedule_delay_ms) {
            DeliveryDecision::Retry
        } else {
            DeliveryDecision::Defer {
                until_ms: self.timestamp.saturating_add(ms_i64(self.reschedule_delay_ms)),
            }
        }
    }

    /// Next retry instant strictly after `now_ms`
    pub fn next_attempt_after(&self, now_ms: i64) -> i64 {
        let delay = ms_i64(self.reschedule_delay_ms);
        if delay == 0 {
            return now_ms;
        }
        let elapsed = now_ms.saturating_sub(self.timestamp).max(0);
        self.timestamp
            .saturating_add(delay.saturating_mul(elapsed / delay + 1))
    }
}

fn ms_i64(ms: u64) -> i64 {
    i64::try_from(ms).unwrap_or(i64::MAX)
}

/// Delivery state of a process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProcessState {
    /// No trapstate
    Normal,
    Error,
    Paused,
    PauseOnCondition,
}

impl ProcessState {
    pub fn of(trapstate: Option<&Trapstate>) -> Self {
        trapstate.map_or(ProcessState::Normal, Trapstate::state)
    }

    /// `ERROR` and `PAUSED` hold all messages
    pub fn blocks_delivery(&self) -> bool {
        matches!(self, ProcessState::Error | ProcessState::Paused)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessState::Normal => "NORMAL",
            ProcessState::Error => "ERROR",
            ProcessState::Paused => "PAUSED",
            ProcessState::PauseOnCondition => "PAUSE_ON_CONDITION",
        }
    }
}

impl fmt::Display for ProcessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Something that changes a process's trapstate
#[derive(Debug, Clone, PartialEq)]
pub enum TrapEvent {
    /// Rule execution failed on `triggering_message`
    Fault {
        description: String,
        triggering_message: Vec<Term>,
        at_ms: i64,
    },
    /// Administrative pause
    Pause { description: String, at_ms: i64 },
    /// Start watching a pause condition
    Watch { condition: String, at_ms: i64 },
    /// The watched condition evaluated true after a transition.
    /// The pause is stamped `at_ms`, so the reschedule and discard windows
    /// start over from that instant.
    ConditionHeld { at_ms: i64 },
    /// A create or update that writes this trapstate
    Set(Trapstate),
    /// An update that omits or blanks the trapstate
    Clear,
}

impl TrapEvent {
    pub fn name(&self) -> &'static str {
        match self {
            TrapEvent::Fault { .. } => "fault",
            TrapEvent::Pause { .. } => "pause",
            TrapEvent::Watch { .. } => "watch",
            TrapEvent::ConditionHeld { .. } => "condition held",
            TrapEvent::Set(_) => "set",
            TrapEvent::Clear => "clear",
        }
    }
}

/// Apply `event` to a process's current trapstate
///
/// A halted process cannot fault or be paused again (it runs no rules),
/// only a watching process can have its condition hold, and only a normal
/// process starts watching. `Set` and `Clear` are always allowed.
///
/// `ConditionHeld` rewrites the cause to `PAUSED` and restamps the trapstate,
/// so messages held from then on are measured against the pause instant.
pub fn transition(current: Option<Trapstate>, event: TrapEvent) -> Result<Option<Trapstate>> {
    let from = ProcessState::of(current.as_ref());
    let invalid = |event: &TrapEvent| RubbleError::InvalidTransition {
        from: from.as_str(),
        event: event.name(),
    };

    match event {
        TrapEvent::Set(trapstate) => Ok(Some(trapstate)),
        TrapEvent::Clear => Ok(None),
        TrapEvent::Fault {
            description,
            triggering_message,
            at_ms,
        } if !from.blocks_delivery() => Ok(Some(
            Trapstate::new(Cause::Error, description, at_ms)
                .with_triggering_message(triggering_message),
        )),
        TrapEvent::Pause { description, at_ms } if !from.blocks_delivery() => {
            Ok(Some(Trapstate::paused(description, at_ms)))
        }
        TrapEvent::Watch { condition, at_ms } if from == ProcessState::Normal => {
            Ok(Some(Trapstate::pause_on(condition, at_ms)))
        }
        TrapEvent::ConditionHeld { at_ms } => match current {
            Some(trapstate) if trapstate.cause == Cause::PauseOnCondition => Ok(Some(Trapstate {
                cause: Cause::Paused,
                timestamp: at_ms,
                ..trapstate
            })),
            _ => Err(invalid(&TrapEvent::ConditionHeld { at_ms })),
        },
        other => Err(invalid(&other)),
    }
}

/// Fate of a message addressed to a process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryDecision {
    /// Process runs normally (or is only watching)
    Deliver,
    /// Held; the first retry is due at `until_ms`
    Defer { until_ms: i64 },
    /// Held long enough to be retried now
    Retry,
    /// Held past `discard-after`; dropped without notifying anyone
    Discard,
}

/// Decision for a process that may have no trapstate
pub fn delivery_decision(trapstate: Option<&Trapstate>, now_ms: i64) -> DeliveryDecision {
    trapstate.map_or(DeliveryDecision::Deliver, |t| t.delivery_decision(now_ms))
}
