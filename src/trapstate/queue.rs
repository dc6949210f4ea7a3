//! Per-process hold queue for messages addressed to a trapped process

use super::{DeliveryDecision, Trapstate};
use std::collections::VecDeque;

/// Messages held for one process, oldest first
///
/// Order is preserved on release. Discards take the whole queue at once,
/// since the discard window is measured from the trapstate timestamp and not
/// from when each message arrived.
#[derive(Debug, Clone)]
pub struct HeldMessages<T> {
    queue: VecDeque<T>,
}

/// Outcome of [`HeldMessages::release`]
#[derive(Debug, Clone, PartialEq)]
pub struct Release<T> {
    /// Messages handed to the process, in arrival order
    pub delivered: Vec<T>,
    /// Messages dropped past `discard-after`, in arrival order
    pub discarded: Vec<T>,
    /// When to look again, if anything is still held
    pub next_attempt_ms: Option<i64>,
}

impl<T> Default for HeldMessages<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> HeldMessages<T> {
    pub fn new() -> Self {
        Self {
            queue: VecDeque::new(),
        }
    }

    /// Append a message behind everything already held
    pub fn hold(&mut self, message: T) {
        self.queue.push_back(message);
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Held messages, oldest first
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.queue.iter()
    }

    /// Attempt delivery at `now_ms` given the process's current trapstate
    pub fn release(&mut self, trapstate: Option<&Trapstate>, now_ms: i64) -> Release<T> {
        let decision = super::delivery_decision(trapstate, now_ms);
        let mut release = Release {
            delivered: Vec::new(),
            discarded: Vec::new(),
            next_attempt_ms: None,
        };

        match (decision, trapstate) {
            (DeliveryDecision::Deliver, _) => {
                release.delivered = self.queue.drain(..).collect();
            }
            (DeliveryDecision::Discard, _) => {
                release.discarded = self.queue.drain(..).collect();
                if !release.discarded.is_empty() {
                    tracing::debug!(
                        count = release.discarded.len(),
                        "held messages passed discard-after"
                    );
                }
            }
            (DeliveryDecision::Defer { until_ms }, _) if !self.queue.is_empty() => {
                release.next_attempt_ms = Some(until_ms);
            }
            (DeliveryDecision::Retry, Some(trap)) if !self.queue.is_empty() => {
                let last_chance = trap.discard_at().saturating_add(1);
                release.next_attempt_ms = Some(trap.next_attempt_after(now_ms).min(last_chance));
            }
            _ => {}
        }

        release
    }
}
