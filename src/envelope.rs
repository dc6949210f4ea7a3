//! Message envelopes: terms plus addressing metadata

use crate::channel::ChannelAddress;
use crate::error::{Result, RubbleError};
use crate::term::Term;
use crate::time;
use chrono::{DateTime, Utc};

/// A message ready for delivery by [`call`](crate::RubbleClient::call) or
/// [`send`](crate::RubbleClient::send)
///
/// With a sender tag, every top-level term `X` becomes `input(TAG, X)`.
/// The wrap happens once, at construction; sub-terms are never touched.
/// The sender tag is mandatory for cross-domain messaging.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageEnvelope {
    payload: Vec<Term>,
    terms: Vec<Term>,
    target: ChannelAddress,
    sender_tag: Option<String>,
    deliver_at: Option<i64>,
}

impl MessageEnvelope {
    /// Wrap `terms` for delivery to `target`
    ///
    /// `deliver_at` must not lie in the past; it only affects `send`.
    pub fn wrap(
        terms: Vec<Term>,
        target: ChannelAddress,
        sender_tag: Option<&str>,
        deliver_at: Option<DateTime<Utc>>,
    ) -> Result<Self> {
        Self::wrap_at(terms, target, sender_tag, deliver_at, time::now_millis())
    }

    fn wrap_at(
        terms: Vec<Term>,
        target: ChannelAddress,
        sender_tag: Option<&str>,
        deliver_at: Option<DateTime<Utc>>,
        now_ms: i64,
    ) -> Result<Self> {
        target.validate()?;
        let deliver_at = deliver_at.map(time::to_millis);
        if let Some(deliver_at_ms) = deliver_at {
            if deliver_at_ms < now_ms {
                return Err(RubbleError::DeliveryTimeInPast {
                    deliver_at_ms,
                    now_ms,
                });
            }
        }

        let wrapped = match sender_tag {
            Some(tag) => terms
                .iter()
                .cloned()
                .map(|term| Term::input(tag, term))
                .collect(),
            None => terms.clone(),
        };

        Ok(Self {
            payload: terms,
            terms: wrapped,
            target,
            sender_tag: sender_tag.map(str::to_string),
            deliver_at,
        })
    }

    /// An immediate, untagged message
    pub fn to(target: ChannelAddress, terms: Vec<Term>) -> Self {
        Self {
            payload: terms.clone(),
            terms,
            target,
            sender_tag: None,
            deliver_at: None,
        }
    }

    /// Terms as the receiving process sees them (wrapped when tagged)
    pub fn terms(&self) -> &[Term] {
        &self.terms
    }

    /// Terms as supplied by the caller, before any wrap
    pub fn payload(&self) -> &[Term] {
        &self.payload
    }

    /// Target channel
    pub fn target(&self) -> &ChannelAddress {
        &self.target
    }

    /// Sender tag, if any
    pub fn sender_tag(&self) -> Option<&str> {
        self.sender_tag.as_deref()
    }

    /// Requested delivery time in epoch milliseconds
    pub fn deliver_at_millis(&self) -> Option<i64> {
        self.deliver_at
    }

    /// Requested delivery time
    pub fn deliver_at(&self) -> Option<DateTime<Utc>> {
        self.deliver_at.and_then(time::from_millis)
    }
}
