//! Delivery modes: synchronous call and asynchronous send
//!
//! - **Call** delivers in the same rule-execution transaction as the request,
//!   bypassing anything queued for the process, and returns what the
//!   triggered rules wrote to the `default` pseudo-channel.
//! - **Send** only enqueues. Success means "enqueued", not "processed": a
//!   trapped target may hold the message and later discard it, and the
//!   sender is never told. Use call, or poll the process, when delivery
//!   must be confirmed.

use crate::envelope::MessageEnvelope;
use crate::term::Term;
use serde::Deserialize;

/// Which endpoint carries a message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryMode {
    Call,
    Send,
}

impl DeliveryMode {
    /// Endpoint name below the service path
    pub fn endpoint(&self) -> &'static str {
        match self {
            DeliveryMode::Call => "call",
            DeliveryMode::Send => "send",
        }
    }

    /// Query parameters for delivering `envelope` in this mode
    ///
    /// The payload goes out unwrapped with `wrap-input-from`, so the server
    /// applies the `input(FROM, X)` wrap itself. `when` is only sent on the
    /// send path.
    pub fn query_params(&self, envelope: &MessageEnvelope) -> Vec<(&'static str, String)> {
        let mut params = vec![("channel", envelope.target().to_wire_form())];
        if let Some(tag) = envelope.sender_tag() {
            params.push(("wrap-input-from", tag.to_string()));
        }
        if *self == DeliveryMode::Send {
            if let Some(when) = envelope.deliver_at_millis() {
                params.push(("when", when.to_string()));
            }
        }
        params
    }
}

/// Successful call reply
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct CallOutput {
    /// Terms the triggered rules sent to the `default` pseudo-channel
    #[serde(default)]
    pub output: Vec<Term>,
}
