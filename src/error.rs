//! Error types for the Rubble client

use thiserror::Error;

/// Broad category of a [`RubbleError`].
///
/// Callers use this to tell a rejected request (transport) apart from a
/// problem reported by the domain logic (application).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Rejected locally before any network call
    Validation,
    /// Non-2xx response or connection failure
    Transport,
    /// Well-formed 2xx response carrying `{"error": "..."}`
    Application,
    /// 2xx response that does not match the documented shape
    Protocol,
    /// Unusable client configuration
    Config,
}

/// Rubble client error
#[derive(Debug, Error)]
pub enum RubbleError {
    /// Both an alias and a pid were supplied as the target
    #[error("Ambiguous target: use either a channel alias or a pid, not both")]
    AmbiguousTarget,

    /// Neither an alias nor a pid was supplied
    #[error("Missing target: a channel alias or a pid is required")]
    MissingTarget,

    /// Facts were supplied in a syntax that does not match the facts format
    #[error("Facts format {format} requires {expected} facts")]
    FormatMismatch {
        format: &'static str,
        expected: &'static str,
    },

    /// A term could not be decoded
    #[error("Malformed term: {0}")]
    MalformedTerm(String),

    /// A trapstate XML document could not be decoded
    #[error("Malformed trapstate: {0}")]
    MalformedTrapstate(String),

    /// Rules reference is not a `file:` locator
    #[error("Invalid rules reference: {0}")]
    InvalidRulesRef(String),

    /// Requested delivery time lies in the past
    #[error("Delivery time {deliver_at_ms} is before now ({now_ms})")]
    DeliveryTimeInPast { deliver_at_ms: i64, now_ms: i64 },

    /// Trapstate event not allowed in the current state
    #[error("Invalid trapstate transition: {event} while {from}")]
    InvalidTransition {
        from: &'static str,
        event: &'static str,
    },

    /// Server answered with a non-2xx status
    #[error("Transport error {status}: {reason}")]
    Transport { status: u16, reason: String },

    /// HTTP request failed before a response arrived
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Server reported an application-level error
    #[error("Server reported: {0}")]
    Application(String),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid response from server
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl RubbleError {
    /// Category of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            RubbleError::AmbiguousTarget
            | RubbleError::MissingTarget
            | RubbleError::FormatMismatch { .. }
            | RubbleError::MalformedTerm(_)
            | RubbleError::MalformedTrapstate(_)
            | RubbleError::InvalidRulesRef(_)
            | RubbleError::DeliveryTimeInPast { .. }
            | RubbleError::InvalidTransition { .. } => ErrorKind::Validation,
            RubbleError::Transport { .. } | RubbleError::Http(_) => ErrorKind::Transport,
            RubbleError::Application(_) => ErrorKind::Application,
            RubbleError::Json(_) | RubbleError::InvalidResponse(_) => ErrorKind::Protocol,
            RubbleError::Config(_) => ErrorKind::Config,
        }
    }

    /// True for non-2xx responses and network failures
    pub fn is_transport(&self) -> bool {
        self.kind() == ErrorKind::Transport
    }

    /// The server's message if this is an application error
    pub fn application_message(&self) -> Option<&str> {
        match self {
            RubbleError::Application(message) => Some(message),
            _ => None,
        }
    }
}

/// Result type for Rubble client operations
pub type Result<T> = std::result::Result<T, RubbleError>;
