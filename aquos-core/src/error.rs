//! Domain-specific error types for the AQUOS remote-control client.
//!
//! All fallible operations return `Result<T, AquosError>`.
//! Invalid input never panics; it surfaces as a typed error.

use std::time::Duration;
use thiserror::Error;

/// The canonical error type for the AQUOS client.
#[derive(Debug, Error)]
pub enum AquosError {
    // ── Handshake Errors ─────────────────────────────────────────
    /// The device asked for a login but no username/password is configured.
    #[error(
        "connection refused: the TV requires a username and password; \
         check the AQUOS connect settings on the TV and add them to the configuration"
    )]
    AuthRequired,

    /// The device rejected the configured username/password.
    #[error("invalid username or password")]
    InvalidCredentials,

    // ── Command Errors ───────────────────────────────────────────
    /// A command parameter fell outside the range the protocol accepts.
    #[error("the given {field} must be between {min} and {max} (got {value})")]
    Range {
        field: &'static str,
        value: i64,
        min: i64,
        max: i64,
    },

    /// The device answered a command with its error marker.
    #[error("the TV reported an error: {0}")]
    Wire(String),

    /// A command is already in flight and the queue is full.
    #[error("a command is already in flight")]
    Busy,

    /// Commands cannot be queued and the connection is not ready.
    #[error("connection is not ready")]
    NotReady,

    /// The reply did not arrive before the command deadline.
    #[error("timeout after {0:?}")]
    Timeout(Duration),

    /// The connection dropped while the command was in flight.
    #[error("connection lost before a reply arrived")]
    ConnectionLost,

    /// The client was closed or its supervisor has stopped.
    #[error("client is closed")]
    Closed,

    // ── Connection Errors ────────────────────────────────────────
    /// The TCP/IO layer reported an error.
    #[error("connection error: {0}")]
    Connection(#[from] std::io::Error),

    /// An mpsc channel was closed unexpectedly.
    #[error("channel closed")]
    ChannelClosed,

    /// A reply grew past the codec limit without a terminator.
    #[error("frame too large: {size} bytes (max {max})")]
    FrameTooLarge { size: usize, max: usize },

    /// A state transition or message violated protocol rules.
    #[error("protocol violation: {0}")]
    ProtocolViolation(&'static str),

    // ── Application Errors ───────────────────────────────────────
    /// A command string could not be parsed or encoded.
    #[error("invalid command: {0}")]
    InvalidCommand(String),

    /// Catch-all for errors that do not fit another variant.
    #[error("{0}")]
    Other(String),
}

impl AquosError {
    /// Returns `true` for errors that end the client for good.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::AuthRequired | Self::InvalidCredentials | Self::Closed
        )
    }

    pub(crate) fn range(field: &'static str, value: i64, min: i64, max: i64) -> Self {
        Self::Range {
            field,
            value,
            min,
            max,
        }
    }
}

// ── Convenient From implementations ──────────────────────────────

impl From<String> for AquosError {
    fn from(s: String) -> Self {
        AquosError::Other(s)
    }
}

impl From<&str> for AquosError {
    fn from(s: &str) -> Self {
        AquosError::Other(s.to_string())
    }
}

impl<T> From<tokio::sync::mpsc::error::SendError<T>> for AquosError {
    fn from(_: tokio::sync::mpsc::error::SendError<T>) -> Self {
        AquosError::ChannelClosed
    }
}

impl From<tokio::sync::oneshot::error::RecvError> for AquosError {
    fn from(_: tokio::sync::oneshot::error::RecvError) -> Self {
        AquosError::ChannelClosed
    }
}
