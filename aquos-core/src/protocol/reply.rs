//! Inbound text classification.
//!
//! The device does not frame its replies beyond a terminator, so every
//! decision is a substring match on the decoded text.

use std::fmt;

use serde::Serialize;

/// Sent by the device when it wants a username.
pub const LOGIN_PROMPT: &str = "Login";

/// Generic acknowledgment.
pub const ACK: &str = "OK";

/// Sent after a wrong username or password.
pub const AUTH_MISMATCH: &str = "User Name or Password mismatch";

/// Sent when a command was rejected.
pub const ERROR_MARKER: &str = "ERR";

// ── Inbound ──────────────────────────────────────────────────────

/// What a chunk of inbound text means, in precedence order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Inbound {
    AuthMismatch,
    LoginPrompt,
    Error,
    Ack,
    Payload,
}

impl Inbound {
    pub fn classify(text: &str) -> Self {
        if text.contains(AUTH_MISMATCH) {
            Self::AuthMismatch
        } else if text.contains(LOGIN_PROMPT) {
            Self::LoginPrompt
        } else if text.contains(ERROR_MARKER) {
            Self::Error
        } else if text.contains(ACK) {
            Self::Ack
        } else {
            Self::Payload
        }
    }
}

// ── Reply ────────────────────────────────────────────────────────

/// A successful reply to a command, as received.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reply {
    raw: String,
}

impl Reply {
    pub fn new(raw: impl Into<String>) -> Self {
        Self { raw: raw.into() }
    }

    /// The reply exactly as decoded from the wire.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// The reply with surrounding whitespace and terminators removed.
    pub fn text(&self) -> &str {
        self.raw.trim()
    }

    /// `true` for a plain `OK` acknowledgment.
    pub fn is_ok(&self) -> bool {
        self.text() == ACK
    }

    /// Interpret `1` / `0` state replies (power, mute).
    ///
    /// Mute reports `2` for unmuted.
    pub fn as_bool(&self) -> Option<bool> {
        match self.text() {
            "1" => Some(true),
            "0" | "2" => Some(false),
            _ => None,
        }
    }

    /// Interpret numeric replies (volume, input, channel).
    pub fn as_number(&self) -> Option<i64> {
        self.text().parse().ok()
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.text())
    }
}

// ── Tests ────────────────────────────────────────────────────────
