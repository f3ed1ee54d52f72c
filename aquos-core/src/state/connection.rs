//! Connection state machine.
//!
//! Models the lifecycle of one AQUOS control connection, with validated
//! transitions that return `Result` instead of panicking.

use std::time::Instant;

use crate::error::AquosError;

// ── ConnectionState ──────────────────────────────────────────────

/// The current state of the control connection.
///
/// ```text
///  Disconnected ──► Connecting ──► AwaitingLogin ──┐
///       ▲               │                          ▼
///       │               └──────────────────► AwaitingSetupAck ──► Ready
///       │                                          │               │
///       └──────────────────────────────────────────┴───────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// No transport. Initial state, and the state after every close.
    #[default]
    Disconnected,

    /// Transport opening or open, nothing received yet.
    Connecting,

    /// The device sent its login prompt.
    AwaitingLogin,

    /// Setup command written; waiting for `OK`.
    AwaitingSetupAck,

    /// Setup acknowledged; commands may be issued.
    Ready {
        /// When the connection became ready.
        since: Instant,
    },
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disconnected => write!(f, "Disconnected"),
            Self::Connecting => write!(f, "Connecting"),
            Self::AwaitingLogin => write!(f, "AwaitingLogin"),
            Self::AwaitingSetupAck => write!(f, "AwaitingSetupAck"),
            Self::Ready { .. } => write!(f, "Ready"),
        }
    }
}

impl ConnectionState {
    /// Returns `true` when commands can be written.
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready { .. })
    }

    pub fn is_disconnected(&self) -> bool {
        matches!(self, Self::Disconnected)
    }

    /// Returns `true` while the handshake is still running.
    pub fn is_handshaking(&self) -> bool {
        matches!(
            self,
            Self::Connecting | Self::AwaitingLogin | Self::AwaitingSetupAck
        )
    }

    /// How long the connection has been ready.
    ///
    /// Returns `None` for any other state.
    pub fn ready_duration(&self) -> Option<std::time::Duration> {
        match self {
            Self::Ready { since } => Some(since.elapsed()),
            _ => None,
        }
    }

    // ── Transitions ──────────────────────────────────────────────

    /// Transition to `Connecting`.
    ///
    /// Valid from: `Disconnected`.
    pub fn begin_connect(&mut self) -> Result<(), AquosError> {
        match self {
            Self::Disconnected => {
                *self = Self::Connecting;
                Ok(())
            }
            _ => Err(AquosError::ProtocolViolation(
                "cannot connect: not in Disconnected state",
            )),
        }
    }

    /// Transition to `AwaitingLogin`.
    ///
    /// Valid from: `Connecting`, `AwaitingSetupAck` (the device may prompt
    /// after an unauthenticated setup).
    pub fn login_requested(&mut self) -> Result<(), AquosError> {
        match self {
            Self::Connecting | Self::AwaitingSetupAck => {
                *self = Self::AwaitingLogin;
                Ok(())
            }
            _ => Err(AquosError::ProtocolViolation(
                "unexpected login prompt",
            )),
        }
    }

    /// Transition to `AwaitingSetupAck`.
    ///
    /// Valid from: `Connecting` (no credentials), `AwaitingLogin`.
    pub fn setup_sent(&mut self) -> Result<(), AquosError> {
        match self {
            Self::Connecting | Self::AwaitingLogin => {
                *self = Self::AwaitingSetupAck;
                Ok(())
            }
            _ => Err(AquosError::ProtocolViolation(
                "cannot send setup: handshake not in progress",
            )),
        }
    }

    /// Transition to `Ready`.
    ///
    /// Valid from: `AwaitingSetupAck`.
    pub fn setup_acknowledged(&mut self) -> Result<(), AquosError> {
        match self {
            Self::AwaitingSetupAck => {
                *self = Self::Ready {
                    since: Instant::now(),
                };
                Ok(())
            }
            _ => Err(AquosError::ProtocolViolation(
                "cannot become ready: setup not sent",
            )),
        }
    }

    /// Reset to `Disconnected` regardless of current state.
    ///
    /// Used on every transport close.
    pub fn force_disconnect(&mut self) {
        *self = Self::Disconnected;
    }
}

// ── Tests ────────────────────────────────────────────────────────
