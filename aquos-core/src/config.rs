//! Client configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::codec::Framing;
use crate::network::ConnectionInfo;
use crate::protocol::DEFAULT_PORT;

/// Login pair sent when the TV prompts for it.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Connection settings for one TV.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Hostname or IP address of the TV.
    pub host: String,
    /// IP-control port.
    pub port: u16,
    /// Login name, if the TV has authentication enabled.
    pub username: Option<String>,
    /// Login password.
    pub password: Option<String>,
    /// Inbound message framing.
    pub framing: Framing,
    /// TCP connect timeout in milliseconds.
    pub connect_timeout_ms: u64,
    /// Reply deadline per command in milliseconds (0 = wait forever).
    pub command_timeout_ms: u64,
    /// Fixed pause between reconnect attempts in milliseconds.
    pub reconnect_delay_ms: u64,
    /// Commands allowed to wait behind the in-flight one (0 = reject).
    pub queue_depth: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: DEFAULT_PORT,
            username: None,
            password: None,
            framing: Framing::default(),
            connect_timeout_ms: 5000,
            command_timeout_ms: 5000,
            reconnect_delay_ms: 500,
            queue_depth: 16,
        }
    }
}

impl ClientConfig {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            ..Self::default()
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    pub fn with_framing(mut self, framing: Framing) -> Self {
        self.framing = framing;
        self
    }

    pub fn with_queue_depth(mut self, depth: usize) -> Self {
        self.queue_depth = depth;
        self
    }

    /// `None` disables the per-command deadline.
    pub fn with_command_timeout(mut self, timeout: Option<Duration>) -> Self {
        // Sub-millisecond deadlines round up; zero would mean none.
        self.command_timeout_ms = timeout.map_or(0, |t| millis(t).max(1));
        self
    }

    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay_ms = millis(delay);
        self
    }

    /// A username is configured, so setup waits for the login prompt.
    pub fn expects_login(&self) -> bool {
        self.username.is_some()
    }

    /// Both halves of the login, or `None` if either is missing.
    pub fn credentials(&self) -> Option<Credentials> {
        match (&self.username, &self.password) {
            (Some(username), Some(password)) => Some(Credentials {
                username: username.clone(),
                password: password.clone(),
            }),
            _ => None,
        }
    }

    pub fn connection_info(&self) -> ConnectionInfo {
        ConnectionInfo::new(self.host.clone(), self.port)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn command_timeout(&self) -> Option<Duration> {
        (self.command_timeout_ms > 0).then(|| Duration::from_millis(self.command_timeout_ms))
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

// ── Tests ────────────────────────────────────────────────────────
