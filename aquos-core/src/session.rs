//! Sans-IO protocol session.
//!
//! `Session` owns the connection state machine and the command channel.
//! It consumes [`TransportEvent`]s and caller requests and answers with
//! [`Action`]s for whoever owns the socket. No I/O happens here, so the
//! whole handshake and correlation logic is testable without a network.

use std::time::Instant;

use tracing::{debug, info, warn};

use crate::codec::Outbound;
use crate::config::{ClientConfig, Credentials};
use crate::error::AquosError;
use crate::protocol::{Command, Inbound};
use crate::state::{CommandChannel, ConnectionState, Request};

/// Everything the transport can report.
#[derive(Debug)]
pub enum TransportEvent {
    /// The socket is open.
    Connected,
    /// One inbound message, as framed by the codec.
    Data(String),
    /// The socket closed, for whatever reason.
    Closed,
    /// A read or write failed. A `Closed` follows.
    Errored(AquosError),
}

/// What the socket owner must do next, in order.
#[derive(Debug)]
pub enum Action {
    Write(Outbound),
    /// Tear the transport down; the owner reconnects unless a `Fail` follows.
    Close,
    /// The handshake completed.
    Ready,
    /// The handshake failed for good; no reconnect.
    Fail(AquosError),
}

#[derive(Debug)]
pub struct Session {
    state: ConnectionState,
    credentials: Option<Credentials>,
    /// Wait for the login prompt instead of sending setup on connect.
    expects_login: bool,
    channel: CommandChannel,
    /// Credentials already written on this connection.
    login_sent: bool,
}

impl Session {
    pub fn new(config: &ClientConfig) -> Self {
        Self {
            state: ConnectionState::default(),
            credentials: config.credentials(),
            expects_login: config.expects_login(),
            channel: CommandChannel::new(config.queue_depth, config.command_timeout()),
            login_sent: false,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn channel(&self) -> &CommandChannel {
        &self.channel
    }

    /// A new transport is about to be opened.
    pub fn begin_connect(&mut self) -> Result<(), AquosError> {
        self.login_sent = false;
        self.state.begin_connect()
    }

    // ── Transport events ─────────────────────────────────────────

    pub fn handle(&mut self, event: TransportEvent) -> Vec<Action> {
        match event {
            TransportEvent::Connected => self.on_connected(),
            TransportEvent::Data(text) => self.on_data(text),
            TransportEvent::Closed => {
                if !self.state.is_disconnected() {
                    info!(
                        state = %self.state,
                        uptime = ?self.state.ready_duration(),
                        "connection closed"
                    );
                }
                self.state.force_disconnect();
                self.channel.connection_lost();
                Vec::new()
            }
            TransportEvent::Errored(err) => {
                warn!(error = %err, "transport error");
                Vec::new()
            }
        }
    }

    fn on_connected(&mut self) -> Vec<Action> {
        if self.expects_login {
            debug!("connected; waiting for login prompt");
            return Vec::new();
        }
        match self.state.setup_sent() {
            Ok(()) => {
                debug!("connected; sending setup");
                vec![Action::Write(Command::Setup.into())]
            }
            Err(e) => {
                warn!(error = %e, "connect event out of order");
                Vec::new()
            }
        }
    }

    fn on_data(&mut self, text: String) -> Vec<Action> {
        if self.state.is_ready() {
            self.channel.on_reply(text);
            return self.dispatch();
        }
        if !self.state.is_handshaking() {
            debug!(data = %text.trim(), "data while disconnected");
            return Vec::new();
        }

        match Inbound::classify(&text) {
            Inbound::AuthMismatch => {
                warn!("the TV rejected the username or password");
                self.terminate(|| AquosError::InvalidCredentials)
            }
            Inbound::LoginPrompt => self.on_login_prompt(),
            Inbound::Ack if self.state == ConnectionState::AwaitingSetupAck => {
                if let Err(e) = self.state.setup_acknowledged() {
                    warn!(error = %e, "setup acknowledgment out of order");
                    return Vec::new();
                }
                let mut actions = vec![Action::Ready];
                actions.extend(self.dispatch());
                actions
            }
            _ => {
                debug!(state = %self.state, data = %text.trim(), "ignoring handshake data");
                Vec::new()
            }
        }
    }

    fn on_login_prompt(&mut self) -> Vec<Action> {
        let Some(creds) = self.credentials.clone() else {
            warn!("the TV requires a login but no credentials are configured");
            return self.terminate(|| AquosError::AuthRequired);
        };
        // A second prompt means the first answer was not accepted.
        if self.login_sent {
            warn!("the TV prompted for a login again");
            return self.terminate(|| AquosError::InvalidCredentials);
        }
        if let Err(e) = self.state.login_requested() {
            warn!(error = %e, "login prompt out of order");
            return Vec::new();
        }

        if let Err(e) = self.state.setup_sent() {
            warn!(error = %e, "setup out of order");
            return Vec::new();
        }

        self.login_sent = true;
        debug!(username = %creds.username, "sending credentials");
        vec![
            Action::Write(Outbound::Login {
                username: creds.username,
                password: creds.password,
            }),
            Action::Write(Command::Setup.into()),
        ]
    }

    /// End the session: everything waiting fails with `make()`.
    fn terminate(&mut self, make: fn() -> AquosError) -> Vec<Action> {
        self.channel.fail_all(make);
        self.state.force_disconnect();
        vec![Action::Close, Action::Fail(make())]
    }

    // ── Caller requests ──────────────────────────────────────────

    pub fn submit(&mut self, request: Request) -> Vec<Action> {
        match self.channel.submit(request, self.state.is_ready()) {
            Some(command) => vec![Action::Write(command.into())],
            None => Vec::new(),
        }
    }

    fn dispatch(&mut self) -> Vec<Action> {
        if !self.state.is_ready() {
            return Vec::new();
        }
        self.channel
            .dispatch_next()
            .map(|command| vec![Action::Write(command.into())])
            .unwrap_or_default()
    }

    /// Check the pending command's deadline.
    ///
    /// An expired command recycles the transport, so its late reply cannot
    /// be taken for the answer to the next command.
    pub fn tick(&mut self, now: Instant) -> Vec<Action> {
        match self.channel.expire(now) {
            Some(deadline) => {
                warn!(?deadline, "command timed out; recycling connection");
                vec![Action::Close]
            }
            None => Vec::new(),
        }
    }

    /// The client is closing: fail everything and forget the connection.
    pub fn shutdown(&mut self) {
        self.channel.fail_all(|| AquosError::Closed);
        self.state.force_disconnect();
    }
}

// ── Tests ────────────────────────────────────────────────────────
