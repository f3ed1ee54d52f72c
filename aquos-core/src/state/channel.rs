//! Command channel: one in-flight command, a bounded backlog behind it.
//!
//! The protocol carries no request IDs, so the only way to pair a reply
//! with its caller is to never have two commands on the wire. A command
//! submitted while another is pending waits in the backlog and is written
//! after the previous reply resolves.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use tokio::sync::oneshot;
use tracing::debug;

use crate::error::AquosError;
use crate::protocol::reply::ERROR_MARKER;
use crate::protocol::{Command, Reply};

/// Completion handle of one command.
pub type Resolver = oneshot::Sender<Result<Reply, AquosError>>;

/// Caller side of a [`Resolver`].
pub type ReplyReceiver = oneshot::Receiver<Result<Reply, AquosError>>;

// ── Request ──────────────────────────────────────────────────────

/// A command waiting to be written.
#[derive(Debug)]
pub struct Request {
    pub command: Command,
    resolver: Resolver,
}

impl Request {
    pub fn new(command: Command) -> (Self, ReplyReceiver) {
        let (resolver, rx) = oneshot::channel();
        (Self { command, resolver }, rx)
    }

    /// Complete the request without writing it.
    pub fn reject(self, err: AquosError) {
        let _ = self.resolver.send(Err(err));
    }

    /// `true` when the caller stopped waiting.
    pub fn is_abandoned(&self) -> bool {
        self.resolver.is_closed()
    }
}

// ── PendingCommand ───────────────────────────────────────────────

/// The command currently on the wire.
#[derive(Debug)]
pub struct PendingCommand {
    /// The command that was written.
    pub command: Command,
    /// When it was written.
    pub sent_at: Instant,
    /// Optional deadline; `None` means wait forever.
    pub deadline: Option<Duration>,
    resolver: Resolver,
}

impl PendingCommand {
    fn is_expired_at(&self, now: Instant) -> bool {
        match self.expires_at() {
            Some(at) => now >= at,
            None => false,
        }
    }

    /// Instant at which the deadline passes.
    pub fn expires_at(&self) -> Option<Instant> {
        self.deadline.map(|d| self.sent_at + d)
    }

    /// How long this command has been in flight.
    pub fn elapsed(&self) -> Duration {
        self.sent_at.elapsed()
    }

    fn resolve(self, result: Result<Reply, AquosError>) {
        // A dropped receiver only means the caller gave up.
        let _ = self.resolver.send(result);
    }
}

// ── CommandChannel ───────────────────────────────────────────────

#[derive(Debug)]
pub struct CommandChannel {
    /// The single in-flight command.
    pending: Option<PendingCommand>,

    /// Commands waiting for the wire, oldest first.
    backlog: VecDeque<Request>,

    /// Maximum backlog length; 0 rejects any command while one is pending.
    queue_depth: usize,

    /// Deadline applied to every written command.
    timeout: Option<Duration>,
}

impl CommandChannel {
    pub fn new(queue_depth: usize, timeout: Option<Duration>) -> Self {
        Self {
            pending: None,
            backlog: VecDeque::new(),
            queue_depth,
            timeout,
        }
    }

    /// Returns `true` when nothing is in flight.
    pub fn is_idle(&self) -> bool {
        self.pending.is_none()
    }

    pub fn pending(&self) -> Option<&PendingCommand> {
        self.pending.as_ref()
    }

    /// Number of commands waiting behind the pending one.
    pub fn backlog_len(&self) -> usize {
        self.backlog.len()
    }

    /// Deadline of the in-flight command, if any.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.as_ref().and_then(PendingCommand::expires_at)
    }

    // ── Submission ───────────────────────────────────────────────

    /// Accept a new request.
    ///
    /// Returns the command to write when it can go out immediately. Otherwise
    /// the request is queued, or rejected with `Busy` / `NotReady` when the
    /// backlog is full.
    pub fn submit(&mut self, request: Request, ready: bool) -> Option<Command> {
        if ready && self.pending.is_none() && self.backlog.is_empty() {
            return Some(self.start(request));
        }

        // Callers that gave up do not hold a slot.
        self.backlog.retain(|r| !r.is_abandoned());
        if self.backlog.len() < self.queue_depth {
            debug!(command = %request.command, backlog = self.backlog.len() + 1, "queued");
            self.backlog.push_back(request);
            return None;
        }

        let err = if ready {
            AquosError::Busy
        } else {
            AquosError::NotReady
        };
        request.reject(err);
        None
    }

    /// Move the oldest live backlog entry onto the wire.
    ///
    /// Must only be called when the connection is ready.
    pub fn dispatch_next(&mut self) -> Option<Command> {
        if self.pending.is_some() {
            return None;
        }
        while let Some(request) = self.backlog.pop_front() {
            if request.is_abandoned() {
                debug!(command = %request.command, "skipping abandoned command");
                continue;
            }
            return Some(self.start(request));
        }
        None
    }

    fn start(&mut self, request: Request) -> Command {
        let command = request.command.clone();
        self.pending = Some(PendingCommand {
            command: request.command,
            sent_at: Instant::now(),
            deadline: self.timeout,
            resolver: request.resolver,
        });
        command
    }

    // ── Resolution ───────────────────────────────────────────────

    /// Resolve the pending command with one inbound message.
    ///
    /// Returns `false` when nothing was pending and the message was dropped.
    pub fn on_reply(&mut self, text: String) -> bool {
        let Some(pending) = self.pending.take() else {
            debug!(reply = %text.trim(), "dropping unsolicited reply");
            return false;
        };

        let result = if text.contains(ERROR_MARKER) {
            Err(AquosError::Wire(text))
        } else {
            Ok(Reply::new(text))
        };
        debug!(command = %pending.command, elapsed = ?pending.elapsed(), ok = result.is_ok(), "resolved");
        pending.resolve(result);
        true
    }

    /// Fail the pending command if its deadline has passed.
    ///
    /// Returns the deadline that expired.
    pub fn expire(&mut self, now: Instant) -> Option<Duration> {
        if !self.pending.as_ref().is_some_and(|p| p.is_expired_at(now)) {
            return None;
        }
        let pending = self.pending.take()?;
        let deadline = pending.deadline.unwrap_or_default();
        pending.resolve(Err(AquosError::Timeout(deadline)));
        Some(deadline)
    }

    /// The transport closed: the pending command can never be answered.
    ///
    /// Backlog entries survive and go out after the next handshake.
    pub fn connection_lost(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.resolve(Err(AquosError::ConnectionLost));
        }
        self.backlog.retain(|r| !r.is_abandoned());
    }

    /// Fail everything, pending and queued.
    pub fn fail_all(&mut self, err: impl Fn() -> AquosError) {
        if let Some(pending) = self.pending.take() {
            pending.resolve(Err(err()));
        }
        for request in self.backlog.drain(..) {
            request.reject(err());
        }
    }
}

impl Default for CommandChannel {
    fn default() -> Self {
        Self::new(0, None)
    }
}

// ── Tests ─────────────────────────────────────────────────────────
