//! Public client handle.
//!
//! ```no_run
//! # async fn demo() -> Result<(), aquos_core::AquosError> {
//! use aquos_core::{AquosClient, ClientConfig};
//!
//! let tv = AquosClient::connect(ClientConfig::new("192.168.1.20")).await?;
//! tv.power(Some(true)).await?;
//! let level = tv.volume(None).await?;
//! println!("volume: {level}");
//! tv.close().await;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, watch};

use crate::config::ClientConfig;
use crate::error::AquosError;
use crate::network::supervisor::{Control, Supervisor};
use crate::network::{Connector, TcpConnector};
use crate::protocol::{Command, Reply};
use crate::state::{ConnectionState, Request};

/// Resolves once, when the first handshake succeeds or fails.
pub type Readiness = oneshot::Receiver<Result<(), AquosError>>;

/// Cheap, cloneable handle to one TV connection.
///
/// All clones talk to the same supervisor task. The task stops when
/// [`close`](Self::close) is called or every handle is dropped.
#[derive(Debug, Clone)]
pub struct AquosClient {
    control: mpsc::Sender<Control>,
    state: watch::Receiver<ConnectionState>,
    config: Arc<ClientConfig>,
}

impl AquosClient {
    /// Connect over TCP and wait for the handshake.
    pub async fn connect(config: ClientConfig) -> Result<Self, AquosError> {
        let connector = TcpConnector::new(config.connect_timeout());
        Self::connect_with(config, connector).await
    }

    /// Connect through a custom [`Connector`] and wait for the handshake.
    pub async fn connect_with<C: Connector>(
        config: ClientConfig,
        connector: C,
    ) -> Result<Self, AquosError> {
        let (client, ready) = Self::spawn(config, connector);
        ready.await.map_err(|_| AquosError::Closed)??;
        Ok(client)
    }

    /// Start the supervisor without waiting.
    ///
    /// Commands issued before the returned [`Readiness`] resolves are held
    /// until the handshake completes.
    pub fn spawn<C: Connector>(config: ClientConfig, connector: C) -> (Self, Readiness) {
        let (control_tx, control_rx) = mpsc::channel(100);
        let (state_tx, state_rx) = watch::channel(ConnectionState::default());
        let (ready_tx, ready_rx) = oneshot::channel();

        let supervisor = Supervisor::new(&config, connector, control_rx, state_tx, ready_tx);
        tokio::spawn(supervisor.run());

        let client = Self {
            control: control_tx,
            state: state_rx,
            config: Arc::new(config),
        };
        (client, ready_rx)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Subscribe to connection state changes.
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.clone()
    }

    /// Stop the supervisor. Nothing reconnects afterwards, and every
    /// outstanding command resolves with `Closed`.
    pub async fn close(&self) {
        let _ = self.control.send(Control::Close).await;
    }

    // ── Commands ─────────────────────────────────────────────────

    /// Send one command and wait for its reply.
    ///
    /// Invalid parameters fail here, before anything reaches the wire.
    pub async fn send(&self, command: Command) -> Result<Reply, AquosError> {
        command.validate()?;
        let (request, reply) = Request::new(command);
        self.control
            .send(Control::Submit(request))
            .await
            .map_err(|_| AquosError::Closed)?;
        reply.await.map_err(|_| AquosError::Closed)?
    }

    /// Query (`None`) or set the power state.
    pub async fn power(&self, on: Option<bool>) -> Result<Reply, AquosError> {
        self.send(Command::power(on)).await
    }

    pub async fn mute(&self, muted: Option<bool>) -> Result<Reply, AquosError> {
        self.send(Command::mute(muted)).await
    }

    /// Query or set the volume (0–60).
    pub async fn volume(&self, level: Option<i64>) -> Result<Reply, AquosError> {
        self.send(Command::volume(level)?).await
    }

    /// Query or select an input (1–9).
    pub async fn input(&self, input: Option<i64>) -> Result<Reply, AquosError> {
        self.send(Command::input(input)?).await
    }

    pub async fn channel(&self, code: Option<i64>) -> Result<Reply, AquosError> {
        self.send(Command::channel(code)?).await
    }

    pub async fn captioning(&self, level: Option<i64>) -> Result<Reply, AquosError> {
        self.send(Command::captioning(level)?).await
    }

    pub async fn channel_up(&self) -> Result<Reply, AquosError> {
        self.send(Command::ChannelUp).await
    }

    pub async fn channel_down(&self) -> Result<Reply, AquosError> {
        self.send(Command::ChannelDown).await
    }

    pub async fn netflix(&self) -> Result<Reply, AquosError> {
        self.send(Command::netflix()).await
    }

    pub async fn remote_key(&self, code: i64) -> Result<Reply, AquosError> {
        self.send(Command::remote_key(code)?).await
    }

    /// Write a raw code followed by the terminator.
    pub async fn button(&self, code: impl Into<String>) -> Result<Reply, AquosError> {
        self.send(Command::button(code)?).await
    }
}
