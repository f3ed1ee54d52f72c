//! # aquos-core
//!
//! Client library for the Sharp AQUOS IP remote-control protocol.
//!
//! This crate contains:
//! - **Protocol types**: `Command` with its fixed-width wire encoding, `Reply`
//! - **Codec**: `AquosCodec` for framed TCP I/O via `tokio_util`
//! - **State**: the connection state machine and the single-slot command channel
//! - **Session**: sans-IO handshake and correlation logic driven by transport events
//! - **Network**: `Connector` seam and the reconnecting supervisor task
//! - **Client**: `AquosClient`, the public async handle
//! - **Error**: `AquosError`, the typed error hierarchy

pub mod client;
pub mod codec;
pub mod config;
pub mod error;
pub mod network;
pub mod protocol;
pub mod session;
pub mod state;

// ── Re-exports for ergonomic usage ───────────────────────────────

pub use client::{AquosClient, Readiness};
pub use codec::{AquosCodec, Framing, Outbound};
pub use config::{ClientConfig, Credentials};
pub use error::AquosError;
pub use network::{ConnectionInfo, Connector, TcpConnector};
pub use protocol::{Command, DEFAULT_PORT, Inbound, Reply, SETUP};
pub use session::{Action, Session, TransportEvent};
pub use state::{CommandChannel, ConnectionState, PendingCommand};
