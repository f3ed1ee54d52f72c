//! AQUOS IP-control protocol: outbound commands and inbound replies.
//!
//! - `command`: the command table and its fixed-width wire encoding
//! - `reply`: substring markers and the `Reply` payload type

pub mod command;
pub mod reply;

pub use command::Command;
pub use reply::{Inbound, Reply};

/// Setup command sent once per connection, after authentication.
pub const SETUP: &str = "RSPW2   \r";

/// Default TCP port of the IP-control server.
pub const DEFAULT_PORT: u16 = 10002;
