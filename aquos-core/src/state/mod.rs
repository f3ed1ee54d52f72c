pub mod channel;
pub mod connection;

pub use channel::{CommandChannel, PendingCommand, ReplyReceiver, Request, Resolver};
pub use connection::ConnectionState;
