pub mod connection;
pub(crate) mod supervisor;

pub use connection::{ConnectionInfo, Connector, TcpConnector};
