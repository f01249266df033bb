//! SOCKS4, SOCKS4a and SOCKS5 on tokio: a listening proxy server and
//! client dialers sharing one bit-exact wire codec.
//!
//! The server accepts a byte stream, sniffs the protocol version from the
//! first octet, negotiates authentication, establishes the requested
//! upstream and tunnels bytes both ways with proper half-close semantics.
//! The dialers run the same handshakes against an external proxy and hand
//! back a transparent stream to the target. Network access goes through
//! injected dial/listen capabilities, so everything is testable in-memory.

pub mod addr;
pub mod auth;
pub mod conn;
pub mod copy;
pub mod dialer;
pub mod dialers;
pub mod error;
mod handler;
pub mod msgs;
pub mod server;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// Re-export commonly used types for convenience
pub use addr::TargetAddress;
pub use conn::{Channel, SocksConn};
pub use dialer::{Socks4Dialer, Socks5Dialer};
pub use error::{Error, Result};
pub use msgs::{AuthMethod, Command, Socks4Status, Socks5Status, Version};
pub use server::Server;
