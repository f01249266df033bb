use std::io;

use thiserror::Error;

use crate::msgs::{Socks4Status, Socks5Status};

pub type Result<T> = std::result::Result<T, Error>;

/// All failure modes of the protocol engine.
///
/// Codec failures are non-retryable: the input octets do not form a valid
/// message. Reply variants carry the non-granted status a proxy answered
/// with, so callers can inspect the peer's verdict.
#[derive(Error, Debug)]
pub enum Error {
    #[error("short buffer")]
    ShortBuffer,

    #[error("unsupported SOCKS version: {0}")]
    BadVersion(u8),

    #[error("unknown address type: {0:#04x}")]
    BadAddrType(u8),

    #[error("FQDN too long")]
    FqdnTooLong,

    #[error("port number out of range")]
    BadPortRange,

    #[error("invalid host: {0}")]
    BadHost(String),

    /// First byte of an accepted connection was neither 0x04 nor 0x05.
    #[error("unsupported SOCKS version byte: {0:#04x}")]
    UnsupportedVersion(u8),

    #[error("no authentication methods offered")]
    NoAuthMethods,

    #[error("more than 255 authentication methods offered")]
    TooManyMethods,

    #[error("no acceptable authentication methods")]
    NoAcceptableMethod,

    #[error("authentication failed")]
    AuthFailed,

    #[error("username or password length out of range")]
    BadCredential,

    #[error("io error: {0}")]
    Io(#[from] io::Error),

    #[error("cancelled")]
    Cancelled,

    /// The SOCKS4 proxy answered with a non-granted status.
    #[error("reply error: {0}")]
    Socks4Reply(Socks4Status),

    /// The SOCKS5 proxy answered with a non-granted status.
    #[error("reply error: {0}")]
    Socks5Reply(Socks5Status),
}
