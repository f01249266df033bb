//! Wire codec for every SOCKS4/4a/5 message.
//!
//! Each message type encodes to and decodes from a plain octet buffer; all
//! multi-byte integers are big-endian. Encoders validate what the protocol
//! cannot express (ports, FQDN length, IPv6 in SOCKS4); decoders are
//! tolerant of the short reply forms emitted by deployed peers.

use std::fmt::Display;
use std::net::{IpAddr, Ipv4Addr};

use bytes::BufMut;

use crate::addr::TargetAddress;
use crate::error::{Error, Result};

pub const SOCKS4_VERSION: u8 = 0x04;
pub const SOCKS5_VERSION: u8 = 0x05;
pub const USERPASS_AUTH_VERSION: u8 = 0x01;

/// A protocol message with pure buffer-level marshalling.
pub trait Message: Sized {
    fn encode(&self) -> Result<Vec<u8>>;
    fn decode(buf: &[u8]) -> Result<Self>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Version {
    Socks4,
    Socks5,
}

impl Version {
    pub fn from_u8(b: u8) -> Option<Self> {
        match b {
            SOCKS4_VERSION => Some(Self::Socks4),
            SOCKS5_VERSION => Some(Self::Socks5),
            _ => None,
        }
    }

    pub fn as_u8(self) -> u8 {
        match self {
            Self::Socks4 => SOCKS4_VERSION,
            Self::Socks5 => SOCKS5_VERSION,
        }
    }
}

/// Request command. Unknown bytes are carried through so the server state
/// machine can answer them with the proper reject status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Connect,
    Bind,
    Associate,
    Other(u8),
}

impl Command {
    pub fn from_u8(b: u8) -> Self {
        match b {
            0x01 => Self::Connect,
            0x02 => Self::Bind,
            0x03 => Self::Associate,
            other => Self::Other(other),
        }
    }

    pub fn as_u8(self) -> u8 {
        match self {
            Self::Connect => 0x01,
            Self::Bind => 0x02,
            Self::Associate => 0x03,
            Self::Other(other) => other,
        }
    }
}

impl Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Connect => write!(f, "socks connect"),
            Self::Bind => write!(f, "socks bind"),
            Self::Associate => write!(f, "socks associate"),
            Self::Other(other) => write!(f, "socks {}", other),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddrType {
    V4,
    Domain,
    V6,
}

impl AddrType {
    pub fn from_u8(b: u8) -> Result<Self> {
        match b {
            0x01 => Ok(Self::V4),
            0x03 => Ok(Self::Domain),
            0x04 => Ok(Self::V6),
            other => Err(Error::BadAddrType(other)),
        }
    }

    pub fn as_u8(self) -> u8 {
        match self {
            Self::V4 => 0x01,
            Self::Domain => 0x03,
            Self::V6 => 0x04,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Socks4Status {
    Granted,
    Rejected,
    NoIdentd,
    InvalidUserId,
    Other(u8),
}

impl Socks4Status {
    pub fn from_u8(b: u8) -> Self {
        match b {
            0x5a => Self::Granted,
            0x5b => Self::Rejected,
            0x5c => Self::NoIdentd,
            0x5d => Self::InvalidUserId,
            other => Self::Other(other),
        }
    }

    pub fn as_u8(self) -> u8 {
        match self {
            Self::Granted => 0x5a,
            Self::Rejected => 0x5b,
            Self::NoIdentd => 0x5c,
            Self::InvalidUserId => 0x5d,
            Self::Other(other) => other,
        }
    }
}

impl Display for Socks4Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Granted => write!(f, "request granted"),
            Self::Rejected => write!(f, "request rejected or failed"),
            Self::NoIdentd => write!(
                f,
                "request rejected because SOCKS server cannot connect to identd on the client"
            ),
            Self::InvalidUserId => write!(
                f,
                "request rejected because the client program and identd report different user-ids"
            ),
            Self::Other(other) => write!(f, "unknown code: {}", other),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Socks5Status {
    Granted,
    Failure,
    NotAllowed,
    NetUnreachable,
    HostUnreachable,
    ConnRefused,
    TtlExpired,
    CmdNotSupported,
    AddrTypeNotSupported,
    Other(u8),
}

impl Socks5Status {
    pub fn from_u8(b: u8) -> Self {
        match b {
            0x00 => Self::Granted,
            0x01 => Self::Failure,
            0x02 => Self::NotAllowed,
            0x03 => Self::NetUnreachable,
            0x04 => Self::HostUnreachable,
            0x05 => Self::ConnRefused,
            0x06 => Self::TtlExpired,
            0x07 => Self::CmdNotSupported,
            0x08 => Self::AddrTypeNotSupported,
            other => Self::Other(other),
        }
    }

    pub fn as_u8(self) -> u8 {
        match self {
            Self::Granted => 0x00,
            Self::Failure => 0x01,
            Self::NotAllowed => 0x02,
            Self::NetUnreachable => 0x03,
            Self::HostUnreachable => 0x04,
            Self::ConnRefused => 0x05,
            Self::TtlExpired => 0x06,
            Self::CmdNotSupported => 0x07,
            Self::AddrTypeNotSupported => 0x08,
            Self::Other(other) => other,
        }
    }
}

impl Display for Socks5Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Granted => write!(f, "succeeded"),
            Self::Failure => write!(f, "general SOCKS server failure"),
            Self::NotAllowed => write!(f, "connection not allowed by ruleset"),
            Self::NetUnreachable => write!(f, "network unreachable"),
            Self::HostUnreachable => write!(f, "host unreachable"),
            Self::ConnRefused => write!(f, "connection refused"),
            Self::TtlExpired => write!(f, "TTL expired"),
            Self::CmdNotSupported => write!(f, "command not supported"),
            Self::AddrTypeNotSupported => write!(f, "address type not supported"),
            Self::Other(other) => write!(f, "unknown code: {}", other),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMethod {
    None,
    Gssapi,
    UserPass,
    NoAcceptable,
    Other(u8),
}

impl AuthMethod {
    pub fn from_u8(b: u8) -> Self {
        match b {
            0x00 => Self::None,
            0x01 => Self::Gssapi,
            0x02 => Self::UserPass,
            0xff => Self::NoAcceptable,
            other => Self::Other(other),
        }
    }

    pub fn as_u8(self) -> u8 {
        match self {
            Self::None => 0x00,
            Self::Gssapi => 0x01,
            Self::UserPass => 0x02,
            Self::NoAcceptable => 0xff,
            Self::Other(other) => other,
        }
    }
}

/// RFC 1929 treats any nonzero status octet as failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthStatus {
    Success,
    Failure,
}

impl AuthStatus {
    pub fn from_u8(b: u8) -> Self {
        if b == 0 {
            Self::Success
        } else {
            Self::Failure
        }
    }

    pub fn as_u8(self) -> u8 {
        match self {
            Self::Success => 0x00,
            Self::Failure => 0xff,
        }
    }
}

// decode cursor helpers

fn get_u8(buf: &mut &[u8]) -> Result<u8> {
    let (&b, rest) = buf.split_first().ok_or(Error::ShortBuffer)?;
    *buf = rest;
    Ok(b)
}

fn get_u16(buf: &mut &[u8]) -> Result<u16> {
    let hi = get_u8(buf)?;
    let lo = get_u8(buf)?;
    Ok(u16::from(hi) << 8 | u16::from(lo))
}

fn get_bytes<'a>(buf: &mut &'a [u8], n: usize) -> Result<&'a [u8]> {
    if buf.len() < n {
        return Err(Error::ShortBuffer);
    }
    let (head, rest) = buf.split_at(n);
    *buf = rest;
    Ok(head)
}

fn get_cstr(buf: &mut &[u8]) -> Result<String> {
    let nul = buf.iter().position(|&b| b == 0).ok_or(Error::ShortBuffer)?;
    let s = String::from_utf8_lossy(&buf[..nul]).to_string();
    *buf = &buf[nul + 1..];
    Ok(s)
}

fn put_port(b: &mut Vec<u8>, port: u16) -> Result<()> {
    if port == 0 {
        return Err(Error::BadPortRange);
    }
    b.put_u16(port);
    Ok(())
}

fn ipv4_of(addr: &TargetAddress) -> Option<Ipv4Addr> {
    match addr {
        TargetAddress::SocketAddr(a) => match a.ip() {
            IpAddr::V4(v4) => Some(v4),
            IpAddr::V6(_) => None,
        },
        TargetAddress::DomainPort(host, _) => host.parse().ok(),
    }
}

/// ATYP + ADDR + PORT as used by SOCKS5 requests and replies.
fn put_addr(b: &mut Vec<u8>, addr: &TargetAddress) -> Result<()> {
    let host_ip = match addr {
        TargetAddress::SocketAddr(a) => Some(a.ip()),
        TargetAddress::DomainPort(host, _) => host.parse::<IpAddr>().ok(),
    };
    match host_ip {
        Some(IpAddr::V4(v4)) => {
            b.put_u8(AddrType::V4.as_u8());
            b.put_slice(&v4.octets());
        }
        Some(IpAddr::V6(v6)) => {
            b.put_u8(AddrType::V6.as_u8());
            b.put_slice(&v6.octets());
        }
        None => {
            let host = match addr {
                TargetAddress::DomainPort(host, _) => host,
                TargetAddress::SocketAddr(_) => unreachable!(),
            };
            if host.len() > 255 {
                return Err(Error::FqdnTooLong);
            }
            b.put_u8(AddrType::Domain.as_u8());
            b.put_u8(host.len() as u8);
            b.put_slice(host.as_bytes());
        }
    }
    put_port(b, addr.port())
}

fn get_addr(buf: &mut &[u8]) -> Result<TargetAddress> {
    let atype = AddrType::from_u8(get_u8(buf)?)?;
    match atype {
        AddrType::V4 => {
            let ip: [u8; 4] = get_bytes(buf, 4)?.try_into().unwrap();
            let port = get_u16(buf)?;
            Ok((Ipv4Addr::from(ip), port).into())
        }
        AddrType::V6 => {
            let ip: [u8; 16] = get_bytes(buf, 16)?.try_into().unwrap();
            let port = get_u16(buf)?;
            Ok((ip, port).into())
        }
        AddrType::Domain => {
            let len = get_u8(buf)? as usize;
            let host = String::from_utf8_lossy(get_bytes(buf, len)?).to_string();
            let port = get_u16(buf)?;
            Ok(TargetAddress::DomainPort(host, port))
        }
    }
}

/// SOCKS4/4a request: `VN CD DSTPORT DSTIP USERID NUL [DOMAIN NUL]`.
///
/// A DNS-name destination is written in the 4a form: DSTIP becomes the
/// marker `0.0.0.1` and the name follows the user-id terminator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Socks4Request {
    pub cmd: Command,
    pub dst: TargetAddress,
    pub user_id: String,
}

impl Message for Socks4Request {
    fn encode(&self) -> Result<Vec<u8>> {
        let mut b = Vec::with_capacity(16);
        b.put_u8(SOCKS4_VERSION);
        b.put_u8(self.cmd.as_u8());
        put_port(&mut b, self.dst.port())?;
        let domain = match &self.dst {
            TargetAddress::SocketAddr(a) => match a.ip() {
                IpAddr::V4(v4) => {
                    b.put_slice(&v4.octets());
                    None
                }
                IpAddr::V6(_) => return Err(Error::BadHost(self.dst.to_string())),
            },
            TargetAddress::DomainPort(host, _) => {
                if let Ok(v4) = host.parse::<Ipv4Addr>() {
                    b.put_slice(&v4.octets());
                    None
                } else {
                    if host.len() > 255 {
                        return Err(Error::FqdnTooLong);
                    }
                    b.put_slice(&[0, 0, 0, 1]);
                    Some(host)
                }
            }
        };
        b.put_slice(self.user_id.as_bytes());
        b.put_u8(0);
        if let Some(domain) = domain {
            b.put_slice(domain.as_bytes());
            b.put_u8(0);
        }
        Ok(b)
    }

    fn decode(buf: &[u8]) -> Result<Self> {
        let mut buf = buf;
        let version = get_u8(&mut buf)?;
        if version != SOCKS4_VERSION {
            return Err(Error::BadVersion(version));
        }
        let cmd = Command::from_u8(get_u8(&mut buf)?);
        let port = get_u16(&mut buf)?;
        let ip: [u8; 4] = get_bytes(&mut buf, 4)?.try_into().unwrap();
        let user_id = get_cstr(&mut buf)?;
        let socks4a = ip[0] == 0 && ip[1] == 0 && ip[2] == 0 && ip[3] != 0;
        let dst = if socks4a {
            TargetAddress::DomainPort(get_cstr(&mut buf)?, port)
        } else {
            (Ipv4Addr::from(ip), port).into()
        };
        Ok(Self { cmd, dst, user_id })
    }
}

/// SOCKS4 reply: `0x00 CD DSTPORT DSTIP`, always the fixed 8-octet form on
/// encode (zero padded when the endpoint is unknown). Decoding accepts the
/// 2-octet short form some peers emit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Socks4Response {
    pub status: Socks4Status,
    pub dst: Option<TargetAddress>,
}

impl Message for Socks4Response {
    fn encode(&self) -> Result<Vec<u8>> {
        let mut b = Vec::with_capacity(8);
        b.put_u8(0);
        b.put_u8(self.status.as_u8());
        match &self.dst {
            None => b.put_slice(&[0u8; 6]),
            Some(dst) => {
                put_port(&mut b, dst.port())?;
                let ip = ipv4_of(dst).ok_or_else(|| Error::BadHost(dst.to_string()))?;
                b.put_slice(&ip.octets());
            }
        }
        Ok(b)
    }

    fn decode(buf: &[u8]) -> Result<Self> {
        let mut buf = buf;
        let _reserved = get_u8(&mut buf)?;
        let status = Socks4Status::from_u8(get_u8(&mut buf)?);
        if buf.is_empty() {
            return Ok(Self { status, dst: None });
        }
        let port = get_u16(&mut buf)?;
        let ip: [u8; 4] = get_bytes(&mut buf, 4)?.try_into().unwrap();
        let dst = if port == 0 && ip == [0, 0, 0, 0] {
            None
        } else {
            Some((Ipv4Addr::from(ip), port).into())
        };
        Ok(Self { status, dst })
    }
}

/// SOCKS5 greeting: `VER NMETHODS METHODS...`, client order preserved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodSelectRequest {
    pub methods: Vec<AuthMethod>,
}

impl Message for MethodSelectRequest {
    fn encode(&self) -> Result<Vec<u8>> {
        if self.methods.is_empty() {
            return Err(Error::NoAuthMethods);
        }
        if self.methods.len() > 255 {
            return Err(Error::TooManyMethods);
        }
        let mut b = Vec::with_capacity(2 + self.methods.len());
        b.put_u8(SOCKS5_VERSION);
        b.put_u8(self.methods.len() as u8);
        for m in &self.methods {
            b.put_u8(m.as_u8());
        }
        Ok(b)
    }

    fn decode(buf: &[u8]) -> Result<Self> {
        let mut buf = buf;
        let version = get_u8(&mut buf)?;
        if version != SOCKS5_VERSION {
            return Err(Error::BadVersion(version));
        }
        let n = get_u8(&mut buf)? as usize;
        let methods = get_bytes(&mut buf, n)?
            .iter()
            .map(|&b| AuthMethod::from_u8(b))
            .collect();
        Ok(Self { methods })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodSelectResponse {
    pub method: AuthMethod,
}

impl Message for MethodSelectResponse {
    fn encode(&self) -> Result<Vec<u8>> {
        Ok(vec![SOCKS5_VERSION, self.method.as_u8()])
    }

    fn decode(buf: &[u8]) -> Result<Self> {
        let mut buf = buf;
        let version = get_u8(&mut buf)?;
        if version != SOCKS5_VERSION {
            return Err(Error::BadVersion(version));
        }
        let method = AuthMethod::from_u8(get_u8(&mut buf)?);
        Ok(Self { method })
    }
}

/// RFC 1929 username/password sub-negotiation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserPassRequest {
    pub username: String,
    pub password: String,
}

impl Message for UserPassRequest {
    fn encode(&self) -> Result<Vec<u8>> {
        for field in [&self.username, &self.password] {
            if field.is_empty() || field.len() > 255 {
                return Err(Error::BadCredential);
            }
        }
        let mut b = Vec::with_capacity(3 + self.username.len() + self.password.len());
        b.put_u8(USERPASS_AUTH_VERSION);
        b.put_u8(self.username.len() as u8);
        b.put_slice(self.username.as_bytes());
        b.put_u8(self.password.len() as u8);
        b.put_slice(self.password.as_bytes());
        Ok(b)
    }

    fn decode(buf: &[u8]) -> Result<Self> {
        let mut buf = buf;
        let version = get_u8(&mut buf)?;
        if version != USERPASS_AUTH_VERSION {
            return Err(Error::BadVersion(version));
        }
        let ulen = get_u8(&mut buf)? as usize;
        let username = String::from_utf8_lossy(get_bytes(&mut buf, ulen)?).to_string();
        let plen = get_u8(&mut buf)? as usize;
        let password = String::from_utf8_lossy(get_bytes(&mut buf, plen)?).to_string();
        Ok(Self { username, password })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserPassResponse {
    pub status: AuthStatus,
}

impl Message for UserPassResponse {
    fn encode(&self) -> Result<Vec<u8>> {
        Ok(vec![USERPASS_AUTH_VERSION, self.status.as_u8()])
    }

    fn decode(buf: &[u8]) -> Result<Self> {
        let mut buf = buf;
        let version = get_u8(&mut buf)?;
        if version != USERPASS_AUTH_VERSION {
            return Err(Error::BadVersion(version));
        }
        let status = AuthStatus::from_u8(get_u8(&mut buf)?);
        Ok(Self { status })
    }
}

/// SOCKS5 request: `VER CMD RSV ATYP DST.ADDR DST.PORT`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Socks5Request {
    pub cmd: Command,
    pub dst: TargetAddress,
}

impl Message for Socks5Request {
    fn encode(&self) -> Result<Vec<u8>> {
        let mut b = Vec::with_capacity(22);
        b.put_u8(SOCKS5_VERSION);
        b.put_u8(self.cmd.as_u8());
        b.put_u8(0);
        put_addr(&mut b, &self.dst)?;
        Ok(b)
    }

    fn decode(buf: &[u8]) -> Result<Self> {
        let mut buf = buf;
        let version = get_u8(&mut buf)?;
        if version != SOCKS5_VERSION {
            return Err(Error::BadVersion(version));
        }
        let cmd = Command::from_u8(get_u8(&mut buf)?);
        let _reserved = get_u8(&mut buf)?;
        let dst = get_addr(&mut buf)?;
        Ok(Self { cmd, dst })
    }
}

/// SOCKS5 reply: `VER REP RSV [ATYP BND.ADDR BND.PORT]`. A reply without a
/// meaningful endpoint is the 3-octet prefix alone; decoding accepts both
/// forms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Socks5Response {
    pub status: Socks5Status,
    pub bnd: Option<TargetAddress>,
}

impl Message for Socks5Response {
    fn encode(&self) -> Result<Vec<u8>> {
        let mut b = Vec::with_capacity(22);
        b.put_u8(SOCKS5_VERSION);
        b.put_u8(self.status.as_u8());
        b.put_u8(0);
        if let Some(bnd) = &self.bnd {
            put_addr(&mut b, bnd)?;
        }
        Ok(b)
    }

    fn decode(buf: &[u8]) -> Result<Self> {
        let mut buf = buf;
        let version = get_u8(&mut buf)?;
        if version != SOCKS5_VERSION {
            return Err(Error::BadVersion(version));
        }
        let status = Socks5Status::from_u8(get_u8(&mut buf)?);
        if buf.is_empty() {
            return Ok(Self { status, bnd: None });
        }
        let _reserved = get_u8(&mut buf)?;
        if buf.is_empty() {
            return Ok(Self { status, bnd: None });
        }
        let bnd = Some(get_addr(&mut buf)?);
        Ok(Self { status, bnd })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip<M: Message + PartialEq + std::fmt::Debug>(msg: M) -> Vec<u8> {
        let b = msg.encode().unwrap();
        assert_eq!(M::decode(&b).unwrap(), msg);
        b
    }

    #[test]
    fn socks4_request_v4() {
        let b = roundtrip(Socks4Request {
            cmd: Command::Connect,
            dst: "127.0.0.1:8080".parse().unwrap(),
            user_id: String::new(),
        });
        assert_eq!(b, [4, 1, 0x1f, 0x90, 127, 0, 0, 1, 0]);
    }

    #[test]
    fn socks4_request_with_user_id() {
        let b = roundtrip(Socks4Request {
            cmd: Command::Connect,
            dst: "127.0.0.1:8080".parse().unwrap(),
            user_id: "xyz".into(),
        });
        assert_eq!(b, [4, 1, 0x1f, 0x90, 127, 0, 0, 1, b'x', b'y', b'z', 0]);
    }

    #[test]
    fn socks4a_request_fqdn() {
        let b = roundtrip(Socks4Request {
            cmd: Command::Connect,
            dst: "localhost:8080".parse().unwrap(),
            user_id: String::new(),
        });
        // 4a form: marker address 0.0.0.1, domain after the user-id NUL
        assert_eq!(&b[4..8], &[0, 0, 0, 1]);
        assert_eq!(&b[9..], b"localhost\0");
    }

    #[test]
    fn socks4a_request_with_user_id() {
        let b = roundtrip(Socks4Request {
            cmd: Command::Connect,
            dst: "localhost:8080".parse().unwrap(),
            user_id: "xyz".into(),
        });
        assert_eq!(
            b,
            [
                4, 1, 0x1f, 0x90, 0, 0, 0, 1, b'x', b'y', b'z', 0, b'l', b'o', b'c', b'a', b'l',
                b'h', b'o', b's', b't', 0,
            ]
        );
    }

    #[test]
    fn socks4_request_rejects_ipv6() {
        let req = Socks4Request {
            cmd: Command::Connect,
            dst: "[::1]:8080".parse().unwrap(),
            user_id: String::new(),
        };
        assert!(matches!(req.encode(), Err(Error::BadHost(_))));
    }

    #[test]
    fn socks4_response_empty_endpoint() {
        let b = roundtrip(Socks4Response {
            status: Socks4Status::Granted,
            dst: None,
        });
        assert_eq!(b, [0, 0x5a, 0, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn socks4_response_short_form_accepted() {
        let resp = Socks4Response::decode(&[0, 0x5b]).unwrap();
        assert_eq!(resp.status, Socks4Status::Rejected);
        assert_eq!(resp.dst, None);
    }

    #[test]
    fn socks4_response_with_endpoint() {
        let b = roundtrip(Socks4Response {
            status: Socks4Status::Granted,
            dst: Some("127.0.0.1:5566".parse().unwrap()),
        });
        assert_eq!(b, [0, 0x5a, 0x15, 0xbe, 127, 0, 0, 1]);
    }

    #[test]
    fn method_select_request() {
        let b = roundtrip(MethodSelectRequest {
            methods: vec![AuthMethod::None],
        });
        assert_eq!(b, [5, 1, 0]);

        let b = roundtrip(MethodSelectRequest {
            methods: vec![AuthMethod::None, AuthMethod::UserPass],
        });
        assert_eq!(b, [5, 2, 0, 2]);
    }

    #[test]
    fn method_select_request_needs_methods() {
        let req = MethodSelectRequest { methods: vec![] };
        assert!(matches!(req.encode(), Err(Error::NoAuthMethods)));
    }

    #[test]
    fn method_select_response() {
        let b = roundtrip(MethodSelectResponse {
            method: AuthMethod::NoAcceptable,
        });
        assert_eq!(b, [5, 0xff]);
    }

    #[test]
    fn userpass_request() {
        let b = roundtrip(UserPassRequest {
            username: "User".into(),
            password: "Pass".into(),
        });
        assert_eq!(
            b,
            [1, 4, b'U', b's', b'e', b'r', 4, b'P', b'a', b's', b's']
        );
    }

    #[test]
    fn userpass_request_rejects_oversize() {
        let req = UserPassRequest {
            username: "u".repeat(256),
            password: "p".into(),
        };
        assert!(matches!(req.encode(), Err(Error::BadCredential)));
    }

    #[test]
    fn userpass_response() {
        let b = roundtrip(UserPassResponse {
            status: AuthStatus::Success,
        });
        assert_eq!(b, [1, 0]);
        // any nonzero status is failure
        let resp = UserPassResponse::decode(&[1, 42]).unwrap();
        assert_eq!(resp.status, AuthStatus::Failure);
    }

    #[test]
    fn socks5_request_addr_types() {
        let b = roundtrip(Socks5Request {
            cmd: Command::Connect,
            dst: "127.0.0.1:8080".parse().unwrap(),
        });
        assert_eq!(b, [5, 1, 0, 1, 127, 0, 0, 1, 0x1f, 0x90]);
        assert_eq!(b.len(), 6 + 4);

        let b = roundtrip(Socks5Request {
            cmd: Command::Connect,
            dst: "[::1]:8080".parse().unwrap(),
        });
        assert_eq!(b[3], 4);
        assert_eq!(b.len(), 6 + 16);

        let b = roundtrip(Socks5Request {
            cmd: Command::Connect,
            dst: "localhost:8080".parse().unwrap(),
        });
        assert_eq!(&b[..5], &[5, 1, 0, 3, 9]);
        assert_eq!(b.len(), 6 + 1 + "localhost".len());
    }

    #[test]
    fn socks5_request_rejects_long_fqdn() {
        let req = Socks5Request {
            cmd: Command::Connect,
            dst: TargetAddress::DomainPort("x".repeat(256), 80),
        };
        assert!(matches!(req.encode(), Err(Error::FqdnTooLong)));
    }

    #[test]
    fn socks5_request_rejects_port_zero() {
        let req = Socks5Request {
            cmd: Command::Connect,
            dst: TargetAddress::DomainPort("localhost".into(), 0),
        };
        assert!(matches!(req.encode(), Err(Error::BadPortRange)));
    }

    #[test]
    fn socks5_response_short_form() {
        let b = roundtrip(Socks5Response {
            status: Socks5Status::Failure,
            bnd: None,
        });
        assert_eq!(b, [5, 1, 0]);
    }

    #[test]
    fn socks5_response_with_endpoint() {
        let b = roundtrip(Socks5Response {
            status: Socks5Status::Granted,
            bnd: Some("127.0.0.1:5544".parse().unwrap()),
        });
        assert_eq!(b, [5, 0, 0, 1, 127, 0, 0, 1, 0x15, 0xa8]);
    }

    #[test]
    fn socks5_response_ipv6_endpoint() {
        let b = roundtrip(Socks5Response {
            status: Socks5Status::Granted,
            bnd: Some("[::1]:5".parse().unwrap()),
        });
        assert_eq!(
            b,
            [5, 0, 0, 4, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1, 0, 5]
        );
    }

    #[test]
    fn rejects_wrong_version() {
        assert!(matches!(
            Socks4Request::decode(&[5, 1, 0, 80, 1, 2, 3, 4, 0]),
            Err(Error::BadVersion(5))
        ));
        assert!(matches!(
            Socks5Request::decode(&[4, 1, 0, 1, 1, 2, 3, 4, 0, 80]),
            Err(Error::BadVersion(4))
        ));
    }

    #[test]
    fn rejects_truncated_input() {
        assert!(matches!(
            Socks4Request::decode(&[4, 1, 0]),
            Err(Error::ShortBuffer)
        ));
        // user-id without its NUL terminator
        assert!(matches!(
            Socks4Request::decode(&[4, 1, 0, 80, 1, 2, 3, 4, b'a']),
            Err(Error::ShortBuffer)
        ));
        assert!(matches!(
            Socks5Request::decode(&[5, 1, 0, 1, 127, 0]),
            Err(Error::ShortBuffer)
        ));
    }

    #[test]
    fn rejects_bad_addr_type() {
        assert!(matches!(
            Socks5Request::decode(&[5, 1, 0, 2, 0, 0]),
            Err(Error::BadAddrType(2))
        ));
    }

    #[test]
    fn status_strings() {
        assert_eq!(Socks4Status::Granted.to_string(), "request granted");
        assert_eq!(Socks5Status::ConnRefused.to_string(), "connection refused");
        assert_eq!(Socks5Status::Other(0x40).to_string(), "unknown code: 64");
        assert_eq!(Command::Other(9).to_string(), "socks 9");
    }
}
