use std::{
    fmt::Display,
    net::{IpAddr, Ipv4Addr, SocketAddr, SocketAddrV4, SocketAddrV6},
    str::FromStr,
};

use tokio::net::{lookup_host, TcpStream};

use crate::error::{Error, Result};

/// A connection endpoint: either a raw socket address or a DNS name with a
/// port. The canonical textual form is `host:port`, with IPv6 literals
/// bracketed (`[::1]:1080`).
#[derive(Debug, Hash, Clone, Eq, PartialEq)]
pub enum TargetAddress {
    DomainPort(String, u16),
    SocketAddr(SocketAddr),
}

impl TargetAddress {
    pub fn port(&self) -> u16 {
        match self {
            Self::DomainPort(_, port) => *port,
            Self::SocketAddr(addr) => addr.port(),
        }
    }

    pub async fn connect_tcp(&self) -> std::io::Result<TcpStream> {
        match self {
            Self::DomainPort(host, port) => TcpStream::connect((host.as_str(), *port)).await,
            Self::SocketAddr(addr) => TcpStream::connect(addr).await,
        }
    }

    /// Resolves to the set of candidate IPs. Socket addresses resolve to
    /// themselves; domain names go through the system resolver.
    pub async fn resolve_ip(&self) -> Result<Vec<IpAddr>> {
        match self {
            Self::SocketAddr(addr) => Ok(vec![addr.ip()]),
            Self::DomainPort(host, port) => {
                let addrs = lookup_host((host.as_str(), *port)).await?;
                Ok(addrs.map(|a| a.ip()).collect())
            }
        }
    }
}

impl From<(Ipv4Addr, u16)> for TargetAddress {
    fn from((ip, port): (Ipv4Addr, u16)) -> Self {
        let a = SocketAddrV4::new(ip, port);
        Self::SocketAddr(SocketAddr::V4(a))
    }
}

impl From<(u32, u16)> for TargetAddress {
    fn from((ip, port): (u32, u16)) -> Self {
        let ip = ip.into();
        let a = SocketAddrV4::new(ip, port);
        Self::SocketAddr(SocketAddr::V4(a))
    }
}

impl From<([u8; 16], u16)> for TargetAddress {
    fn from((ip, port): ([u8; 16], u16)) -> Self {
        let ip = ip.into();
        let a = SocketAddrV6::new(ip, port, 0, 0);
        Self::SocketAddr(SocketAddr::V6(a))
    }
}

impl From<SocketAddr> for TargetAddress {
    fn from(addr: SocketAddr) -> Self {
        Self::SocketAddr(addr)
    }
}

impl FromStr for TargetAddress {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self> {
        if let Ok(a) = SocketAddr::from_str(s) {
            Ok(TargetAddress::SocketAddr(a))
        } else {
            let mut parts = s.rsplitn(2, ':');
            let port = parts.next().ok_or_else(|| Error::BadHost(s.to_owned()))?;
            let host = parts.next().ok_or_else(|| Error::BadHost(s.to_owned()))?;
            if host.is_empty() {
                return Err(Error::BadHost(s.to_owned()));
            }
            let port = port.parse().map_err(|_| Error::BadHost(s.to_owned()))?;
            Ok(TargetAddress::DomainPort(host.to_string(), port))
        }
    }
}

impl Display for TargetAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DomainPort(domain, port) => write!(f, "{}:{}", domain, port),
            Self::SocketAddr(addr) => write!(f, "{}", addr),
        }
    }
}
