//! Injected network capabilities: the engine never opens sockets directly.
//!
//! `TcpDialer` reaches the upstream target (server side) or the proxy
//! itself (dialer side); `TcpBinder` creates the one-shot listener used by
//! BIND. The tokio-backed defaults are what production uses; tests swap in
//! their own.

use std::net::SocketAddr;

use async_trait::async_trait;
use tokio::net::TcpListener;

use crate::addr::TargetAddress;
use crate::conn::IoStream;
use crate::error::Result;

/// An established connection plus the addresses the reply paths need.
pub struct DialedConn {
    pub stream: Box<dyn IoStream>,
    pub local_addr: SocketAddr,
    pub peer_addr: SocketAddr,
}

#[async_trait]
pub trait TcpDialer: Send + Sync {
    async fn dial(&self, target: &TargetAddress) -> Result<DialedConn>;
}

pub struct TokioTcpDialer;

#[async_trait]
impl TcpDialer for TokioTcpDialer {
    async fn dial(&self, target: &TargetAddress) -> Result<DialedConn> {
        let stream = target.connect_tcp().await?;
        let local_addr = stream.local_addr()?;
        let peer_addr = stream.peer_addr()?;
        Ok(DialedConn {
            stream: Box::new(stream),
            local_addr,
            peer_addr,
        })
    }
}

#[async_trait]
pub trait BoundListener: Send + Sync {
    async fn accept(&self) -> Result<DialedConn>;
    fn local_addr(&self) -> Result<SocketAddr>;
}

#[async_trait]
pub trait TcpBinder: Send + Sync {
    async fn bind(&self, addr: SocketAddr) -> Result<Box<dyn BoundListener>>;
}

pub struct TokioTcpBinder;

#[async_trait]
impl TcpBinder for TokioTcpBinder {
    async fn bind(&self, addr: SocketAddr) -> Result<Box<dyn BoundListener>> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Box::new(TokioBoundListener(listener)))
    }
}

struct TokioBoundListener(TcpListener);

#[async_trait]
impl BoundListener for TokioBoundListener {
    async fn accept(&self) -> Result<DialedConn> {
        let (stream, peer_addr) = self.0.accept().await?;
        let local_addr = stream.local_addr()?;
        Ok(DialedConn {
            stream: Box::new(stream),
            local_addr,
            peer_addr,
        })
    }

    fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.0.local_addr()?)
    }
}
