//! The listening proxy: accepts connections, sniffs the SOCKS version and
//! runs the per-connection handshake.

use std::sync::Arc;

use log::{debug, error, info};
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;

use crate::auth::{Authenticator, Ident};
use crate::conn::{IoStream, SocksConn};
use crate::dialers::{TcpBinder, TcpDialer, TokioTcpBinder, TokioTcpDialer};
use crate::error::Result;
use crate::handler;
use crate::msgs::{AuthMethod, Version};

/// The proxy server. Configuration is immutable once built; every accepted
/// connection runs in its own task and owns its channel, dialed target and
/// tunnel exclusively.
pub struct Server {
    dialer: Arc<dyn TcpDialer>,
    binder: Arc<dyn TcpBinder>,
    auth_methods: Vec<AuthMethod>,
    authenticator: Option<Arc<dyn Authenticator>>,
    ident: Option<Arc<dyn Ident>>,
    shutdown: CancellationToken,
}

impl Default for Server {
    fn default() -> Self {
        Self::new()
    }
}

impl Server {
    pub fn new() -> Self {
        Self {
            dialer: Arc::new(TokioTcpDialer),
            binder: Arc::new(TokioTcpBinder),
            auth_methods: vec![AuthMethod::None],
            authenticator: None,
            ident: None,
            shutdown: CancellationToken::new(),
        }
    }

    pub fn with_dialer(mut self, dialer: Arc<dyn TcpDialer>) -> Self {
        self.dialer = dialer;
        self
    }

    pub fn with_binder(mut self, binder: Arc<dyn TcpBinder>) -> Self {
        self.binder = binder;
        self
    }

    /// Replaces the supported SOCKS5 method set (default: `[None]`).
    pub fn with_auth_methods(mut self, methods: Vec<AuthMethod>) -> Self {
        self.auth_methods = methods;
        self
    }

    pub fn with_authenticator(mut self, authenticator: Arc<dyn Authenticator>) -> Self {
        self.authenticator = Some(authenticator);
        self
    }

    pub fn with_ident(mut self, ident: Arc<dyn Ident>) -> Self {
        self.ident = Some(ident);
        self
    }

    /// Stops the accept loop and cancels every in-flight tunnel.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    pub async fn listen_and_serve(self: Arc<Self>, addr: &str) -> Result<()> {
        let listener = TcpListener::bind(addr).await?;
        self.serve(listener).await
    }

    /// Serves connections from an already-bound listener until shutdown or
    /// an accept error.
    pub async fn serve(self: Arc<Self>, listener: TcpListener) -> Result<()> {
        info!("listening on {}", listener.local_addr()?);
        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => return Ok(()),
                accepted = listener.accept() => {
                    let (socket, source) = accepted?;
                    debug!("connected from {}", source);
                    let this = self.clone();
                    tokio::spawn(async move {
                        if let Err(e) = this.handle_conn(socket).await {
                            error!("connection from {}: {}", source, e);
                        }
                    });
                }
            }
        }
    }

    /// Runs one handshake on an already-accepted connection.
    pub async fn handle_conn(&self, socket: TcpStream) -> Result<()> {
        self.handle_stream(Box::new(socket)).await
    }

    /// Same as [`handle_conn`](Self::handle_conn) for any duplex stream.
    pub async fn handle_stream(&self, stream: Box<dyn IoStream>) -> Result<()> {
        let mut conn = SocksConn::new(stream);
        match conn.peek_version().await? {
            Version::Socks4 => handler::socks4(self, conn).await,
            Version::Socks5 => handler::socks5(self, conn).await,
        }
    }

    pub(crate) fn dialer(&self) -> &Arc<dyn TcpDialer> {
        &self.dialer
    }

    pub(crate) fn binder(&self) -> &Arc<dyn TcpBinder> {
        &self.binder
    }

    pub(crate) fn auth_methods(&self) -> &[AuthMethod] {
        &self.auth_methods
    }

    pub(crate) fn authenticator(&self) -> Option<&Arc<dyn Authenticator>> {
        self.authenticator.as_ref()
    }

    pub(crate) fn ident(&self) -> Option<&Arc<dyn Ident>> {
        self.ident.as_ref()
    }

    pub(crate) fn cancel_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }
}
