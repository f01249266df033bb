//! Client-side dialers: initiate a SOCKS handshake through an external
//! proxy and hand back a transparent byte stream to the target.

use std::sync::Arc;

use log::{debug, trace};

use crate::addr::TargetAddress;
use crate::auth::Authenticator;
use crate::conn::{Channel, SocksConn};
use crate::dialers::{TcpDialer, TokioTcpDialer};
use crate::error::{Error, Result};
use crate::msgs::{
    AuthMethod, Command, MethodSelectRequest, MethodSelectResponse, Socks4Request, Socks4Response,
    Socks4Status, Socks5Request, Socks5Response, Socks5Status,
};

/// Dials CONNECT through a SOCKS4/4a proxy.
pub struct Socks4Dialer {
    proxy: TargetAddress,
    user_id: String,
    proxy_dialer: Arc<dyn TcpDialer>,
}

impl Socks4Dialer {
    pub fn new(proxy: TargetAddress) -> Self {
        Self {
            proxy,
            user_id: String::new(),
            proxy_dialer: Arc::new(TokioTcpDialer),
        }
    }

    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = user_id.into();
        self
    }

    pub fn with_proxy_dialer(mut self, dialer: Arc<dyn TcpDialer>) -> Self {
        self.proxy_dialer = dialer;
        self
    }

    /// Connects to the target through the proxy. On success the returned
    /// channel is a plain byte stream to the target.
    pub async fn dial(&self, target: &TargetAddress) -> Result<Channel> {
        let proxy = self.proxy_dialer.dial(&self.proxy).await?;
        trace!("socks4 proxy {} connected", self.proxy);
        let mut conn = SocksConn::new(proxy.stream);

        conn.write_msg(&Socks4Request {
            cmd: Command::Connect,
            dst: target.clone(),
            user_id: self.user_id.clone(),
        })
        .await?;
        let resp: Socks4Response = conn.read_msg().await?;
        if resp.status != Socks4Status::Granted {
            return Err(Error::Socks4Reply(resp.status));
        }
        debug!("socks4 connect to {} granted", target);
        Ok(conn)
    }
}

/// Dials CONNECT through a SOCKS5 proxy, with optional authentication.
pub struct Socks5Dialer {
    proxy: TargetAddress,
    auth_methods: Vec<AuthMethod>,
    authenticator: Option<Arc<dyn Authenticator>>,
    proxy_dialer: Arc<dyn TcpDialer>,
}

impl Socks5Dialer {
    pub fn new(proxy: TargetAddress) -> Self {
        Self {
            proxy,
            auth_methods: vec![AuthMethod::None],
            authenticator: None,
            proxy_dialer: Arc::new(TokioTcpDialer),
        }
    }

    /// Replaces the offered method list (default: `[None]`).
    pub fn with_auth_methods(mut self, methods: Vec<AuthMethod>) -> Self {
        self.auth_methods = methods;
        self
    }

    pub fn with_authenticator(mut self, authenticator: Arc<dyn Authenticator>) -> Self {
        self.authenticator = Some(authenticator);
        self
    }

    pub fn with_proxy_dialer(mut self, dialer: Arc<dyn TcpDialer>) -> Self {
        self.proxy_dialer = dialer;
        self
    }

    pub async fn dial(&self, target: &TargetAddress) -> Result<Channel> {
        let proxy = self.proxy_dialer.dial(&self.proxy).await?;
        trace!("socks5 proxy {} connected", self.proxy);
        let mut conn = SocksConn::new(proxy.stream);

        conn.write_msg(&MethodSelectRequest {
            methods: self.auth_methods.clone(),
        })
        .await?;
        let selected: MethodSelectResponse = conn.read_msg().await?;
        if selected.method == AuthMethod::NoAcceptable
            || !self.auth_methods.contains(&selected.method)
        {
            return Err(Error::NoAcceptableMethod);
        }

        if let Some(authenticator) = &self.authenticator {
            authenticator.authenticate(&mut conn, selected.method).await?;
        }

        conn.write_msg(&Socks5Request {
            cmd: Command::Connect,
            dst: target.clone(),
        })
        .await?;
        let resp: Socks5Response = conn.read_msg().await?;
        if resp.status != Socks5Status::Granted {
            return Err(Error::Socks5Reply(resp.status));
        }
        debug!("socks5 connect to {} granted, bound {:?}", target, resp.bnd);
        Ok(conn)
    }
}
