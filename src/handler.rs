//! Per-connection handshake state machines for the server side.
//!
//! Every error bubbles up after a best-effort protocol reply; a failed
//! reply write supersedes the original error in the return value. Streams
//! and listeners are owned by the handler and released on every exit path.

use std::io;
use std::net::{Ipv4Addr, SocketAddr};

use log::{debug, error, warn};

use crate::auth;
use crate::conn::Channel;
use crate::copy::tunnel;
use crate::error::{Error, Result};
use crate::msgs::{
    AuthMethod, Command, MethodSelectRequest, MethodSelectResponse, Socks4Request, Socks4Response,
    Socks4Status, Socks5Request, Socks5Response, Socks5Status,
};
use crate::server::Server;

pub(crate) async fn socks4(srv: &Server, mut conn: Channel) -> Result<()> {
    let req: Socks4Request = conn.read_msg().await?;
    debug!("{} to {} (user-id {:?})", req.cmd, req.dst, req.user_id);

    if let Some(ident) = srv.ident() {
        if let Err(e) = ident.ident(&mut conn, &req).await {
            let status = match &e {
                Error::Socks4Reply(status) => *status,
                _ => Socks4Status::Rejected,
            };
            conn.write_msg(&Socks4Response { status, dst: None }).await?;
            return Err(e);
        }
    }

    match req.cmd {
        Command::Connect => socks4_connect(srv, conn, &req).await,
        Command::Bind => socks4_bind(srv, conn, &req).await,
        _ => {
            debug!("rejecting {}", req.cmd);
            conn.write_msg(&Socks4Response {
                status: Socks4Status::Rejected,
                dst: None,
            })
            .await?;
            Ok(())
        }
    }
}

async fn socks4_connect(srv: &Server, mut conn: Channel, req: &Socks4Request) -> Result<()> {
    let target = match srv.dialer().dial(&req.dst).await {
        Ok(target) => target,
        Err(e) => {
            error!("connect to {} failed: {}", req.dst, e);
            conn.write_msg(&Socks4Response {
                status: Socks4Status::Rejected,
                dst: None,
            })
            .await?;
            return Err(e);
        }
    };
    conn.write_msg(&Socks4Response {
        status: Socks4Status::Granted,
        dst: None,
    })
    .await?;

    let (sent, received) = tunnel(conn, target.stream, srv.cancel_token()).await?;
    debug!("{} closed: {} bytes sent, {} received", req.dst, sent, received);
    Ok(())
}

async fn socks4_bind(srv: &Server, mut conn: Channel, req: &Socks4Request) -> Result<()> {
    let listener = match srv.binder().bind(unspecified()).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("bind for {} failed: {}", req.dst, e);
            conn.write_msg(&Socks4Response {
                status: Socks4Status::Rejected,
                dst: None,
            })
            .await?;
            return Err(e);
        }
    };
    let bnd = listener.local_addr()?;
    conn.write_msg(&Socks4Response {
        status: Socks4Status::Granted,
        dst: Some(bnd.into()),
    })
    .await?;

    let peer = match listener.accept().await {
        Ok(peer) => peer,
        Err(e) => {
            error!("bind accept failed: {}", e);
            conn.write_msg(&Socks4Response {
                status: Socks4Status::Rejected,
                dst: None,
            })
            .await?;
            return Err(e);
        }
    };
    if !peer_ip_matches(&req.dst, &peer.peer_addr).await {
        warn!("bind peer {} does not match {}", peer.peer_addr, req.dst);
        conn.write_msg(&Socks4Response {
            status: Socks4Status::Rejected,
            dst: None,
        })
        .await?;
        return Ok(());
    }
    drop(listener);
    conn.write_msg(&Socks4Response {
        status: Socks4Status::Granted,
        dst: None,
    })
    .await?;

    tunnel(conn, peer.stream, srv.cancel_token()).await?;
    Ok(())
}

pub(crate) async fn socks5(srv: &Server, mut conn: Channel) -> Result<()> {
    let greeting: MethodSelectRequest = conn.read_msg().await?;
    let method = auth::select_method(&greeting.methods, srv.auth_methods());
    conn.write_msg(&MethodSelectResponse { method }).await?;
    if method == AuthMethod::NoAcceptable {
        debug!("no acceptable method, client offered {:?}", greeting.methods);
        return Err(Error::NoAcceptableMethod);
    }

    if let Some(authenticator) = srv.authenticator() {
        authenticator.authenticate(&mut conn, method).await?;
    }

    let req: Socks5Request = conn.read_msg().await?;
    debug!("{} to {}", req.cmd, req.dst);

    match req.cmd {
        Command::Connect => socks5_connect(srv, conn, &req).await,
        Command::Bind => socks5_bind(srv, conn, &req).await,
        _ => {
            debug!("rejecting {}", req.cmd);
            conn.write_msg(&Socks5Response {
                status: Socks5Status::CmdNotSupported,
                bnd: None,
            })
            .await?;
            Ok(())
        }
    }
}

async fn socks5_connect(srv: &Server, mut conn: Channel, req: &Socks5Request) -> Result<()> {
    let target = match srv.dialer().dial(&req.dst).await {
        Ok(target) => target,
        Err(e) => {
            error!("connect to {} failed: {}", req.dst, e);
            conn.write_msg(&Socks5Response {
                status: dial_error_status(&e),
                bnd: None,
            })
            .await?;
            return Err(e);
        }
    };
    conn.write_msg(&Socks5Response {
        status: Socks5Status::Granted,
        bnd: Some(target.local_addr.into()),
    })
    .await?;

    let (sent, received) = tunnel(conn, target.stream, srv.cancel_token()).await?;
    debug!("{} closed: {} bytes sent, {} received", req.dst, sent, received);
    Ok(())
}

async fn socks5_bind(srv: &Server, mut conn: Channel, req: &Socks5Request) -> Result<()> {
    let listener = match srv.binder().bind(unspecified()).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("bind for {} failed: {}", req.dst, e);
            conn.write_msg(&Socks5Response {
                status: Socks5Status::Failure,
                bnd: None,
            })
            .await?;
            return Err(e);
        }
    };
    let bnd = listener.local_addr()?;
    conn.write_msg(&Socks5Response {
        status: Socks5Status::Granted,
        bnd: Some(bnd.into()),
    })
    .await?;

    let peer = match listener.accept().await {
        Ok(peer) => peer,
        Err(e) => {
            error!("bind accept failed: {}", e);
            conn.write_msg(&Socks5Response {
                status: Socks5Status::Failure,
                bnd: None,
            })
            .await?;
            return Err(e);
        }
    };
    if !peer_ip_matches(&req.dst, &peer.peer_addr).await {
        warn!("bind peer {} does not match {}", peer.peer_addr, req.dst);
        conn.write_msg(&Socks5Response {
            status: Socks5Status::Failure,
            bnd: None,
        })
        .await?;
        return Ok(());
    }
    drop(listener);
    conn.write_msg(&Socks5Response {
        status: Socks5Status::Granted,
        bnd: Some(peer.peer_addr.into()),
    })
    .await?;

    tunnel(conn, peer.stream, srv.cancel_token()).await?;
    Ok(())
}

fn unspecified() -> SocketAddr {
    SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0))
}

/// Only the IP is compared, never the port: classic SOCKS language speaks
/// of "the IP address of the originating host".
async fn peer_ip_matches(dst: &crate::addr::TargetAddress, peer: &SocketAddr) -> bool {
    match dst.resolve_ip().await {
        Ok(ips) => ips.contains(&peer.ip()),
        Err(_) => false,
    }
}

/// Maps a dial failure onto the closest SOCKS5 status. `ErrorKind` carries
/// refusals portably; "network is unreachable" still needs a message probe.
/// Everything else degrades to host-unreachable.
fn dial_error_status(err: &Error) -> Socks5Status {
    if let Error::Io(e) = err {
        if e.kind() == io::ErrorKind::ConnectionRefused {
            return Socks5Status::ConnRefused;
        }
        if e.to_string().contains("network is unreachable") {
            return Socks5Status::NetUnreachable;
        }
    }
    Socks5Status::HostUnreachable
}
