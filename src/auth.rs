//! Authentication seams for the SOCKS5 handshake and the SOCKS4 user-id.
//!
//! An [`Authenticator`] runs the method-specific sub-protocol on the framed
//! channel after method selection; the engine stays method-agnostic. The
//! same trait serves the server (verify) and the dialer (prove) sides.

use async_trait::async_trait;
use log::debug;

use crate::conn::Channel;
use crate::error::{Error, Result};
use crate::msgs::{AuthMethod, AuthStatus, Socks4Request, UserPassRequest, UserPassResponse};

#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn authenticate(&self, conn: &mut Channel, method: AuthMethod) -> Result<()>;
}

/// SOCKS4 user-id verification callback. Returning
/// `Error::Socks4Reply(status)` selects the reject status sent to the
/// client; any other error maps to `Rejected`.
#[async_trait]
pub trait Ident: Send + Sync {
    async fn ident(&self, conn: &mut Channel, req: &Socks4Request) -> Result<()>;
}

/// Picks the first client-offered method that the server supports.
pub fn select_method(offered: &[AuthMethod], supported: &[AuthMethod]) -> AuthMethod {
    offered
        .iter()
        .find(|m| supported.contains(m))
        .copied()
        .unwrap_or(AuthMethod::NoAcceptable)
}

/// The `None` method: nothing on the wire.
pub struct NoAuth;

#[async_trait]
impl Authenticator for NoAuth {
    async fn authenticate(&self, _conn: &mut Channel, _method: AuthMethod) -> Result<()> {
        Ok(())
    }
}

/// Server-side RFC 1929 username/password verification against a fixed
/// credential list.
#[derive(Default)]
pub struct PasswordAuth {
    users: Vec<(String, String)>,
}

impl PasswordAuth {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.users.push((username.into(), password.into()));
        self
    }

    fn check(&self, username: &str, password: &str) -> bool {
        self.users
            .iter()
            .any(|(u, p)| u == username && p == password)
    }
}

#[async_trait]
impl Authenticator for PasswordAuth {
    async fn authenticate(&self, conn: &mut Channel, method: AuthMethod) -> Result<()> {
        match method {
            AuthMethod::None => Ok(()),
            AuthMethod::UserPass => {
                let req: UserPassRequest = conn.read_msg().await?;
                let ok = self.check(&req.username, &req.password);
                let status = if ok {
                    AuthStatus::Success
                } else {
                    AuthStatus::Failure
                };
                conn.write_msg(&UserPassResponse { status }).await?;
                if ok {
                    Ok(())
                } else {
                    debug!("password auth failed for user {:?}", req.username);
                    Err(Error::AuthFailed)
                }
            }
            _ => Err(Error::NoAcceptableMethod),
        }
    }
}

/// Dialer-side RFC 1929 username/password: sends the credentials and checks
/// the status.
pub struct PasswordClientAuth {
    username: String,
    password: String,
}

impl PasswordClientAuth {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

#[async_trait]
impl Authenticator for PasswordClientAuth {
    async fn authenticate(&self, conn: &mut Channel, method: AuthMethod) -> Result<()> {
        match method {
            AuthMethod::None => Ok(()),
            AuthMethod::UserPass => {
                conn.write_msg(&UserPassRequest {
                    username: self.username.clone(),
                    password: self.password.clone(),
                })
                .await?;
                let resp: UserPassResponse = conn.read_msg().await?;
                if resp.status == AuthStatus::Success {
                    Ok(())
                } else {
                    Err(Error::AuthFailed)
                }
            }
            _ => Err(Error::NoAcceptableMethod),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conn::{IoStream, SocksConn};
    use test_log::test;
    use tokio::io::duplex;

    fn channel_pair() -> (Channel, Channel) {
        let (a, b) = duplex(256);
        (
            SocksConn::new(Box::new(a) as Box<dyn IoStream>),
            SocksConn::new(Box::new(b) as Box<dyn IoStream>),
        )
    }

    #[test]
    fn first_offered_supported_method_wins() {
        let offered = [AuthMethod::Gssapi, AuthMethod::UserPass, AuthMethod::None];
        assert_eq!(
            select_method(&offered, &[AuthMethod::None, AuthMethod::UserPass]),
            AuthMethod::UserPass
        );
        assert_eq!(
            select_method(&offered, &[AuthMethod::None]),
            AuthMethod::None
        );
        assert_eq!(
            select_method(&[AuthMethod::Gssapi], &[AuthMethod::None]),
            AuthMethod::NoAcceptable
        );
    }

    #[test(tokio::test)]
    async fn userpass_exchange_succeeds() {
        let (mut client, mut server) = channel_pair();
        let server_side = tokio::spawn(async move {
            PasswordAuth::new()
                .with_user("user", "pass")
                .authenticate(&mut server, AuthMethod::UserPass)
                .await
        });

        PasswordClientAuth::new("user", "pass")
            .authenticate(&mut client, AuthMethod::UserPass)
            .await
            .unwrap();
        server_side.await.unwrap().unwrap();
    }

    #[test(tokio::test)]
    async fn userpass_exchange_rejects_wrong_password() {
        let (mut client, mut server) = channel_pair();
        let server_side = tokio::spawn(async move {
            PasswordAuth::new()
                .with_user("user", "pass")
                .authenticate(&mut server, AuthMethod::UserPass)
                .await
        });

        let client_result = PasswordClientAuth::new("user", "wrong")
            .authenticate(&mut client, AuthMethod::UserPass)
            .await;
        assert!(matches!(client_result, Err(Error::AuthFailed)));
        assert!(matches!(
            server_side.await.unwrap(),
            Err(Error::AuthFailed)
        ));
    }

    #[test(tokio::test)]
    async fn none_method_is_a_no_op() {
        let (mut client, _server) = channel_pair();
        PasswordClientAuth::new("user", "pass")
            .authenticate(&mut client, AuthMethod::None)
            .await
            .unwrap();
    }
}
