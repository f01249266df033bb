//! The framed channel: a peekable, message-oriented wrapper over a byte
//! stream. SOCKS messages never exceed ~262 octets, so one buffered read
//! into a scratch buffer always holds a whole message in practice.

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::io::{
    AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader, ReadBuf,
};

use crate::error::{Error, Result};
use crate::msgs::{Message, Version};

pub trait IoStream: AsyncRead + AsyncWrite + Send + Sync + Unpin {}
impl<T> IoStream for T where T: AsyncRead + AsyncWrite + Send + Sync + Unpin {}

/// The channel type the server and dialers operate on.
pub type Channel = SocksConn<Box<dyn IoStream>>;

const SCRATCH_SIZE: usize = 1024;

/// A duplex stream with single-byte look-ahead and typed message exchange.
///
/// `SocksConn` itself implements [`AsyncRead`] and [`AsyncWrite`], so once
/// the handshake is done it doubles as the transparent byte stream that is
/// tunnelled or handed back to the caller. Bytes sitting in the read buffer
/// are not lost on that transition.
pub struct SocksConn<IO> {
    io: BufReader<IO>,
}

impl<IO> std::fmt::Debug for SocksConn<IO> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SocksConn").finish_non_exhaustive()
    }
}

impl<IO: AsyncRead + AsyncWrite + Unpin> SocksConn<IO> {
    pub fn new(io: IO) -> Self {
        Self {
            io: BufReader::new(io),
        }
    }

    /// Looks at the first byte without consuming it and maps it to a
    /// protocol version. Fails with `UnsupportedVersion` on anything else.
    pub async fn peek_version(&mut self) -> Result<Version> {
        let buf = self.io.fill_buf().await?;
        let first = *buf
            .first()
            .ok_or_else(|| Error::Io(io::ErrorKind::UnexpectedEof.into()))?;
        Version::from_u8(first).ok_or(Error::UnsupportedVersion(first))
    }

    /// Reads one message. A single buffered read fills the scratch buffer
    /// and the codec consumes it; messages are never interleaved.
    pub async fn read_msg<M: Message>(&mut self) -> Result<M> {
        let mut buf = [0u8; SCRATCH_SIZE];
        let n = self.io.read(&mut buf).await?;
        if n == 0 {
            return Err(Error::Io(io::ErrorKind::UnexpectedEof.into()));
        }
        M::decode(&buf[..n])
    }

    /// Encodes one message and writes it out whole.
    pub async fn write_msg<M: Message>(&mut self, msg: &M) -> Result<()> {
        let b = msg.encode()?;
        self.io.write_all(&b).await?;
        self.io.flush().await?;
        Ok(())
    }

    pub fn get_ref(&self) -> &IO {
        self.io.get_ref()
    }
}

impl<IO: AsyncRead + AsyncWrite + Unpin> AsyncRead for SocksConn<IO> {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.io).poll_read(cx, buf)
    }
}

impl<IO: AsyncRead + AsyncWrite + Unpin> AsyncWrite for SocksConn<IO> {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.io).poll_write(cx, buf)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.io).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.io).poll_shutdown(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::msgs::{Command, Socks4Request, Socks5Response, Socks5Status};
    use test_log::test;
    use tokio_test::io::Builder;

    #[test(tokio::test)]
    async fn peek_does_not_consume() {
        let input = [4u8, 1, 0x1f, 0x90, 127, 0, 0, 1, 0];
        let stream = Builder::new().read(&input).build();
        let mut conn = SocksConn::new(stream);

        assert_eq!(conn.peek_version().await.unwrap(), Version::Socks4);
        // the version byte is still there for the full request read
        let req: Socks4Request = conn.read_msg().await.unwrap();
        assert_eq!(req.cmd, Command::Connect);
        assert_eq!(req.dst, "127.0.0.1:8080".parse().unwrap());
    }

    #[test(tokio::test)]
    async fn peek_rejects_unknown_version() {
        let stream = Builder::new().read(&[0x47, 0x45, 0x54]).build();
        let mut conn = SocksConn::new(stream);
        assert!(matches!(
            conn.peek_version().await,
            Err(Error::UnsupportedVersion(0x47))
        ));
    }

    #[test(tokio::test)]
    async fn peek_at_eof() {
        let stream = Builder::new().build();
        let mut conn = SocksConn::new(stream);
        assert!(matches!(conn.peek_version().await, Err(Error::Io(_))));
    }

    #[test(tokio::test)]
    async fn write_then_read() {
        let resp = Socks5Response {
            status: Socks5Status::Granted,
            bnd: Some("127.0.0.1:5544".parse().unwrap()),
        };
        let wire = resp.encode().unwrap();
        let stream = Builder::new().write(&wire).read(&wire).build();
        let mut conn = SocksConn::new(stream);

        conn.write_msg(&resp).await.unwrap();
        let echoed: Socks5Response = conn.read_msg().await.unwrap();
        assert_eq!(echoed, resp);
    }

    #[test(tokio::test)]
    async fn read_at_eof_is_io_error() {
        let stream = Builder::new().build();
        let mut conn = SocksConn::new(stream);
        let r: Result<Socks5Response> = conn.read_msg().await;
        assert!(matches!(r, Err(Error::Io(_))));
    }
}
