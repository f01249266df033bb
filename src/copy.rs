//! Bidirectional byte relay with half-close propagation.

use futures::future::join;
use log::trace;
use tokio::io::{split, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};

const BUFFER_SIZE: usize = 8192;

/// Copies `a -> b` and `b -> a` concurrently until both directions reach
/// EOF. When one direction sees EOF it shuts down the peer's write side, so
/// the far end observes a TCP half-close while the other direction keeps
/// flowing. Both halves are always awaited; the first non-EOF error wins.
/// Returns the byte counts `(a_to_b, b_to_a)`.
///
/// Cancelling the token aborts both halves and closes both streams.
pub async fn tunnel<A, B>(a: A, b: B, cancel: CancellationToken) -> Result<(u64, u64)>
where
    A: AsyncRead + AsyncWrite + Send + Unpin,
    B: AsyncRead + AsyncWrite + Send + Unpin,
{
    let (mut ar, mut aw) = split(a);
    let (mut br, mut bw) = split(b);
    let copies = join(copy_half(&mut ar, &mut bw), copy_half(&mut br, &mut aw));
    tokio::pin!(copies);
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(Error::Cancelled),
        (a_to_b, b_to_a) = &mut copies => {
            trace!("tunnel done: {:?} bytes forward, {:?} bytes back", a_to_b, b_to_a);
            match (a_to_b, b_to_a) {
                (Ok(fwd), Ok(back)) => Ok((fwd, back)),
                (Err(e), _) | (_, Err(e)) => Err(Error::Io(e)),
            }
        }
    }
}

async fn copy_half<R, W>(src: &mut R, dst: &mut W) -> std::io::Result<u64>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut buf = vec![0u8; BUFFER_SIZE];
    let mut total = 0u64;
    loop {
        let n = src.read(&mut buf).await?;
        if n == 0 {
            // source is done: half-close the destination, the opposite
            // direction keeps running until its own EOF
            let _ = dst.shutdown().await;
            return Ok(total);
        }
        dst.write_all(&buf[..n]).await?;
        total += n as u64;
    }
}
