//! Reliable byte-stream I/O primitives.
//!
//! TCP is a stream protocol: a single `read()` may return fewer bytes
//! than requested, and a single `write()` may accept fewer than offered.
//! Every frame field in this protocol has a known size, so the pipeline
//! wants full-buffer semantics: transfer exactly `n` bytes or fail.
//!
//! These primitives loop over partial transfers internally and never
//! expose a short result to callers. A read of zero bytes while more are
//! expected means the peer closed mid-frame; that is reported as
//! [`std::io::ErrorKind::UnexpectedEof`], never silently tolerated. No
//! retry is attempted here; retry policy belongs to the caller.
//!
//! The functions are generic over [`AsyncRead`]/[`AsyncWrite`] so unit
//! tests can drive them with mock transports that deliver data in
//! arbitrary small chunks.

use std::io;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Reads exactly `buf.len()` bytes from `stream` into `buf`.
///
/// # Errors
///
/// Propagates any transport error; an orderly close before the buffer is
/// full yields [`io::ErrorKind::UnexpectedEof`]. The buffer contents are
/// unspecified after an error; the frame is discarded, never resumed.
pub async fn read_exact_into<S>(stream: &mut S, buf: &mut [u8]) -> io::Result<()>
where
    S: AsyncRead + Unpin,
{
    let mut filled = 0;
    while filled < buf.len() {
        let n = stream.read(&mut buf[filled..]).await?;
        if n == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("peer closed after {filled} of {} expected bytes", buf.len()),
            ));
        }
        filled += n;
    }
    Ok(())
}

/// Writes all of `bytes` to `stream`.
///
/// # Errors
///
/// Propagates any transport error; a write that accepts zero bytes yields
/// [`io::ErrorKind::WriteZero`].
pub async fn write_all_bytes<S>(stream: &mut S, bytes: &[u8]) -> io::Result<()>
where
    S: AsyncWrite + Unpin,
{
    let mut written = 0;
    while written < bytes.len() {
        let n = stream.write(&bytes[written..]).await?;
        if n == 0 {
            return Err(io::Error::new(
                io::ErrorKind::WriteZero,
                format!("transport accepted 0 of {} remaining bytes", bytes.len() - written),
            ));
        }
        written += n;
    }
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
