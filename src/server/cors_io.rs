// CORS for responses hyper writes on its own
//
// A request hyper cannot parse (400, 414, 431) is answered inside hyper
// without calling the service, so it never passes `apply_cors_headers`.
// `CorsIo` wraps the connection and, while the service has not run, inserts
// the CORS header lines after the status line of the first response head.

use std::io;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::task::{ready, Context, Poll};

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

use crate::http::cors;

enum WriteState {
    /// No response bytes written yet
    Head,
    /// Patched head being flushed; `consumed` is what the caller handed over
    Patched {
        bytes: Vec<u8>,
        written: usize,
        consumed: usize,
    },
    Passthrough,
}

pub struct CorsIo<S> {
    inner: S,
    handled: Arc<AtomicBool>,
    state: WriteState,
}

impl<S> CorsIo<S> {
    /// `handled` must be set once the service is invoked; its response
    /// already carries the headers.
    pub const fn new(inner: S, handled: Arc<AtomicBool>) -> Self {
        Self {
            inner,
            handled,
            state: WriteState::Head,
        }
    }
}

/// Insert the CORS lines after the status line of an HTTP/1 response head
fn patch_head(buf: &[u8]) -> Option<Vec<u8>> {
    if !buf.starts_with(b"HTTP/") {
        return None;
    }
    let line_end = buf.windows(2).position(|w| w == b"\r\n")? + 2;
    let lines = cors::header_lines();

    let mut patched = Vec::with_capacity(buf.len() + lines.len());
    patched.extend_from_slice(&buf[..line_end]);
    patched.extend_from_slice(lines.as_bytes());
    patched.extend_from_slice(&buf[line_end..]);
    Some(patched)
}

impl<S: AsyncRead + Unpin> AsyncRead for CorsIo<S> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_read(cx, buf)
    }
}

impl<S: AsyncWrite + Unpin> AsyncWrite for CorsIo<S> {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let this = self.get_mut();
        loop {
            match &mut this.state {
                WriteState::Head => {
                    if buf.is_empty() {
                        return Pin::new(&mut this.inner).poll_write(cx, buf);
                    }
                    this.state = match patch_head(buf) {
                        Some(bytes) if !this.handled.load(Ordering::Acquire) => {
                            WriteState::Patched {
                                bytes,
                                written: 0,
                                consumed: buf.len(),
                            }
                        }
                        _ => WriteState::Passthrough,
                    };
                }
                WriteState::Patched {
                    bytes,
                    written,
                    consumed,
                } => {
                    // A retried call after Pending carries the same bytes again
                    while *written < bytes.len() {
                        let n = ready!(Pin::new(&mut this.inner).poll_write(cx, &bytes[*written..]))?;
                        if n == 0 {
                            return Poll::Ready(Err(io::ErrorKind::WriteZero.into()));
                        }
                        *written += n;
                    }
                    let consumed = *consumed;
                    this.state = WriteState::Passthrough;
                    return Poll::Ready(Ok(consumed));
                }
                WriteState::Passthrough => return Pin::new(&mut this.inner).poll_write(cx, buf),
            }
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_flush(cx)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_shutdown(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt;

    const BARE_400: &[u8] =
        b"HTTP/1.1 400 Bad Request\r\nConnection: close\r\nContent-Length: 0\r\n\r\n";

    #[test]
    fn test_patch_head_inserts_after_status_line() {
        let patched = String::from_utf8(patch_head(BARE_400).unwrap()).unwrap();
        assert_eq!(
            patched,
            "HTTP/1.1 400 Bad Request\r\n\
             Access-Control-Allow-Origin: *\r\n\
             Access-Control-Allow-Methods: GET, POST, OPTIONS\r\n\
             Access-Control-Allow-Headers: *\r\n\
             Connection: close\r\nContent-Length: 0\r\n\r\n"
        );
        assert!(patch_head(b"not a response").is_none());
        assert!(patch_head(b"HTTP/1.1 400 Bad Req").is_none());
    }

    #[tokio::test]
    async fn test_unhandled_response_is_patched_once() {
        let mut io = CorsIo::new(Vec::new(), Arc::new(AtomicBool::new(false)));
        io.write_all(BARE_400).await.unwrap();
        io.write_all(b"HTTP/1.1 trailing bytes").await.unwrap();

        let out = String::from_utf8(io.inner).unwrap();
        assert_eq!(out.matches("Access-Control-Allow-Origin").count(), 1);
        assert!(out.ends_with("\r\n\r\nHTTP/1.1 trailing bytes"));
    }

    #[tokio::test]
    async fn test_handled_response_passes_through() {
        let mut io = CorsIo::new(Vec::new(), Arc::new(AtomicBool::new(true)));
        io.write_all(BARE_400).await.unwrap();
        assert_eq!(io.inner, BARE_400);
    }
}
