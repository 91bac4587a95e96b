// Connection handling module
// Serves one TCP (or TLS) connection carrying a single HTTP/1 request

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio_rustls::TlsAcceptor;

use super::cors_io::CorsIo;
use crate::config::AppState;
use crate::handler;
use crate::logger;

/// Serve a freshly accepted connection until its response is written.
///
/// When `tls` is set the TLS handshake runs first; a failed handshake drops
/// the connection without an HTTP response.
pub async fn serve_connection(
    stream: TcpStream,
    peer_addr: SocketAddr,
    state: &Arc<AppState>,
    tls: Option<&TlsAcceptor>,
) {
    match tls {
        None => serve_io(stream, peer_addr, state).await,
        Some(acceptor) => match acceptor.accept(stream).await {
            Ok(tls_stream) => serve_io(tls_stream, peer_addr, state).await,
            Err(e) => {
                logger::log_warning(&format!("TLS handshake with {peer_addr} failed: {e}"));
            }
        },
    }
}

/// Run hyper's HTTP/1 state machine over `stream`.
///
/// Keep-alive is off: one request per connection, so a browser holding an
/// idle connection open cannot block the next client. Error responses hyper
/// produces without calling the service get their CORS headers from
/// [`CorsIo`].
async fn serve_io<S>(stream: S, peer_addr: SocketAddr, state: &Arc<AppState>)
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let handled = Arc::new(AtomicBool::new(false));
    let io = TokioIo::new(CorsIo::new(stream, Arc::clone(&handled)));
    let timeout = state
        .config
        .server
        .connection_timeout
        .filter(|&secs| secs > 0)
        .map(Duration::from_secs);

    let mut builder = http1::Builder::new();
    builder.keep_alive(false).title_case_headers(true);

    let service_state = Arc::clone(state);
    let conn = builder.serve_connection(
        io,
        service_fn(move |req| {
            handled.store(true, Ordering::Release);
            handler::handle_request(req, Arc::clone(&service_state), peer_addr)
        }),
    );

    match timeout {
        Some(limit) => match tokio::time::timeout(limit, conn).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => logger::log_connection_error(&err),
            Err(_) => logger::log_warning(&format!(
                "Connection from {peer_addr} timed out after {} seconds",
                limit.as_secs()
            )),
        },
        None => {
            if let Err(err) = conn.await {
                logger::log_connection_error(&err);
            }
        }
    }
}
