// Server loop module
// Accepts connections one at a time until shutdown is signalled

use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::Notify;
use tokio_rustls::TlsAcceptor;

use super::connection::serve_connection;
use crate::config::AppState;
use crate::logger;

/// Serialized accept loop.
///
/// Each accepted connection is served to completion before the next
/// `accept`, so at most one request is in flight. Returns once `shutdown` is
/// notified; a connection being served at that moment finishes first.
pub async fn run(
    listener: TcpListener,
    state: Arc<AppState>,
    tls: Option<TlsAcceptor>,
    shutdown: Arc<Notify>,
) {
    loop {
        tokio::select! {
            accept_result = listener.accept() => {
                match accept_result {
                    Ok((stream, peer_addr)) => {
                        serve_connection(stream, peer_addr, &state, tls.as_ref()).await;
                    }
                    Err(e) => {
                        logger::log_error(&format!("Failed to accept connection: {e}"));
                    }
                }
            }

            () = shutdown.notified() => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::test_support::{state_for, TestDir};
    use crate::server::create_listener;
    use std::net::SocketAddr;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    async fn raw_request(addr: SocketAddr, request: &str) -> String {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream.write_all(request.as_bytes()).await.unwrap();
        let mut response = Vec::new();
        stream.read_to_end(&mut response).await.unwrap();
        String::from_utf8(response).unwrap()
    }

    #[tokio::test]
    async fn test_end_to_end_over_tcp() {
        let dir = TestDir::new("e2e");
        dir.write("index.html", b"<h1>hi</h1>");
        let state = state_for(&dir);

        let listener = create_listener("127.0.0.1:0".parse().unwrap()).unwrap();
        let addr = listener.local_addr().unwrap();
        let shutdown = Arc::new(Notify::new());

        let client_shutdown = Arc::clone(&shutdown);
        let client = tokio::spawn(async move {
            let preflight = raw_request(
                addr,
                "OPTIONS /anything HTTP/1.1\r\nHost: localhost\r\nOrigin: http://example.com\r\n\r\n",
            )
            .await;
            let page = raw_request(addr, "GET /index.html HTTP/1.1\r\nHost: localhost\r\n\r\n").await;
            let missing = raw_request(
                addr,
                "GET /does-not-exist.txt HTTP/1.1\r\nHost: localhost\r\n\r\n",
            )
            .await;
            client_shutdown.notify_one();
            (preflight, page, missing)
        });

        run(listener, state, None, shutdown).await;
        let (preflight, page, missing) = client.await.unwrap();

        assert!(preflight.starts_with("HTTP/1.1 200 OK\r\n"), "{preflight}");
        assert!(preflight.contains("\r\nAccess-Control-Allow-Methods: GET, POST, OPTIONS\r\n"));
        assert!(preflight.contains("\r\nAccess-Control-Allow-Origin: *\r\n"));
        assert!(preflight.ends_with("\r\n\r\n"), "preflight must have no body");

        assert!(page.starts_with("HTTP/1.1 200 OK\r\n"), "{page}");
        assert!(page.contains("\r\nContent-Type: text/html"));
        assert!(page.ends_with("\r\n\r\n<h1>hi</h1>"));

        assert!(missing.starts_with("HTTP/1.1 404 Not Found\r\n"), "{missing}");
        assert!(missing.contains("\r\nAccess-Control-Allow-Origin: *\r\n"));
    }

    #[tokio::test]
    async fn test_malformed_requests_still_carry_cors() {
        let dir = TestDir::new("malformed");
        let state = state_for(&dir);

        let listener = create_listener("127.0.0.1:0".parse().unwrap()).unwrap();
        let addr = listener.local_addr().unwrap();
        let shutdown = Arc::new(Notify::new());

        let client_shutdown = Arc::clone(&shutdown);
        let client = tokio::spawn(async move {
            let garbage = raw_request(addr, "GARBAGE\r\n\r\n").await;
            let bad_header = raw_request(
                addr,
                "GET / HTTP/1.1\r\nHost: localhost\r\nno colon here\r\n\r\n",
            )
            .await;
            client_shutdown.notify_one();
            (garbage, bad_header)
        });

        run(listener, state, None, shutdown).await;
        let (garbage, bad_header) = client.await.unwrap();

        for response in [garbage, bad_header] {
            assert!(response.starts_with("HTTP/1.1 400 Bad Request\r\n"), "{response}");
            assert!(response.contains("\r\nAccess-Control-Allow-Origin: *\r\n"), "{response}");
            assert!(response.contains("\r\nAccess-Control-Allow-Methods: GET, POST, OPTIONS\r\n"));
            assert!(response.contains("\r\nAccess-Control-Allow-Headers: *\r\n"));
            assert!(response.ends_with("\r\n\r\n"));
        }
    }
}
