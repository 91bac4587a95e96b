//! Startup error types
//!
//! Request handling never fails outward (every failure becomes an HTTP status),
//! so these errors only cover bringing the server up.

use std::io;
use std::net::SocketAddr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to load configuration: {0}")]
    Config(#[from] ::config::ConfigError),

    #[error("invalid listen address '{addr}': {source}")]
    Address {
        addr: String,
        source: std::net::AddrParseError,
    },

    #[error("document root '{path}' is not accessible: {source}")]
    Root { path: String, source: io::Error },

    #[error("failed to bind {addr}: {source}")]
    Bind { addr: SocketAddr, source: io::Error },

    #[error("TLS setup failed: {0}")]
    Tls(String),

    #[error("failed to open log files: {0}")]
    Logging(#[source] io::Error),

    #[error(transparent)]
    Io(#[from] io::Error),
}
