// Server module entry point
// Listener setup, the serialized accept loop, TLS and signal handling

pub mod connection;
mod cors_io;
pub mod listener;
pub mod serve_loop;
pub mod signal;
pub mod tls;

pub use listener::create_listener;
pub use serve_loop::run;
