//! Request handler module
//!
//! Responsible for method dispatch and static file serving. Every response
//! built here passes through CORS injection in [`router::handle_request`].

pub mod listing;
pub mod router;
pub mod static_files;

// Re-export main entry point
pub use router::handle_request;
