//! HTTP protocol layer module
//!
//! Response builders, MIME detection, HTTP dates and CORS injection,
//! decoupled from path resolution.

pub mod cache;
pub mod cors;
pub mod mime;
pub mod response;

// Re-export commonly used builders
pub use response::{
    build_304_response, build_error_response, build_file_response, build_html_response,
    build_moved_permanently_response, build_preflight_response, escape_html,
};
