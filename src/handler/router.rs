//! Request dispatch module
//!
//! Entry point for HTTP request processing: method dispatch, CORS injection
//! and access logging.

use crate::config::AppState;
use crate::handler::static_files;
use crate::http::{self, cors};
use crate::logger::{self, AccessLogEntry};
use http_body_util::Full;
use hyper::body::{Body, Bytes};
use hyper::header::{HeaderName, IF_MODIFIED_SINCE, REFERER, USER_AGENT};
use hyper::{Method, Request, Response, StatusCode, Version};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

/// Request context: everything later stages need, detached from the request body
pub struct RequestContext {
    pub method: Method,
    /// Raw (still percent-encoded) URI path
    pub path: String,
    pub query: Option<String>,
    pub version: Version,
    pub is_head: bool,
    pub if_modified_since: Option<String>,
    pub referer: Option<String>,
    pub user_agent: Option<String>,
}

impl RequestContext {
    pub fn from_request<B>(req: &Request<B>) -> Self {
        let header = |name: HeaderName| {
            req.headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(ToString::to_string)
        };

        Self {
            method: req.method().clone(),
            path: req.uri().path().to_string(),
            query: req.uri().query().map(ToString::to_string),
            version: req.version(),
            is_head: req.method() == Method::HEAD,
            if_modified_since: header(IF_MODIFIED_SINCE),
            referer: header(REFERER),
            user_agent: header(USER_AGENT),
        }
    }
}

/// Main entry point for HTTP request handling
///
/// Whatever the dispatcher produces, including error pages and redirects,
/// gets the CORS headers before it is returned.
pub async fn handle_request<B>(
    req: Request<B>,
    state: Arc<AppState>,
    peer_addr: SocketAddr,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let started = Instant::now();
    let ctx = RequestContext::from_request(&req);
    drop(req);

    let mut response = dispatch(&ctx, &state).await;
    cors::apply_cors_headers(&mut response);

    if state.config.logging.access_log {
        log_access(&ctx, &response, peer_addr, started, &state.config.logging.access_log_format);
    }

    Ok(response)
}

/// Route on the method alone; the path only matters for file verbs
async fn dispatch(ctx: &RequestContext, state: &AppState) -> Response<Full<Bytes>> {
    match ctx.method {
        Method::OPTIONS => http::build_preflight_response(),
        Method::GET | Method::HEAD => {
            static_files::serve_path(ctx, &state.root, state.index_files()).await
        }
        ref method => {
            logger::log_warning(&format!("Unsupported method: {method} {}", ctx.path));
            http::build_error_response(
                StatusCode::NOT_IMPLEMENTED,
                &format!("Unsupported method ('{method}')"),
                false,
            )
        }
    }
}

fn log_access(
    ctx: &RequestContext,
    response: &Response<Full<Bytes>>,
    peer_addr: SocketAddr,
    started: Instant,
    format: &str,
) {
    let mut entry = AccessLogEntry::new(
        peer_addr.ip().to_string(),
        ctx.method.to_string(),
        ctx.path.clone(),
    );
    entry.query.clone_from(&ctx.query);
    entry.http_version = version_label(ctx.version).to_string();
    entry.status = response.status().as_u16();
    entry.body_bytes = response.body().size_hint().exact().unwrap_or(0);
    entry.referer.clone_from(&ctx.referer);
    entry.user_agent.clone_from(&ctx.user_agent);
    entry.request_time_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);

    logger::log_access(&entry, format);
}

fn version_label(version: Version) -> &'static str {
    match version {
        Version::HTTP_09 => "0.9",
        Version::HTTP_10 => "1.0",
        Version::HTTP_2 => "2.0",
        Version::HTTP_3 => "3.0",
        _ => "1.1",
    }
}
