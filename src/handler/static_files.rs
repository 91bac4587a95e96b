//! Static file serving module
//!
//! Maps request paths onto the document root, serves files and index pages,
//! and falls back to directory listings.

use crate::handler::listing;
use crate::handler::router::RequestContext;
use crate::http::{self, cache, mime};
use crate::logger;
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::{Response, StatusCode};
use std::borrow::Cow;
use std::ffi::OsStr;
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;

/// A request path translated onto the filesystem
#[derive(Debug, PartialEq, Eq)]
pub struct ResolvedPath {
    pub fs_path: PathBuf,
    /// The request named a directory explicitly (`/docs/`)
    pub trailing_slash: bool,
}

/// Translate a URI path into a path under `root`
///
/// The path is percent-decoded to raw bytes, then normalized segment by
/// segment: empty and `.` segments vanish and `..` removes the previous
/// segment but never climbs above the root. On Windows, segments carrying a
/// backslash are dropped as well.
pub fn translate_path(root: &Path, request_path: &str) -> ResolvedPath {
    let decoded = urlencoding::decode_binary(request_path.as_bytes());

    let mut segments: Vec<&[u8]> = Vec::new();
    for segment in decoded.split(|&b| b == b'/') {
        match segment {
            b"" | b"." => {}
            b".." => {
                segments.pop();
            }
            s if cfg!(windows) && s.contains(&b'\\') => {}
            s => segments.push(s),
        }
    }

    let mut fs_path = root.to_path_buf();
    for segment in segments {
        fs_path.push(segment_to_os(segment));
    }

    ResolvedPath {
        fs_path,
        trailing_slash: decoded.ends_with(b"/"),
    }
}

/// File names are arbitrary bytes on Unix, so decoded segments map directly
#[cfg(unix)]
fn segment_to_os(segment: &[u8]) -> Cow<'_, OsStr> {
    use std::os::unix::ffi::OsStrExt;
    Cow::Borrowed(OsStr::from_bytes(segment))
}

#[cfg(not(unix))]
fn segment_to_os(segment: &[u8]) -> Cow<'_, OsStr> {
    match String::from_utf8_lossy(segment) {
        Cow::Borrowed(s) => Cow::Borrowed(OsStr::new(s)),
        Cow::Owned(s) => Cow::Owned(s.into()),
    }
}

/// Serve whatever `ctx.path` names under `root`
pub async fn serve_path(
    ctx: &RequestContext,
    root: &Path,
    index_files: &[String],
) -> Response<Full<Bytes>> {
    let resolved = translate_path(root, &ctx.path);

    let metadata = match fs::metadata(&resolved.fs_path).await {
        Ok(m) => m,
        Err(e) => return io_error_response(&e, ctx.is_head),
    };

    // Symlinks may still point outside the root
    if !is_within_root(root, &resolved.fs_path).await {
        logger::log_warning(&format!(
            "Path escapes document root, refusing: {} -> {}",
            ctx.path,
            resolved.fs_path.display()
        ));
        return not_found(ctx.is_head);
    }

    if metadata.is_dir() {
        if !ctx.path.ends_with('/') {
            return http::build_moved_permanently_response(&directory_location(ctx));
        }
        for index_file in index_files {
            let index_path = resolved.fs_path.join(index_file);
            if fs::metadata(&index_path).await.is_ok_and(|m| m.is_file())
                && is_within_root(root, &index_path).await
            {
                return serve_file(ctx, &index_path).await;
            }
        }
        return listing::list_directory(ctx, &resolved.fs_path).await;
    }

    if resolved.trailing_slash {
        return not_found(ctx.is_head);
    }

    serve_file(ctx, &resolved.fs_path).await
}

/// Serve a single regular file, honoring `If-Modified-Since`
async fn serve_file(ctx: &RequestContext, path: &Path) -> Response<Full<Bytes>> {
    let modified = fs::metadata(path).await.ok().and_then(|m| m.modified().ok());
    let last_modified = modified.map(cache::format_http_date);

    if let (Some(modified), Some(last_modified)) = (modified, last_modified.as_deref()) {
        if cache::is_not_modified(ctx.if_modified_since.as_deref(), modified) {
            return http::build_304_response(last_modified);
        }
    }

    let content = match fs::read(path).await {
        Ok(c) => c,
        Err(e) => {
            logger::log_error(&format!("Failed to read file '{}': {e}", path.display()));
            return io_error_response(&e, ctx.is_head);
        }
    };

    http::build_file_response(
        Bytes::from(content),
        mime::content_type_for(path),
        last_modified.as_deref(),
        ctx.is_head,
    )
}

async fn is_within_root(root: &Path, path: &Path) -> bool {
    fs::canonicalize(path)
        .await
        .is_ok_and(|canonical| canonical.starts_with(root))
}

/// `Location` for a directory requested without its trailing slash
fn directory_location(ctx: &RequestContext) -> String {
    match &ctx.query {
        Some(q) => format!("{}/?{q}", ctx.path),
        None => format!("{}/", ctx.path),
    }
}

fn io_error_response(err: &io::Error, is_head: bool) -> Response<Full<Bytes>> {
    match err.kind() {
        io::ErrorKind::PermissionDenied => {
            http::build_error_response(StatusCode::FORBIDDEN, "Permission denied", is_head)
        }
        _ => not_found(is_head),
    }
}

fn not_found(is_head: bool) -> Response<Full<Bytes>> {
    http::build_error_response(StatusCode::NOT_FOUND, "File not found", is_head)
}
