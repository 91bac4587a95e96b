//! Directory listing module
//!
//! Renders an HTML index for directories that carry no index file.

use crate::handler::router::RequestContext;
use crate::http::{self, escape_html};
use crate::logger;
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::{Response, StatusCode};
use std::borrow::Cow;
use std::path::Path;
use tokio::fs;

/// One row of a directory listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingItem {
    pub name: String,
    pub is_dir: bool,
    pub is_symlink: bool,
}

impl ListingItem {
    /// Text shown to the user: `dir/` for directories, `name@` for symlinks
    fn display_name(&self) -> Cow<'_, str> {
        if self.is_symlink {
            Cow::Owned(format!("{}@", self.name))
        } else if self.is_dir {
            Cow::Owned(format!("{}/", self.name))
        } else {
            Cow::Borrowed(self.name.as_str())
        }
    }

    /// Relative, percent-encoded link target
    fn href(&self) -> String {
        let encoded = urlencoding::encode(&self.name);
        if self.is_dir {
            format!("{encoded}/")
        } else {
            encoded.into_owned()
        }
    }
}

/// Build a listing response for `dir`
pub async fn list_directory(ctx: &RequestContext, dir: &Path) -> Response<Full<Bytes>> {
    let mut reader = match fs::read_dir(dir).await {
        Ok(r) => r,
        Err(e) => {
            logger::log_warning(&format!("Cannot list '{}': {e}", dir.display()));
            return http::build_error_response(
                StatusCode::NOT_FOUND,
                "No permission to list directory",
                ctx.is_head,
            );
        }
    };

    let mut items = Vec::new();
    loop {
        match reader.next_entry().await {
            Ok(Some(entry)) => {
                let is_symlink = entry
                    .file_type()
                    .await
                    .is_ok_and(|t| t.is_symlink());
                // Follow symlinks so a link to a directory still lists as one
                let is_dir = fs::metadata(entry.path())
                    .await
                    .is_ok_and(|m| m.is_dir());
                items.push(ListingItem {
                    name: entry.file_name().to_string_lossy().into_owned(),
                    is_dir,
                    is_symlink,
                });
            }
            Ok(None) => break,
            Err(e) => {
                logger::log_warning(&format!(
                    "Directory listing of '{}' cut short: {e}",
                    dir.display()
                ));
                break;
            }
        }
    }

    let decoded = urlencoding::decode_binary(ctx.path.as_bytes());
    let display_path = String::from_utf8_lossy(&decoded);
    http::build_html_response(render_listing(&display_path, items), ctx.is_head)
}

/// Render the listing page; entries are sorted case-insensitively
pub fn render_listing(display_path: &str, mut items: Vec<ListingItem>) -> String {
    items.sort_by_cached_key(|item| item.name.to_lowercase());

    let title = format!("Directory listing for {}", escape_html(display_path));
    let mut html = String::new();
    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n");
    html.push_str("<meta charset=\"utf-8\">\n");
    html.push_str(&format!("<title>{title}</title>\n</head>\n<body>\n"));
    html.push_str(&format!("<h1>{title}</h1>\n<hr>\n<ul>\n"));
    for item in &items {
        html.push_str(&format!(
            "<li><a href=\"{}\">{}</a></li>\n",
            escape_html(&item.href()),
            escape_html(&item.display_name())
        ));
    }
    html.push_str("</ul>\n<hr>\n</body>\n</html>\n");
    html
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(name: &str, is_dir: bool, is_symlink: bool) -> ListingItem {
        ListingItem {
            name: name.to_string(),
            is_dir,
            is_symlink,
        }
    }

    #[test]
    fn test_sorted_case_insensitively() {
        let html = render_listing(
            "/",
            vec![item("b.txt", false, false), item("Assets", true, false), item("a.txt", false, false)],
        );
        let a = html.find(">a.txt<").unwrap();
        let assets = html.find(">Assets/<").unwrap();
        let b = html.find(">b.txt<").unwrap();
        assert!(a < assets && assets < b);
    }

    #[test]
    fn test_names_are_encoded_and_escaped() {
        let html = render_listing(
            "/my docs/",
            vec![item("a b&c.html", false, false), item("<img>", true, false)],
        );
        assert!(html.contains("<title>Directory listing for /my docs/</title>"));
        assert!(html.contains("<a href=\"a%20b%26c.html\">a b&amp;c.html</a>"));
        assert!(html.contains("<a href=\"%3Cimg%3E/\">&lt;img&gt;/</a>"));
    }

    #[test]
    fn test_symlinks_are_marked() {
        let html = render_listing("/", vec![item("latest", false, true), item("current", true, true)]);
        assert!(html.contains("<a href=\"latest\">latest@</a>"));
        assert!(html.contains("<a href=\"current/\">current@</a>"));
    }
}
