//! CORS header injection
//!
//! Every response leaving the handler passes through [`apply_cors_headers`];
//! responses hyper writes by itself get [`header_lines`] spliced in.
//! The policy is fixed and fully permissive: any origin, any request header.

use hyper::header::{
    HeaderValue, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
    ACCESS_CONTROL_ALLOW_ORIGIN,
};
use hyper::Response;

pub const ALLOW_ORIGIN: &str = "*";
pub const ALLOW_METHODS: &str = "GET, POST, OPTIONS";
pub const ALLOW_HEADERS: &str = "*";

/// Set the three CORS headers, replacing any earlier value so each appears once
pub fn apply_cors_headers<B>(response: &mut Response<B>) {
    let headers = response.headers_mut();
    headers.insert(
        ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static(ALLOW_ORIGIN),
    );
    headers.insert(
        ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static(ALLOW_METHODS),
    );
    headers.insert(
        ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static(ALLOW_HEADERS),
    );
}

/// The same three headers as raw HTTP/1 lines, for heads written outside hyper's `Response`
pub fn header_lines() -> String {
    format!(
        "Access-Control-Allow-Origin: {ALLOW_ORIGIN}\r\n\
         Access-Control-Allow-Methods: {ALLOW_METHODS}\r\n\
         Access-Control-Allow-Headers: {ALLOW_HEADERS}\r\n"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_headers_added_to_error_response() {
        let mut resp = Response::builder().status(404).body(()).unwrap();
        apply_cors_headers(&mut resp);
        assert_eq!(resp.headers()["access-control-allow-origin"], "*");
        assert_eq!(
            resp.headers()["access-control-allow-methods"],
            "GET, POST, OPTIONS"
        );
        assert_eq!(resp.headers()["access-control-allow-headers"], "*");
    }

    #[test]
    fn test_existing_value_is_replaced_not_duplicated() {
        let mut resp = Response::builder()
            .header("Access-Control-Allow-Origin", "https://example.com")
            .body(())
            .unwrap();
        apply_cors_headers(&mut resp);
        let values: Vec<_> = resp
            .headers()
            .get_all(ACCESS_CONTROL_ALLOW_ORIGIN)
            .iter()
            .collect();
        assert_eq!(values, vec!["*"]);
    }
}
