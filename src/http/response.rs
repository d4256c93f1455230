//! HTTP response building module
//!
//! Builders for the responses the gateway generates itself. Proxied
//! responses never pass through here.

use super::body::{empty, full, GatewayBody};
use hyper::header::{HeaderValue, ALLOW, CONTENT_LENGTH, CONTENT_TYPE, LOCATION};
use hyper::{Response, StatusCode};

pub const ALLOWED_STATIC_METHODS: &str = "GET, HEAD, OPTIONS";

/// Plain-text response with the canonical reason phrase as body
fn build_text_response(status: StatusCode, message: String) -> Response<GatewayBody> {
    let len = message.len();
    Response::builder()
        .status(status)
        .header(CONTENT_TYPE, "text/plain; charset=utf-8")
        .header(CONTENT_LENGTH, len)
        .body(full(message))
        .unwrap_or_else(|e| {
            log_build_error(status, &e);
            fallback(status)
        })
}

/// Build 304 Not Modified response
pub fn build_304_response(etag: &str, last_modified: Option<&str>) -> Response<GatewayBody> {
    let mut builder = Response::builder()
        .status(StatusCode::NOT_MODIFIED)
        .header("ETag", etag);
    if let Some(lm) = last_modified {
        builder = builder.header("Last-Modified", lm);
    }
    builder.body(empty()).unwrap_or_else(|e| {
        log_build_error(StatusCode::NOT_MODIFIED, &e);
        fallback(StatusCode::NOT_MODIFIED)
    })
}

/// Build 404 Not Found response
pub fn build_404_response() -> Response<GatewayBody> {
    build_text_response(StatusCode::NOT_FOUND, "404 Not Found".to_string())
}

/// Build 405 Method Not Allowed response
pub fn build_405_response() -> Response<GatewayBody> {
    let mut resp = build_text_response(
        StatusCode::METHOD_NOT_ALLOWED,
        "405 Method Not Allowed".to_string(),
    );
    resp.headers_mut()
        .insert(ALLOW, HeaderValue::from_static(ALLOWED_STATIC_METHODS));
    resp
}

/// Build OPTIONS response for static routes
pub fn build_options_response() -> Response<GatewayBody> {
    Response::builder()
        .status(StatusCode::NO_CONTENT)
        .header(ALLOW, ALLOWED_STATIC_METHODS)
        .body(empty())
        .unwrap_or_else(|e| {
            log_build_error(StatusCode::NO_CONTENT, &e);
            fallback(StatusCode::NO_CONTENT)
        })
}

/// Build 416 Range Not Satisfiable response
pub fn build_416_response(file_size: u64) -> Response<GatewayBody> {
    let mut resp = build_text_response(
        StatusCode::RANGE_NOT_SATISFIABLE,
        "416 Range Not Satisfiable".to_string(),
    );
    if let Ok(value) = HeaderValue::from_str(&format!("bytes */{file_size}")) {
        resp.headers_mut().insert("Content-Range", value);
    }
    resp
}

/// Build 301 redirect response
pub fn build_redirect_response(location: &str) -> Response<GatewayBody> {
    Response::builder()
        .status(StatusCode::MOVED_PERMANENTLY)
        .header(LOCATION, location)
        .header(CONTENT_LENGTH, 0)
        .body(empty())
        .unwrap_or_else(|e| {
            log_build_error(StatusCode::MOVED_PERMANENTLY, &e);
            fallback(StatusCode::MOVED_PERMANENTLY)
        })
}

/// Error response for a failed upstream call (502/504 class)
pub fn build_error_response(status: StatusCode) -> Response<GatewayBody> {
    let reason = status.canonical_reason().unwrap_or("Error");
    build_text_response(status, format!("{} {reason}", status.as_u16()))
}

/// Build 200/206 response around a file body of `content_length` bytes
pub fn build_file_response(
    status: StatusCode,
    body: GatewayBody,
    content_length: u64,
    content_type: &str,
    headers: &[(&'static str, String)],
    is_head: bool,
) -> Response<GatewayBody> {
    let mut builder = Response::builder()
        .status(status)
        .header(CONTENT_TYPE, content_type)
        .header(CONTENT_LENGTH, content_length)
        .header("Accept-Ranges", "bytes");
    for (name, value) in headers {
        builder = builder.header(*name, value);
    }
    let body = if is_head { empty() } else { body };
    builder.body(body).unwrap_or_else(|e| {
        log_build_error(status, &e);
        fallback(StatusCode::INTERNAL_SERVER_ERROR)
    })
}

/// Build generic HTML response (directory listings)
pub fn build_html_response(content: String, is_head: bool) -> Response<GatewayBody> {
    let content_length = content.len();
    let body = if is_head { empty() } else { full(content) };

    Response::builder()
        .status(StatusCode::OK)
        .header(CONTENT_TYPE, "text/html; charset=utf-8")
        .header(CONTENT_LENGTH, content_length)
        .body(body)
        .unwrap_or_else(|e| {
            log_build_error(StatusCode::OK, &e);
            fallback(StatusCode::INTERNAL_SERVER_ERROR)
        })
}

fn fallback(status: StatusCode) -> Response<GatewayBody> {
    let mut resp = Response::new(empty());
    *resp.status_mut() = status;
    resp
}

/// Log response build error
fn log_build_error(status: StatusCode, error: &hyper::http::Error) {
    tracing::error!("failed to build {status} response: {error}");
}
