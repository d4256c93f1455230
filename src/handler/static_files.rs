//! Static file serving module
//!
//! Resolves a request path inside a static root and serves the file,
//! an index file, or a directory listing.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use hyper::header::{HeaderMap, HeaderName, IF_MODIFIED_SINCE, IF_NONE_MATCH, RANGE};
use hyper::{Method, Response, StatusCode};
use tokio::fs;
use tokio::io::{AsyncSeekExt, SeekFrom};

use crate::http::body::file_body;
use crate::http::cache::Validators;
use crate::http::range::RangeOutcome;
use crate::http::response::{build_file_response, build_html_response};
use crate::http::{self, mime, GatewayBody};
use crate::routing::StaticRoot;

/// Request details the static handler looks at
pub struct RequestContext<'a> {
    pub method: &'a Method,
    /// Original request path, used for redirects
    pub path: &'a str,
    pub query: Option<&'a str>,
    pub if_none_match: Option<&'a str>,
    pub if_modified_since: Option<&'a str>,
    pub range: Option<&'a str>,
}

impl<'a> RequestContext<'a> {
    pub fn new(method: &'a Method, path: &'a str, query: Option<&'a str>, headers: &'a HeaderMap) -> Self {
        let header = move |name: HeaderName| headers.get(name).and_then(|v| v.to_str().ok());
        Self {
            method,
            path,
            query,
            if_none_match: header(IF_NONE_MATCH),
            if_modified_since: header(IF_MODIFIED_SINCE),
            range: header(RANGE),
        }
    }

    fn is_head(&self) -> bool {
        *self.method == Method::HEAD
    }
}

/// Serve `remainder` (prefix already stripped) from `root`
pub async fn serve(root: &StaticRoot, remainder: &str, ctx: &RequestContext<'_>) -> Response<GatewayBody> {
    if let Some(resp) = check_http_method(ctx.method) {
        return resp;
    }

    let Some(relative) = sanitize_path(remainder) else {
        tracing::warn!("path traversal attempt blocked: {}", ctx.path);
        return http::build_404_response();
    };
    let candidate = root.root.join(&relative);

    let Ok(metadata) = fs::metadata(&candidate).await else {
        return http::build_404_response();
    };

    if !metadata.is_dir() {
        return serve_file(root, &candidate, ctx).await;
    }

    // Relative links in index pages and listings need the trailing slash
    if !ctx.path.ends_with('/') {
        let location = match ctx.query {
            Some(q) => format!("{}/?{q}", ctx.path),
            None => format!("{}/", ctx.path),
        };
        return http::build_redirect_response(&location);
    }

    for index in &root.index_files {
        let index_path = candidate.join(index);
        if fs::metadata(&index_path).await.is_ok_and(|m| m.is_file()) {
            return serve_file(root, &index_path, ctx).await;
        }
    }

    if root.listing {
        return serve_listing(root, &candidate, ctx).await;
    }
    http::build_404_response()
}

/// Only GET and HEAD read files; OPTIONS is answered directly
fn check_http_method(method: &Method) -> Option<Response<GatewayBody>> {
    match *method {
        Method::GET | Method::HEAD => None,
        Method::OPTIONS => Some(http::build_options_response()),
        _ => {
            tracing::debug!("method not allowed on static route: {method}");
            Some(http::build_405_response())
        }
    }
}

/// Decode the URL path into a relative filesystem path.
///
/// Returns `None` for anything that could step outside the root.
pub fn sanitize_path(remainder: &str) -> Option<PathBuf> {
    let decoded = urlencoding::decode(remainder).ok()?;
    if decoded.contains('\0') || decoded.contains('\\') {
        return None;
    }

    let mut relative = PathBuf::new();
    for segment in decoded.split('/') {
        match segment {
            "" | "." => {}
            ".." => return None,
            s => relative.push(s),
        }
    }
    Some(relative)
}

/// Resolve symlinks and make sure the target is still under the root
async fn contained(root: &StaticRoot, path: &Path) -> Option<PathBuf> {
    let canonical = fs::canonicalize(path).await.ok()?;
    if canonical.starts_with(&root.root) {
        Some(canonical)
    } else {
        tracing::warn!("blocked path escaping static root: {}", canonical.display());
        None
    }
}

async fn serve_file(root: &StaticRoot, path: &Path, ctx: &RequestContext<'_>) -> Response<GatewayBody> {
    let Some(path) = contained(root, path).await else {
        return http::build_404_response();
    };
    let (mut file, metadata) = match open_file(&path).await {
        Ok(opened) => opened,
        Err(e) => {
            tracing::error!("failed to open file '{}': {e}", path.display());
            return http::build_404_response();
        }
    };

    let validators = Validators::from_metadata(metadata.len(), metadata.modified().ok());
    let last_modified = validators.last_modified();
    if validators.is_not_modified(ctx.if_none_match, ctx.if_modified_since) {
        return http::build_304_response(&validators.etag, last_modified.as_deref());
    }

    let content_type = mime::content_type_for(&path);
    let mut headers = vec![("ETag", validators.etag.clone())];
    if let Some(lm) = last_modified {
        headers.push(("Last-Modified", lm));
    }

    let total = metadata.len();
    match http::parse_range_header(ctx.range, total) {
        RangeOutcome::Full => build_file_response(
            StatusCode::OK,
            file_body(file, total),
            total,
            content_type,
            &headers,
            ctx.is_head(),
        ),
        RangeOutcome::Partial(range) => {
            if let Err(e) = file.seek(SeekFrom::Start(range.start)).await {
                tracing::error!("failed to seek in '{}': {e}", path.display());
                return http::build_404_response();
            }
            headers.push(("Content-Range", range.content_range(total)));
            build_file_response(
                StatusCode::PARTIAL_CONTENT,
                file_body(file, range.len()),
                range.len(),
                content_type,
                &headers,
                ctx.is_head(),
            )
        }
        RangeOutcome::Unsatisfiable => http::build_416_response(total),
    }
}

async fn open_file(path: &Path) -> std::io::Result<(fs::File, std::fs::Metadata)> {
    let file = fs::File::open(path).await?;
    let metadata = file.metadata().await?;
    Ok((file, metadata))
}

async fn serve_listing(root: &StaticRoot, dir: &Path, ctx: &RequestContext<'_>) -> Response<GatewayBody> {
    let Some(dir) = contained(root, dir).await else {
        return http::build_404_response();
    };
    let mut entries = match fs::read_dir(&dir).await {
        Ok(entries) => entries,
        Err(e) => {
            tracing::error!("failed to list directory '{}': {e}", dir.display());
            return http::build_404_response();
        }
    };

    let mut names = Vec::new();
    while let Ok(Some(entry)) = entries.next_entry().await {
        let mut name = entry.file_name().to_string_lossy().into_owned();
        if entry.file_type().await.is_ok_and(|t| t.is_dir()) {
            name.push('/');
        }
        names.push(name);
    }
    names.sort();

    let mut html = String::from("<!doctype html>\n<meta name=\"viewport\" content=\"width=device-width\">\n<pre>\n");
    for name in &names {
        let _ = writeln!(html, "<a href=\"{}\">{}</a>", listing_href(name), escape_html(name));
    }
    html.push_str("</pre>\n");

    build_html_response(html, ctx.is_head())
}

/// Href for a listing entry; directories keep their trailing slash
fn listing_href(name: &str) -> String {
    match name.strip_suffix('/') {
        Some(dir) => format!("{}/", urlencoding::encode(dir)),
        None => urlencoding::encode(name).into_owned(),
    }
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
