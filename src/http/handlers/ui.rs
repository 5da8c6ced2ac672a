//! UI shell and embedded static assets

use crate::http::errors::{HttpError, HttpResult};
use crate::http::handlers::AppState;
use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderValue, StatusCode, Uri},
    response::Response,
};
use include_dir::{include_dir, Dir, File};
use std::path::Path;
use tracing::debug;

/// Static assets embedded at compile time
static EMBEDDED_STATIC: Dir<'_> = include_dir!("$CARGO_MANIFEST_DIR/src/http/static");

const STATIC_CACHE_CONTROL: &str = "public, max-age=3600";

/// GET /, GET /index.html
pub async fn index(State(state): State<AppState>) -> HttpResult<Response> {
    let file = EMBEDDED_STATIC.get_file("index.html").ok_or_else(|| {
        HttpError::internal("Internal server error", "index.html is missing from embedded assets")
    })?;

    let html = String::from_utf8_lossy(file.contents());
    let html = inject_base_path(&html, &state.base_path);

    Response::builder()
        .status(StatusCode::OK)
        .header(
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/html; charset=utf-8"),
        )
        .body(Body::from(html))
        .map_err(|e| HttpError::internal("Internal server error", e.to_string()))
}

/// Any path no other route claims
pub async fn static_asset(uri: Uri) -> HttpResult<Response> {
    let path = uri.path().trim_start_matches('/');

    let file = lookup_asset(path).ok_or_else(|| {
        HttpError::not_found(
            "Static file not found",
            format!("No embedded asset for '{}'", uri.path()),
        )
    })?;
    debug!("Serving embedded asset {}", file.path().display());

    Response::builder()
        .status(StatusCode::OK)
        .header(
            header::CONTENT_TYPE,
            HeaderValue::from_static(content_type(file.path())),
        )
        .header(
            header::CACHE_CONTROL,
            HeaderValue::from_static(STATIC_CACHE_CONTROL),
        )
        .body(Body::from(file.contents()))
        .map_err(|e| HttpError::internal("Internal server error", e.to_string()))
}

/// Find an embedded file, preferring the `assets/` directory
fn lookup_asset(path: &str) -> Option<&'static File<'static>> {
    if path.is_empty() {
        return None;
    }
    EMBEDDED_STATIC
        .get_file(format!("assets/{}", path))
        .or_else(|| EMBEDDED_STATIC.get_file(path))
}

fn content_type(path: &Path) -> &'static str {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("css") => "text/css; charset=utf-8",
        Some("js") => "application/javascript; charset=utf-8",
        Some("png") => "image/png",
        Some("html") => "text/html; charset=utf-8",
        Some("json") => "application/json",
        Some("svg") => "image/svg+xml",
        _ => "application/octet-stream",
    }
}

/// Insert a `base-path` meta tag before the closing head tag
pub fn inject_base_path(html: &str, base_path: &str) -> String {
    if base_path.is_empty() {
        return html.to_string();
    }

    match html.find("</head>") {
        Some(pos) => {
            let meta = format!(
                r#"<meta name="base-path" content="{}">"#,
                escape_html(base_path)
            );
            debug!("Added base path meta tag: {}", base_path);
            format!("{}{}\n{}", &html[..pos], meta, &html[pos..])
        }
        None => html.to_string(),
    }
}

fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            c => escaped.push(c),
        }
    }
    escaped
}
