//! Dialect detection and server-location rewriting for specification documents
//!
//! A fetched document describes its API relative to wherever its authors
//! deployed it. The portal serves it from somewhere else, so the location
//! fields are rebased on the URL the document was fetched from:
//!
//! - OpenAPI 3.x: a resolved copy of the first `servers` entry is prepended
//! - Swagger 2.0: `host` becomes the fetch URL's host
//! - Swagger 1.2 / unversioned: `basePath` is resolved against the fetch URL

use serde_json::{json, Map, Value};
use std::fmt;
use tracing::debug;
use url::{Position, Url};

/// Specification dialect, detected from the `openapi`/`swagger` marker fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    OpenApi3,
    Swagger2,
    /// Swagger 1.2 or a document without a recognized version marker
    Legacy,
}

impl Dialect {
    pub fn detect(doc: &Map<String, Value>) -> Self {
        let openapi = doc.get("openapi").and_then(Value::as_str);
        let swagger = doc.get("swagger").and_then(Value::as_str);

        if openapi.is_some_and(|version| version.starts_with("3.")) {
            Dialect::OpenApi3
        } else if swagger == Some("2.0") {
            Dialect::Swagger2
        } else {
            Dialect::Legacy
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dialect::OpenApi3 => write!(f, "OpenAPI 3.x"),
            Dialect::Swagger2 => write!(f, "Swagger 2.0"),
            Dialect::Legacy => write!(f, "Swagger 1.2/undefined"),
        }
    }
}

/// The URL a document was fetched from, keeping its authority as written.
///
/// `Url` normalizes a scheme-default port away; rewritten locations keep
/// whatever host and port the registry record spells out.
#[derive(Debug, Clone)]
pub struct DocumentBase {
    url: Url,
    authority: String,
}

impl DocumentBase {
    pub fn parse(raw: &str) -> Result<Self, url::ParseError> {
        let url = Url::parse(raw)?;
        let authority = written_authority(raw).unwrap_or_else(|| normalized_authority(&url));
        Ok(Self { url, authority })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// `host[:port]` exactly as the fetch URL spells it, without userinfo
    pub fn authority(&self) -> &str {
        &self.authority
    }

    /// `scheme://host[:port]`
    pub fn origin(&self) -> String {
        format!("{}://{}", self.url.scheme(), self.authority)
    }
}

impl fmt::Display for DocumentBase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.url.fmt(f)
    }
}

fn written_authority(raw: &str) -> Option<String> {
    let (_, rest) = raw.split_once("://")?;
    let end = rest.find(['/', '?', '#']).unwrap_or(rest.len());
    let authority = &rest[..end];
    let authority = authority.rsplit_once('@').map_or(authority, |(_, host)| host);
    if authority.is_empty() {
        None
    } else {
        Some(authority.to_string())
    }
}

fn normalized_authority(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default();
    match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    }
}

/// Resolve a server location from a document against the URL it was fetched from.
///
/// - empty: the base origin
/// - absolute URL: returned unchanged
/// - `/path`: replaces the base path
/// - relative path: joined under the base path, which is treated as a directory
pub fn resolve(base: &DocumentBase, component: &str) -> String {
    if component.is_empty() {
        return base.origin();
    }

    if Url::parse(component).is_ok() {
        return component.to_string();
    }

    if component.starts_with('/') {
        return format!("{}{}", base.origin(), component);
    }

    let mut dir = base.url().clone();
    if !dir.path().ends_with('/') {
        let path = format!("{}/", dir.path());
        dir.set_path(&path);
    }
    dir.set_query(None);
    dir.set_fragment(None);

    match dir.join(component) {
        Ok(resolved) => format!("{}{}", base.origin(), &resolved[Position::BeforePath..]),
        Err(_) => format!("{}{}{}", base.origin(), dir.path(), component),
    }
}

/// Rewrite the dialect-specific location fields of `doc` in place.
pub fn rewrite_document(doc: &mut Map<String, Value>, base: &DocumentBase) -> Dialect {
    let dialect = Dialect::detect(doc);
    debug!("Rewriting {} document against {}", dialect, base);

    match dialect {
        Dialect::OpenApi3 => rewrite_servers(doc, base),
        Dialect::Swagger2 => {
            doc.insert(
                "host".to_string(),
                Value::String(base.authority().to_string()),
            );
        }
        Dialect::Legacy => {
            if let Some(base_path) = doc.get("basePath").and_then(Value::as_str) {
                let resolved = resolve(base, base_path);
                doc.insert("basePath".to_string(), Value::String(resolved));
            }
        }
    }

    dialect
}

/// Prepend a reachable server entry while keeping the declared ones visible.
fn rewrite_servers(doc: &mut Map<String, Value>, base: &DocumentBase) {
    let existing = match doc.remove("servers") {
        Some(Value::Array(servers)) => servers,
        _ => Vec::new(),
    };

    let preferred = existing
        .first()
        .and_then(|server| server.get("url"))
        .and_then(Value::as_str)
        .map(|declared| resolve(base, declared))
        .unwrap_or_else(|| resolve(base, ""));

    let mut servers = Vec::with_capacity(existing.len() + 1);
    servers.push(json!({ "url": preferred }));
    servers.extend(existing);

    doc.insert("servers".to_string(), Value::Array(servers));
}
