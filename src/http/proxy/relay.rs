//! Request forwarding with streamed responses

use crate::http::errors::{HttpError, HttpResult};
use crate::http::proxy::config::ProxyConfig;
use axum::{
    body::{Body, Bytes},
    http::{HeaderMap, Method, StatusCode},
    response::Response,
};
use futures::TryStreamExt;
use tracing::{debug, error};
use url::Url;

/// Message returned when a request arrives without a usable destination
pub const MISSING_TARGET_MESSAGE: &str = "proxyUrl query parameter is required for all requests";

/// Headers scoped to a single connection, never relayed in either direction
const HOP_BY_HOP_HEADERS: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "proxy-connection",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// Inbound headers describing the client connection rather than the request
const SKIPPED_REQUEST_HEADERS: &[&str] = &["host", "content-length"];

/// Upstream headers that only describe the upstream connection
const SKIPPED_RESPONSE_HEADERS: &[&str] = &[];

/// Header names a `Connection` header declares as hop-by-hop
fn connection_listed<'a>(values: impl Iterator<Item = &'a [u8]>) -> Vec<String> {
    values
        .filter_map(|value| std::str::from_utf8(value).ok())
        .flat_map(|value| value.split(','))
        .map(|token| token.trim().to_ascii_lowercase())
        .filter(|token| !token.is_empty())
        .collect()
}

fn should_forward(name: &str, skipped: &[&str], listed: &[String]) -> bool {
    !HOP_BY_HOP_HEADERS
        .iter()
        .chain(skipped)
        .any(|s| s.eq_ignore_ascii_case(name))
        && !listed.iter().any(|s| s.eq_ignore_ascii_case(name))
}

/// Forwards arbitrary requests to the URL named by the caller
#[derive(Clone)]
pub struct ProxyRelay {
    config: ProxyConfig,
    client: reqwest::Client,
}

impl ProxyRelay {
    /// Create a new relay
    pub fn new(config: ProxyConfig) -> Result<Self, reqwest::Error> {
        // No overall timeout: response bodies may stream for as long as the target needs
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()?;

        Ok(Self { config, client })
    }

    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }

    /// Extract and validate the destination from a raw query string.
    ///
    /// Only the first `proxyUrl` value counts; an empty one is treated as missing.
    pub fn target_from_query(&self, query: Option<&str>) -> HttpResult<Url> {
        let raw = query
            .and_then(|q| {
                url::form_urlencoded::parse(q.as_bytes())
                    .find(|(key, _)| key == "proxyUrl")
                    .map(|(_, value)| value.into_owned())
            })
            .filter(|value| !value.is_empty())
            .ok_or_else(|| HttpError::BadRequest(MISSING_TARGET_MESSAGE.to_string()))?;

        let target = Url::parse(&raw)
            .map_err(|_| HttpError::BadRequest(MISSING_TARGET_MESSAGE.to_string()))?;
        if !matches!(target.scheme(), "http" | "https") || target.host_str().is_none() {
            return Err(HttpError::BadRequest(MISSING_TARGET_MESSAGE.to_string()));
        }

        let host = target.host_str().unwrap_or_default();
        if !self.config.allows_host(host) {
            return Err(HttpError::Forbidden(format!(
                "Proxying to '{}' is not allowed",
                host
            )));
        }

        Ok(target)
    }

    /// Forward a request to `target` and stream the answer back.
    ///
    /// The target's status, headers and body are passed through unchanged,
    /// including error statuses. Only transport failures become a 502.
    pub async fn forward(
        &self,
        method: &Method,
        headers: &HeaderMap,
        body: Bytes,
        target: &Url,
    ) -> HttpResult<Response> {
        let method = reqwest::Method::from_bytes(method.as_str().as_bytes())
            .map_err(|e| HttpError::BadRequest(format!("Unsupported method: {}", e)))?;

        debug!("Forwarding {} {}", method, target);

        let mut request_builder = self.client.request(method, target.as_str());

        let listed = connection_listed(
            headers
                .get_all(axum::http::header::CONNECTION)
                .iter()
                .map(|value| value.as_bytes()),
        );
        for (name, value) in headers.iter() {
            if should_forward(name.as_str(), SKIPPED_REQUEST_HEADERS, &listed) {
                request_builder = request_builder.header(name.as_str(), value.as_bytes());
            }
        }

        if !body.is_empty() {
            request_builder = request_builder.body(body);
        }

        let response =
            match tokio::time::timeout(self.config.request_timeout, request_builder.send()).await {
                Ok(Ok(response)) => response,
                Ok(Err(e)) => {
                    return Err(HttpError::bad_gateway(
                        "Failed to forward request",
                        format!("Failed to forward request to {}: {}", target, e),
                    ))
                }
                Err(_) => {
                    return Err(HttpError::bad_gateway(
                        "Failed to forward request",
                        format!(
                            "No response from {} within {}s",
                            target,
                            self.config.request_timeout.as_secs()
                        ),
                    ))
                }
            };

        let status = StatusCode::from_u16(response.status().as_u16()).map_err(|e| {
            HttpError::bad_gateway(
                "Failed to forward request",
                format!("Bad upstream status: {}", e),
            )
        })?;

        let listed = connection_listed(
            response
                .headers()
                .get_all(reqwest::header::CONNECTION)
                .iter()
                .map(|value| value.as_bytes()),
        );
        let mut response_builder = Response::builder().status(status);
        for (name, value) in response.headers().iter() {
            if should_forward(name.as_str(), SKIPPED_RESPONSE_HEADERS, &listed) {
                response_builder = response_builder.header(name.as_str(), value.as_bytes());
            }
        }

        let source = target.to_string();
        let stream = response.bytes_stream().map_err(move |e| {
            error!("Error copying response body from {}: {}", source, e);
            std::io::Error::other(e)
        });

        response_builder
            .body(Body::from_stream(stream))
            .map_err(|e| HttpError::internal("Failed to write response", e.to_string()))
    }
}
