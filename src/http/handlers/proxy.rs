//! Proxy endpoint

use crate::http::errors::HttpResult;
use crate::http::handlers::AppState;
use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, Method, Uri},
    response::Response,
};
use tracing::debug;

/// ANY /proxy/* - relay the request to the URL in the `proxyUrl` query parameter
pub async fn proxy_request(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> HttpResult<Response> {
    let target = state.relay.target_from_query(uri.query())?;
    debug!(
        "Proxying {} {} to {} ({} byte body)",
        method,
        uri.path(),
        target,
        body.len()
    );

    state.relay.forward(&method, &headers, body, &target).await
}
