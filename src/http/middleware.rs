//! Request middleware shared by every route

use crate::http::errors::ErrorDetail;
use axum::{
    body::Body,
    extract::{Request, State},
    http::{header, uri::PathAndQuery, HeaderValue, Method, StatusCode, Uri},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use std::sync::Arc;
use tracing::{debug, error};

/// Remove the configured base path from the request URI before routing.
///
/// The prefix is only removed on a segment boundary, so with base `/swagger`
/// the path `/swaggerfoo` is left as is. The query string is preserved.
///
/// The bare base path is redirected to `base_path/` so the UI's relative
/// asset links resolve under the prefix.
pub async fn strip_base_path(
    State(base_path): State<Arc<str>>,
    mut req: Request,
) -> Result<Request, Response> {
    if base_path.is_empty() {
        return Ok(req);
    }

    if req.uri().path() == &*base_path {
        let location = match req.uri().query() {
            Some(query) => format!("{}/?{}", base_path, query),
            None => format!("{}/", base_path),
        };
        debug!("Redirecting {} to {}", base_path, location);
        return Err(Redirect::permanent(&location).into_response());
    }

    let stripped = match strip_prefix(req.uri().path(), &base_path) {
        Some(rest) => rest,
        None => return Ok(req),
    };

    let path_and_query = match req.uri().query() {
        Some(query) => format!("{}?{}", stripped, query),
        None => stripped,
    };

    let mut parts = req.uri().clone().into_parts();
    match path_and_query.parse::<PathAndQuery>() {
        Ok(pq) => {
            parts.path_and_query = Some(pq);
            if let Ok(uri) = Uri::from_parts(parts) {
                *req.uri_mut() = uri;
            }
        }
        Err(e) => error!("Failed to rewrite path '{}': {}", path_and_query, e),
    }

    Ok(req)
}

fn strip_prefix(path: &str, base_path: &str) -> Option<String> {
    let rest = path.strip_prefix(base_path)?;
    if rest.is_empty() {
        Some("/".to_string())
    } else if rest.starts_with('/') {
        Some(rest.to_string())
    } else {
        None
    }
}

/// Attach permissive CORS headers to every response and answer preflights directly
pub async fn cors(req: Request, next: Next) -> Response {
    let mut response = if req.method() == Method::OPTIONS {
        let mut response = Response::new(Body::empty());
        *response.status_mut() = StatusCode::OK;
        response
    } else {
        next.run(req).await
    };

    let headers = response.headers_mut();
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, POST, OPTIONS"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type, Authorization"),
    );
    headers.insert(
        header::ACCESS_CONTROL_EXPOSE_HEADERS,
        HeaderValue::from_static("Content-Length"),
    );

    response
}

/// Log the internal cause of failed requests
pub async fn log_errors(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let response = next.run(req).await;

    if let Some(ErrorDetail(detail)) = response.extensions().get::<ErrorDetail>() {
        error!(
            "[{} {}] HTTP {} - {}",
            method,
            path,
            response.status().as_u16(),
            detail
        );
    }

    response
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use axum::http::Request;
    use axum::{middleware, routing::get, Router};
    use tower::ServiceExt;

    #[test]
    fn test_strip_prefix_on_segment_boundary() {
        assert_eq!(strip_prefix("/swagger", "/swagger").as_deref(), Some("/"));
        assert_eq!(strip_prefix("/swagger/", "/swagger").as_deref(), Some("/"));
        assert_eq!(
            strip_prefix("/swagger/api/orders", "/swagger").as_deref(),
            Some("/api/orders")
        );
        assert_eq!(strip_prefix("/swaggerfoo", "/swagger"), None);
        assert_eq!(strip_prefix("/api/orders", "/swagger"), None);
    }

    fn echo_router(base_path: &str) -> Router {
        let inner = Router::new().fallback(|uri: Uri| async move { uri.to_string() });
        Router::new()
            .fallback_service(inner)
            .layer(middleware::map_request_with_state(
                Arc::<str>::from(base_path),
                strip_base_path,
            ))
    }

    async fn body_string(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_strip_base_path_keeps_query() {
        let response = echo_router("/swagger")
            .oneshot(
                Request::builder()
                    .uri("/swagger/proxy/?proxyUrl=http%3A%2F%2Forders")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(
            body_string(response).await,
            "/proxy/?proxyUrl=http%3A%2F%2Forders"
        );
    }

    #[tokio::test]
    async fn test_bare_base_path_redirects_to_trailing_slash() {
        let response = echo_router("/swagger")
            .oneshot(
                Request::builder()
                    .uri("/swagger?tab=specs")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::PERMANENT_REDIRECT);
        assert_eq!(response.headers()[header::LOCATION], "/swagger/?tab=specs");
    }

    #[tokio::test]
    async fn test_empty_base_path_is_a_no_op() {
        let response = echo_router("")
            .oneshot(Request::builder().uri("/list").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(body_string(response).await, "/list");
    }

    #[tokio::test]
    async fn test_cors_short_circuits_preflight() {
        let app = Router::new()
            .route("/swagger-specs", get(|| async { "should not run" }))
            .layer(middleware::from_fn(cors));

        let response = app
            .oneshot(
                Request::builder()
                    .method(Method::OPTIONS)
                    .uri("/swagger-specs")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_METHODS], "GET, POST, OPTIONS");
        assert!(body_string(response).await.is_empty());
    }

    #[tokio::test]
    async fn test_cors_headers_on_error_responses() {
        let app = Router::new().layer(middleware::from_fn(cors));

        let response = app
            .oneshot(Request::builder().uri("/missing").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.headers()[header::ACCESS_CONTROL_EXPOSE_HEADERS], "Content-Length");
    }
}
