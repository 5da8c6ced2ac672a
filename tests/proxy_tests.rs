//! Proxy relay tests against mock upstream services
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use multispec::http::proxy::ProxyConfig;
use multispec::http::server::PortalServer;
use multispec::{PortalService, ServiceConfig};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;
use wiremock::matchers::{
    body_string, header as header_is, headers as headers_are, method, path, query_param,
};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn app_with(config: ServiceConfig) -> Router {
    let service = Arc::new(PortalService::new(config).unwrap());
    PortalServer::new(service).unwrap().create_router()
}

fn proxy_uri(prefix: &str, target: &str) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(target.as_bytes()).collect();
    format!("{}/proxy/?proxyUrl={}", prefix, encoded)
}

async fn read_body(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn test_relays_method_query_headers_and_body() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/orders"))
        .and(query_param("status", "open"))
        .and(header_is("authorization", "Bearer token-123"))
        .and(header_is("content-type", "application/json"))
        .and(body_string(r#"{"item":"book"}"#))
        .respond_with(
            ResponseTemplate::new(201)
                .insert_header("x-order-id", "42")
                .set_body_string(r#"{"id":42}"#),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let app = app_with(ServiceConfig::default());
    let target = format!("{}/orders?status=open", mock_server.uri());

    let response = app
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri(proxy_uri("", &target))
                .header(header::AUTHORIZATION, "Bearer token-123")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"item":"book"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(response.headers()["x-order-id"], "42");
    assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    assert_eq!(read_body(response).await, r#"{"id":42}"#);
}

#[tokio::test]
async fn test_repeated_headers_keep_every_value() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/session"))
        .and(headers_are("x-multi", vec!["one", "two"]))
        .respond_with(
            ResponseTemplate::new(200)
                .append_header("set-cookie", "a=1")
                .append_header("set-cookie", "b=2"),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let app = app_with(ServiceConfig::default());
    let target = format!("{}/session", mock_server.uri());

    let response = app
        .oneshot(
            Request::builder()
                .uri(proxy_uri("", &target))
                .header("x-multi", "one")
                .header("x-multi", "two")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let cookies: Vec<_> = response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|value| value.to_str().unwrap())
        .collect();
    assert_eq!(cookies, vec!["a=1", "b=2"]);
}

#[tokio::test]
async fn test_upstream_errors_pass_through_unchanged() {
    let mock_server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/orders/7"))
        .respond_with(
            ResponseTemplate::new(409)
                .insert_header("x-request-id", "req-7")
                .set_body_string("order already shipped"),
        )
        .mount(&mock_server)
        .await;

    let app = app_with(ServiceConfig::default());
    let target = format!("{}/orders/7", mock_server.uri());

    let response = app
        .oneshot(
            Request::builder()
                .method(Method::DELETE)
                .uri(proxy_uri("", &target))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(response.headers()["x-request-id"], "req-7");
    assert_eq!(read_body(response).await, "order already shipped");
}

#[tokio::test]
async fn test_large_bodies_are_streamed_back() {
    let payload = "x".repeat(4 * 1024 * 1024);
    let mock_server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/upload"))
        .respond_with(ResponseTemplate::new(200).set_body_string(payload.clone()))
        .mount(&mock_server)
        .await;

    let app = app_with(ServiceConfig::default());
    let target = format!("{}/upload", mock_server.uri());

    // Larger than the default request body limit
    let response = app
        .oneshot(
            Request::builder()
                .method(Method::PUT)
                .uri(proxy_uri("", &target))
                .body(Body::from(payload.clone()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(read_body(response).await.len(), payload.len());
}

#[tokio::test]
async fn test_relay_under_base_path() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .mount(&mock_server)
        .await;

    let app = app_with(ServiceConfig::default().with_base_path("/swagger"));
    let target = format!("{}/health", mock_server.uri());

    let response = app
        .oneshot(
            Request::builder()
                .uri(proxy_uri("/swagger", &target))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(read_body(response).await, "ok");
}

#[tokio::test]
async fn test_slow_target_times_out_as_bad_gateway() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
        .mount(&mock_server)
        .await;

    let app = app_with(ServiceConfig {
        proxy: ProxyConfig::new().with_request_timeout(Duration::from_millis(200)),
        ..Default::default()
    });

    let response = app
        .oneshot(
            Request::builder()
                .uri(proxy_uri("", &mock_server.uri()))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let body = read_body(response).await;
    assert!(body.contains("Failed to forward request"));
    assert!(!body.contains(&mock_server.uri()));
}

#[tokio::test]
async fn test_allow_list_blocks_other_destinations() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let app = app_with(ServiceConfig {
        proxy: ProxyConfig::new().with_allowed_hosts(vec!["orders.shop.svc".to_string()]),
        ..Default::default()
    });

    let response = app
        .oneshot(
            Request::builder()
                .uri(proxy_uri("", &mock_server.uri()))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}
