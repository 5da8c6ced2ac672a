//! Axum HTTP server implementation

use crate::core::service::{PortalService, ServiceError};
use crate::http::handlers::{proxy, specs, ui, AppState};
use crate::http::middleware::{cors, log_errors, strip_base_path};
use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{any, get},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

/// Portal HTTP server
pub struct PortalServer {
    state: AppState,
    addr: SocketAddr,
}

impl PortalServer {
    /// Create a new server instance listening on the configured host and port
    pub fn new(service: Arc<PortalService>) -> Result<Self, ServiceError> {
        let config = service.config();
        let addr = Self::parse_address(&config.host, config.port).map_err(ServiceError::Config)?;
        let state = AppState::new(service)?;

        Ok(Self { state, addr })
    }

    fn parse_address(host: &str, port: u16) -> Result<SocketAddr, String> {
        // Normalize common hostnames for SocketAddr compatibility
        let normalized_host = Self::normalize_host(host);

        // IPv6 addresses need brackets
        let addr_str = if normalized_host.contains(':') {
            format!("[{}]:{}", normalized_host, port)
        } else {
            format!("{}:{}", normalized_host, port)
        };

        addr_str.parse().map_err(|_| {
            format!(
                "Unable to parse address '{}'. Use IP addresses like '127.0.0.1', '0.0.0.0', '::1', or hostnames that resolve to IP addresses",
                addr_str
            )
        })
    }

    /// Normalize hostnames for SocketAddr compatibility
    fn normalize_host(host: &str) -> String {
        match host {
            "localhost" => "127.0.0.1".to_string(),
            "::1" | "[::1]" => "::1".to_string(),
            "::" | "[::]" => "::".to_string(),
            _ => host.to_string(),
        }
    }

    /// Create the Axum router with all routes and middleware
    pub fn create_router(&self) -> Router {
        let relay_route = || any(proxy::proxy_request).layer(DefaultBodyLimit::disable());

        let routes = Router::new()
            .route("/", get(ui::index))
            .route("/index.html", get(ui::index))
            .route("/swagger-specs", get(specs::list_specs))
            .route("/list", get(specs::list_specs))
            .route("/api/*name", get(specs::render_spec))
            .route("/proxy/", relay_route())
            .route("/proxy/*rest", relay_route())
            .fallback(ui::static_asset)
            .layer(middleware::from_fn(log_errors))
            .with_state(self.state.clone());

        // Base-path stripping must run before routing, so it wraps the
        // routed app as a whole instead of being a route layer.
        Router::new()
            .fallback_service(routes)
            .layer(middleware::map_request_with_state(
                self.state.base_path.clone(),
                strip_base_path,
            ))
            .layer(middleware::from_fn(cors))
            .layer(TraceLayer::new_for_http())
    }

    /// Start the server and run until Ctrl-C or SIGTERM
    pub async fn serve(self) -> Result<(), ServiceError> {
        let app = self.create_router();

        info!("Starting API portal on {}", self.addr);
        if !self.state.base_path.is_empty() {
            info!("Serving under base path {}", self.state.base_path);
        }
        if self.state.service.config().dev_mode {
            debug!("Development mode enabled");
        }
        if self.state.relay.config().allowed_hosts.is_empty() {
            warn!("Proxy relay accepts any destination; set an allow-list unless the network is isolated");
        }

        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        let actual_addr = listener.local_addr()?;
        info!("Server bound to {}", actual_addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        info!("Server stopped");
        Ok(())
    }

    /// Get server address
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_address() {
        assert_eq!(
            PortalServer::parse_address("localhost", 9090).unwrap(),
            "127.0.0.1:9090".parse::<SocketAddr>().unwrap()
        );
        assert_eq!(
            PortalServer::parse_address("::", 8080).unwrap(),
            "[::]:8080".parse::<SocketAddr>().unwrap()
        );
        assert!(PortalServer::parse_address("not a host", 80).is_err());
    }
}
