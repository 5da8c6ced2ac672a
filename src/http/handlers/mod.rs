//! HTTP request handlers

pub mod proxy;
pub mod specs;
pub mod ui;

use crate::core::service::{normalize_base_path, PortalService, ServiceError};
use crate::http::proxy::ProxyRelay;
use std::sync::Arc;

/// Shared state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<PortalService>,
    pub relay: Arc<ProxyRelay>,
    /// Normalized base path, empty when the portal is served at the root
    pub base_path: Arc<str>,
}

impl AppState {
    pub fn new(service: Arc<PortalService>) -> Result<Self, ServiceError> {
        let relay = ProxyRelay::new(service.config().proxy.clone())
            .map_err(|e| ServiceError::Config(format!("Failed to build proxy client: {}", e)))?;
        let base_path = normalize_base_path(&service.config().base_path);

        Ok(Self {
            service,
            relay: Arc::new(relay),
            base_path: Arc::from(base_path),
        })
    }
}
