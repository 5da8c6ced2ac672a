//! Main multispec service: configuration, errors and the shared service handle

use crate::core::fetch::SpecRenderer;
use crate::core::registry::SpecRegistry;
use crate::http::proxy::ProxyConfig;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Where the poller discovers API records
#[derive(Debug, Clone)]
pub enum SourceConfig {
    /// A Kubernetes ConfigMap read through the API server
    ConfigMap(ConfigMapSourceConfig),
    /// A directory of JSON/YAML record files (e.g. a mounted ConfigMap volume)
    Directory(PathBuf),
}

impl Default for SourceConfig {
    fn default() -> Self {
        SourceConfig::ConfigMap(ConfigMapSourceConfig::default())
    }
}

/// Kubernetes ConfigMap source configuration
#[derive(Debug, Clone)]
pub struct ConfigMapSourceConfig {
    /// Namespace holding the ConfigMap (default: "default")
    pub namespace: String,
    /// ConfigMap name (default: "openapi-specs")
    pub name: String,
    /// API server URL. Derived from the in-cluster environment when unset.
    pub api_url: Option<String>,
    /// Bearer token file. Defaults to the service-account token in-cluster.
    pub token_file: Option<PathBuf>,
    /// CA bundle for the API server. Defaults to the service-account CA in-cluster.
    pub ca_file: Option<PathBuf>,
    /// Kubeconfig consulted outside a cluster. Defaults to `$KUBECONFIG`, then `~/.kube/config`.
    pub kubeconfig: Option<PathBuf>,
}

impl Default for ConfigMapSourceConfig {
    fn default() -> Self {
        Self {
            namespace: "default".to_string(),
            name: "openapi-specs".to_string(),
            api_url: None,
            token_file: None,
            ca_file: None,
            kubeconfig: None,
        }
    }
}

/// Spec fetching configuration
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Upper bound for fetching one specification document
    pub timeout: Duration,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
        }
    }
}

/// Main service configuration
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Interface to bind the HTTP server to
    pub host: String,

    /// Port to bind the HTTP server to
    pub port: u16,

    /// Path prefix the portal is mounted under (Ingress/Route support), e.g. "/swagger"
    pub base_path: String,

    /// Record source for the poller
    pub source: SourceConfig,

    /// Delay between two polls of the source
    pub poll_interval: Duration,

    /// Spec fetch configuration
    pub fetch: FetchConfig,

    /// Proxy relay configuration
    pub proxy: ProxyConfig,

    /// Development mode (forces debug logging)
    pub dev_mode: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 9090,
            base_path: String::new(),
            source: SourceConfig::default(),
            poll_interval: Duration::from_secs(10),
            fetch: FetchConfig::default(),
            proxy: ProxyConfig::default(),
            dev_mode: false,
        }
    }
}

impl ServiceConfig {
    /// Set the base path, normalizing it to `/segment` form
    pub fn with_base_path(mut self, base_path: &str) -> Self {
        self.base_path = normalize_base_path(base_path);
        self
    }
}

/// Normalize a configured base path: leading slash, no trailing slash, empty for root.
pub fn normalize_base_path(raw: &str) -> String {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{}", trimmed)
    }
}

/// Service error types
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("API not found: {0}")]
    SpecNotFound(String),

    #[error("Failed to fetch spec from {url}: {reason}")]
    Fetch { url: String, reason: String },

    #[error("Failed to fetch spec from {url}, status: {status}")]
    UpstreamStatus { url: String, status: u16 },

    #[error("Failed to decode OpenAPI spec: {0}")]
    Decode(String),

    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Source error: {0}")]
    Source(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Main multispec service
///
/// Owns the registry and the spec renderer. The registry is shared with the
/// poller, which is its only writer.
pub struct PortalService {
    config: ServiceConfig,
    registry: Arc<SpecRegistry>,
    renderer: SpecRenderer,
}

impl PortalService {
    /// Create a new service with an empty registry
    pub fn new(config: ServiceConfig) -> Result<Self, ServiceError> {
        Self::with_registry(config, Arc::new(SpecRegistry::new()))
    }

    /// Create a new service around an existing registry
    pub fn with_registry(
        config: ServiceConfig,
        registry: Arc<SpecRegistry>,
    ) -> Result<Self, ServiceError> {
        info!("Initializing multispec service v{}", crate::VERSION);

        let renderer = SpecRenderer::new(registry.clone(), &config.fetch)?;

        Ok(Self {
            config,
            registry,
            renderer,
        })
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn registry(&self) -> Arc<SpecRegistry> {
        self.registry.clone()
    }

    pub fn renderer(&self) -> &SpecRenderer {
        &self.renderer
    }
}
