//! Serve command implementation

use crate::cli::config::create_service_config;
use crate::cli::error::CliResult;
use clap::Args;
use multispec::http::server::PortalServer;
use multispec::{create_source, PortalService, SpecPoller};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Serve the documentation portal via HTTP
#[derive(Debug, Args)]
pub struct ServeArgs {
    /// Host to bind the server to
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to bind the server to
    #[arg(long, env = "PORT", default_value_t = 9090)]
    pub port: u16,

    /// Path prefix the portal is reachable under behind an Ingress or Route
    #[arg(long, env = "SWAGGER_BASE_PATH", default_value = "")]
    pub base_path: String,

    /// Read API records from this directory instead of a ConfigMap
    #[arg(long, env = "SPECS_DIR")]
    pub specs_dir: Option<PathBuf>,

    /// Namespace of the ConfigMap holding API records
    #[arg(long, env = "NAMESPACE", default_value = "default")]
    pub namespace: String,

    /// Name of the ConfigMap holding API records
    #[arg(long, env = "CONFIGMAP_NAME", default_value = "openapi-specs")]
    pub configmap_name: String,

    /// Kubernetes API server URL (defaults to the in-cluster service)
    #[arg(long, env = "KUBERNETES_API_URL")]
    pub api_server: Option<String>,

    /// Bearer token file for the API server
    #[arg(long)]
    pub token_file: Option<PathBuf>,

    /// CA bundle for the API server
    #[arg(long)]
    pub ca_file: Option<PathBuf>,

    /// Kubeconfig used outside a cluster (defaults to $KUBECONFIG, then ~/.kube/config)
    #[arg(long)]
    pub kubeconfig: Option<PathBuf>,

    /// Seconds between two polls of the record source
    #[arg(long, env = "WATCH_INTERVAL_SECONDS", default_value_t = 10)]
    pub watch_interval_seconds: u64,

    /// Seconds allowed for fetching one specification
    #[arg(long, env = "SPEC_FETCH_TIMEOUT_SECONDS", default_value_t = 30)]
    pub fetch_timeout_seconds: u64,

    /// Seconds a proxied call may take to return response headers
    #[arg(long, env = "PROXY_TIMEOUT_SECONDS", default_value_t = 300)]
    pub proxy_timeout_seconds: u64,

    /// Restrict the proxy to these hosts (repeatable; empty allows any host)
    #[arg(
        long = "proxy-allowed-host",
        env = "PROXY_ALLOWED_HOSTS",
        value_delimiter = ','
    )]
    pub proxy_allowed_hosts: Vec<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Development mode: debug logging
    #[arg(long, env = "DEV_MODE")]
    pub dev_mode: bool,
}

pub async fn execute_serve(args: ServeArgs) -> CliResult<()> {
    multispec::init_logging_with(args.log_level.as_deref(), args.dev_mode);

    let config = create_service_config(&args)?;
    info!(
        "Starting API portal on {}:{} (base path: '{}')",
        config.host, config.port, config.base_path
    );

    let service = Arc::new(PortalService::new(config)?);
    let server = PortalServer::new(service.clone())?;

    let source = create_source(&service.config().source)?;
    let poller = SpecPoller::new(source, service.registry(), service.config().poll_interval);
    let poller_handle = poller.start();

    println!("API portal starting...");
    println!(
        "  Listening on: http://{}{}/",
        server.addr(),
        service.config().base_path
    );

    // Blocks until shutdown
    let result = server.serve().await;

    poller.stop();
    poller_handle.abort();

    result?;
    Ok(())
}
