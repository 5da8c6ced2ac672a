//! # multispec
//!
//! Aggregates the OpenAPI/Swagger specifications of many services into a
//! single Swagger UI portal.
//!
//! ## Architecture
//!
//! - A [`SpecPoller`] periodically loads [`ApiRecord`]s (service name + spec
//!   URL) from a [`SpecSource`] and replaces the [`SpecRegistry`] contents.
//! - The HTTP server lists the registry, fetches individual specifications on
//!   demand through the [`SpecRenderer`], which rebases their server/host/basePath
//!   fields on the URL they were fetched from, and relays "try it out" calls
//!   through a reverse proxy so browsers are not blocked by CORS.
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use multispec::http::server::PortalServer;
//! use multispec::{PortalService, ServiceConfig, SourceConfig, SpecPoller, create_source};
//! use std::path::PathBuf;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ServiceConfig {
//!         source: SourceConfig::Directory(PathBuf::from("./specs")),
//!         ..Default::default()
//!     };
//!
//!     let service = Arc::new(PortalService::new(config)?);
//!
//!     let source = create_source(&service.config().source)?;
//!     let poller = SpecPoller::new(source, service.registry(), service.config().poll_interval);
//!     poller.start();
//!
//!     PortalServer::new(service)?.serve().await?;
//!     Ok(())
//! }
//! ```

pub mod core;
pub mod http;

pub use core::fetch::SpecRenderer;
pub use core::poller::{PollOutcome, SpecPoller};
pub use core::record::ApiRecord;
pub use core::registry::{RegistrySnapshot, SpecRegistry};
pub use core::rewrite::Dialect;
pub use core::service::{PortalService, ServiceConfig, ServiceError, SourceConfig};
pub use core::sources::{create_source, SpecSource};

/// Version of the portal
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize logging from the environment (safe for testing)
///
/// `RUST_LOG` takes precedence; otherwise `LOG_LEVEL` selects the level and
/// `DEV_MODE=true` forces debug output.
pub fn init_logging() {
    let level = std::env::var("LOG_LEVEL").ok();
    let dev_mode = std::env::var("DEV_MODE").is_ok_and(|v| v == "true");
    init_logging_with(level.as_deref(), dev_mode);
}

/// Initialize logging with an explicit level
pub fn init_logging_with(level: Option<&str>, dev_mode: bool) {
    // Only initialize logging once
    static INIT: std::sync::Once = std::sync::Once::new();
    INIT.call_once(|| {
        use tracing_subscriber::EnvFilter;

        let level = if dev_mode {
            tracing::Level::DEBUG
        } else {
            level
                .and_then(|l| l.parse::<tracing::Level>().ok())
                .unwrap_or(tracing::Level::INFO)
        };
        let level = level.to_string().to_lowercase();

        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| format!("multispec={},tower_http={}", level, level).into());

        // stderr keeps stdout free for command output such as `render`
        let subscriber = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .finish();

        // This will fail silently if already initialized
        let _ = tracing::subscriber::set_global_default(subscriber);

        if dev_mode {
            tracing::debug!("DEV_MODE enabled, setting log level to DEBUG");
        }
    });
}
