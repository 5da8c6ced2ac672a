//! Service configuration from command-line arguments

use crate::cli::commands::serve::ServeArgs;
use crate::cli::error::{CliError, CliResult};
use multispec::core::service::{ConfigMapSourceConfig, FetchConfig, ServiceConfig, SourceConfig};
use multispec::http::proxy::ProxyConfig;
use std::time::Duration;
use tracing::debug;

/// Build the service configuration for `serve`
pub fn create_service_config(args: &ServeArgs) -> CliResult<ServiceConfig> {
    let poll_interval = positive_seconds("watch interval", args.watch_interval_seconds)?;
    let fetch_timeout = positive_seconds("spec fetch timeout", args.fetch_timeout_seconds)?;
    let proxy_timeout = positive_seconds("proxy timeout", args.proxy_timeout_seconds)?;

    let source = match &args.specs_dir {
        Some(dir) => {
            if !dir.is_dir() {
                return Err(CliError::Config(format!(
                    "Specs directory does not exist: {}",
                    dir.display()
                )));
            }
            SourceConfig::Directory(dir.clone())
        }
        None => SourceConfig::ConfigMap(ConfigMapSourceConfig {
            namespace: args.namespace.clone(),
            name: args.configmap_name.clone(),
            api_url: args.api_server.clone(),
            token_file: args.token_file.clone(),
            ca_file: args.ca_file.clone(),
            kubeconfig: args.kubeconfig.clone(),
        }),
    };
    debug!("Using record source: {:?}", source);

    let proxy = ProxyConfig::new()
        .with_request_timeout(proxy_timeout)
        .with_allowed_hosts(args.proxy_allowed_hosts.clone());

    Ok(ServiceConfig {
        host: args.host.clone(),
        port: args.port,
        source,
        poll_interval,
        fetch: FetchConfig {
            timeout: fetch_timeout,
        },
        proxy,
        dev_mode: args.dev_mode,
        ..Default::default()
    }
    .with_base_path(&args.base_path))
}

fn positive_seconds(what: &str, seconds: u64) -> CliResult<Duration> {
    if seconds == 0 {
        return Err(CliError::Config(format!(
            "The {} must be at least one second",
            what
        )));
    }
    Ok(Duration::from_secs(seconds))
}
