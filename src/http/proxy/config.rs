//! Proxy relay configuration

use std::time::Duration;

/// Configuration for the proxy relay
#[derive(Debug, Clone)]
pub struct ProxyConfig {
    /// Time allowed for the target to send response headers (default: 5 minutes)
    pub request_timeout: Duration,
    /// Time allowed to establish the connection to the target (default: 10 seconds)
    pub connect_timeout: Duration,
    /// Hosts the relay may forward to. Empty allows any host.
    pub allowed_hosts: Vec<String>,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(300),
            connect_timeout: Duration::from_secs(10),
            allowed_hosts: Vec::new(),
        }
    }
}

impl ProxyConfig {
    /// Create a new proxy config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the response-header timeout
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Restrict forwarding to the given hosts
    pub fn with_allowed_hosts(mut self, hosts: Vec<String>) -> Self {
        self.allowed_hosts = hosts
            .into_iter()
            .map(|h| h.trim().to_ascii_lowercase())
            .filter(|h| !h.is_empty())
            .collect();
        self
    }

    /// Whether `host` may be used as a proxy destination
    pub fn allows_host(&self, host: &str) -> bool {
        self.allowed_hosts.is_empty()
            || self
                .allowed_hosts
                .iter()
                .any(|allowed| allowed.eq_ignore_ascii_case(host))
    }
}
