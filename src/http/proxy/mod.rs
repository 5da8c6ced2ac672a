//! Reverse proxy relay for Swagger UI "try it out" calls
//!
//! The UI cannot call most documented services directly because of browser
//! cross-origin rules, so it sends them here with the real destination in
//! the `proxyUrl` query parameter.

pub mod config;
pub mod relay;

pub use config::ProxyConfig;
pub use relay::ProxyRelay;
