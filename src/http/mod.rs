//! HTTP surface of the portal
//!
//! Serves the UI shell and its assets, the spec listing, rendered specs and
//! the "try it out" proxy relay.

pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod proxy;
pub mod server;

/// Re-export commonly used types
pub use errors::{HttpError, HttpResult};
pub use server::PortalServer;
