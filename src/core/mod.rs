//! Core service layer modules

pub mod fetch;
pub mod poller;
pub mod record;
pub mod registry;
pub mod rewrite;
pub mod service;
pub mod sources;

// Re-export main types for convenience
pub use fetch::SpecRenderer;
pub use poller::{PollOutcome, SpecPoller};
pub use record::ApiRecord;
pub use registry::{RegistrySnapshot, SpecRegistry};
pub use rewrite::{resolve, rewrite_document, Dialect, DocumentBase};
pub use service::{
    normalize_base_path, ConfigMapSourceConfig, FetchConfig, PortalService, ServiceConfig,
    ServiceError, SourceConfig,
};
pub use sources::{create_source, ConfigMapSource, DirectorySource, SpecSource};
