//! Spec registry: the current set of known API records
//!
//! The registry holds an immutable snapshot behind a read/write lock. Writers
//! build a complete new map and swap it in; readers clone the `Arc` of the
//! snapshot they observed. No reader can see a half-built map, and a reader
//! holding a snapshot keeps it alive across later replacements.

use crate::core::record::ApiRecord;
use crate::core::service::ServiceError;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};

/// Name-keyed view of the registry at one point in time
pub type RegistrySnapshot = Arc<BTreeMap<String, ApiRecord>>;

/// Registry of API records keyed by name
#[derive(Debug, Default)]
pub struct SpecRegistry {
    specs: RwLock<RegistrySnapshot>,
}

impl SpecRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole registry with `candidates`.
    ///
    /// Candidates carrying an `error` are skipped. When two candidates share a
    /// name the later one wins. Returns the number of stored records.
    pub async fn replace<I>(&self, candidates: I) -> usize
    where
        I: IntoIterator<Item = ApiRecord>,
    {
        let mut next = BTreeMap::new();
        for record in candidates {
            if record.has_error() {
                warn!(
                    "Skipping API spec for {} due to existing error: {}",
                    record.name, record.error
                );
                continue;
            }
            next.insert(record.name.clone(), record);
        }

        let count = next.len();
        *self.specs.write().await = Arc::new(next);
        info!("API specs updated. Total specs: {}", count);
        count
    }

    /// Current snapshot
    pub async fn snapshot(&self) -> RegistrySnapshot {
        self.specs.read().await.clone()
    }

    /// Look up a single record by name
    pub async fn lookup(&self, name: &str) -> Result<ApiRecord, ServiceError> {
        self.specs
            .read()
            .await
            .get(name)
            .cloned()
            .ok_or_else(|| ServiceError::SpecNotFound(name.to_string()))
    }

    pub async fn len(&self) -> usize {
        self.specs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.specs.read().await.is_empty()
    }
}
