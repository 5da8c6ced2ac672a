//! Spec fetch & rewrite engine

use crate::core::registry::SpecRegistry;
use crate::core::rewrite::{rewrite_document, DocumentBase};
use crate::core::service::{FetchConfig, ServiceError};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::debug;
use url::Url;

/// Fetches specification documents and rebases their server locations
#[derive(Clone)]
pub struct SpecRenderer {
    registry: Arc<SpecRegistry>,
    client: reqwest::Client,
}

impl SpecRenderer {
    /// Create a renderer reading records from `registry`
    pub fn new(registry: Arc<SpecRegistry>, config: &FetchConfig) -> Result<Self, ServiceError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ServiceError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { registry, client })
    }

    /// Render the registered spec `name`: fetch, decode and rewrite it.
    pub async fn render(&self, name: &str) -> Result<Value, ServiceError> {
        let record = self.registry.lookup(name).await?;
        debug!("Updating server info for spec: {}", name);
        self.render_url(&record.url).await
    }

    /// Fetch the document at `url` and rewrite it using `url` as the resolution base.
    pub async fn render_url(&self, url: &str) -> Result<Value, ServiceError> {
        let base = DocumentBase::parse(url).map_err(|e| ServiceError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        let mut doc = self.fetch_document(base.url()).await?;
        rewrite_document(&mut doc, &base);

        Ok(Value::Object(doc))
    }

    async fn fetch_document(&self, url: &Url) -> Result<Map<String, Value>, ServiceError> {
        let response = self
            .client
            .get(url.as_str())
            .send()
            .await
            .map_err(|e| ServiceError::Fetch {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ServiceError::UpstreamStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await.map_err(|e| ServiceError::Fetch {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        serde_json::from_slice::<Map<String, Value>>(&body)
            .map_err(|e| ServiceError::Decode(e.to_string()))
    }
}
