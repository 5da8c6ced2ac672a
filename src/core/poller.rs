//! Background poller keeping the registry in sync with its source

use crate::core::record::ApiRecord;
use crate::core::registry::SpecRegistry;
use crate::core::service::ServiceError;
use crate::core::sources::SpecSource;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

/// Outcome of a single poll cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// The registry was replaced and now holds this many records
    Updated(usize),
    /// The source yielded nothing usable; the registry was left untouched
    Skipped,
}

/// Periodically loads records from a [`SpecSource`] into a [`SpecRegistry`]
pub struct SpecPoller {
    source: Arc<dyn SpecSource>,
    registry: Arc<SpecRegistry>,
    interval: Duration,
    running: Arc<AtomicBool>,
}

impl SpecPoller {
    pub fn new(
        source: Arc<dyn SpecSource>,
        registry: Arc<SpecRegistry>,
        interval: Duration,
    ) -> Self {
        Self {
            source,
            registry,
            interval,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Start polling in the background. The first poll happens immediately.
    pub fn start(&self) -> tokio::task::JoinHandle<()> {
        let source = self.source.clone();
        let registry = self.registry.clone();
        let interval = self.interval;
        let running = self.running.clone();

        running.store(true, Ordering::SeqCst);

        tokio::spawn(async move {
            info!("Spec poller started for {}", source.describe());

            while running.load(Ordering::SeqCst) {
                Self::poll(source.as_ref(), &registry).await;
                sleep(interval).await;
            }

            info!("Spec poller stopped");
        })
    }

    /// Stop the background loop after its current cycle
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Run one poll cycle
    pub async fn poll_once(&self) -> PollOutcome {
        Self::poll(self.source.as_ref(), &self.registry).await
    }

    async fn poll(source: &dyn SpecSource, registry: &SpecRegistry) -> PollOutcome {
        info!("Attempting to load API specs from {}", source.describe());

        let records = match Self::load(source).await {
            Ok(records) => records,
            Err(e) => {
                error!("Failed to load API specs: {}", e);
                Vec::new()
            }
        };

        if records.is_empty() {
            warn!("No API specs loaded or an error occurred. Registry not updated.");
            return PollOutcome::Skipped;
        }

        info!(
            "Successfully loaded {} API spec(s). Updating registry...",
            records.len()
        );
        PollOutcome::Updated(registry.replace(records).await)
    }

    async fn load(source: &dyn SpecSource) -> Result<Vec<ApiRecord>, ServiceError> {
        let records = source.load().await?;
        Ok(records
            .into_iter()
            .filter_map(|record| {
                if record.name.is_empty() {
                    warn!("Skipping API record without a name (url: '{}')", record.url);
                    None
                } else {
                    Some(with_display_defaults(record))
                }
            })
            .collect())
    }
}

/// Fill in display metadata the source left empty
pub fn with_display_defaults(mut record: ApiRecord) -> ApiRecord {
    if record.title.is_empty() {
        record.title = record.name.clone();
    }
    if record.description.is_empty()
        && !record.namespace.is_empty()
        && !record.resource_name.is_empty()
    {
        record.description = format!("API from {}/{}", record.namespace, record.resource_name);
    }
    debug!("Normalized record '{}'", record.name);
    record
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Source replaying a scripted sequence of poll results
    struct ScriptedSource {
        results: Mutex<Vec<Result<Vec<ApiRecord>, ServiceError>>>,
    }

    impl ScriptedSource {
        fn new(mut results: Vec<Result<Vec<ApiRecord>, ServiceError>>) -> Self {
            results.reverse();
            Self {
                results: Mutex::new(results),
            }
        }
    }

    #[async_trait]
    impl SpecSource for ScriptedSource {
        async fn load(&self) -> Result<Vec<ApiRecord>, ServiceError> {
            self.results
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| Ok(Vec::new()))
        }

        fn describe(&self) -> String {
            "scripted source".to_string()
        }
    }

    fn record(name: &str) -> ApiRecord {
        ApiRecord::new(name, format!("http://{}/openapi.json", name))
    }

    #[tokio::test]
    async fn test_poll_replaces_registry() {
        let registry = Arc::new(SpecRegistry::new());
        let source = Arc::new(ScriptedSource::new(vec![Ok(vec![
            record("orders"),
            record("payments"),
        ])]));
        let poller = SpecPoller::new(source, registry.clone(), Duration::from_secs(60));

        assert_eq!(poller.poll_once().await, PollOutcome::Updated(2));
        assert!(registry.lookup("payments").await.is_ok());
    }

    #[tokio::test]
    async fn test_empty_or_failed_poll_keeps_previous_snapshot() {
        let registry = Arc::new(SpecRegistry::new());
        let source = Arc::new(ScriptedSource::new(vec![
            Ok(vec![record("orders")]),
            Ok(Vec::new()),
            Err(ServiceError::Source("api server unavailable".to_string())),
        ]));
        let poller = SpecPoller::new(source, registry.clone(), Duration::from_secs(60));

        assert_eq!(poller.poll_once().await, PollOutcome::Updated(1));
        assert_eq!(poller.poll_once().await, PollOutcome::Skipped);
        assert_eq!(poller.poll_once().await, PollOutcome::Skipped);

        assert_eq!(registry.len().await, 1);
        assert!(registry.lookup("orders").await.is_ok());
    }

    #[tokio::test]
    async fn test_poll_drops_unnamed_records_and_fills_display_fields() {
        let registry = Arc::new(SpecRegistry::new());
        let described = ApiRecord {
            namespace: "shop".to_string(),
            resource_name: "orders-svc".to_string(),
            ..record("orders")
        };
        let source = Arc::new(ScriptedSource::new(vec![Ok(vec![
            described,
            ApiRecord::new("", "http://anonymous/openapi.json"),
        ])]));
        let poller = SpecPoller::new(source, registry.clone(), Duration::from_secs(60));

        assert_eq!(poller.poll_once().await, PollOutcome::Updated(1));
        let stored = registry.lookup("orders").await.unwrap();
        assert_eq!(stored.title, "orders");
        assert_eq!(stored.description, "API from shop/orders-svc");
    }

    #[test]
    fn test_display_defaults_keep_existing_values() {
        let titled = ApiRecord {
            title: "Orders API".to_string(),
            description: "Handles orders".to_string(),
            namespace: "shop".to_string(),
            resource_name: "orders".to_string(),
            ..record("orders")
        };
        let normalized = with_display_defaults(titled);
        assert_eq!(normalized.title, "Orders API");
        assert_eq!(normalized.description, "Handles orders");

        let bare = with_display_defaults(record_without_namespace());
        assert!(bare.description.is_empty());
    }

    fn record_without_namespace() -> ApiRecord {
        ApiRecord {
            resource_name: "orders".to_string(),
            ..record("orders")
        }
    }

    #[tokio::test]
    async fn test_start_polls_immediately_and_stops() {
        let registry = Arc::new(SpecRegistry::new());
        let source = Arc::new(ScriptedSource::new(vec![Ok(vec![record("orders")])]));
        let poller = SpecPoller::new(source, registry.clone(), Duration::from_millis(10));

        let handle = poller.start();
        assert!(poller.is_running());

        for _ in 0..100 {
            if !registry.is_empty().await {
                break;
            }
            sleep(Duration::from_millis(10)).await;
        }
        poller.stop();
        handle.await.unwrap();

        assert!(registry.lookup("orders").await.is_ok());
        assert!(!poller.is_running());
    }
}
