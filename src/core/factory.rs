//! Creates and caches one source service per (broker, capability).

use crate::core::cache::Cache;
use crate::core::capability::Capability;
use crate::core::config::BrokerSettings;
use crate::core::error::{SourceError, SourceResult};
use crate::core::models::BrokerId;
use crate::core::registry::{BrokerRegistry, SourceConstructor};
use crate::core::source::SourceService;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

pub struct SourceFactory {
    registry: Arc<BrokerRegistry>,
    settings: Arc<dyn BrokerSettings>,
    services: Cache<(BrokerId, Capability), Arc<dyn SourceService>>,
}

impl SourceFactory {
    /// `ttl` bounds how long a constructed service is reused before the
    /// broker's constructor runs again.
    pub fn new(
        registry: Arc<BrokerRegistry>,
        settings: Arc<dyn BrokerSettings>,
        ttl: Option<Duration>,
    ) -> Self {
        Self {
            registry,
            settings,
            services: Cache::with_ttl(ttl),
        }
    }

    pub fn registry(&self) -> &BrokerRegistry {
        &self.registry
    }

    pub fn is_enabled(&self, broker: &BrokerId) -> bool {
        self.settings.is_enabled(broker)
    }

    /// Returns the service for `broker` and `capability`, constructing it on
    /// first use. Any construction failure is reported as
    /// [`SourceError::Unavailable`] and retried on the next call.
    pub async fn get(
        &self,
        broker: &BrokerId,
        capability: Capability,
    ) -> SourceResult<Arc<dyn SourceService>> {
        if !self.settings.is_enabled(broker) {
            return Err(SourceError::Unavailable(format!(
                "broker {broker} is disabled"
            )));
        }
        let registration = self
            .registry
            .get(broker)
            .ok_or_else(|| SourceError::Unavailable(format!("broker {broker} is not registered")))?;
        if !registration.supports(capability) {
            return Err(SourceError::NotSupported);
        }

        let key = (broker.clone(), capability);
        self.services
            .get_or_try_insert_with(&key, || async {
                debug!(%broker, %capability, "Constructing source service");
                construct_blocking(registration.constructor(), broker.clone(), capability)
                    .await
                    .map_err(|e| {
                        warn!(%broker, %capability, error = %e, "Source construction failed");
                        match e {
                            SourceError::Unavailable(_) => e,
                            other => SourceError::Unavailable(other.to_string()),
                        }
                    })
            })
            .await
    }

    /// Drops every cached service, forcing reconstruction on next use.
    pub fn invalidate(&self) {
        self.services.clear();
    }
}

/// Constructors may read files or build clients synchronously, so they run
/// on the blocking pool. A constructor panic is resumed on the caller.
async fn construct_blocking(
    constructor: SourceConstructor,
    broker: BrokerId,
    capability: Capability,
) -> SourceResult<Arc<dyn SourceService>> {
    match tokio::task::spawn_blocking(move || constructor(&broker, capability)).await {
        Ok(result) => result,
        Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
        Err(e) => Err(SourceError::Unavailable(format!(
            "source construction was cancelled: {e}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::PortfolioEntry;
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Holdings;

    #[async_trait]
    impl SourceService for Holdings {
        async fn portfolio(&self) -> SourceResult<Vec<PortfolioEntry>> {
            Ok(Vec::new())
        }
    }

    fn factory(constructed: Arc<AtomicUsize>, ttl: Option<Duration>) -> SourceFactory {
        let mut registry = BrokerRegistry::new();
        registry.register(
            BrokerId::new("degiro"),
            "DEGIRO",
            [Capability::Portfolio, Capability::Transactions],
            move |_, _| {
                constructed.fetch_add(1, Ordering::SeqCst);
                Ok(Arc::new(Holdings) as Arc<dyn SourceService>)
            },
        );
        registry.register(
            BrokerId::new("bitvavo"),
            "Bitvavo",
            [Capability::Portfolio],
            |_, _| Err(SourceError::Authentication("invalid api secret".to_string())),
        );
        registry.register(
            BrokerId::new("kraken"),
            "Kraken",
            [Capability::Portfolio],
            |_, _| Ok(Arc::new(Holdings) as Arc<dyn SourceService>),
        );
        let enabled: HashSet<BrokerId> = ["degiro", "bitvavo"].into_iter().map(BrokerId::from).collect();
        SourceFactory::new(Arc::new(registry), Arc::new(enabled), ttl)
    }

    #[tokio::test]
    async fn test_services_are_cached_per_broker_and_capability() {
        let constructed = Arc::new(AtomicUsize::new(0));
        let factory = factory(Arc::clone(&constructed), None);
        let degiro = BrokerId::new("degiro");

        factory.get(&degiro, Capability::Portfolio).await.unwrap();
        factory.get(&degiro, Capability::Portfolio).await.unwrap();
        assert_eq!(constructed.load(Ordering::SeqCst), 1);

        factory.get(&degiro, Capability::Transactions).await.unwrap();
        assert_eq!(constructed.load(Ordering::SeqCst), 2);

        factory.invalidate();
        factory.get(&degiro, Capability::Portfolio).await.unwrap();
        assert_eq!(constructed.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_cached_services_expire() {
        let constructed = Arc::new(AtomicUsize::new(0));
        let factory = factory(Arc::clone(&constructed), Some(Duration::from_millis(10)));
        let degiro = BrokerId::new("degiro");

        factory.get(&degiro, Capability::Portfolio).await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        factory.get(&degiro, Capability::Portfolio).await.unwrap();
        assert_eq!(constructed.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_construction_failure_is_unavailable() {
        let factory = factory(Arc::new(AtomicUsize::new(0)), None);
        let result = factory.get(&BrokerId::new("bitvavo"), Capability::Portfolio).await;
        match result {
            Err(SourceError::Unavailable(msg)) => assert!(msg.contains("invalid api secret")),
            _ => panic!("Expected an unavailable source"),
        }
    }

    #[tokio::test]
    async fn test_disabled_unknown_and_incapable_brokers() {
        let factory = factory(Arc::new(AtomicUsize::new(0)), None);

        let disabled = factory.get(&BrokerId::new("kraken"), Capability::Portfolio).await;
        assert!(matches!(disabled, Err(SourceError::Unavailable(_))));

        let unknown = factory.get(&BrokerId::new("trading212"), Capability::Portfolio).await;
        assert!(matches!(unknown, Err(SourceError::Unavailable(_))));

        let incapable = factory.get(&BrokerId::new("degiro"), Capability::Fees).await;
        assert!(matches!(incapable, Err(SourceError::NotSupported)));
    }
}
