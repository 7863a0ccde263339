//! Fans a capability query out to every eligible broker.

use crate::core::capability::Capability;
use crate::core::envelope::BrokerAvailability;
use crate::core::error::{AggregationError, SourceError, SourceResult};
use crate::core::factory::SourceFactory;
use crate::core::models::{BrokerId, PortfolioSelector};
use crate::core::source::SourceService;
use futures::future::join_all;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinError;
use tracing::{debug, warn};

/// Raw per-broker results of one capability query, in registration order.
#[derive(Debug)]
pub struct Collected<T> {
    pub results: Vec<(BrokerId, T)>,
    pub availability: Vec<BrokerAvailability>,
}

impl<T> Collected<T> {
    pub fn into_values(self) -> (Vec<T>, Vec<BrokerAvailability>) {
        let values = self.results.into_iter().map(|(_, value)| value).collect();
        (values, self.availability)
    }
}

pub struct Aggregator {
    factory: Arc<SourceFactory>,
    query_timeout: Duration,
}

impl Aggregator {
    pub fn new(factory: Arc<SourceFactory>, query_timeout: Duration) -> Self {
        Self {
            factory,
            query_timeout,
        }
    }

    pub fn factory(&self) -> &SourceFactory {
        &self.factory
    }

    /// Brokers capable of `capability` under `selector` in registration
    /// order, each flagged with whether it is enabled.
    fn resolve(
        &self,
        capability: Capability,
        selector: &PortfolioSelector,
    ) -> Result<Vec<(BrokerId, bool)>, AggregationError> {
        let registry = self.factory.registry();
        match selector {
            PortfolioSelector::Broker(id) => {
                let registration = registry
                    .get(id)
                    .ok_or_else(|| AggregationError::UnknownBroker(id.clone()))?;
                if !self.factory.is_enabled(id) {
                    return Err(AggregationError::BrokerDisabled(id.clone()));
                }
                if !registration.supports(capability) {
                    return Err(AggregationError::CapabilityNotSupported {
                        broker: id.clone(),
                        capability,
                    });
                }
                Ok(vec![(id.clone(), true)])
            }
            PortfolioSelector::All => {
                let brokers: Vec<_> = registry
                    .capable_of(capability)
                    .map(|registration| {
                        let enabled = self.factory.is_enabled(&registration.id);
                        (registration.id.clone(), enabled)
                    })
                    .collect();
                if !brokers.iter().any(|(_, enabled)| *enabled) {
                    return Err(AggregationError::NoEligibleBrokers(capability));
                }
                Ok(brokers)
            }
        }
    }

    /// Runs `query` against every eligible broker concurrently.
    ///
    /// Each broker runs in its own task, and the configured timeout covers
    /// both building its source and answering the query. A broker that
    /// fails, times out or panics is recorded in the returned availability
    /// and never affects the others. A broker answering `NotSupported`
    /// succeeds without contributing results. Disabled brokers are listed
    /// in availability without being queried.
    pub async fn collect<T, Q, Fut>(
        &self,
        capability: Capability,
        selector: &PortfolioSelector,
        query: Q,
    ) -> Result<Collected<T>, AggregationError>
    where
        T: Send + 'static,
        Q: Fn(Arc<dyn SourceService>) -> Fut + Clone + Send + 'static,
        Fut: Future<Output = SourceResult<T>> + Send + 'static,
    {
        let brokers = self.resolve(capability, selector)?;
        let eligible: Vec<&BrokerId> = brokers
            .iter()
            .filter(|(_, enabled)| *enabled)
            .map(|(broker, _)| broker)
            .collect();
        debug!(%capability, %selector, brokers = eligible.len(), "Querying brokers");

        let tasks = eligible.into_iter().map(|broker| {
            let factory = Arc::clone(&self.factory);
            let broker = broker.clone();
            let query = query.clone();
            let timeout = self.query_timeout;
            let handle = tokio::spawn(async move {
                let fetch = async move {
                    let service = factory.get(&broker, capability).await?;
                    query(service).await
                };
                tokio::time::timeout(timeout, fetch)
                    .await
                    .unwrap_or(Err(SourceError::Timeout(timeout)))
            });
            async move { handle.await.unwrap_or_else(|e| Err(panic_error(e))) }
        });

        // join_all yields in input order, which is registration order.
        let mut outcomes = join_all(tasks).await.into_iter();

        let mut results = Vec::new();
        let mut availability = Vec::with_capacity(brokers.len());
        for (broker, enabled) in brokers {
            if !enabled {
                availability.push(BrokerAvailability::disabled(broker));
                continue;
            }
            let Some(outcome) = outcomes.next() else {
                break;
            };
            match outcome {
                Ok(value) => {
                    debug!(%broker, %capability, "Broker query succeeded");
                    availability.push(BrokerAvailability::succeeded(broker.clone()));
                    results.push((broker, value));
                }
                Err(SourceError::NotSupported) => {
                    debug!(%broker, %capability, "Broker has nothing to contribute");
                    availability.push(BrokerAvailability::not_supported(broker));
                }
                Err(e) => {
                    warn!(%broker, %capability, error = %e, "Broker query failed");
                    availability.push(BrokerAvailability::failed(broker, &e));
                }
            }
        }

        Ok(Collected {
            results,
            availability,
        })
    }
}

fn panic_error(join_error: JoinError) -> SourceError {
    if join_error.is_panic() {
        let payload = join_error.into_panic();
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string());
        SourceError::Panicked(message)
    } else {
        SourceError::Panicked("query task was cancelled".to_string())
    }
}
