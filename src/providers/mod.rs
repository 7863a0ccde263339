pub mod http;
pub mod statement;
pub mod util;
pub mod yahoo_finance;

use crate::core::config::{AppConfig, SourceConfig};
use crate::core::registry::BrokerRegistry;
use crate::core::source::SourceService;
use http::HttpBrokerSource;
use statement::StatementSource;
use std::sync::Arc;
use tracing::debug;

/// Registers every configured broker, in file order. Disabled brokers are
/// registered too so they can be reported as unavailable.
pub fn build_registry(config: &AppConfig) -> BrokerRegistry {
    let mut registry = BrokerRegistry::new();
    for broker in &config.brokers {
        debug!(broker = %broker.id, source = ?broker.source, "Registering broker");
        let source = broker.source.clone();
        registry.register(
            broker.id.clone(),
            broker.display_name(),
            broker.capabilities(),
            move |id, _capability| {
                let service: Arc<dyn SourceService> = match &source {
                    SourceConfig::Statement { path } => Arc::new(StatementSource::load(id, path)?),
                    SourceConfig::Http { base_url, api_key } => {
                        Arc::new(HttpBrokerSource::new(id, base_url, api_key.clone())?)
                    }
                };
                Ok(service)
            },
        );
    }
    registry
}
