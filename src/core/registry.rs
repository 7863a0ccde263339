//! Catalog of known brokers, the capabilities they advertise and how to
//! build their source services.

use crate::core::capability::Capability;
use crate::core::error::SourceResult;
use crate::core::models::BrokerId;
use crate::core::source::SourceService;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Builds the source service of one broker for one capability.
pub type SourceConstructor =
    Arc<dyn Fn(&BrokerId, Capability) -> SourceResult<Arc<dyn SourceService>> + Send + Sync>;

pub struct BrokerRegistration {
    pub id: BrokerId,
    pub display_name: String,
    pub capabilities: BTreeSet<Capability>,
    constructor: SourceConstructor,
}

impl BrokerRegistration {
    pub fn supports(&self, capability: Capability) -> bool {
        self.capabilities.contains(&capability)
    }

    /// Shared handle to the constructor, for running it off the async
    /// workers.
    pub fn constructor(&self) -> SourceConstructor {
        Arc::clone(&self.constructor)
    }
}

impl std::fmt::Debug for BrokerRegistration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BrokerRegistration")
            .field("id", &self.id)
            .field("display_name", &self.display_name)
            .field("capabilities", &self.capabilities)
            .finish_non_exhaustive()
    }
}

/// Brokers in registration order. The order is stable and drives both the
/// query order and merge tie-breaks.
#[derive(Debug, Default)]
pub struct BrokerRegistry {
    brokers: Vec<BrokerRegistration>,
}

impl BrokerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a broker. Registering an id twice replaces the earlier
    /// entry in place, keeping its position.
    pub fn register<F>(
        &mut self,
        id: BrokerId,
        display_name: &str,
        capabilities: impl IntoIterator<Item = Capability>,
        constructor: F,
    ) where
        F: Fn(&BrokerId, Capability) -> SourceResult<Arc<dyn SourceService>> + Send + Sync + 'static,
    {
        let registration = BrokerRegistration {
            id,
            display_name: display_name.to_string(),
            capabilities: capabilities.into_iter().collect(),
            constructor: Arc::new(constructor),
        };
        match self.brokers.iter().position(|b| b.id == registration.id) {
            Some(index) => self.brokers[index] = registration,
            None => self.brokers.push(registration),
        }
    }

    pub fn get(&self, id: &BrokerId) -> Option<&BrokerRegistration> {
        self.brokers.iter().find(|b| &b.id == id)
    }

    pub fn supports(&self, id: &BrokerId, capability: Capability) -> bool {
        self.get(id).is_some_and(|b| b.supports(capability))
    }

    pub fn iter(&self) -> impl Iterator<Item = &BrokerRegistration> {
        self.brokers.iter()
    }

    /// Brokers advertising `capability`, in registration order.
    pub fn capable_of(&self, capability: Capability) -> impl Iterator<Item = &BrokerRegistration> {
        self.brokers.iter().filter(move |b| b.supports(capability))
    }

    pub fn len(&self) -> usize {
        self.brokers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.brokers.is_empty()
    }
}
