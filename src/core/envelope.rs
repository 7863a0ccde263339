use crate::core::error::{ErrorKind, SourceError};
use crate::core::models::BrokerId;
use serde::Serialize;

/// Status of one broker for one aggregation request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BrokerAvailability {
    pub broker: BrokerId,
    pub enabled: bool,
    pub queried: bool,
    pub succeeded: bool,
    /// False when the broker answered that it has nothing for this capability.
    pub contributed: bool,
    pub error_kind: Option<ErrorKind>,
    pub error: Option<String>,
}

impl BrokerAvailability {
    pub fn disabled(broker: BrokerId) -> Self {
        BrokerAvailability {
            broker,
            enabled: false,
            queried: false,
            succeeded: false,
            contributed: false,
            error_kind: None,
            error: None,
        }
    }

    pub fn succeeded(broker: BrokerId) -> Self {
        BrokerAvailability {
            broker,
            enabled: true,
            queried: true,
            succeeded: true,
            contributed: true,
            error_kind: None,
            error: None,
        }
    }

    pub fn not_supported(broker: BrokerId) -> Self {
        BrokerAvailability {
            contributed: false,
            ..Self::succeeded(broker)
        }
    }

    pub fn failed(broker: BrokerId, error: &SourceError) -> Self {
        BrokerAvailability {
            broker,
            enabled: true,
            queried: true,
            succeeded: false,
            contributed: false,
            error_kind: Some(error.kind()),
            error: Some(error.to_string()),
        }
    }

    pub fn is_failed(&self) -> bool {
        self.queried && !self.succeeded
    }
}

/// Merged data together with the status of every broker that was considered.
#[derive(Debug, Clone, Serialize)]
pub struct ResultEnvelope<T> {
    pub data: T,
    pub availability: Vec<BrokerAvailability>,
}

impl<T> ResultEnvelope<T> {
    pub fn new(data: T, availability: Vec<BrokerAvailability>) -> Self {
        ResultEnvelope { data, availability }
    }

    /// True when at least one queried broker failed.
    pub fn is_partial(&self) -> bool {
        self.availability.iter().any(BrokerAvailability::is_failed)
    }

    pub fn failed_brokers(&self) -> impl Iterator<Item = &BrokerAvailability> {
        self.availability.iter().filter(|a| a.is_failed())
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ResultEnvelope<U> {
        ResultEnvelope {
            data: f(self.data),
            availability: self.availability,
        }
    }
}
