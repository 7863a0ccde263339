//! Core business logic abstractions

pub mod aggregator;
pub mod allocation;
pub mod cache;
pub mod capability;
pub mod config;
pub mod currency;
pub mod envelope;
pub mod error;
pub mod factory;
pub mod log;
pub mod merge;
pub mod models;
pub mod registry;
pub mod service;
pub mod source;

// Re-export main types for cleaner imports
pub use capability::Capability;
pub use currency::CurrencyRateProvider;
pub use envelope::{BrokerAvailability, ResultEnvelope};
pub use error::{AggregationError, SourceError};
pub use models::{BrokerId, PortfolioSelector};
pub use service::PortfolioService;
pub use source::SourceService;
