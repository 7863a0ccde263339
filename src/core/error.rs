//! Error types of the aggregation core.
//!
//! Failures of a single broker are [`SourceError`]s. The aggregator never
//! propagates them; they end up in the availability list of the result.
//! Only [`AggregationError`] reaches the caller, and only for requests that
//! cannot be served by any broker.

use crate::core::capability::Capability;
use crate::core::models::BrokerId;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SourceError {
    #[error("Connection to broker failed: {0}")]
    Connection(String),

    #[error("Authentication with broker failed: {0}")]
    Authentication(String),

    #[error("Capability is not supported by this broker")]
    NotSupported,

    #[error("Broker returned an invalid response: {0}")]
    InvalidResponse(String),

    #[error("Broker source could not be constructed: {0}")]
    Unavailable(String),

    #[error("Broker query timed out after {0:?}")]
    Timeout(Duration),

    #[error("Currency conversion failed: {0}")]
    Conversion(String),

    #[error("Broker query panicked: {0}")]
    Panicked(String),
}

impl SourceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SourceError::Connection(_) => ErrorKind::Connection,
            SourceError::Authentication(_) => ErrorKind::Authentication,
            SourceError::NotSupported => ErrorKind::NotSupported,
            SourceError::InvalidResponse(_) => ErrorKind::InvalidResponse,
            SourceError::Unavailable(_) => ErrorKind::Unavailable,
            SourceError::Timeout(_) => ErrorKind::Timeout,
            SourceError::Conversion(_) => ErrorKind::Conversion,
            SourceError::Panicked(_) => ErrorKind::Panicked,
        }
    }
}

/// Serializable classification of a [`SourceError`] for availability reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Connection,
    Authentication,
    NotSupported,
    InvalidResponse,
    Unavailable,
    Timeout,
    Conversion,
    Panicked,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                ErrorKind::Connection => "connection error",
                ErrorKind::Authentication => "authentication error",
                ErrorKind::NotSupported => "not supported",
                ErrorKind::InvalidResponse => "invalid response",
                ErrorKind::Unavailable => "unavailable",
                ErrorKind::Timeout => "timeout",
                ErrorKind::Conversion => "currency conversion error",
                ErrorKind::Panicked => "internal error",
            }
        )
    }
}

/// Request-level configuration errors. These are the only failures
/// surfaced to the caller of an aggregation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AggregationError {
    #[error("Unknown broker: {0}")]
    UnknownBroker(BrokerId),

    #[error("Broker {0} is disabled in configuration")]
    BrokerDisabled(BrokerId),

    #[error("Broker {broker} does not support {capability}")]
    CapabilityNotSupported {
        broker: BrokerId,
        capability: Capability,
    },

    #[error("No enabled broker supports {0}")]
    NoEligibleBrokers(Capability),
}

pub type SourceResult<T> = std::result::Result<T, SourceError>;
