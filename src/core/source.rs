//! Data-access boundary to a single broker.

use crate::core::error::{SourceError, SourceResult};
use crate::core::models::{AccountOverview, Deposit, Dividend, Fee, PortfolioEntry, Transaction};
use async_trait::async_trait;

/// Uniform accessor for one broker's data. Every capability defaults to
/// `NotSupported`, so an integration only implements what it can supply.
#[async_trait]
pub trait SourceService: Send + Sync {
    async fn portfolio(&self) -> SourceResult<Vec<PortfolioEntry>> {
        Err(SourceError::NotSupported)
    }

    async fn transactions(&self) -> SourceResult<Vec<Transaction>> {
        Err(SourceError::NotSupported)
    }

    async fn deposits(&self) -> SourceResult<Vec<Deposit>> {
        Err(SourceError::NotSupported)
    }

    async fn dividends(&self) -> SourceResult<Vec<Dividend>> {
        Err(SourceError::NotSupported)
    }

    async fn fees(&self) -> SourceResult<Vec<Fee>> {
        Err(SourceError::NotSupported)
    }

    async fn account_overview(&self) -> SourceResult<AccountOverview> {
        Err(SourceError::NotSupported)
    }
}
