//! Broker data read from an exported statement file.

use crate::core::error::{SourceError, SourceResult};
use crate::core::models::{
    AccountOverview, BrokerId, Deposit, Dividend, Fee, PortfolioEntry, Transaction, stamp_all,
};
use crate::core::source::SourceService;
use async_trait::async_trait;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::debug;

/// Contents of a statement file. A missing section means the broker does
/// not report that kind of data.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BrokerStatement {
    pub portfolio: Option<Vec<PortfolioEntry>>,
    pub transactions: Option<Vec<Transaction>>,
    pub deposits: Option<Vec<Deposit>>,
    pub dividends: Option<Vec<Dividend>>,
    pub fees: Option<Vec<Fee>>,
    pub overview: Option<AccountOverview>,
}

pub struct StatementSource {
    statement: BrokerStatement,
}

impl StatementSource {
    /// Reads and parses `path`, blocking the calling thread. YAML and JSON
    /// are both accepted.
    pub fn load(broker: &BrokerId, path: &Path) -> SourceResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            SourceError::Unavailable(format!(
                "Failed to read statement file {}: {e}",
                path.display()
            ))
        })?;
        let statement: BrokerStatement = serde_yaml::from_str(&content).map_err(|e| {
            SourceError::Unavailable(format!(
                "Failed to parse statement file {}: {e}",
                path.display()
            ))
        })?;
        debug!(%broker, path = %path.display(), "Loaded statement");
        Ok(Self::new(broker, statement))
    }

    /// Wraps an in-memory statement, stamping every record with `broker`.
    pub fn new(broker: &BrokerId, statement: BrokerStatement) -> Self {
        let statement = BrokerStatement {
            portfolio: statement.portfolio.map(|r| stamp_all(r, broker)),
            transactions: statement.transactions.map(|r| stamp_all(r, broker)),
            deposits: statement.deposits.map(|r| stamp_all(r, broker)),
            dividends: statement.dividends.map(|r| stamp_all(r, broker)),
            fees: statement.fees.map(|r| stamp_all(r, broker)),
            overview: statement.overview,
        };
        StatementSource { statement }
    }
}

fn section<T: Clone>(records: &Option<T>) -> SourceResult<T> {
    records.clone().ok_or(SourceError::NotSupported)
}

#[async_trait]
impl SourceService for StatementSource {
    async fn portfolio(&self) -> SourceResult<Vec<PortfolioEntry>> {
        section(&self.statement.portfolio)
    }

    async fn transactions(&self) -> SourceResult<Vec<Transaction>> {
        section(&self.statement.transactions)
    }

    async fn deposits(&self) -> SourceResult<Vec<Deposit>> {
        section(&self.statement.deposits)
    }

    async fn dividends(&self) -> SourceResult<Vec<Dividend>> {
        section(&self.statement.dividends)
    }

    async fn fees(&self) -> SourceResult<Vec<Fee>> {
        section(&self.statement.fees)
    }

    async fn account_overview(&self) -> SourceResult<AccountOverview> {
        section(&self.statement.overview)
    }
}
