//! Brokers reachable over a JSON HTTP API.
//!
//! Each capability maps to `GET {base_url}/{endpoint}`; see
//! [`Capability::endpoint`].

use crate::core::capability::Capability;
use crate::core::error::{SourceError, SourceResult};
use crate::core::models::{
    AccountOverview, BrokerId, Deposit, Dividend, Fee, PortfolioEntry, Transaction, stamp_all,
};
use crate::core::source::SourceService;
use crate::providers::util::with_retry;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, instrument};

const RETRIES: usize = 2;
const RETRY_DELAY: Duration = Duration::from_millis(200);

pub struct HttpBrokerSource {
    broker: BrokerId,
    base_url: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl HttpBrokerSource {
    pub fn new(broker: &BrokerId, base_url: &str, api_key: Option<String>) -> SourceResult<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("brokerfold/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| SourceError::Unavailable(format!("Failed to build HTTP client: {e}")))?;
        Ok(HttpBrokerSource {
            broker: broker.clone(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            client,
        })
    }

    #[instrument(name = "BrokerFetch", skip(self), fields(broker = %self.broker))]
    async fn fetch<T: DeserializeOwned>(&self, capability: Capability) -> SourceResult<T> {
        let url = format!("{}/{}", self.base_url, capability.endpoint());
        debug!("Requesting {}", url);

        let response = with_retry(
            || {
                let request = match &self.api_key {
                    Some(key) => self.client.get(&url).bearer_auth(key),
                    None => self.client.get(&url),
                };
                request.send()
            },
            RETRIES,
            RETRY_DELAY,
        )
        .await
        .map_err(|e| SourceError::Connection(format!("Request error: {e} for URL: {url}")))?;

        let status = response.status();
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(SourceError::Authentication(format!(
                    "{} rejected the credentials: {status}",
                    self.broker
                )));
            }
            StatusCode::NOT_FOUND | StatusCode::NOT_IMPLEMENTED => {
                return Err(SourceError::NotSupported);
            }
            _ if !status.is_success() => {
                return Err(SourceError::Connection(format!(
                    "HTTP error: {status} for URL: {url}"
                )));
            }
            _ => {}
        }

        let text = response
            .text()
            .await
            .map_err(|e| SourceError::Connection(format!("Failed to read response: {e}")))?;

        serde_json::from_str(&text).map_err(|e| {
            SourceError::InvalidResponse(format!("Failed to parse JSON response from {url}: {e}"))
        })
    }
}

#[async_trait]
impl SourceService for HttpBrokerSource {
    async fn portfolio(&self) -> SourceResult<Vec<PortfolioEntry>> {
        let entries = self.fetch(Capability::Portfolio).await?;
        Ok(stamp_all(entries, &self.broker))
    }

    async fn transactions(&self) -> SourceResult<Vec<Transaction>> {
        let records = self.fetch(Capability::Transactions).await?;
        Ok(stamp_all(records, &self.broker))
    }

    async fn deposits(&self) -> SourceResult<Vec<Deposit>> {
        let records = self.fetch(Capability::Deposits).await?;
        Ok(stamp_all(records, &self.broker))
    }

    async fn dividends(&self) -> SourceResult<Vec<Dividend>> {
        let records = self.fetch(Capability::Dividends).await?;
        Ok(stamp_all(records, &self.broker))
    }

    async fn fees(&self) -> SourceResult<Vec<Fee>> {
        let records = self.fetch(Capability::Fees).await?;
        Ok(stamp_all(records, &self.broker))
    }

    async fn account_overview(&self) -> SourceResult<AccountOverview> {
        self.fetch(Capability::AccountOverview).await
    }
}
