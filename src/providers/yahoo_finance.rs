use anyhow::{Result, anyhow};
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};

use crate::core::cache::Cache;
use crate::core::currency::CurrencyRateProvider;
use crate::providers::util::with_retry;

// YahooCurrencyProvider implementation for CurrencyRateProvider
pub struct YahooCurrencyProvider {
    base_url: String,
    client: reqwest::Client,
    cache: Arc<Cache<String, Decimal>>,
}

impl YahooCurrencyProvider {
    pub fn new(base_url: &str, cache: Arc<Cache<String, Decimal>>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("brokerfold/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(YahooCurrencyProvider {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            cache,
        })
    }

    async fn fetch_rate(&self, symbol: &str) -> Result<Decimal> {
        let url = format!("{}/v8/finance/chart/{symbol}", self.base_url);
        debug!("Requesting currency rate from {}", url);

        let response = with_retry(
            || self.client.get(&url).send(),
            2,
            Duration::from_millis(200),
        )
        .await
        .map_err(|e| anyhow!("Request error: {} for currency pair: {}", e, symbol))?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "HTTP error: {} for currency pair: {}",
                response.status(),
                symbol
            ));
        }

        let text = response.text().await?;

        let data: YahooCurrencyResponse = serde_json::from_str(&text)
            .map_err(|e| anyhow!("Failed to parse JSON response for {}: {}", symbol, e))?;

        let item = data
            .chart
            .result
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("No rate data found for currency pair: {}", symbol))?;

        Decimal::try_from(item.meta.regular_market_price)
            .map_err(|e| anyhow!("Invalid rate for currency pair {}: {}", symbol, e))
    }
}

#[derive(Debug, Deserialize)]
struct YahooCurrencyResponse {
    chart: CurrencyChartResult,
}

#[derive(Debug, Deserialize)]
struct CurrencyChartResult {
    result: Vec<CurrencyChartItem>,
}

#[derive(Debug, Deserialize)]
struct CurrencyChartItem {
    meta: CurrencyChartMeta,
}

#[derive(Debug, Deserialize)]
struct CurrencyChartMeta {
    #[serde(alias = "regularMarketPrice")]
    regular_market_price: f64,
}

#[async_trait]
impl CurrencyRateProvider for YahooCurrencyProvider {
    #[instrument(name = "YahooRateFetch", skip(self))]
    async fn get_rate(&self, from: &str, to: &str) -> Result<Decimal> {
        let symbol = format!("{from}{to}=X");
        self.cache
            .get_or_try_insert_with(&symbol, || self.fetch_rate(&symbol))
            .await
    }
}
