//! Currency conversion abstractions

use crate::core::error::{SourceError, SourceResult};
use crate::core::models::{AccountOverview, TimeSeriesPoint, TotalPortfolio};
use anyhow::Result;
use async_trait::async_trait;
use rust_decimal::Decimal;
use tracing::debug;

#[async_trait]
pub trait CurrencyRateProvider: Send + Sync {
    async fn get_rate(&self, from: &str, to: &str) -> Result<Decimal>;
}

/// Converts `value` from `from` into `to`. Same-currency values are returned
/// unchanged without consulting the provider.
pub async fn convert(
    provider: &dyn CurrencyRateProvider,
    value: Decimal,
    from: &str,
    to: &str,
) -> Result<Decimal> {
    if from == to {
        return Ok(value);
    }
    let rate = provider.get_rate(from, to).await?;
    debug!("Converted {value} from {from} to {to} at rate {rate}");
    Ok(value * rate)
}

/// Restates a broker's account overview in `base_currency`, so overviews of
/// different brokers can be merged.
pub async fn normalize_overview(
    overview: AccountOverview,
    base_currency: &str,
    provider: &dyn CurrencyRateProvider,
) -> SourceResult<AccountOverview> {
    let from = overview.total.currency.as_str();
    if from == base_currency {
        return Ok(overview);
    }

    let rate = provider.get_rate(from, base_currency).await.map_err(|e| {
        SourceError::Conversion(format!(
            "Currency conversion failed from {from} to {base_currency}: {e}"
        ))
    })?;
    debug!("Normalizing overview from {from} to {base_currency} at rate {rate}");

    let scale = |points: Vec<TimeSeriesPoint>| -> Vec<TimeSeriesPoint> {
        points
            .into_iter()
            .map(|p| TimeSeriesPoint::new(p.date, p.value * rate))
            .collect()
    };

    // The percentage is a ratio of two amounts in the same currency.
    Ok(AccountOverview {
        total: TotalPortfolio {
            total_value: overview.total.total_value * rate,
            total_gain_loss: overview.total.total_gain_loss * rate,
            total_gain_loss_pct: overview.total.total_gain_loss_pct,
            currency: base_currency.to_string(),
        },
        value_history: scale(overview.value_history),
        cash_history: scale(overview.cash_history),
    })
}
