//! Entry points combining aggregation and merge per capability.

use crate::core::aggregator::Aggregator;
use crate::core::allocation::{Allocation, calculate_allocation};
use crate::core::capability::Capability;
use crate::core::currency::{CurrencyRateProvider, normalize_overview};
use crate::core::envelope::ResultEnvelope;
use crate::core::error::AggregationError;
use crate::core::merge;
use crate::core::models::{
    AccountOverview, Deposit, Dividend, Fee, PortfolioEntry, PortfolioSelector, TotalPortfolio,
    Transaction,
};
use std::sync::Arc;

pub type ServiceResult<T> = Result<ResultEnvelope<T>, AggregationError>;

/// Consolidated view over every registered broker.
///
/// Holdings and overviews from fewer than two brokers are returned as the
/// broker sent them; merging only happens when at least two brokers answered.
/// Event lists are always sorted newest first.
pub struct PortfolioService {
    aggregator: Aggregator,
    currency_provider: Arc<dyn CurrencyRateProvider>,
    base_currency: String,
}

impl PortfolioService {
    pub fn new(
        aggregator: Aggregator,
        currency_provider: Arc<dyn CurrencyRateProvider>,
        base_currency: &str,
    ) -> Self {
        Self {
            aggregator,
            currency_provider,
            base_currency: base_currency.to_string(),
        }
    }

    pub fn aggregator(&self) -> &Aggregator {
        &self.aggregator
    }

    pub async fn portfolio(&self, selector: &PortfolioSelector) -> ServiceResult<Vec<PortfolioEntry>> {
        let collected = self
            .aggregator
            .collect(Capability::Portfolio, selector, |source| async move {
                source.portfolio().await
            })
            .await?;
        let (per_broker, availability) = collected.into_values();
        let data = merge_or_bypass(per_broker, Vec::new, merge::merge_portfolio_entries);
        Ok(ResultEnvelope::new(data, availability))
    }

    /// Account overview of the selected brokers in the base currency.
    pub async fn account_overview(
        &self,
        selector: &PortfolioSelector,
    ) -> ServiceResult<Option<AccountOverview>> {
        let rates = Arc::clone(&self.currency_provider);
        let base_currency = self.base_currency.clone();
        let collected = self
            .aggregator
            .collect(Capability::AccountOverview, selector, move |source| {
                let rates = Arc::clone(&rates);
                let base_currency = base_currency.clone();
                async move {
                    let overview = source.account_overview().await?;
                    normalize_overview(overview, &base_currency, rates.as_ref()).await
                }
            })
            .await?;
        let (per_broker, availability) = collected.into_values();
        let data = merge_or_bypass(per_broker, || None, merge::merge_overviews);
        Ok(ResultEnvelope::new(data, availability))
    }

    pub async fn totals(&self, selector: &PortfolioSelector) -> ServiceResult<Option<TotalPortfolio>> {
        let overview = self.account_overview(selector).await?;
        Ok(overview.map(|o| o.map(|o| o.total)))
    }

    pub async fn transactions(&self, selector: &PortfolioSelector) -> ServiceResult<Vec<Transaction>> {
        let collected = self
            .aggregator
            .collect(Capability::Transactions, selector, |source| async move {
                source.transactions().await
            })
            .await?;
        let (per_broker, availability) = collected.into_values();
        let data = newest_first(per_broker, |t: &Transaction| t.date);
        Ok(ResultEnvelope::new(data, availability))
    }

    pub async fn deposits(&self, selector: &PortfolioSelector) -> ServiceResult<Vec<Deposit>> {
        let collected = self
            .aggregator
            .collect(Capability::Deposits, selector, |source| async move {
                source.deposits().await
            })
            .await?;
        let (per_broker, availability) = collected.into_values();
        let data = newest_first(per_broker, |d: &Deposit| d.date);
        Ok(ResultEnvelope::new(data, availability))
    }

    pub async fn dividends(&self, selector: &PortfolioSelector) -> ServiceResult<Vec<Dividend>> {
        let collected = self
            .aggregator
            .collect(Capability::Dividends, selector, |source| async move {
                source.dividends().await
            })
            .await?;
        let (per_broker, availability) = collected.into_values();
        let data = newest_first(per_broker, |d: &Dividend| d.date);
        Ok(ResultEnvelope::new(data, availability))
    }

    pub async fn fees(&self, selector: &PortfolioSelector) -> ServiceResult<Vec<Fee>> {
        let collected = self
            .aggregator
            .collect(Capability::Fees, selector, |source| async move {
                source.fees().await
            })
            .await?;
        let (per_broker, availability) = collected.into_values();
        let data = newest_first(per_broker, |f: &Fee| f.date);
        Ok(ResultEnvelope::new(data, availability))
    }

    /// Merged holdings grouped by product type, valued in the base currency.
    pub async fn allocation(&self, selector: &PortfolioSelector) -> ServiceResult<Allocation> {
        let portfolio = self.portfolio(selector).await?;
        let allocation = calculate_allocation(
            &portfolio.data,
            self.currency_provider.as_ref(),
            &self.base_currency,
        )
        .await;
        Ok(portfolio.map(|_| allocation))
    }
}

/// Applies `merge` only when two or more brokers answered.
fn merge_or_bypass<T, U>(
    mut per_broker: Vec<T>,
    empty: impl FnOnce() -> U,
    merge: impl FnOnce(&[T]) -> U,
) -> U
where
    U: From<T>,
{
    match per_broker.len() {
        0 => empty(),
        1 => U::from(per_broker.remove(0)),
        _ => merge(&per_broker),
    }
}

/// Event lists, newest first, however many brokers answered.
fn newest_first<T, K: Ord>(per_broker: Vec<Vec<T>>, date: impl Fn(&T) -> K) -> Vec<T> {
    merge::concatenate_and_sort(per_broker, date, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::BrokerSettings;
    use crate::core::currency::tests::MockCurrencyProvider;
    use crate::core::error::{SourceError, SourceResult};
    use crate::core::factory::SourceFactory;
    use crate::core::models::{BrokerId, ProductType, TimeSeriesPoint};
    use crate::core::registry::BrokerRegistry;
    use crate::core::source::SourceService;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use std::collections::HashSet;
    use std::time::Duration;

    struct Broker {
        id: BrokerId,
        holdings: Vec<(&'static str, Decimal, Decimal)>,
        overview: Option<TotalPortfolio>,
        deposits: Vec<(u32, Decimal)>,
        down: bool,
    }

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    #[async_trait]
    impl SourceService for Broker {
        async fn portfolio(&self) -> SourceResult<Vec<PortfolioEntry>> {
            if self.down {
                return Err(SourceError::Connection("broker offline".to_string()));
            }
            Ok(self
                .holdings
                .iter()
                .map(|(symbol, quantity, price)| PortfolioEntry {
                    symbol: symbol.to_string(),
                    display_name: String::new(),
                    quantity: *quantity,
                    break_even_price: *price,
                    current_price: Some(*price),
                    current_value: *quantity * *price,
                    currency: "EUR".to_string(),
                    product_type: ProductType::Stock,
                    unrealized_gain: Decimal::ZERO,
                    realized_gain: Decimal::ZERO,
                    sources: vec![self.id.clone()],
                    zero_quantity: false,
                })
                .collect())
        }

        async fn deposits(&self) -> SourceResult<Vec<Deposit>> {
            Ok(self
                .deposits
                .iter()
                .map(|(day, amount)| Deposit {
                    date: date(*day),
                    amount: *amount,
                    currency: "EUR".to_string(),
                    description: None,
                    source_broker: Some(self.id.clone()),
                })
                .collect())
        }

        async fn account_overview(&self) -> SourceResult<AccountOverview> {
            let total = self.overview.clone().ok_or(SourceError::NotSupported)?;
            Ok(AccountOverview {
                value_history: vec![TimeSeriesPoint::new(date(1), total.total_value)],
                cash_history: Vec::new(),
                total,
            })
        }
    }

    fn service(brokers: Vec<Broker>) -> PortfolioService {
        let mut registry = BrokerRegistry::new();
        let mut enabled = HashSet::new();
        for broker in brokers {
            let id = broker.id.clone();
            enabled.insert(id.clone());
            let source: Arc<dyn SourceService> = Arc::new(broker);
            registry.register(id.clone(), id.as_str(), Capability::ALL, move |_, _| {
                Ok(Arc::clone(&source))
            });
        }
        let settings: Arc<dyn BrokerSettings> = Arc::new(enabled);
        let factory = SourceFactory::new(Arc::new(registry), settings, None);
        let rates = MockCurrencyProvider::new().with_rate("USD", "EUR", dec!(0.5));
        PortfolioService::new(
            Aggregator::new(Arc::new(factory), Duration::from_secs(5)),
            Arc::new(rates),
            "EUR",
        )
    }

    fn broker(id: &str) -> Broker {
        Broker {
            id: BrokerId::new(id),
            holdings: Vec::new(),
            overview: None,
            deposits: Vec::new(),
            down: false,
        }
    }

    #[tokio::test]
    async fn test_portfolio_merges_across_brokers() {
        let service = service(vec![
            Broker {
                holdings: vec![("ASML", dec!(10), dec!(100)), ("NVDA", dec!(1), dec!(90))],
                ..broker("degiro")
            },
            Broker {
                holdings: vec![("ASML", dec!(5), dec!(130))],
                ..broker("trading212")
            },
            Broker {
                down: true,
                ..broker("bitvavo")
            },
        ]);

        let envelope = service.portfolio(&PortfolioSelector::All).await.unwrap();

        assert_eq!(envelope.data.len(), 2);
        let asml = &envelope.data[0];
        assert_eq!(asml.quantity, dec!(15));
        assert_eq!(asml.break_even_price, dec!(110));
        assert_eq!(asml.current_value, dec!(1500));
        assert!(envelope.is_partial());
        let failed: Vec<_> = envelope.failed_brokers().map(|a| a.broker.as_str()).collect();
        assert_eq!(failed, vec!["bitvavo"]);
    }

    #[tokio::test]
    async fn test_single_broker_selector_bypasses_merge() {
        let service = service(vec![
            Broker {
                holdings: vec![("ASML", dec!(1), dec!(100)), ("ASML", dec!(2), dec!(130))],
                ..broker("degiro")
            },
            Broker {
                holdings: vec![("ASML", dec!(5), dec!(130))],
                ..broker("trading212")
            },
        ]);

        let envelope = service
            .portfolio(&PortfolioSelector::Broker(BrokerId::new("degiro")))
            .await
            .unwrap();

        assert_eq!(envelope.data.len(), 2);
        assert_eq!(envelope.data[1].break_even_price, dec!(130));
        assert!(!envelope.is_partial());
    }

    #[tokio::test]
    async fn test_totals_are_normalized_then_merged() {
        let service = service(vec![
            Broker {
                overview: Some(TotalPortfolio::new(dec!(1000), dec!(100), "EUR")),
                ..broker("degiro")
            },
            Broker {
                overview: Some(TotalPortfolio::new(dec!(1000), dec!(-100), "USD")),
                ..broker("kraken")
            },
            Broker {
                overview: Some(TotalPortfolio::new(dec!(1000), dec!(0), "JPY")),
                ..broker("bitvavo")
            },
            broker("trading212"),
        ]);

        let envelope = service.totals(&PortfolioSelector::All).await.unwrap();
        let totals = envelope.data.unwrap();

        assert_eq!(totals.currency, "EUR");
        assert_eq!(totals.total_value, dec!(1500));
        assert_eq!(totals.total_gain_loss, dec!(50));
        assert_eq!(totals.total_gain_loss_pct.round_dp(2), dec!(3.45));

        let bitvavo = &envelope.availability[2];
        assert_eq!(
            bitvavo.error_kind,
            Some(crate::core::error::ErrorKind::Conversion)
        );
        let trading212 = &envelope.availability[3];
        assert!(trading212.succeeded);
        assert!(!trading212.contributed);
    }

    #[tokio::test]
    async fn test_deposits_are_concatenated_newest_first() {
        let service = service(vec![
            Broker {
                deposits: vec![(1, dec!(100)), (3, dec!(300))],
                ..broker("degiro")
            },
            Broker {
                deposits: vec![(2, dec!(200))],
                ..broker("kraken")
            },
        ]);

        let envelope = service.deposits(&PortfolioSelector::All).await.unwrap();
        let amounts: Vec<_> = envelope.data.iter().map(|d| d.amount).collect();

        assert_eq!(amounts, vec![dec!(300), dec!(200), dec!(100)]);
    }

    #[tokio::test]
    async fn test_single_broker_deposits_are_newest_first() {
        let service = service(vec![
            Broker {
                deposits: vec![(1, dec!(100)), (3, dec!(300))],
                ..broker("degiro")
            },
            Broker {
                deposits: vec![(2, dec!(200))],
                ..broker("kraken")
            },
        ]);

        let envelope = service
            .deposits(&PortfolioSelector::Broker(BrokerId::new("degiro")))
            .await
            .unwrap();
        let amounts: Vec<_> = envelope.data.iter().map(|d| d.amount).collect();

        assert_eq!(amounts, vec![dec!(300), dec!(100)]);
    }

    #[tokio::test]
    async fn test_allocation_uses_merged_portfolio() {
        let service = service(vec![
            Broker {
                holdings: vec![("ASML", dec!(1), dec!(100))],
                ..broker("degiro")
            },
            Broker {
                holdings: vec![("ASML", dec!(1), dec!(300))],
                ..broker("trading212")
            },
        ]);

        let envelope = service.allocation(&PortfolioSelector::All).await.unwrap();

        assert_eq!(envelope.data.total_value, dec!(200));
        assert_eq!(envelope.data.slices[0].holdings, 1);
        assert_eq!(envelope.availability.len(), 2);
    }

    #[tokio::test]
    async fn test_configuration_errors_propagate() {
        let service = service(vec![broker("degiro")]);
        let result = service
            .portfolio(&PortfolioSelector::Broker(BrokerId::new("unknown")))
            .await;
        assert!(matches!(result, Err(AggregationError::UnknownBroker(_))));
    }
}
