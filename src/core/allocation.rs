//! Breakdown of holdings by product type.
use crate::core::currency::{CurrencyRateProvider, convert};
use crate::core::models::{PortfolioEntry, ProductType};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AllocationSlice {
    pub product_type: ProductType,
    pub value: Decimal,
    pub weight_pct: Decimal,
    pub holdings: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Allocation {
    pub currency: String,
    pub total_value: Decimal,
    pub slices: Vec<AllocationSlice>,
    /// Holdings left out because their value could not be converted, with the reason.
    pub unallocated: Vec<(String, String)>,
}

/// Groups holdings by product type, with every value converted into
/// `target_currency`.
pub async fn calculate_allocation(
    entries: &[PortfolioEntry],
    currency_provider: &dyn CurrencyRateProvider,
    target_currency: &str,
) -> Allocation {
    let mut by_type: BTreeMap<ProductType, (Decimal, usize)> = BTreeMap::new();
    let mut unallocated = Vec::new();

    for entry in entries {
        match convert(
            currency_provider,
            entry.current_value,
            &entry.currency,
            target_currency,
        )
        .await
        {
            Ok(value) => {
                let slot = by_type.entry(entry.product_type).or_default();
                slot.0 += value;
                slot.1 += 1;
            }
            Err(e) => {
                debug!("Currency conversion error for {}: {}", entry.symbol, e);
                unallocated.push((entry.symbol.clone(), e.to_string()));
            }
        }
    }

    let total_value: Decimal = by_type.values().map(|(value, _)| *value).sum();
    let slices = by_type
        .into_iter()
        .map(|(product_type, (value, holdings))| AllocationSlice {
            product_type,
            value,
            weight_pct: if total_value.is_zero() {
                Decimal::ZERO
            } else {
                value / total_value * Decimal::ONE_HUNDRED
            },
            holdings,
        })
        .collect();

    Allocation {
        currency: target_currency.to_string(),
        total_value,
        slices,
        unallocated,
    }
}
