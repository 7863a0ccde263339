//! Pure functions combining per-broker results into unified records.
//!
//! Every function takes its inputs in registration order; ties (such as
//! which broker's quote becomes the merged current price) are resolved in
//! favour of the earlier broker. A single input list is returned unchanged.

use crate::core::models::{
    AccountOverview, BrokerId, PortfolioEntry, TimeSeriesPoint, TotalPortfolio,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap};
use tracing::error;

/// Merges holdings by `(symbol, currency)`.
///
/// Quantities and gains are summed, the break-even price is the
/// quantity-weighted average and the current value is recomputed from the
/// merged quantity and the first available quote. Groups whose quantities
/// cancel out get a zero break-even price and are flagged `zero_quantity`.
pub fn merge_portfolio_entries(per_broker: &[Vec<PortfolioEntry>]) -> Vec<PortfolioEntry> {
    if let [single] = per_broker {
        return single.clone();
    }

    let mut order: Vec<(&str, &str)> = Vec::new();
    let mut groups: HashMap<(&str, &str), Vec<&PortfolioEntry>> = HashMap::new();
    for entry in per_broker.iter().flatten() {
        let key = (entry.symbol.as_str(), entry.currency.as_str());
        let group = groups.entry(key).or_default();
        if group.is_empty() {
            order.push(key);
        }
        group.push(entry);
    }

    order
        .into_iter()
        .filter_map(|key| groups.remove(&key))
        .map(|group| match group.as_slice() {
            [single] => (*single).clone(),
            _ => merge_group(&group),
        })
        .collect()
}

fn merge_group(group: &[&PortfolioEntry]) -> PortfolioEntry {
    let first = group[0];
    let quantity: Decimal = group.iter().map(|e| e.quantity).sum();
    let cost: Decimal = group.iter().map(|e| e.quantity * e.break_even_price).sum();
    let zero_quantity = quantity.is_zero();
    let break_even_price = if zero_quantity {
        Decimal::ZERO
    } else {
        cost / quantity
    };

    let current_price = group.iter().find_map(|e| e.current_price);
    let current_value = match current_price {
        Some(price) => quantity * price,
        None => group.iter().map(|e| e.current_value).sum(),
    };

    let display_name = group
        .iter()
        .map(|e| e.display_name.as_str())
        .find(|name| !name.is_empty())
        .unwrap_or_default()
        .to_string();

    let mut sources: Vec<BrokerId> = Vec::new();
    for source in group.iter().flat_map(|e| e.sources.iter()) {
        if !sources.contains(source) {
            sources.push(source.clone());
        }
    }

    PortfolioEntry {
        symbol: first.symbol.clone(),
        display_name,
        quantity,
        break_even_price,
        current_price,
        current_value,
        currency: first.currency.clone(),
        product_type: first.product_type,
        unrealized_gain: group.iter().map(|e| e.unrealized_gain).sum(),
        realized_gain: group.iter().map(|e| e.realized_gain).sum(),
        sources,
        zero_quantity,
    }
}

/// Sums series point-wise over the union of their dates, ascending.
/// A series without a point on some date contributes zero there.
pub fn merge_time_series(per_broker: &[Vec<TimeSeriesPoint>]) -> Vec<TimeSeriesPoint> {
    if let [single] = per_broker {
        return single.clone();
    }

    let mut by_date: BTreeMap<NaiveDate, Decimal> = BTreeMap::new();
    for point in per_broker.iter().flatten() {
        *by_date.entry(point.date).or_default() += point.value;
    }
    by_date
        .into_iter()
        .map(|(date, value)| TimeSeriesPoint::new(date, value))
        .collect()
}

/// Sums value and gain across brokers and recomputes the percentage from
/// the sums. Returns `None` for empty input.
pub fn merge_totals(per_broker: &[TotalPortfolio]) -> Option<TotalPortfolio> {
    match per_broker {
        [] => None,
        [single] => Some(single.clone()),
        _ => {
            let totals = same_currency(per_broker, |t| &t.currency);
            let currency = &totals[0].currency;
            let total_value = totals.iter().map(|t| t.total_value).sum();
            let total_gain_loss = totals.iter().map(|t| t.total_gain_loss).sum();
            Some(TotalPortfolio::new(total_value, total_gain_loss, currency))
        }
    }
}

/// Merges totals and both histories of several account overviews.
pub fn merge_overviews(per_broker: &[AccountOverview]) -> Option<AccountOverview> {
    match per_broker {
        [] => None,
        [single] => Some(single.clone()),
        _ => {
            let overviews = same_currency(per_broker, |o| &o.total.currency);
            let totals: Vec<TotalPortfolio> = overviews.iter().map(|o| o.total.clone()).collect();
            let values: Vec<Vec<TimeSeriesPoint>> =
                overviews.iter().map(|o| o.value_history.clone()).collect();
            let cash: Vec<Vec<TimeSeriesPoint>> =
                overviews.iter().map(|o| o.cash_history.clone()).collect();
            Some(AccountOverview {
                total: merge_totals(&totals)?,
                value_history: merge_time_series(&values),
                cash_history: merge_time_series(&cash),
            })
        }
    }
}

/// Keeps the inputs denominated in the first input's currency. Anything
/// else means currency normalization was skipped upstream; those inputs are
/// logged and dropped. `items` must not be empty.
fn same_currency<'a, T>(items: &'a [T], currency: impl Fn(&T) -> &String) -> Vec<&'a T> {
    let reference = currency(&items[0]);
    items
        .iter()
        .filter(|item| {
            let matches = currency(*item) == reference;
            if !matches {
                error!(
                    expected = %reference,
                    found = %currency(*item),
                    "Merge invariant violated: mixed currencies, excluding input"
                );
            }
            matches
        })
        .collect()
}

/// Concatenates append-only records and stable-sorts them by `key`.
/// Records with equal keys keep their registration order.
pub fn concatenate_and_sort<T, K, F>(per_broker: Vec<Vec<T>>, key: F, descending: bool) -> Vec<T>
where
    K: Ord,
    F: Fn(&T) -> K,
{
    let mut all: Vec<T> = per_broker.into_iter().flatten().collect();
    if descending {
        all.sort_by(|a, b| key(b).cmp(&key(a)));
    } else {
        all.sort_by_key(|item| key(item));
    }
    all
}
