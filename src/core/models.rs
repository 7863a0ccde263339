//! Financial records exchanged between broker sources and the merge engine.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;

/// Identifier of a configured broker, e.g. `degiro` or `kraken`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BrokerId(String);

impl BrokerId {
    pub fn new(id: impl Into<String>) -> Self {
        BrokerId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for BrokerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BrokerId {
    fn from(s: &str) -> Self {
        BrokerId(s.to_string())
    }
}

/// Scope of an aggregation request.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PortfolioSelector {
    #[default]
    All,
    Broker(BrokerId),
}

impl Display for PortfolioSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PortfolioSelector::All => f.write_str("all"),
            PortfolioSelector::Broker(id) => write!(f, "{id}"),
        }
    }
}

impl FromStr for PortfolioSelector {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("all") {
            Ok(PortfolioSelector::All)
        } else {
            Ok(PortfolioSelector::Broker(BrokerId::new(s)))
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductType {
    Stock,
    Etf,
    Crypto,
    Bond,
    #[serde(other)]
    Other,
}

impl ProductType {
    pub fn label(&self) -> &'static str {
        match self {
            ProductType::Stock => "Stock",
            ProductType::Etf => "ETF",
            ProductType::Crypto => "Crypto",
            ProductType::Bond => "Bond",
            ProductType::Other => "Other",
        }
    }
}

/// One held position.
///
/// A record produced by a broker source has exactly one entry in `sources`.
/// A record produced by a merge lists every broker that contributed to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioEntry {
    pub symbol: String,
    #[serde(default)]
    pub display_name: String,
    pub quantity: Decimal,
    pub break_even_price: Decimal,
    #[serde(default)]
    pub current_price: Option<Decimal>,
    #[serde(default)]
    pub current_value: Decimal,
    pub currency: String,
    #[serde(default = "default_product_type")]
    pub product_type: ProductType,
    #[serde(default)]
    pub unrealized_gain: Decimal,
    #[serde(default)]
    pub realized_gain: Decimal,
    #[serde(default)]
    pub sources: Vec<BrokerId>,
    /// Set when the merged quantity is zero and the break-even price could not be averaged.
    #[serde(default)]
    pub zero_quantity: bool,
}

fn default_product_type() -> ProductType {
    ProductType::Other
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TotalPortfolio {
    pub total_value: Decimal,
    pub total_gain_loss: Decimal,
    /// Percentage, e.g. `3.45` for 3.45%.
    #[serde(default)]
    pub total_gain_loss_pct: Decimal,
    pub currency: String,
}

impl TotalPortfolio {
    pub fn new(total_value: Decimal, total_gain_loss: Decimal, currency: &str) -> Self {
        TotalPortfolio {
            total_value,
            total_gain_loss,
            total_gain_loss_pct: gain_loss_pct(total_value, total_gain_loss),
            currency: currency.to_string(),
        }
    }
}

/// Gain relative to the invested amount (`value - gain`), as a percentage.
pub fn gain_loss_pct(total_value: Decimal, total_gain_loss: Decimal) -> Decimal {
    let invested = total_value - total_gain_loss;
    if invested.is_zero() {
        return Decimal::ZERO;
    }
    total_gain_loss / invested * Decimal::ONE_HUNDRED
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSeriesPoint {
    pub date: NaiveDate,
    pub value: Decimal,
}

impl TimeSeriesPoint {
    pub fn new(date: NaiveDate, value: Decimal) -> Self {
        TimeSeriesPoint { date, value }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountOverview {
    pub total: TotalPortfolio,
    #[serde(default)]
    pub value_history: Vec<TimeSeriesPoint>,
    #[serde(default)]
    pub cash_history: Vec<TimeSeriesPoint>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Buy,
    Sell,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub date: NaiveDate,
    pub symbol: String,
    pub kind: TransactionKind,
    #[serde(default)]
    pub quantity: Decimal,
    #[serde(default)]
    pub price: Decimal,
    pub amount: Decimal,
    pub currency: String,
    #[serde(default)]
    pub source_broker: Option<BrokerId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deposit {
    pub date: NaiveDate,
    pub amount: Decimal,
    pub currency: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub source_broker: Option<BrokerId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dividend {
    pub date: NaiveDate,
    pub symbol: String,
    pub amount: Decimal,
    pub currency: String,
    #[serde(default)]
    pub source_broker: Option<BrokerId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fee {
    pub date: NaiveDate,
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    pub amount: Decimal,
    pub currency: String,
    #[serde(default)]
    pub source_broker: Option<BrokerId>,
}

/// Stamps provenance on records read from a single broker.
pub trait Provenance {
    fn stamp(&mut self, broker: &BrokerId);
}

impl Provenance for PortfolioEntry {
    fn stamp(&mut self, broker: &BrokerId) {
        self.sources = vec![broker.clone()];
    }
}

macro_rules! impl_event_provenance {
    ($($ty:ty),*) => {
        $(impl Provenance for $ty {
            fn stamp(&mut self, broker: &BrokerId) {
                self.source_broker = Some(broker.clone());
            }
        })*
    };
}

impl_event_provenance!(Transaction, Deposit, Dividend, Fee);

pub fn stamp_all<T: Provenance>(mut records: Vec<T>, broker: &BrokerId) -> Vec<T> {
    for record in &mut records {
        record.stamp(broker);
    }
    records
}
