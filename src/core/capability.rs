use anyhow::anyhow;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;

/// Category of financial data a broker may be able to supply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    Portfolio,
    Transactions,
    Deposits,
    Dividends,
    Fees,
    AccountOverview,
}

impl Capability {
    pub const ALL: [Capability; 6] = [
        Capability::Portfolio,
        Capability::Transactions,
        Capability::Deposits,
        Capability::Dividends,
        Capability::Fees,
        Capability::AccountOverview,
    ];

    /// Path segment used by HTTP broker bridges.
    pub fn endpoint(&self) -> &'static str {
        match self {
            Capability::Portfolio => "portfolio",
            Capability::Transactions => "transactions",
            Capability::Deposits => "deposits",
            Capability::Dividends => "dividends",
            Capability::Fees => "fees",
            Capability::AccountOverview => "overview",
        }
    }
}

impl Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Capability::Portfolio => "portfolio",
                Capability::Transactions => "transactions",
                Capability::Deposits => "deposits",
                Capability::Dividends => "dividends",
                Capability::Fees => "fees",
                Capability::AccountOverview => "account_overview",
            }
        )
    }
}

impl FromStr for Capability {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "portfolio" => Ok(Capability::Portfolio),
            "transactions" => Ok(Capability::Transactions),
            "deposits" => Ok(Capability::Deposits),
            "dividends" => Ok(Capability::Dividends),
            "fees" => Ok(Capability::Fees),
            "account_overview" | "overview" => Ok(Capability::AccountOverview),
            _ => Err(anyhow!("Invalid capability: {}", s)),
        }
    }
}
