pub mod cli;
pub mod core;
pub mod providers;

use crate::cli::events::EventKind;
use crate::core::aggregator::Aggregator;
use crate::core::cache::Cache;
use crate::core::config::AppConfig;
use crate::core::factory::SourceFactory;
use crate::core::models::PortfolioSelector;
use crate::core::service::PortfolioService;
use anyhow::Result;
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppCommand {
    Brokers,
    Portfolio,
    Overview,
    Transactions,
    Deposits,
    Dividends,
    Fees,
    Allocation,
}

/// Wires registry, factory, aggregator and currency provider from `config`.
pub fn build_service(config: &AppConfig) -> Result<PortfolioService> {
    let registry = providers::build_registry(config);
    let factory = SourceFactory::new(
        Arc::new(registry),
        Arc::new(config.clone()),
        Some(config.source_cache_ttl()),
    );
    let aggregator = Aggregator::new(Arc::new(factory), config.query_timeout());

    let rate_cache = Arc::new(Cache::with_ttl(Some(config.source_cache_ttl())));
    let currency_provider = providers::yahoo_finance::YahooCurrencyProvider::new(
        config.yahoo_base_url(),
        rate_cache,
    )?;

    Ok(PortfolioService::new(
        aggregator,
        Arc::new(currency_provider),
        &config.currency,
    ))
}

pub async fn run_command(
    command: AppCommand,
    selector: &PortfolioSelector,
    config_path: Option<&str>,
) -> Result<()> {
    info!("brokerfold starting...");

    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    let service = build_service(&config)?;

    match command {
        AppCommand::Brokers => {
            cli::brokers::run(service.aggregator().factory());
            Ok(())
        }
        AppCommand::Portfolio => cli::portfolio::run(&service, selector).await,
        AppCommand::Overview => cli::overview::run(&service, selector).await,
        AppCommand::Transactions => {
            cli::events::run(&service, selector, EventKind::Transactions).await
        }
        AppCommand::Deposits => cli::events::run(&service, selector, EventKind::Deposits).await,
        AppCommand::Dividends => cli::events::run(&service, selector, EventKind::Dividends).await,
        AppCommand::Fees => cli::events::run(&service, selector, EventKind::Fees).await,
        AppCommand::Allocation => cli::allocation::run(&service, selector).await,
    }
}
