use brokerfold::core::config::AppConfig;
use brokerfold::core::error::ErrorKind;
use brokerfold::core::models::{BrokerId, PortfolioSelector};
use rust_decimal_macros::dec;
use std::fs;
use std::path::Path;
use tempfile::TempDir;
use tracing::info;

mod test_utils {
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Broker bridge failing every portfolio request and answering deposits.
    pub async fn create_broker_server() -> MockServer {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/portfolio"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&mock_server)
            .await;

        Mock::given(method("GET"))
            .and(path("/deposits"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"[{"date": "2024-03-15", "amount": "75", "currency": "EUR"}]"#,
            ))
            .mount(&mock_server)
            .await;

        mock_server
    }

    pub async fn create_rate_server(pair: &str, rate: &str) -> MockServer {
        let mock_server = MockServer::start().await;
        let body = format!(r#"{{"chart": {{"result": [{{"meta": {{"regularMarketPrice": {rate}}}}}]}}}}"#);

        Mock::given(method("GET"))
            .and(path(format!("/v8/finance/chart/{pair}")))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&mock_server)
            .await;

        mock_server
    }
}

const DEGIRO_STATEMENT: &str = r#"
portfolio:
  - symbol: "ASML"
    display_name: "ASML Holding"
    quantity: "10"
    break_even_price: "100"
    current_price: "120"
    current_value: "1200"
    currency: "EUR"
    product_type: stock
deposits:
  - date: 2024-01-10
    amount: "1000"
    currency: "EUR"
overview:
  total:
    total_value: "1000"
    total_gain_loss: "20"
    currency: "EUR"
  value_history:
    - { date: 2024-01-01, value: "900" }
"#;

const TRADING212_STATEMENT: &str = r#"
portfolio:
  - symbol: "ASML"
    quantity: "5"
    break_even_price: "130"
    current_value: "600"
    currency: "EUR"
    product_type: stock
  - symbol: "VWRL"
    display_name: "Vanguard FTSE All-World"
    quantity: "4"
    break_even_price: "100"
    current_price: "110"
    current_value: "440"
    currency: "EUR"
    product_type: etf
deposits:
  - date: 2024-02-01
    amount: "500"
    currency: "EUR"
overview:
  total:
    total_value: "500"
    total_gain_loss: "30"
    currency: "USD"
  value_history:
    - { date: 2024-01-01, value: "400" }
    - { date: 2024-01-02, value: "500" }
"#;

/// Writes both statements and a config pointing at them, plus an HTTP broker.
fn write_config(dir: &Path, broker_url: &str, rates_url: &str) -> std::path::PathBuf {
    let degiro = dir.join("degiro.yaml");
    let trading212 = dir.join("trading212.yaml");
    fs::write(&degiro, DEGIRO_STATEMENT).expect("Failed to write statement");
    fs::write(&trading212, TRADING212_STATEMENT).expect("Failed to write statement");

    let config_content = format!(
        r#"
currency: "EUR"
query_timeout_secs: 5
brokers:
  - id: degiro
    name: "DEGIRO"
    source: {{ kind: statement, path: "{}" }}
  - id: trading212
    source: {{ kind: statement, path: "{}" }}
  - id: kraken
    capabilities: [portfolio, deposits]
    source: {{ kind: http, base_url: "{}" }}
  - id: bitvavo
    enabled: false
    capabilities: [fees]
    source: {{ kind: http, base_url: "{}" }}
providers:
  yahoo:
    base_url: "{}"
"#,
        degiro.display(),
        trading212.display(),
        broker_url,
        broker_url,
        rates_url
    );

    let config_path = dir.join("config.yaml");
    fs::write(&config_path, config_content).expect("Failed to write config file");
    config_path
}

#[test_log::test(tokio::test)]
async fn test_portfolio_merges_across_brokers_with_one_down() {
    let temp_dir = TempDir::new().unwrap();
    let broker_server = test_utils::create_broker_server().await;
    let rate_server = test_utils::create_rate_server("USDEUR=X", "0.5").await;
    let config_path = write_config(temp_dir.path(), &broker_server.uri(), &rate_server.uri());

    let config = AppConfig::load_from_path(&config_path).unwrap();
    let service = brokerfold::build_service(&config).unwrap();

    let envelope = service.portfolio(&PortfolioSelector::All).await.unwrap();
    info!(?envelope, "Merged portfolio");

    assert_eq!(envelope.data.len(), 2);
    let asml = &envelope.data[0];
    assert_eq!(asml.symbol, "ASML");
    assert_eq!(asml.quantity, dec!(15));
    assert_eq!(asml.break_even_price, dec!(110));
    assert_eq!(asml.current_price, Some(dec!(120)));
    assert_eq!(asml.current_value, dec!(1800));
    assert_eq!(
        asml.sources,
        vec![BrokerId::new("degiro"), BrokerId::new("trading212")]
    );
    assert_eq!(envelope.data[1].symbol, "VWRL");

    assert!(envelope.is_partial());
    let failed: Vec<_> = envelope.failed_brokers().collect();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].broker, BrokerId::new("kraken"));
    assert_eq!(failed[0].error_kind, Some(ErrorKind::Connection));
}

#[test_log::test(tokio::test)]
async fn test_overview_is_normalized_before_merge() {
    let temp_dir = TempDir::new().unwrap();
    let broker_server = test_utils::create_broker_server().await;
    let rate_server = test_utils::create_rate_server("USDEUR=X", "0.5").await;
    let config_path = write_config(temp_dir.path(), &broker_server.uri(), &rate_server.uri());

    let config = AppConfig::load_from_path(&config_path).unwrap();
    let service = brokerfold::build_service(&config).unwrap();

    let envelope = service
        .account_overview(&PortfolioSelector::All)
        .await
        .unwrap();
    let overview = envelope.data.as_ref().expect("Expected a merged overview");

    assert_eq!(overview.total.currency, "EUR");
    assert_eq!(overview.total.total_value, dec!(1250));
    assert_eq!(overview.total.total_gain_loss, dec!(35));
    assert_eq!(overview.value_history.len(), 2);
    assert_eq!(overview.value_history[0].value, dec!(1100));
    assert_eq!(overview.value_history[1].value, dec!(250));
    assert!(!envelope.is_partial());
}

#[test_log::test(tokio::test)]
async fn test_deposits_from_every_source_newest_first() {
    let temp_dir = TempDir::new().unwrap();
    let broker_server = test_utils::create_broker_server().await;
    let rate_server = test_utils::create_rate_server("USDEUR=X", "0.5").await;
    let config_path = write_config(temp_dir.path(), &broker_server.uri(), &rate_server.uri());

    let config = AppConfig::load_from_path(&config_path).unwrap();
    let service = brokerfold::build_service(&config).unwrap();

    let envelope = service.deposits(&PortfolioSelector::All).await.unwrap();

    let dates: Vec<String> = envelope.data.iter().map(|d| d.date.to_string()).collect();
    assert_eq!(dates, vec!["2024-03-15", "2024-02-01", "2024-01-10"]);
    assert_eq!(
        envelope.data[0].source_broker,
        Some(BrokerId::new("kraken"))
    );
}

#[test_log::test(tokio::test)]
async fn test_run_commands_with_config_file() {
    let temp_dir = TempDir::new().unwrap();
    let broker_server = test_utils::create_broker_server().await;
    let rate_server = test_utils::create_rate_server("USDEUR=X", "0.5").await;
    let config_path = write_config(temp_dir.path(), &broker_server.uri(), &rate_server.uri());
    let config_path = config_path.to_str().unwrap();

    for command in [
        brokerfold::AppCommand::Brokers,
        brokerfold::AppCommand::Portfolio,
        brokerfold::AppCommand::Overview,
        brokerfold::AppCommand::Deposits,
        brokerfold::AppCommand::Allocation,
    ] {
        let result =
            brokerfold::run_command(command, &PortfolioSelector::All, Some(config_path)).await;
        assert!(
            result.is_ok(),
            "{command:?} failed with: {:?}",
            result.err()
        );
    }
}

#[test_log::test(tokio::test)]
async fn test_configuration_errors_are_reported() {
    let temp_dir = TempDir::new().unwrap();
    let broker_server = test_utils::create_broker_server().await;
    let rate_server = test_utils::create_rate_server("USDEUR=X", "0.5").await;
    let config_path = write_config(temp_dir.path(), &broker_server.uri(), &rate_server.uri());
    let config_path = config_path.to_str().unwrap();

    let unknown = brokerfold::run_command(
        brokerfold::AppCommand::Portfolio,
        &"nope".parse().unwrap(),
        Some(config_path),
    )
    .await;
    assert!(
        unknown
            .unwrap_err()
            .to_string()
            .contains("Unknown broker: nope")
    );

    let unsupported = brokerfold::run_command(
        brokerfold::AppCommand::Dividends,
        &"kraken".parse().unwrap(),
        Some(config_path),
    )
    .await;
    assert!(
        unsupported
            .unwrap_err()
            .to_string()
            .contains("Broker kraken does not support dividends")
    );

    let disabled = brokerfold::run_command(
        brokerfold::AppCommand::Fees,
        &"bitvavo".parse().unwrap(),
        Some(config_path),
    )
    .await;
    assert!(
        disabled
            .unwrap_err()
            .to_string()
            .contains("Broker bitvavo is disabled in configuration")
    );
}

#[test_log::test]
fn test_setup_writes_loadable_config() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("config.yaml");

    brokerfold::cli::setup::setup_at_path(&config_path).unwrap();

    let config = AppConfig::load_from_path(&config_path).unwrap();
    assert_eq!(config.brokers.len(), 2);
    assert!(brokerfold::build_service(&config).is_ok());
}
