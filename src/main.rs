use anyhow::Result;
use brokerfold::core::log::init_logging;
use brokerfold::core::models::PortfolioSelector;
use clap::{CommandFactory, Parser, Subcommand};

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    /// Query a single broker instead of all of them
    #[arg(short, long, global = true, default_value = "all")]
    broker: PortfolioSelector,

    #[command(subcommand)]
    command: Option<Commands>,
}

impl From<Commands> for brokerfold::AppCommand {
    fn from(cmd: Commands) -> brokerfold::AppCommand {
        match cmd {
            Commands::Brokers => brokerfold::AppCommand::Brokers,
            Commands::Portfolio => brokerfold::AppCommand::Portfolio,
            Commands::Overview => brokerfold::AppCommand::Overview,
            Commands::Transactions => brokerfold::AppCommand::Transactions,
            Commands::Deposits => brokerfold::AppCommand::Deposits,
            Commands::Dividends => brokerfold::AppCommand::Dividends,
            Commands::Fees => brokerfold::AppCommand::Fees,
            Commands::Allocation => brokerfold::AppCommand::Allocation,
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// List configured brokers and their capabilities
    Brokers,
    /// Display consolidated holdings
    Portfolio,
    /// Display account totals and value history
    Overview,
    /// List transactions, newest first
    Transactions,
    /// List deposits, newest first
    Deposits,
    /// List dividends, newest first
    Dividends,
    /// List fees, newest first
    Fees,
    /// Display holdings grouped by product type
    Allocation,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => match cli.config_path.as_deref() {
            Some(path) => brokerfold::cli::setup::setup_at_path(path),
            None => brokerfold::cli::setup::setup(),
        },
        Some(cmd) => {
            brokerfold::run_command(cmd.into(), &cli.broker, cli.config_path.as_deref()).await
        }
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}
