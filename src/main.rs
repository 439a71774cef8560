use anyhow::Result;
use chrono::NaiveDate;
use clap::{CommandFactory, Parser, Subcommand};
use rust_decimal::Decimal;
use vedollar::cli::convert::Currency;
use vedollar::core::RateSource;
use vedollar::core::log::init_logging;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

impl From<Commands> for vedollar::AppCommand {
    fn from(cmd: Commands) -> vedollar::AppCommand {
        match cmd {
            Commands::Rate { source, date } => vedollar::AppCommand::Rate { source, date },
            Commands::Rates { date } => vedollar::AppCommand::Rates { date },
            Commands::Convert {
                amount,
                from,
                source,
                date,
            } => vedollar::AppCommand::Convert {
                amount,
                from,
                source,
                date,
            },
            Commands::Interactive { source, date } => {
                vedollar::AppCommand::Interactive { source, date }
            }
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Show the exchange rate for one source
    Rate {
        /// Rate source: BCV or paralelo
        #[arg(short, long)]
        source: Option<RateSource>,
        /// Rate date (YYYY-MM-DD), latest when omitted
        #[arg(short, long)]
        date: Option<NaiveDate>,
    },
    /// Show the exchange rate for every source
    Rates {
        /// Rate date (YYYY-MM-DD), latest when omitted
        #[arg(short, long)]
        date: Option<NaiveDate>,
    },
    /// Convert an amount between USD and VED
    Convert {
        amount: Decimal,
        /// Currency of the given amount
        #[arg(short, long, value_enum, default_value = "usd")]
        from: Currency,
        #[arg(short, long)]
        source: Option<RateSource>,
        #[arg(short, long)]
        date: Option<NaiveDate>,
    },
    /// Interactive converter that keeps both amounts in sync
    Interactive {
        #[arg(short, long)]
        source: Option<RateSource>,
        #[arg(short, long)]
        date: Option<NaiveDate>,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => vedollar::cli::setup::setup(),
        Some(cmd) => vedollar::run_command(cmd.into(), cli.config_path.as_deref()).await,
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
