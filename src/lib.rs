pub mod cli;
pub mod core;
pub mod providers;
pub mod sync;

use crate::cli::convert::Currency;
use crate::core::config::AppConfig;
use crate::core::{RateProvider, RateQuery, RateSource};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq)]
pub enum AppCommand {
    Rate {
        source: Option<RateSource>,
        date: Option<NaiveDate>,
    },
    Rates {
        date: Option<NaiveDate>,
    },
    Convert {
        amount: Decimal,
        from: Currency,
        source: Option<RateSource>,
        date: Option<NaiveDate>,
    },
    Interactive {
        source: Option<RateSource>,
        date: Option<NaiveDate>,
    },
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("vedollar starting...");

    let config = AppConfig::load_or_default(config_path)?;
    debug!("Loaded config: {config:#?}");

    let provider: Arc<dyn RateProvider> = Arc::new(
        providers::ApiRateProvider::from_config(&config.api)
            .context("Failed to create rate client")?,
    );
    let default_source = config.source;

    match command {
        AppCommand::Rate { source, date } => {
            let query = RateQuery::new(source.unwrap_or(default_source), date);
            cli::rate::show_rate(provider.as_ref(), query).await
        }
        AppCommand::Rates { date } => cli::rate::show_rates(provider.as_ref(), date).await,
        AppCommand::Convert {
            amount,
            from,
            source,
            date,
        } => {
            let query = RateQuery::new(source.unwrap_or(default_source), date);
            cli::convert::run_convert(provider.as_ref(), query, amount, from).await
        }
        AppCommand::Interactive { source, date } => {
            cli::interactive::run_interactive(provider, source.unwrap_or(default_source), date)
                .await
        }
    }
}
