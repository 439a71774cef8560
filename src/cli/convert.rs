use super::ui;
use crate::core::rate::format_amount;
use crate::core::{Rate, RateProvider, RateQuery};
use anyhow::{Context, Result};
use clap::ValueEnum;
use rust_decimal::Decimal;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Currency {
    Usd,
    Ved,
}

impl Currency {
    pub fn other(self) -> Currency {
        match self {
            Currency::Usd => Currency::Ved,
            Currency::Ved => Currency::Usd,
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Currency::Usd => "USD",
            Currency::Ved => "VED",
        }
    }
}

/// Same formulas the form uses for its two fields.
pub fn convert_amount(rate: Rate, amount: Decimal, from: Currency) -> Option<Decimal> {
    match from {
        Currency::Usd => rate.usd_to_ved(amount),
        Currency::Ved => rate.ved_to_usd(amount),
    }
}

pub async fn run_convert(
    provider: &dyn RateProvider,
    query: RateQuery,
    amount: Decimal,
    from: Currency,
) -> Result<()> {
    let rate = provider
        .fetch_rate(&query)
        .await
        .with_context(|| format!("Failed to fetch {} rate", query.source))?;

    let converted = convert_amount(rate, amount, from)
        .with_context(|| format!("Cannot convert with a rate of {}", rate.per_base()))?;

    println!(
        "{} {} = {} {}  {}",
        format_amount(amount),
        from.code(),
        ui::style_text(&format_amount(converted), ui::StyleType::TotalValue),
        from.other().code(),
        ui::style_text(
            &format!("({} {})", query.source, rate.display_text()),
            ui::StyleType::Subtle
        )
    );
    Ok(())
}
