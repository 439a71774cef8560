use super::ui;
use crate::core::{FetchError, Rate, RateProvider, RateQuery, RateSource};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use comfy_table::Cell;
use futures::future::join_all;

/// Fetches a single rate and prints it as `Bs. X.XXXX`.
pub async fn show_rate(provider: &dyn RateProvider, query: RateQuery) -> Result<()> {
    let rate = provider
        .fetch_rate(&query)
        .await
        .with_context(|| format!("Failed to fetch {} rate", query.source))?;

    println!("{}", format_rate_line(&query, rate));
    Ok(())
}

pub fn format_rate_line(query: &RateQuery, rate: Rate) -> String {
    let when = query
        .date
        .map_or("latest".to_string(), |d| d.format("%Y-%m-%d").to_string());
    format!(
        "{} ({}): {}",
        ui::style_text(&query.source.to_string(), ui::StyleType::TotalLabel),
        ui::style_text(&when, ui::StyleType::Subtle),
        ui::style_text(&rate.display_text(), ui::StyleType::TotalValue)
    )
}

/// Fetches every source concurrently and prints them side by side.
pub async fn show_rates(provider: &dyn RateProvider, date: Option<NaiveDate>) -> Result<()> {
    let queries: Vec<RateQuery> = RateSource::ALL
        .iter()
        .map(|source| RateQuery::new(*source, date))
        .collect();
    let results = join_all(queries.iter().map(|q| provider.fetch_rate(q))).await;

    let rows: Vec<(RateSource, Result<Rate, FetchError>)> = RateSource::ALL
        .iter()
        .copied()
        .zip(results)
        .collect();

    if rows.iter().all(|(_, r)| r.is_err()) {
        for (source, result) in &rows {
            if let Err(e) = result {
                tracing::warn!(%source, error = %e, "Rate fetch failed");
            }
        }
        anyhow::bail!("No rate could be fetched from any source");
    }

    println!("{}", rates_table(&rows, date));
    Ok(())
}

pub fn rates_table(rows: &[(RateSource, Result<Rate, FetchError>)], date: Option<NaiveDate>) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Source"),
        ui::header_cell("Date"),
        ui::header_cell("Bs/USD"),
    ]);

    let when = date.map_or("latest".to_string(), |d| d.format("%Y-%m-%d").to_string());
    for (source, result) in rows {
        let value = match result {
            Ok(rate) => ui::amount_cell(&format!("{:.4}", rate.per_usd())),
            Err(FetchError::NoRate) => ui::na_cell(false),
            Err(_) => ui::na_cell(true),
        };
        table.add_row(vec![Cell::new(source.to_string()), Cell::new(&when), value]);
    }

    table.to_string()
}
