//! Query parameters sent to the rate endpoint

use anyhow::Result;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;

use super::rate::RATE_BASE;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum RateSource {
    /// Official reference rate published by the central bank.
    #[default]
    #[serde(rename = "BCV", alias = "bcv")]
    Bcv,
    /// Parallel market rate.
    #[serde(rename = "paralelo", alias = "PARALELO")]
    Paralelo,
}

impl RateSource {
    pub const ALL: [RateSource; 2] = [RateSource::Bcv, RateSource::Paralelo];
}

impl Display for RateSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                RateSource::Bcv => "BCV",
                RateSource::Paralelo => "paralelo",
            }
        )
    }
}

impl FromStr for RateSource {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "BCV" => Ok(RateSource::Bcv),
            "PARALELO" => Ok(RateSource::Paralelo),
            _ => Err(anyhow::anyhow!("Invalid rate source: {}", s)),
        }
    }
}

/// Parameters for one rate lookup. Built on demand, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateQuery {
    pub source: RateSource,
    pub date: Option<NaiveDate>,
}

impl RateQuery {
    pub fn new(source: RateSource, date: Option<NaiveDate>) -> Self {
        Self { source, date }
    }

    /// `source`, `value=10000` and, when set, `date` in that order.
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("source", self.source.to_string()),
            ("value", RATE_BASE.to_string()),
        ];
        if let Some(date) = self.date {
            pairs.push(("date", date.format("%Y-%m-%d").to_string()));
        }
        pairs
    }
}

/// Parses a date field. Blank means "latest".
pub fn parse_date(text: &str) -> Result<Option<NaiveDate>> {
    let text = text.trim();
    if text.is_empty() || text == "-" {
        return Ok(None);
    }
    let date = NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .map_err(|e| anyhow::anyhow!("Invalid date {text:?}: {e}"))?;
    Ok(Some(date))
}
