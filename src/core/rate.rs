//! Exchange rate value and the USD/VED conversion formulas

use rust_decimal::{Decimal, RoundingStrategy};
use std::fmt::Display;
use std::str::FromStr;

use super::error::FetchError;

/// Amount of USD the endpoint quotes a rate for.
pub const RATE_BASE: u32 = 10_000;

/// Decimal places shown for every converted amount and for the rate itself.
pub const DISPLAY_PLACES: u32 = 4;

/// Bolívars per 10,000 USD.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Rate(Decimal);

fn round_display(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(DISPLAY_PLACES, RoundingStrategy::MidpointAwayFromZero)
}

fn base() -> Decimal {
    Decimal::from(RATE_BASE)
}

impl Rate {
    pub const ZERO: Rate = Rate(Decimal::ZERO);

    pub fn new(per_base: Decimal) -> Self {
        Rate(per_base)
    }

    /// Raw value as returned by the endpoint.
    pub fn per_base(&self) -> Decimal {
        self.0
    }

    /// Bolívars for a single dollar, rounded for display.
    pub fn per_usd(&self) -> Decimal {
        round_display(self.0 / base())
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Text shown next to the form, e.g. `Bs. 305.0000`.
    pub fn display_text(&self) -> String {
        format!("Bs. {:.4}", self.per_usd())
    }

    /// `round(usd * rate / 10000, 4)`
    pub fn usd_to_ved(&self, usd: Decimal) -> Option<Decimal> {
        usd.checked_mul(self.0)
            .and_then(|v| v.checked_div(base()))
            .map(round_display)
    }

    /// `round(ved / rate * 10000, 4)`. `None` until a non-zero rate is known.
    pub fn ved_to_usd(&self, ved: Decimal) -> Option<Decimal> {
        ved.checked_div(self.0)
            .and_then(|v| v.checked_mul(base()))
            .map(round_display)
    }
}

impl Display for Rate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_text())
    }
}

impl FromStr for Rate {
    type Err = FetchError;

    /// Parses a response body. `null` means the endpoint has no rate for the query.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let body = s.trim().trim_matches('"');
        if body.is_empty() || body == "null" {
            return Err(FetchError::NoRate);
        }
        Decimal::from_str(body)
            .or_else(|_| Decimal::from_scientific(body))
            .map(Rate)
            .map_err(|_| FetchError::InvalidBody(body.to_string()))
    }
}

/// Formats an amount the way it is written back into a form field.
pub fn format_amount(value: Decimal) -> String {
    format!("{:.4}", round_display(value))
}

/// Reads an amount field the way a numeric input reports it: blank is zero.
pub fn parse_amount(text: &str) -> Option<Decimal> {
    let text = text.trim();
    if text.is_empty() {
        return Some(Decimal::ZERO);
    }
    Decimal::from_str(text)
        .or_else(|_| Decimal::from_scientific(text))
        .ok()
}
