//! The form surface a `RateSync` drives

use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::core::RateSource;
use crate::core::rate::parse_amount;

/// Two amount fields, a date field, a source selector and a rate label.
pub trait FormView: Send + Sync {
    /// Toggles every control except the date field. Called while the sync
    /// state is locked, so implementations must not call back into `RateSync`.
    fn set_controls_enabled(&self, enabled: bool);
    fn set_rate_text(&self, text: &str);
    fn usd_value(&self) -> Option<Decimal>;
    fn set_usd_text(&self, text: &str);
    fn set_ved_text(&self, text: &str);
    fn source(&self) -> RateSource;
    fn date(&self) -> Option<NaiveDate>;
}

#[derive(Debug, Default)]
struct FormFields {
    usd: String,
    ved: String,
    rate_text: String,
    source: RateSource,
    date: Option<NaiveDate>,
    controls_enabled: bool,
}

/// Headless form holding field contents in memory.
#[derive(Debug, Default)]
pub struct MemoryView {
    fields: Mutex<FormFields>,
}

impl MemoryView {
    pub fn new(source: RateSource, date: Option<NaiveDate>) -> Self {
        MemoryView {
            fields: Mutex::new(FormFields {
                source,
                date,
                controls_enabled: true,
                ..FormFields::default()
            }),
        }
    }

    fn fields(&self) -> MutexGuard<'_, FormFields> {
        self.fields.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn usd_text(&self) -> String {
        self.fields().usd.clone()
    }

    pub fn ved_text(&self) -> String {
        self.fields().ved.clone()
    }

    pub fn rate_text(&self) -> String {
        self.fields().rate_text.clone()
    }

    pub fn controls_enabled(&self) -> bool {
        self.fields().controls_enabled
    }

    pub fn set_source(&self, source: RateSource) {
        self.fields().source = source;
    }

    pub fn set_date(&self, date: Option<NaiveDate>) {
        self.fields().date = date;
    }
}

impl FormView for MemoryView {
    fn set_controls_enabled(&self, enabled: bool) {
        self.fields().controls_enabled = enabled;
    }

    fn set_rate_text(&self, text: &str) {
        self.fields().rate_text = text.to_string();
    }

    fn usd_value(&self) -> Option<Decimal> {
        parse_amount(&self.fields().usd)
    }

    fn set_usd_text(&self, text: &str) {
        self.fields().usd = text.to_string();
    }

    fn set_ved_text(&self, text: &str) {
        self.fields().ved = text.to_string();
    }

    fn source(&self) -> RateSource {
        self.fields().source
    }

    fn date(&self) -> Option<NaiveDate> {
        self.fields().date
    }
}
