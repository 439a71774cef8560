//! Failures of a single rate fetch

use thiserror::Error;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Bad response status: {status}")]
    Http { status: u16 },

    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Invalid endpoint URL: {0}")]
    InvalidUrl(String),

    #[error("Response is not a rate: {0:?}")]
    InvalidBody(String),

    #[error("No rate available for the requested source and date")]
    NoRate,

    #[error("Request superseded by a newer fetch")]
    Cancelled,
}

impl FetchError {
    /// Only network-level failures are worth another attempt.
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::Transport(e) => !e.is_builder(),
            _ => false,
        }
    }
}
