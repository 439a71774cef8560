//! Core types and abstractions

pub mod config;
pub mod error;
pub mod log;
pub mod provider;
pub mod query;
pub mod rate;

// Re-export main types for cleaner imports
pub use error::FetchError;
pub use provider::RateProvider;
pub use query::{RateQuery, RateSource};
pub use rate::Rate;
