//! Rate lookup abstraction

use async_trait::async_trait;

use super::error::FetchError;
use super::query::RateQuery;
use super::rate::Rate;

#[async_trait]
pub trait RateProvider: Send + Sync {
    async fn fetch_rate(&self, query: &RateQuery) -> Result<Rate, FetchError>;
}
