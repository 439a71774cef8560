use async_trait::async_trait;
use reqwest::{Client, Url};
use tracing::{debug, instrument};

use super::util::with_retry;
use crate::core::config::ApiConfig;
use crate::core::{FetchError, Rate, RateProvider, RateQuery};

pub const RATE_ENDPOINT: &str = "/api/v1";

/// Client for the `/api/v1` rate endpoint.
#[derive(Clone)]
pub struct ApiRateProvider {
    base_url: String,
    client: Client,
    retries: usize,
    retry_delay_ms: u64,
}

impl ApiRateProvider {
    pub fn new(base_url: &str, retries: usize, retry_delay_ms: u64) -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent(concat!("vedollar/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(ApiRateProvider {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            retries,
            retry_delay_ms,
        })
    }

    pub fn from_config(config: &ApiConfig) -> Result<Self, FetchError> {
        Self::new(&config.base_url, config.retries, config.retry_delay_ms)
    }

    pub fn url_for(&self, query: &RateQuery) -> Result<Url, FetchError> {
        let endpoint = format!("{}{}", self.base_url, RATE_ENDPOINT);
        let mut url = Url::parse(&endpoint).map_err(|_| FetchError::InvalidUrl(endpoint))?;
        url.query_pairs_mut().extend_pairs(query.to_pairs());
        Ok(url)
    }

    async fn fetch_once(&self, url: &Url) -> Result<Rate, FetchError> {
        let response = self.client.get(url.clone()).send().await?;
        debug!(status = %response.status(), "Received rate response");

        if !response.status().is_success() {
            return Err(FetchError::Http {
                status: response.status().as_u16(),
            });
        }

        let body = response.text().await?;
        body.parse()
    }
}

#[async_trait]
impl RateProvider for ApiRateProvider {
    #[instrument(
        name = "RateFetch",
        skip(self),
        fields(source = %query.source, date = ?query.date)
    )]
    async fn fetch_rate(&self, query: &RateQuery) -> Result<Rate, FetchError> {
        let url = self.url_for(query)?;
        debug!("Requesting rate from {}", url);

        with_retry(|| self.fetch_once(&url), self.retries, self.retry_delay_ms).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::RateSource;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use wiremock::matchers::{method, path, query_param, query_param_is_missing};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn create_mock_server(source: &str, status: u16, body: &str) -> MockServer {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path(RATE_ENDPOINT))
            .and(query_param("source", source))
            .and(query_param("value", "10000"))
            .respond_with(ResponseTemplate::new(status).set_body_string(body))
            .mount(&mock_server)
            .await;

        mock_server
    }

    fn provider(server: &MockServer) -> ApiRateProvider {
        ApiRateProvider::new(&server.uri(), 0, 1).unwrap()
    }

    #[tokio::test]
    async fn test_successful_rate_fetch() {
        let mock_server = create_mock_server("BCV", 200, "3050000").await;

        let query = RateQuery::new(RateSource::Bcv, None);
        let rate = provider(&mock_server).fetch_rate(&query).await.unwrap();

        assert_eq!(rate.per_base(), Decimal::from(3_050_000));
        assert_eq!(rate.display_text(), "Bs. 305.0000");
    }

    #[tokio::test]
    async fn test_date_is_sent_only_when_set() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(RATE_ENDPOINT))
            .and(query_param("date", "2023-05-02"))
            .respond_with(ResponseTemplate::new(200).set_body_string("245000"))
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path(RATE_ENDPOINT))
            .and(query_param_is_missing("date"))
            .respond_with(ResponseTemplate::new(200).set_body_string("365000"))
            .mount(&mock_server)
            .await;

        let provider = provider(&mock_server);
        let dated = RateQuery::new(
            RateSource::Paralelo,
            NaiveDate::from_ymd_opt(2023, 5, 2),
        );
        let latest = RateQuery::new(RateSource::Paralelo, None);

        assert_eq!(
            provider.fetch_rate(&dated).await.unwrap().per_base(),
            Decimal::from(245_000)
        );
        assert_eq!(
            provider.fetch_rate(&latest).await.unwrap().per_base(),
            Decimal::from(365_000)
        );
    }

    #[tokio::test]
    async fn test_http_error_status() {
        let mock_server = create_mock_server("BCV", 422, "{\"detail\":\"bad\"}").await;

        let query = RateQuery::new(RateSource::Bcv, None);
        let result = provider(&mock_server).fetch_rate(&query).await;

        assert!(matches!(result, Err(FetchError::Http { status: 422 })));
    }

    #[tokio::test]
    async fn test_null_body_is_no_rate() {
        let mock_server = create_mock_server("paralelo", 200, "null").await;

        let query = RateQuery::new(RateSource::Paralelo, None);
        let result = provider(&mock_server).fetch_rate(&query).await;

        assert!(matches!(result, Err(FetchError::NoRate)));
    }

    #[tokio::test]
    async fn test_transport_error() {
        // Nothing listens on port 9 locally
        let provider = ApiRateProvider::new("http://127.0.0.1:9", 1, 1).unwrap();
        let query = RateQuery::new(RateSource::Bcv, None);

        let result = provider.fetch_rate(&query).await;
        assert!(matches!(result, Err(FetchError::Transport(_))));
    }

    #[test]
    fn test_url_for() {
        let provider = ApiRateProvider::new("http://localhost:8000/", 0, 1).unwrap();
        let query = RateQuery::new(RateSource::Bcv, NaiveDate::from_ymd_opt(2024, 1, 31));
        assert_eq!(
            provider.url_for(&query).unwrap().as_str(),
            "http://localhost:8000/api/v1?source=BCV&value=10000&date=2024-01-31"
        );
    }
}
