//! HTTP query transport.
//!
//! Talks to the provider's left-ticket endpoint. Requests are bounded
//! by a semaphore so that a burst of pollers cannot flood the upstream.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;
use tokio::sync::Semaphore;
use tracing::debug;

use crate::domain::StationCode;

use super::error::QueryError;
use super::transport::QueryTransport;

/// Default base URL of the ticketing provider.
const DEFAULT_BASE_URL: &str = "https://kyfw.12306.cn";

/// Default maximum concurrent requests.
const DEFAULT_MAX_CONCURRENT: usize = 4;

/// Passenger type sent with every query.
const PURPOSE_CODE: &str = "ADULT";

/// Configuration for the query client.
#[derive(Debug, Clone)]
pub struct QueryClientConfig {
    /// Base URL for the API (defaults to the public provider)
    pub base_url: String,
    /// Maximum concurrent requests
    pub max_concurrent: usize,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl QueryClientConfig {
    pub fn new() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            timeout_secs: 30,
        }
    }

    /// Set a custom base URL (for a proxy or testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set maximum concurrent requests.
    pub fn with_max_concurrent(mut self, n: usize) -> Self {
        self.max_concurrent = n;
        self
    }

    /// Set request timeout.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

impl Default for QueryClientConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// JSON envelope around the wire records.
#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    data: Option<QueryData>,
}

#[derive(Debug, Deserialize)]
struct QueryData {
    #[serde(default)]
    result: Vec<String>,
}

/// Extract the wire records from a response body.
///
/// A missing `data` or `result` means the route has no trains that day.
pub fn parse_query_response(body: &str) -> Result<Vec<String>, QueryError> {
    let response: QueryResponse = serde_json::from_str(body).map_err(|e| QueryError::Json {
        message: e.to_string(),
        body: Some(body.chars().take(500).collect()),
    })?;

    Ok(response.data.map(|d| d.result).unwrap_or_default())
}

/// HTTP client for the provider's availability endpoint.
#[derive(Debug, Clone)]
pub struct QueryClient {
    http: reqwest::Client,
    base_url: String,
    timeout_secs: u64,
    semaphore: Arc<Semaphore>,
}

impl QueryClient {
    pub fn new(config: QueryClientConfig) -> Result<Self, QueryError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            timeout_secs: config.timeout_secs,
            semaphore: Arc::new(Semaphore::new(config.max_concurrent.max(1))),
        })
    }
}

#[async_trait]
impl QueryTransport for QueryClient {
    async fn query(
        &self,
        date: NaiveDate,
        from: StationCode,
        to: StationCode,
    ) -> Result<Vec<String>, QueryError> {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|_| QueryError::Unavailable("semaphore closed".to_string()))?;

        let url = format!("{}/otn/leftTicket/queryZ", self.base_url);

        let response = self
            .http
            .get(&url)
            .query(&[
                ("leftTicketDTO.train_date", date.format("%Y-%m-%d").to_string()),
                ("leftTicketDTO.from_station", from.as_str().to_string()),
                ("leftTicketDTO.to_station", to.as_str().to_string()),
                ("purpose_codes", PURPOSE_CODE.to_string()),
            ])
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(QueryError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let body = response.text().await.map_err(|e| self.classify(e))?;
        let records = parse_query_response(&body)?;
        debug!(%date, %from, %to, count = records.len(), "queried availability");
        Ok(records)
    }
}

impl QueryClient {
    fn classify(&self, err: reqwest::Error) -> QueryError {
        if err.is_timeout() {
            QueryError::Timeout {
                secs: self.timeout_secs,
            }
        } else {
            QueryError::Http(err)
        }
    }
}
