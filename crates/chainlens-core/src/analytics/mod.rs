//! Client for the SQL analytics API that backs 24h transaction counts.
//!
//! Counting is not something chain nodes answer cheaply, so it is delegated to an indexed
//! data warehouse queried over HTTP:
//!
//! ```text
//! POST <analytics.url>
//! X-API-KEY: <analytics.api_key>
//! {"query": "select count(*) as total from <chain>.transactions where ..."}
//!
//! 200 {"code": 0, "data": {"result": [{"total": "1234"}], ...}}
//! ```
//!
//! This is the only outbound call that retries.

use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use serde::Deserialize;
use serde_json::Value;
use std::{sync::Arc, time::Duration};
use tracing::{debug, warn};

use crate::{
    chain::ChainId,
    config::AnalyticsConfig,
    upstream::{HttpClient, RetryPolicy, UpstreamError},
};

const API_KEY_HEADER: HeaderName = HeaderName::from_static("x-api-key");

/// Delay before the first retry; doubled for each later one.
pub(crate) const RETRY_BASE_DELAY: Duration = Duration::from_millis(500);

#[derive(Debug, thiserror::Error)]
pub enum AnalyticsError {
    #[error("analytics request failed: {0}")]
    Upstream(#[from] UpstreamError),

    #[error("analytics response could not be decoded: {0}")]
    Decode(String),

    #[error("analytics API error {code}: {message}")]
    Api { code: i64, message: String },

    #[error("analytics total is not an integer: {0}")]
    InvalidTotal(String),

    #[error("analytics API key is not a valid header value")]
    InvalidApiKey,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
    #[serde(default)]
    data: Option<QueryData>,
}

#[derive(Debug, Deserialize)]
struct QueryData {
    #[serde(default)]
    result: Vec<QueryRow>,
    #[serde(default)]
    err_msg: String,
}

#[derive(Debug, Deserialize)]
struct QueryRow {
    #[serde(default)]
    total: Value,
}

/// Builds the 24h count query for a chain.
#[must_use]
pub fn count_query(chain: ChainId) -> String {
    format!(
        "select count(*) as total from {chain}.transactions where block_timestamp >= now() - interval 24 hour;"
    )
}

pub struct AnalyticsClient {
    http: Arc<HttpClient>,
    url: String,
    headers: HeaderMap,
    timeout: Duration,
    retry: RetryPolicy,
}

impl AnalyticsClient {
    /// # Errors
    ///
    /// [`AnalyticsError::InvalidApiKey`] if the key cannot be sent as a header.
    pub fn new(http: Arc<HttpClient>, config: &AnalyticsConfig) -> Result<Self, AnalyticsError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json; charset=utf-8"));
        let mut key =
            HeaderValue::from_str(&config.api_key).map_err(|_| AnalyticsError::InvalidApiKey)?;
        key.set_sensitive(true);
        headers.insert(API_KEY_HEADER, key);

        Ok(Self {
            http,
            url: config.url.clone(),
            headers,
            timeout: config.timeout(),
            retry: config.retry_policy(),
        })
    }

    /// Overrides the retry policy. Tests use this to avoid real backoff delays.
    #[must_use]
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Number of transactions committed on `chain` in the last 24 hours.
    ///
    /// An empty result set counts as zero when the API reports success.
    ///
    /// # Errors
    ///
    /// - [`AnalyticsError::Upstream`] when the request fails after all attempts
    /// - [`AnalyticsError::Decode`] for a body that is not the expected JSON
    /// - [`AnalyticsError::Api`] when the API reports an error and returns no rows
    /// - [`AnalyticsError::InvalidTotal`] when the total is not an integer
    pub async fn count_transactions_24h(&self, chain: ChainId) -> Result<i64, AnalyticsError> {
        let body = serde_json::to_vec(&serde_json::json!({ "query": count_query(chain) }))
            .map_err(|e| AnalyticsError::Decode(e.to_string()))?;

        let raw = self
            .http
            .send_with_policy(&self.url, Bytes::from(body), &self.headers, self.timeout, self.retry)
            .await
            .inspect_err(|e| warn!(chain = %chain, error = %e, "analytics request failed"))?;

        let response: QueryResponse =
            serde_json::from_slice(&raw).map_err(|e| AnalyticsError::Decode(e.to_string()))?;

        let rows = response.data.map(|d| (d.result, d.err_msg));
        match rows {
            Some((rows, _)) if !rows.is_empty() => {
                let total = parse_total(&rows[0].total)?;
                debug!(chain = %chain, total = total, "analytics count");
                Ok(total)
            }
            Some((_, err_msg)) if response.code != 0 => Err(AnalyticsError::Api {
                code: response.code,
                message: if err_msg.is_empty() { response.message } else { err_msg },
            }),
            None if response.code != 0 => {
                Err(AnalyticsError::Api { code: response.code, message: response.message })
            }
            _ => Ok(0),
        }
    }
}

fn parse_total(total: &Value) -> Result<i64, AnalyticsError> {
    match total {
        Value::String(s) => s.trim().parse().map_err(|_| AnalyticsError::InvalidTotal(s.clone())),
        Value::Number(n) => n.as_i64().ok_or_else(|| AnalyticsError::InvalidTotal(n.to_string())),
        other => Err(AnalyticsError::InvalidTotal(other.to_string())),
    }
}
