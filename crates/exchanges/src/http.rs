use reqwest::StatusCode;
use serde_json::Value;
use tracing::debug;
use xbridge_core::{ExchangeConfig, ExchangeError, ExchangeResult};

/// Pulls an exchange-reported error message out of a response body, if any.
pub type ErrorExtractor = fn(&Value) -> Option<String>;

/// Thin JSON-over-HTTP client shared by the REST exchanges.
///
/// Applies the configured timeout and user agent, and classifies failures:
/// transport errors become `Network`, HTTP 429 `RateLimited`, 5xx
/// `Unavailable`, exchange error bodies `Api`, and undecodable bodies
/// `BadResponse`.
#[derive(Debug, Clone)]
pub struct RestClient {
    exchange: String,
    base_url: String,
    http: reqwest::Client,
    extract_error: ErrorExtractor,
}

impl RestClient {
    pub fn new(
        exchange: &str,
        config: &ExchangeConfig,
        extract_error: ErrorExtractor,
    ) -> ExchangeResult<Self> {
        let mut builder = reqwest::Client::builder().timeout(config.timeout());
        if let Some(user_agent) = config.user_agent() {
            builder = builder.user_agent(user_agent.to_string());
        }
        let http = builder
            .build()
            .map_err(|e| ExchangeError::InvalidConfig(format!("HTTP client setup failed: {}", e)))?;

        Ok(Self {
            exchange: exchange.to_string(),
            base_url: config.api_url()?,
            http,
            extract_error,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// GET `path` with query parameters and decode the JSON body.
    pub async fn get(&self, path: &str, query: &[(&str, &str)]) -> ExchangeResult<Value> {
        let url = format!("{}{}", self.base_url, path);
        debug!(exchange = %self.exchange, %url, "GET");

        let response = self
            .http
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| ExchangeError::Network(format!("{} GET {} failed: {}", self.exchange, url, e)))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ExchangeError::Network(format!("{} GET {} failed: {}", self.exchange, url, e)))?;

        self.classify(status, &text)
    }

    fn classify(&self, status: StatusCode, text: &str) -> ExchangeResult<Value> {
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(ExchangeError::RateLimited(format!("{} {}", self.exchange, text.trim())));
        }

        let body: Option<Value> = serde_json::from_str(text).ok();
        if let Some(message) = body.as_ref().and_then(self.extract_error) {
            return Err(ExchangeError::Api(format!("{} {}", self.exchange, message)));
        }

        if status.is_server_error() {
            return Err(ExchangeError::Unavailable(format!(
                "{} HTTP {}",
                self.exchange,
                status.as_u16()
            )));
        }
        if !status.is_success() {
            return Err(ExchangeError::Api(format!(
                "{} HTTP {} {}",
                self.exchange,
                status.as_u16(),
                text.trim()
            )));
        }

        body.ok_or_else(|| {
            ExchangeError::BadResponse(format!("{} returned a body that is not JSON", self.exchange))
        })
    }
}
