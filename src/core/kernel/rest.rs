use crate::core::errors::ExchangeError;
use async_trait::async_trait;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use nonzero_ext::nonzero;
use reqwest::{Client, Method};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio_retry::strategy::{jitter, ExponentialBackoff};
use tokio_retry::RetryIf;
use tracing::{instrument, trace, warn};

/// A fully prepared HTTP request: signing has already happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: BTreeMap<String, String>,
    pub body: Option<String>,
}

impl HttpRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: BTreeMap::new(),
            body: None,
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }
}

/// Raw HTTP response. The body is kept as text so error classification can
/// inspect bodies that are not valid JSON.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: BTreeMap::new(),
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Parse the body as JSON. An empty body reads as `null`.
    pub fn json(&self) -> Result<Value, ExchangeError> {
        if self.body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&self.body).map_err(|e| {
            ExchangeError::Deserialization(format!("Failed to parse JSON response: {}: {}", e, self.body))
        })
    }
}

/// HTTP transport seam.
///
/// Implementations only move bytes; status handling and error
/// classification belong to the adapter. Network-level failures map onto
/// `NetworkError` or `RequestTimeout`.
#[async_trait]
pub trait RestClient: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ExchangeError>;
}

#[async_trait]
impl<T: RestClient + ?Sized> RestClient for Arc<T> {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ExchangeError> {
        (**self).send(request).await
    }
}

/// Configuration for the REST client
#[derive(Clone, Debug)]
pub struct RestClientConfig {
    /// Exchange name for logging and tracing
    pub exchange_name: String,
    /// Request timeout in seconds
    pub timeout_seconds: u64,
    /// Retries for idempotent requests that failed at the connection level
    pub max_retries: u32,
    /// User agent string to include in requests
    pub user_agent: String,
    /// Minimum spacing between requests, 0 disables throttling
    pub rate_limit_ms: u64,
}

impl RestClientConfig {
    pub fn new(exchange_name: String) -> Self {
        Self {
            exchange_name,
            timeout_seconds: 30,
            max_retries: 3,
            user_agent: "unifiedx/0.1".to_string(),
            rate_limit_ms: 0,
        }
    }

    pub fn with_timeout(mut self, timeout_seconds: u64) -> Self {
        self.timeout_seconds = timeout_seconds;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_user_agent(mut self, user_agent: String) -> Self {
        self.user_agent = user_agent;
        self
    }

    pub fn with_rate_limit_ms(mut self, rate_limit_ms: u64) -> Self {
        self.rate_limit_ms = rate_limit_ms;
        self
    }
}

type DirectRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Builder for creating REST client instances
pub struct RestClientBuilder {
    config: RestClientConfig,
}

impl RestClientBuilder {
    pub fn new(config: RestClientConfig) -> Self {
        Self { config }
    }

    pub fn build(self) -> Result<ReqwestRest, ExchangeError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(self.config.timeout_seconds))
            .user_agent(&self.config.user_agent)
            .build()
            .map_err(|e| {
                ExchangeError::Configuration(format!("Failed to build HTTP client: {}", e))
            })?;

        let limiter = (self.config.rate_limit_ms > 0)
            .then(|| Quota::with_period(Duration::from_millis(self.config.rate_limit_ms)))
            .flatten()
            .map(|quota| Arc::new(RateLimiter::direct(quota.allow_burst(nonzero!(1u32)))));

        Ok(ReqwestRest {
            client,
            config: self.config,
            limiter,
        })
    }
}

/// Implementation of `RestClient` using reqwest
#[derive(Clone)]
pub struct ReqwestRest {
    client: Client,
    config: RestClientConfig,
    limiter: Option<Arc<DirectRateLimiter>>,
}

impl std::fmt::Debug for ReqwestRest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReqwestRest")
            .field("config", &self.config)
            .field("throttled", &self.limiter.is_some())
            .finish_non_exhaustive()
    }
}

impl ReqwestRest {
    /// Client with default settings for the named exchange.
    pub fn new(exchange_name: String, rate_limit_ms: u64) -> Result<Self, ExchangeError> {
        RestClientBuilder::new(RestClientConfig::new(exchange_name).with_rate_limit_ms(rate_limit_ms))
            .build()
    }

    #[instrument(skip(self, request), fields(exchange = %self.config.exchange_name, method = %request.method, url = %request.url))]
    async fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, ExchangeError> {
        if let Some(limiter) = &self.limiter {
            limiter.until_ready().await;
        }

        let mut builder = self.client.request(request.method.clone(), &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                ExchangeError::RequestTimeout(format!("{} {}: {}", request.method, request.url, e))
            } else {
                ExchangeError::NetworkError(format!("Request failed: {}", e))
            }
        })?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.as_str().to_string(), v.to_string())))
            .collect();
        let body = response.text().await.map_err(|e| {
            ExchangeError::NetworkError(format!("Failed to read response body: {}", e))
        })?;

        trace!(status, "Response body: {}", body);

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

#[async_trait]
impl RestClient for ReqwestRest {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ExchangeError> {
        if request.method != Method::GET || self.config.max_retries == 0 {
            return self.execute(&request).await;
        }

        let strategy = ExponentialBackoff::from_millis(100)
            .max_delay(Duration::from_secs(2))
            .map(jitter)
            .take(self.config.max_retries as usize);

        RetryIf::spawn(
            strategy,
            || self.execute(&request),
            |e: &ExchangeError| {
                let retry = matches!(e, ExchangeError::NetworkError(_));
                if retry {
                    warn!(exchange = %self.config.exchange_name, error = %e, "Retrying GET after connection failure");
                }
                retry
            },
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_body_is_null() {
        assert_eq!(HttpResponse::new(200, "").json().unwrap(), Value::Null);
        assert!(HttpResponse::new(204, " ").is_success());
    }

    #[test]
    fn malformed_body_is_a_deserialization_error() {
        let err = HttpResponse::new(200, "<html>").json().unwrap_err();
        assert!(matches!(err, ExchangeError::Deserialization(_)));
    }

    #[test]
    fn builder_respects_config() {
        let rest = RestClientBuilder::new(
            RestClientConfig::new("kraken".into())
                .with_timeout(5)
                .with_max_retries(0)
                .with_rate_limit_ms(1000),
        )
        .build()
        .unwrap();
        let debug = format!("{:?}", rest);
        assert!(debug.contains("kraken"));
        assert!(debug.contains("throttled: true"));
    }
}
