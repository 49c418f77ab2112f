use crate::core::config::{AdapterOptionsPatch, ExchangeConfig, Merge};
use crate::core::errors::ExchangeError;
use crate::core::kernel::{ReqwestRest, RestClient, RestClientBuilder, RestClientConfig};
use crate::exchanges::kraken::connector::KrakenConnector;
use crate::exchanges::kraken::rest::KrakenRest;
use crate::exchanges::kraken::signer::KrakenSigner;
use crate::exchanges::kraken::types::{kraken_descriptor, KRAKEN_API_URL};
use std::sync::Arc;

/// Builder for creating Kraken exchange connectors
///
/// Credentials are optional; without them only public endpoints work and
/// private calls fail with an authentication error.
pub struct KrakenBuilder {
    config: ExchangeConfig,
    options: AdapterOptionsPatch,
    rest_timeout: u64,
    rest_max_retries: u32,
}

impl Default for KrakenBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl KrakenBuilder {
    /// Create a new `KrakenBuilder` with default settings
    pub fn new() -> Self {
        Self {
            config: ExchangeConfig::read_only(),
            options: AdapterOptionsPatch::default(),
            rest_timeout: 30,
            rest_max_retries: 3,
        }
    }

    /// Set the exchange configuration
    pub fn with_config(mut self, config: ExchangeConfig) -> Self {
        self.config = config;
        self
    }

    /// Set testnet mode
    pub fn with_testnet(mut self, testnet: bool) -> Self {
        self.config.testnet = testnet;
        self
    }

    /// Set API credentials
    pub fn with_credentials(mut self, api_key: String, secret_key: String) -> Self {
        let mut config = ExchangeConfig::new(api_key, secret_key).testnet(self.config.testnet);
        config.base_url = self.config.base_url.take();
        self.config = config;
        self
    }

    /// Set base URL for REST API
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.config.base_url = Some(base_url);
        self
    }

    /// Override adapter options such as network aliases
    pub fn with_options(mut self, options: AdapterOptionsPatch) -> Self {
        self.options = options;
        self
    }

    /// Set REST client timeout
    pub fn with_rest_timeout(mut self, timeout: u64) -> Self {
        self.rest_timeout = timeout;
        self
    }

    /// Set REST client maximum retries
    pub fn with_rest_max_retries(mut self, retries: u32) -> Self {
        self.rest_max_retries = retries;
        self
    }

    /// Build a connector on the default reqwest transport
    pub fn build(self) -> Result<KrakenConnector<ReqwestRest>, ExchangeError> {
        let rest_config = RestClientConfig::new("kraken".to_string())
            .with_timeout(self.rest_timeout)
            .with_max_retries(self.rest_max_retries)
            .with_rate_limit_ms(kraken_descriptor().rate_limit_ms);
        let rest = RestClientBuilder::new(rest_config).build()?;
        Ok(self.build_with_client(rest))
    }

    /// Build a connector on a caller-supplied transport
    pub fn build_with_client<R: RestClient + Clone>(self, rest_client: R) -> KrakenConnector<R> {
        let mut descriptor = kraken_descriptor();
        descriptor.options.merge(self.options);

        // Kraken has no public sandbox for spot.
        let base_url = self
            .config
            .base_url
            .clone()
            .unwrap_or_else(|| KRAKEN_API_URL.to_string());

        let signer = self.config.has_credentials().then(|| {
            Arc::new(KrakenSigner::new(
                self.config.api_key().to_string(),
                self.config.secret_key().to_string(),
            ))
        });

        KrakenConnector::new(KrakenRest::new(rest_client, base_url, signer, Arc::new(descriptor)))
    }
}

/// Create a Kraken connector from a configuration
pub fn build_connector(config: ExchangeConfig) -> Result<KrakenConnector<ReqwestRest>, ExchangeError> {
    KrakenBuilder::new().with_config(config).build()
}
