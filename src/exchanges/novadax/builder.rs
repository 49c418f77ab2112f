use crate::core::config::{AdapterOptionsPatch, ExchangeConfig, Merge};
use crate::core::errors::ExchangeError;
use crate::core::kernel::{ReqwestRest, RestClient, RestClientBuilder, RestClientConfig};
use crate::exchanges::novadax::connector::NovadaxConnector;
use crate::exchanges::novadax::rest::NovadaxRest;
use crate::exchanges::novadax::signer::NovadaxSigner;
use crate::exchanges::novadax::types::{novadax_descriptor, NOVADAX_API_URL};
use std::sync::Arc;

/// Builder for creating NovaDAX exchange connectors
///
/// NovaDAX has no sandbox; point `with_base_url` at a mock server instead.
pub struct NovadaxBuilder {
    config: ExchangeConfig,
    options: AdapterOptionsPatch,
    rest_timeout: u64,
    rest_max_retries: u32,
}

impl Default for NovadaxBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl NovadaxBuilder {
    pub fn new() -> Self {
        Self {
            config: ExchangeConfig::read_only(),
            options: AdapterOptionsPatch::default(),
            rest_timeout: 30,
            rest_max_retries: 3,
        }
    }

    pub fn with_config(mut self, config: ExchangeConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_credentials(mut self, api_key: String, secret_key: String) -> Self {
        let mut config = ExchangeConfig::new(api_key, secret_key);
        config.base_url = self.config.base_url.take();
        self.config = config;
        self
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.config.base_url = Some(base_url);
        self
    }

    pub fn with_options(mut self, options: AdapterOptionsPatch) -> Self {
        self.options = options;
        self
    }

    pub fn with_rest_timeout(mut self, timeout: u64) -> Self {
        self.rest_timeout = timeout;
        self
    }

    pub fn with_rest_max_retries(mut self, retries: u32) -> Self {
        self.rest_max_retries = retries;
        self
    }

    pub fn build(self) -> Result<NovadaxConnector<ReqwestRest>, ExchangeError> {
        let rest_config = RestClientConfig::new("novadax".to_string())
            .with_timeout(self.rest_timeout)
            .with_max_retries(self.rest_max_retries)
            .with_rate_limit_ms(novadax_descriptor().rate_limit_ms);
        let rest = RestClientBuilder::new(rest_config).build()?;
        Ok(self.build_with_client(rest))
    }

    pub fn build_with_client<R: RestClient + Clone>(self, rest_client: R) -> NovadaxConnector<R> {
        let mut descriptor = novadax_descriptor();
        descriptor.options.merge(self.options);

        let rest_url = self
            .config
            .base_url
            .clone()
            .unwrap_or_else(|| NOVADAX_API_URL.to_string());

        let signer = self.config.has_credentials().then(|| {
            Arc::new(NovadaxSigner::new(
                self.config.api_key().to_string(),
                self.config.secret_key().to_string(),
            ))
        });

        NovadaxConnector::new(NovadaxRest::new(rest_client, rest_url, signer, Arc::new(descriptor)))
    }
}

/// Create a NovaDAX connector from a configuration
pub fn build_connector(config: ExchangeConfig) -> Result<NovadaxConnector<ReqwestRest>, ExchangeError> {
    NovadaxBuilder::new().with_config(config).build()
}
