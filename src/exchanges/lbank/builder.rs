use crate::core::config::{AdapterOptionsPatch, ExchangeConfig, Merge};
use crate::core::errors::ExchangeError;
use crate::core::kernel::{ReqwestRest, RestClient, RestClientBuilder, RestClientConfig};
use crate::exchanges::lbank::connector::LbankConnector;
use crate::exchanges::lbank::rest::LbankRest;
use crate::exchanges::lbank::signer::LbankSigner;
use crate::exchanges::lbank::types::{lbank_descriptor, LBANK_API_URL, LBANK_CONTRACT_URL};
use std::sync::Arc;

/// Builder for creating LBank exchange connectors
///
/// The secret may be an HMAC key or a base64 RSA private key; the signer
/// picks the method from its length.
pub struct LbankBuilder {
    config: ExchangeConfig,
    options: AdapterOptionsPatch,
    rest_timeout: u64,
    rest_max_retries: u32,
}

impl Default for LbankBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl LbankBuilder {
    /// Create a new `LbankBuilder` with default settings
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
    pub fn build(self) -> Result<LbankConnector<ReqwestRest>, ExchangeError> {
        let rest_config = RestClientConfig::new("lbank".to_string())
            .with_timeout(self.rest_timeout)
            .with_max_retries(self.rest_max_retries)
            .with_rate_limit_ms(lbank_descriptor().rate_limit_ms);
        let rest = RestClientBuilder::new(rest_config).build()?;
        Ok(self.build_with_client(rest))
    }

    /// Build a connector on a caller-supplied transport
    pub fn build_with_client<R: RestClient + Clone>(self, rest_client: R) -> LbankConnector<R> {
        let mut descriptor = lbank_descriptor();
        descriptor.options.merge(self.options);

        // LBank has no sandbox; a base URL override applies to the spot host.
        let rest_url = self
            .config
            .base_url
            .clone()
            .unwrap_or_else(|| LBANK_API_URL.to_string());
        let contract_url = descriptor
            .urls
            .get("contract")
            .cloned()
            .unwrap_or_else(|| LBANK_CONTRACT_URL.to_string());

        let cache_pem = descriptor.options.cache_secret_as_pem;
        let signer = self.config.has_credentials().then(|| {
            Arc::new(LbankSigner::new(
                self.config.api_key().to_string(),
                self.config.secret_key().to_string(),
                cache_pem,
            ))
        });

        LbankConnector::new(LbankRest::new(
            rest_client,
            rest_url,
            contract_url,
            signer,
            Arc::new(descriptor),
        ))
    }
}

/// Create an LBank connector from a configuration
pub fn build_connector(config: ExchangeConfig) -> Result<LbankConnector<ReqwestRest>, ExchangeError> {
    LbankBuilder::new().with_config(config).build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::traits::ExchangeConnector;

    #[test]
    fn test_build_lbank_connector_without_credentials() {
        let result = build_connector(ExchangeConfig::read_only());
        assert!(result.is_ok());
    }

    #[test]
    fn test_lbank_builder_with_credentials() {
        let result = LbankBuilder::new()
            .with_credentials("test_key".to_string(), "test_secret".to_string())
            .with_rest_timeout(60)
            .with_rest_max_retries(5)
            .build();
        assert!(result.is_ok());
    }

    #[test]
    fn test_lbank_builder_merges_options() {
        let connector = LbankBuilder::new()
            .with_options(AdapterOptionsPatch {
                default_network: Some("ERC20".to_string()),
                create_market_buy_order_requires_price: Some(false),
                ..AdapterOptionsPatch::default()
            })
            .build()
            .unwrap();
        let options = &connector.descriptor().options;
        assert_eq!(options.default_network.as_deref(), Some("ERC20"));
        assert!(!options.create_market_buy_order_requires_price);
        assert!(options.cache_secret_as_pem);
        assert_eq!(options.networks.get("TRX").map(String::as_str), Some("trc20"));
    }
}
