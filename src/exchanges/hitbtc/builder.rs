use crate::core::config::{AdapterOptionsPatch, ExchangeConfig, Merge};
use crate::core::errors::ExchangeError;
use crate::core::kernel::{ReqwestRest, RestClient, RestClientBuilder, RestClientConfig};
use crate::exchanges::hitbtc::connector::HitbtcConnector;
use crate::exchanges::hitbtc::rest::HitbtcRest;
use crate::exchanges::hitbtc::signer::HitbtcSigner;
use crate::exchanges::hitbtc::types::{hitbtc_descriptor, HITBTC_API_URL, HITBTC_TESTNET_URL};
use std::sync::Arc;

/// Builder for creating HitBTC exchange connectors
pub struct HitbtcBuilder {
    config: ExchangeConfig,
    options: AdapterOptionsPatch,
    rest_timeout: u64,
    rest_max_retries: u32,
}

impl Default for HitbtcBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl HitbtcBuilder {
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

    /// Use the demo environment
    pub fn with_testnet(mut self, testnet: bool) -> Self {
        self.config.testnet = testnet;
        self
    }

    pub fn with_credentials(mut self, api_key: String, secret_key: String) -> Self {
        let mut config = ExchangeConfig::new(api_key, secret_key).testnet(self.config.testnet);
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

    pub fn build(self) -> Result<HitbtcConnector<ReqwestRest>, ExchangeError> {
        let rest_config = RestClientConfig::new("hitbtc".to_string())
            .with_timeout(self.rest_timeout)
            .with_max_retries(self.rest_max_retries)
            .with_rate_limit_ms(hitbtc_descriptor().rate_limit_ms);
        let rest = RestClientBuilder::new(rest_config).build()?;
        Ok(self.build_with_client(rest))
    }

    pub fn build_with_client<R: RestClient + Clone>(self, rest_client: R) -> HitbtcConnector<R> {
        let mut descriptor = hitbtc_descriptor();
        descriptor.options.merge(self.options);

        let rest_url = self.config.base_url.clone().unwrap_or_else(|| {
            if self.config.testnet {
                HITBTC_TESTNET_URL.to_string()
            } else {
                HITBTC_API_URL.to_string()
            }
        });

        let signer = self.config.has_credentials().then(|| {
            Arc::new(HitbtcSigner::new(
                self.config.api_key().to_string(),
                self.config.secret_key().to_string(),
            ))
        });

        HitbtcConnector::new(HitbtcRest::new(rest_client, rest_url, signer, Arc::new(descriptor)))
    }
}

/// Create a HitBTC connector from a configuration
pub fn build_connector(config: ExchangeConfig) -> Result<HitbtcConnector<ReqwestRest>, ExchangeError> {
    HitbtcBuilder::new().with_config(config).build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::traits::ExchangeConnector;

    #[test]
    fn test_build_hitbtc_connector_without_credentials() {
        let connector = build_connector(ExchangeConfig::read_only()).unwrap();
        assert!(!connector.rest().has_credentials());
    }

    #[test]
    fn test_hitbtc_builder_with_credentials() {
        let connector = HitbtcBuilder::new()
            .with_credentials("test_key".to_string(), "test_secret".to_string())
            .with_testnet(true)
            .build()
            .unwrap();
        assert!(connector.rest().has_credentials());
    }

    #[test]
    fn test_hitbtc_builder_merges_options() {
        let connector = HitbtcBuilder::new()
            .with_options(AdapterOptionsPatch {
                default_network: Some("TRC20".to_string()),
                ..AdapterOptionsPatch::default()
            })
            .build()
            .unwrap();
        let options = &connector.descriptor().options;
        assert_eq!(options.default_network.as_deref(), Some("TRC20"));
        assert_eq!(options.networks.get("ERC20").map(String::as_str), Some("ETH"));
    }
}
