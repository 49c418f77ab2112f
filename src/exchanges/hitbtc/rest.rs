use crate::core::config::ExchangeDescriptor;
use crate::core::errors::ExchangeError;
use crate::core::kernel::signer::with_query;
use crate::core::kernel::{ErrorClassifier, HttpRequest, RequestParts, RestClient, Signer};
use crate::core::markets::MarketCache;
use crate::core::types::{Currency, Market, Params};
use crate::exchanges::hitbtc::conversions::{convert_hitbtc_currency, convert_hitbtc_market};
use crate::exchanges::hitbtc::errors::check_response;
use crate::exchanges::hitbtc::signer::HitbtcSigner;
use crate::exchanges::hitbtc::types::INVALID_SYMBOL_SUFFIX;
use reqwest::Method;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, instrument, trace};

/// HitBTC v3 REST API client.
pub struct HitbtcRest<R: RestClient> {
    rest_client: R,
    rest_url: String,
    signer: Option<Arc<HitbtcSigner>>,
    classifier: Arc<ErrorClassifier>,
    markets: Arc<MarketCache>,
    descriptor: Arc<ExchangeDescriptor>,
}

impl<R: RestClient + Clone> Clone for HitbtcRest<R> {
    fn clone(&self) -> Self {
        Self {
            rest_client: self.rest_client.clone(),
            rest_url: self.rest_url.clone(),
            signer: self.signer.clone(),
            classifier: Arc::clone(&self.classifier),
            markets: Arc::clone(&self.markets),
            descriptor: Arc::clone(&self.descriptor),
        }
    }
}

impl<R: RestClient> HitbtcRest<R> {
    pub fn new(
        rest_client: R,
        rest_url: String,
        signer: Option<Arc<HitbtcSigner>>,
        descriptor: Arc<ExchangeDescriptor>,
    ) -> Self {
        Self {
            rest_client,
            rest_url,
            signer,
            classifier: Arc::new(crate::exchanges::hitbtc::errors::classifier(&descriptor)),
            markets: Arc::new(MarketCache::new(descriptor.common_currencies.clone())),
            descriptor,
        }
    }

    pub fn markets(&self) -> &MarketCache {
        &self.markets
    }

    pub fn descriptor(&self) -> &ExchangeDescriptor {
        &self.descriptor
    }

    pub fn has_credentials(&self) -> bool {
        self.signer.is_some()
    }

    async fn dispatch(&self, request: HttpRequest) -> Result<Value, ExchangeError> {
        let response = self.rest_client.send(request).await?;
        trace!(status = response.status, "Response body: {}", response.body);
        check_response(&self.classifier, &response)
    }

    #[instrument(skip(self, params), fields(exchange = "hitbtc", method = "GET", endpoint = %path))]
    pub async fn public(&self, path: &str, params: Params) -> Result<Value, ExchangeError> {
        let url = format!("{}/{}", self.rest_url, path);
        self.dispatch(HttpRequest::new(Method::GET, with_query(url, &params)))
            .await
    }

    /// Signed call; GET and DELETE send `params` as a query, other methods
    /// as a JSON body.
    #[instrument(skip(self, params), fields(exchange = "hitbtc", method = %method, endpoint = %path))]
    pub async fn private(&self, method: Method, path: &str, params: Params) -> Result<Value, ExchangeError> {
        let signer = self.signer.as_ref().ok_or_else(|| {
            ExchangeError::Authentication(format!("hitbtc {} requires API credentials", path))
        })?;
        let parts = RequestParts::new(method, self.rest_url.as_str(), path, params);
        let request = signer.sign_request(&parts, signer.nonces().next())?;
        self.dispatch(request).await
    }

    fn parse_currencies(&self, response: &Value) -> Vec<Currency> {
        let networks_by_id = &self.descriptor.options.networks_by_id;
        response
            .as_object()
            .into_iter()
            .flatten()
            .map(|(id, raw)| convert_hitbtc_currency(&self.markets, id, raw, networks_by_id))
            .collect()
    }

    pub async fn fetch_currencies(&self) -> Result<Vec<Currency>, ExchangeError> {
        let response = self.public("public/currency", Params::new()).await?;
        Ok(self.parse_currencies(&response))
    }

    /// Symbols and currencies are fetched together; currencies are stored
    /// first so market codes resolve through them.
    pub async fn fetch_markets(&self) -> Result<Vec<Market>, ExchangeError> {
        let (symbols, currencies) = tokio::try_join!(
            self.public("public/symbol", Params::new()),
            self.public("public/currency", Params::new()),
        )?;
        self.markets.replace_currencies(self.parse_currencies(&currencies));

        Ok(symbols
            .as_object()
            .into_iter()
            .flatten()
            .filter(|(id, _)| !id.ends_with(INVALID_SYMBOL_SUFFIX))
            .filter_map(|(id, raw)| convert_hitbtc_market(&self.markets, id, raw))
            .collect())
    }

    pub async fn load_markets(&self, reload: bool) -> Result<Vec<Market>, ExchangeError> {
        if reload || !self.markets.is_loaded() {
            let markets = self.fetch_markets().await?;
            debug!(count = markets.len(), "Loaded hitbtc markets");
            self.markets.replace_all(markets);
        }
        Ok(self
            .markets
            .get_all()
            .iter()
            .map(|m| m.as_ref().clone())
            .collect())
    }

    pub async fn market(&self, symbol: &str) -> Result<Arc<Market>, ExchangeError> {
        self.ensure_markets().await?;
        self.markets.market(symbol)
    }

    pub async fn ensure_markets(&self) -> Result<(), ExchangeError> {
        if !self.markets.is_loaded() {
            self.load_markets(false).await?;
        }
        Ok(())
    }
}
