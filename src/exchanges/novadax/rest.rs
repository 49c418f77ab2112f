use crate::core::config::ExchangeDescriptor;
use crate::core::errors::ExchangeError;
use crate::core::kernel::signer::with_query;
use crate::core::kernel::{ErrorClassifier, HttpRequest, RequestParts, RestClient, Signer};
use crate::core::markets::MarketCache;
use crate::core::types::{Market, Params};
use crate::exchanges::novadax::conversions::convert_novadax_market;
use crate::exchanges::novadax::errors::check_response;
use crate::exchanges::novadax::signer::NovadaxSigner;
use crate::exchanges::novadax::types::API_VERSION;
use reqwest::Method;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, instrument, trace};

/// NovaDAX v1 REST API client. Calls return the `data` member of the
/// response envelope.
pub struct NovadaxRest<R: RestClient> {
    rest_client: R,
    rest_url: String,
    signer: Option<Arc<NovadaxSigner>>,
    classifier: Arc<ErrorClassifier>,
    markets: Arc<MarketCache>,
    descriptor: Arc<ExchangeDescriptor>,
}

impl<R: RestClient + Clone> Clone for NovadaxRest<R> {
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

impl<R: RestClient> NovadaxRest<R> {
    pub fn new(
        rest_client: R,
        rest_url: String,
        signer: Option<Arc<NovadaxSigner>>,
        descriptor: Arc<ExchangeDescriptor>,
    ) -> Self {
        Self {
            rest_client,
            rest_url,
            signer,
            classifier: Arc::new(crate::exchanges::novadax::errors::classifier(&descriptor)),
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
        let mut envelope = check_response(&self.classifier, &response)?;
        Ok(envelope.get_mut("data").map(Value::take).unwrap_or(Value::Null))
    }

    #[instrument(skip(self, params), fields(exchange = "novadax", method = "GET", endpoint = %path))]
    pub async fn public(&self, path: &str, params: Params) -> Result<Value, ExchangeError> {
        let url = format!("{}/{}/{}", self.rest_url, API_VERSION, path);
        self.dispatch(HttpRequest::new(Method::GET, with_query(url, &params)))
            .await
    }

    /// Signed call; POST sends `params` as a JSON body, GET as a query.
    #[instrument(skip(self, params), fields(exchange = "novadax", method = %method, endpoint = %path))]
    pub async fn private(&self, method: Method, path: &str, params: Params) -> Result<Value, ExchangeError> {
        let signer = self.signer.as_ref().ok_or_else(|| {
            ExchangeError::Authentication(format!("novadax {} requires API credentials", path))
        })?;
        let parts = RequestParts::new(method, self.rest_url.as_str(), path, params);
        let request = signer.sign_request(&parts, signer.nonces().next())?;
        self.dispatch(request).await
    }

    /// Server time in milliseconds.
    pub async fn server_time(&self) -> Result<i64, ExchangeError> {
        let data = self.public("common/timestamp", Params::new()).await?;
        data.as_i64()
            .or_else(|| data.as_str().and_then(|s| s.parse().ok()))
            .ok_or_else(|| ExchangeError::Deserialization(format!("novadax returned no server time: {}", data)))
    }

    pub async fn fetch_markets(&self) -> Result<Vec<Market>, ExchangeError> {
        let data = self.public("common/symbols", Params::new()).await?;
        Ok(data
            .as_array()
            .map(Vec::as_slice)
            .unwrap_or_default()
            .iter()
            .filter_map(|raw| convert_novadax_market(&self.markets, raw))
            .collect())
    }

    pub async fn load_markets(&self, reload: bool) -> Result<Vec<Market>, ExchangeError> {
        if reload || !self.markets.is_loaded() {
            let markets = self.fetch_markets().await?;
            debug!(count = markets.len(), "Loaded novadax markets");
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
