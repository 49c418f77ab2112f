use crate::core::config::ExchangeDescriptor;
use crate::core::errors::ExchangeError;
use crate::core::kernel::signer::with_query;
use crate::core::kernel::{ErrorClassifier, HttpRequest, RequestParts, RestClient, Signer};
use crate::core::markets::MarketCache;
use crate::core::safe;
use crate::core::types::{Market, Params};
use crate::exchanges::lbank::conversions::{convert_lbank_spot_market, convert_lbank_swap_market};
use crate::exchanges::lbank::errors::check_response;
use crate::exchanges::lbank::requests::swap_request;
use crate::exchanges::lbank::signer::LbankSigner;
use crate::exchanges::lbank::types::API_VERSION;
use reqwest::Method;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, instrument, trace};

/// LBank REST API client for the spot (`/v2/*.do`) and contract hosts.
pub struct LbankRest<R: RestClient> {
    rest_client: R,
    rest_url: String,
    contract_url: String,
    signer: Option<Arc<LbankSigner>>,
    classifier: Arc<ErrorClassifier>,
    markets: Arc<MarketCache>,
    descriptor: Arc<ExchangeDescriptor>,
}

impl<R: RestClient + Clone> Clone for LbankRest<R> {
    fn clone(&self) -> Self {
        Self {
            rest_client: self.rest_client.clone(),
            rest_url: self.rest_url.clone(),
            contract_url: self.contract_url.clone(),
            signer: self.signer.clone(),
            classifier: Arc::clone(&self.classifier),
            markets: Arc::clone(&self.markets),
            descriptor: Arc::clone(&self.descriptor),
        }
    }
}

impl<R: RestClient> LbankRest<R> {
    pub fn new(
        rest_client: R,
        rest_url: String,
        contract_url: String,
        signer: Option<Arc<LbankSigner>>,
        descriptor: Arc<ExchangeDescriptor>,
    ) -> Self {
        Self {
            rest_client,
            rest_url,
            contract_url,
            signer,
            classifier: Arc::new(crate::exchanges::lbank::errors::classifier(&descriptor)),
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

    /// `GET /v2/{path}.do`, returning the whole envelope.
    #[instrument(skip(self, params), fields(exchange = "lbank", method = "GET", endpoint = %path))]
    pub async fn public(&self, path: &str, params: Params) -> Result<Value, ExchangeError> {
        let url = format!("{}/{}/{}.do", self.rest_url, API_VERSION, path);
        self.dispatch(HttpRequest::new(Method::GET, with_query(url, &params)))
            .await
    }

    /// `GET {contract}/{path}` on the perpetual host.
    #[instrument(skip(self, params), fields(exchange = "lbank", method = "GET", endpoint = %path))]
    pub async fn contract(&self, path: &str, params: Params) -> Result<Value, ExchangeError> {
        let url = format!("{}/{}", self.contract_url, path);
        self.dispatch(HttpRequest::new(Method::GET, with_query(url, &params)))
            .await
    }

    /// Signed form `POST /v2/{path}.do`, returning the whole envelope.
    #[instrument(skip(self, params), fields(exchange = "lbank", method = "POST", endpoint = %path))]
    pub async fn private(&self, path: &str, params: Params) -> Result<Value, ExchangeError> {
        let signer = self.signer.as_ref().ok_or_else(|| {
            ExchangeError::Authentication(format!("lbank {} requires API credentials", path))
        })?;
        let parts = RequestParts::new(Method::POST, self.rest_url.as_str(), path, params);
        let request = signer.sign_request(&parts, signer.nonces().next())?;
        self.dispatch(request).await
    }

    /// Server time in milliseconds.
    pub async fn server_time(&self) -> Result<i64, ExchangeError> {
        let response = self.public("timestamp", Params::new()).await?;
        safe::integer(&response, "data").ok_or_else(|| {
            ExchangeError::Deserialization(format!("lbank returned no server time: {}", response))
        })
    }

    async fn time_offset(&self) -> Result<Option<i64>, ExchangeError> {
        if !self.descriptor.options.adjust_for_time_difference {
            return Ok(None);
        }
        let server = self.server_time().await?;
        Ok(Some(server - safe::milliseconds()))
    }

    /// Spot pairs and USDT perpetuals are listed on different hosts and
    /// fetched together.
    pub async fn fetch_markets(&self) -> Result<Vec<Market>, ExchangeError> {
        let (spot, swap, offset) = tokio::try_join!(
            self.public("accuracy", Params::new()),
            self.contract("cfd/openApi/v1/pub/instrument", swap_request()),
            self.time_offset(),
        )?;

        if let (Some(offset), Some(signer)) = (offset, &self.signer) {
            debug!(offset_ms = offset, "Adjusting nonce clock to server time");
            signer.nonces().set_offset(offset);
        }

        let spot_markets = safe::array(&spot, "data")
            .iter()
            .filter_map(|raw| convert_lbank_spot_market(&self.markets, raw));
        let swap_markets = safe::array(&swap, "data")
            .iter()
            .filter_map(|raw| convert_lbank_swap_market(&self.markets, raw));
        Ok(spot_markets.chain(swap_markets).collect())
    }

    pub async fn load_markets(&self, reload: bool) -> Result<Vec<Market>, ExchangeError> {
        if reload || !self.markets.is_loaded() {
            let markets = self.fetch_markets().await?;
            debug!(count = markets.len(), "Loaded lbank markets");
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
