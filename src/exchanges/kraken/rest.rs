use crate::core::config::ExchangeDescriptor;
use crate::core::errors::ExchangeError;
use crate::core::kernel::signer::with_query;
use crate::core::kernel::{ErrorClassifier, HttpRequest, RequestParts, RestClient, Signer};
use crate::core::markets::MarketCache;
use crate::core::safe;
use crate::core::types::{Market, Params};
use crate::exchanges::kraken::conversions::{convert_kraken_currency, convert_kraken_market};
use crate::exchanges::kraken::errors::check_response;
use crate::exchanges::kraken::signer::KrakenSigner;
use crate::exchanges::kraken::types::{KrakenServerTime, API_VERSION};
use reqwest::Method;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, instrument, trace};

/// Kraken REST API client.
///
/// Owns the transport, the optional signer and the market cache shared by
/// every connector half.
pub struct KrakenRest<R: RestClient> {
    rest_client: R,
    base_url: String,
    signer: Option<Arc<KrakenSigner>>,
    /// Held from nonce issue until the response arrives, so nonces reach
    /// Kraken in the order they were issued.
    nonce_gate: Arc<Mutex<()>>,
    classifier: Arc<ErrorClassifier>,
    markets: Arc<MarketCache>,
    descriptor: Arc<ExchangeDescriptor>,
}

impl<R: RestClient + Clone> Clone for KrakenRest<R> {
    fn clone(&self) -> Self {
        Self {
            rest_client: self.rest_client.clone(),
            base_url: self.base_url.clone(),
            signer: self.signer.clone(),
            nonce_gate: Arc::clone(&self.nonce_gate),
            classifier: Arc::clone(&self.classifier),
            markets: Arc::clone(&self.markets),
            descriptor: Arc::clone(&self.descriptor),
        }
    }
}

impl<R: RestClient> KrakenRest<R> {
    pub fn new(
        rest_client: R,
        base_url: String,
        signer: Option<Arc<KrakenSigner>>,
        descriptor: Arc<ExchangeDescriptor>,
    ) -> Self {
        Self {
            rest_client,
            base_url,
            signer,
            nonce_gate: Arc::new(Mutex::new(())),
            classifier: Arc::new(crate::exchanges::kraken::errors::classifier(&descriptor)),
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

    async fn dispatch(&self, request: HttpRequest) -> Result<Value, ExchangeError> {
        let response = self.rest_client.send(request).await?;
        trace!(status = response.status, "Response body: {}", response.body);
        let json = check_response(&self.classifier, &response)?;
        Ok(json.get("result").cloned().unwrap_or(Value::Null))
    }

    /// `GET /0/public/{path}`, returning the `result` member.
    #[instrument(skip(self, params), fields(exchange = "kraken", method = "GET", endpoint = %path))]
    pub async fn public(&self, path: &str, params: Params) -> Result<Value, ExchangeError> {
        let url = format!("{}/{}/public/{}", self.base_url, API_VERSION, path);
        self.dispatch(HttpRequest::new(Method::GET, with_query(url, &params)))
            .await
    }

    /// Signed `POST /0/private/{path}`, returning the `result` member.
    #[instrument(skip(self, params), fields(exchange = "kraken", method = "POST", endpoint = %path))]
    pub async fn private(&self, path: &str, params: Params) -> Result<Value, ExchangeError> {
        let signer = self.signer.as_ref().ok_or_else(|| {
            ExchangeError::Authentication(format!(
                "kraken {} requires API credentials",
                path
            ))
        })?;
        let parts = RequestParts::new(Method::POST, self.base_url.as_str(), path, params);
        let _gate = self.nonce_gate.lock().await;
        let request = signer.sign_request(&parts, signer.nonces().next())?;
        self.dispatch(request).await
    }

    /// Server time in milliseconds.
    pub async fn server_time(&self) -> Result<i64, ExchangeError> {
        let result = self.public("Time", Params::new()).await?;
        let time: KrakenServerTime = serde_json::from_value(result).map_err(|e| {
            ExchangeError::Deserialization(format!("Failed to parse kraken server time: {}", e))
        })?;
        Ok(time.unixtime * 1000)
    }

    async fn time_offset(&self) -> Result<Option<i64>, ExchangeError> {
        if !self.descriptor.options.adjust_for_time_difference {
            return Ok(None);
        }
        let server = self.server_time().await?;
        Ok(Some(server - safe::milliseconds()))
    }

    /// Assets, asset pairs and (optionally) the clock are fetched together.
    /// Currencies are parsed first so pair bases and quotes use their codes.
    pub async fn fetch_markets(&self) -> Result<Vec<Market>, ExchangeError> {
        let (assets, pairs, offset) = tokio::try_join!(
            self.public("Assets", Params::new()),
            self.public("AssetPairs", Params::new()),
            self.time_offset(),
        )?;

        if let (Some(offset), Some(signer)) = (offset, &self.signer) {
            debug!(offset_ms = offset, "Adjusting nonce clock to server time");
            signer.nonces().set_offset(offset);
        }

        let currencies = assets
            .as_object()
            .map(|entries| {
                entries
                    .iter()
                    .map(|(id, raw)| convert_kraken_currency(&self.markets, id, raw))
                    .collect()
            })
            .unwrap_or_default();
        self.markets.replace_currencies(currencies);

        Ok(pairs
            .as_object()
            .map(|entries| {
                entries
                    .iter()
                    .map(|(id, raw)| convert_kraken_market(&self.markets, id, raw))
                    .collect()
            })
            .unwrap_or_default())
    }

    pub async fn load_markets(&self, reload: bool) -> Result<Vec<Market>, ExchangeError> {
        if reload || !self.markets.is_loaded() {
            let markets = self.fetch_markets().await?;
            debug!(count = markets.len(), "Loaded kraken markets");
            self.markets.replace_all(markets);
        }
        Ok(self
            .markets
            .get_all()
            .iter()
            .map(|m| m.as_ref().clone())
            .collect())
    }

    /// Market for a unified symbol, loading the cache on first use.
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
