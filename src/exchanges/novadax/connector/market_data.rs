use crate::core::errors::{ExchangeError, ResultExt};
use crate::core::kernel::RestClient;
use crate::core::pagination::{
    filter_by_since_limit, paginate, parse_timeframe, PageRequest, PaginationMode, DEFAULT_MAX_PAGES,
};
use crate::core::safe;
use crate::core::traits::MarketDataSource;
use crate::core::types::{FetchParams, Market, Ohlcv, OrderBook, Params, Ticker, Trade};
use crate::exchanges::novadax::conversions::{
    convert_novadax_ohlcv, convert_novadax_ticker, convert_novadax_trade, resolve_market,
};
use crate::exchanges::novadax::requests::{ohlcv_request, trades_request};
use crate::exchanges::novadax::rest::NovadaxRest;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use tracing::instrument;

fn entries(data: &Value) -> &[Value] {
    data.as_array().map(Vec::as_slice).unwrap_or_default()
}

/// NovaDAX public market data.
pub struct MarketData<R: RestClient> {
    rest: NovadaxRest<R>,
}

impl<R: RestClient + Clone> MarketData<R> {
    pub fn new(rest: &NovadaxRest<R>) -> Self {
        Self { rest: rest.clone() }
    }
}

impl<R: RestClient> MarketData<R> {
    /// Candles carry base volume in `amount` and quote volume in `vol`;
    /// `volume: "vol"` in the extra parameters selects the latter.
    async fn fetch_ohlcv_page(
        &self,
        market: &Market,
        unit: &str,
        timeframe_secs: i64,
        page: PageRequest,
        volume_key: &str,
    ) -> Result<Vec<Ohlcv>, ExchangeError> {
        let request = ohlcv_request(&market.id, unit, timeframe_secs, page.since, page.until, page.limit);
        let data = self.rest.public("market/kline/history", request).await?;
        Ok(entries(&data)
            .iter()
            .filter_map(|raw| convert_novadax_ohlcv(raw, volume_key))
            .collect())
    }
}

#[async_trait]
impl<R: RestClient> MarketDataSource for MarketData<R> {
    #[instrument(skip(self), fields(exchange = "novadax"))]
    async fn load_markets(&self, reload: bool) -> Result<Vec<Market>, ExchangeError> {
        self.rest
            .load_markets(reload)
            .await
            .with_exchange_context("novadax", "load_markets")
    }

    #[instrument(skip(self), fields(exchange = "novadax"))]
    async fn fetch_markets(&self) -> Result<Vec<Market>, ExchangeError> {
        self.rest
            .fetch_markets()
            .await
            .with_exchange_context("novadax", "fetch_markets")
    }

    #[instrument(skip(self), fields(exchange = "novadax"))]
    async fn fetch_ticker(&self, symbol: &str) -> Result<Ticker, ExchangeError> {
        let market = self.rest.market(symbol).await?;
        let mut request = Params::new();
        request.insert("symbol".to_string(), json!(market.id));
        let data = self
            .rest
            .public("market/ticker", request)
            .await
            .with_exchange_context("novadax", "fetch_ticker")?;
        Ok(convert_novadax_ticker(&data, &market))
    }

    #[instrument(skip(self), fields(exchange = "novadax"))]
    async fn fetch_tickers(&self, symbols: Option<&[String]>) -> Result<BTreeMap<String, Ticker>, ExchangeError> {
        self.rest.ensure_markets().await?;
        let data = self
            .rest
            .public("market/tickers", Params::new())
            .await
            .with_exchange_context("novadax", "fetch_tickers")?;

        let mut tickers = BTreeMap::new();
        for raw in entries(&data) {
            let Some(market) = safe::string(raw, "symbol").and_then(|id| resolve_market(self.rest.markets(), &id))
            else {
                continue;
            };
            let symbol = market.symbol().to_string();
            if symbols.map_or(true, |wanted| wanted.contains(&symbol)) {
                tickers.insert(symbol, convert_novadax_ticker(raw, &market));
            }
        }
        Ok(tickers)
    }

    #[instrument(skip(self), fields(exchange = "novadax"))]
    async fn fetch_order_book(&self, symbol: &str, limit: Option<usize>) -> Result<OrderBook, ExchangeError> {
        let market = self.rest.market(symbol).await?;
        let mut request = Params::new();
        request.insert("symbol".to_string(), json!(market.id));
        if let Some(limit) = limit {
            request.insert("limit".to_string(), json!(limit));
        }
        let data = self.rest.public("market/depth", request).await?;
        Ok(OrderBook::from_levels(
            market.symbol(),
            safe::array(&data, "bids"),
            safe::array(&data, "asks"),
            "price",
            "amount",
            safe::integer(&data, "timestamp"),
        ))
    }

    #[instrument(skip(self, params), fields(exchange = "novadax"))]
    async fn fetch_trades(&self, symbol: &str, params: FetchParams) -> Result<Vec<Trade>, ExchangeError> {
        let market = self.rest.market(symbol).await?;
        let mut request = trades_request(&market.id, params.limit);
        request.extend(params.extra.clone());
        let data = self.rest.public("market/trades", request).await?;
        let trades = entries(&data)
            .iter()
            .map(|raw| convert_novadax_trade(self.rest.markets(), raw, Some(&market)))
            .collect();
        Ok(filter_by_since_limit(trades, &params))
    }

    #[instrument(skip(self, params), fields(exchange = "novadax"))]
    async fn fetch_ohlcv(&self, symbol: &str, timeframe: &str, params: FetchParams) -> Result<Vec<Ohlcv>, ExchangeError> {
        let market = self.rest.market(symbol).await?;
        let unit = self.rest.descriptor().timeframe(timeframe)?.to_string();
        let timeframe_secs = parse_timeframe(timeframe)
            .ok_or_else(|| ExchangeError::NotSupported(format!("novadax does not support timeframe {}", timeframe)))?;
        let volume_key = match params.extra.get("volume").and_then(Value::as_str) {
            Some("vol") => "vol",
            _ => "amount",
        };

        if !params.paginate {
            let page = PageRequest {
                since: params.since,
                until: params.until,
                limit: params.limit,
                ..PageRequest::default()
            };
            let candles = self
                .fetch_ohlcv_page(&market, &unit, timeframe_secs, page, volume_key)
                .await
                .with_exchange_context("novadax", "fetch_ohlcv")?;
            return Ok(filter_by_since_limit(candles, &params));
        }

        let mode = PaginationMode::TimeWindow {
            window: self.rest.descriptor().options.ohlcv_page_size,
            step_ms: timeframe_secs * 1000,
        };
        let (market, unit) = (&market, unit.as_str());
        paginate(&mode, &params, DEFAULT_MAX_PAGES, move |page: PageRequest| {
            self.fetch_ohlcv_page(market, unit, timeframe_secs, page, volume_key)
        })
        .await
        .with_exchange_context("novadax", "fetch_ohlcv")
    }

    #[instrument(skip(self), fields(exchange = "novadax"))]
    async fn fetch_time(&self) -> Result<i64, ExchangeError> {
        self.rest
            .server_time()
            .await
            .with_exchange_context("novadax", "fetch_time")
    }
}
