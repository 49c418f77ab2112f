use crate::core::errors::{ExchangeError, ResultExt};
use crate::core::kernel::RestClient;
use crate::core::pagination::{
    filter_by_since_limit, paginate, parse_timeframe, PageRequest, PaginationMode, DEFAULT_MAX_PAGES,
};
use crate::core::safe;
use crate::core::traits::{FundingRateSource, MarketDataSource};
use crate::core::types::{FetchParams, FundingRate, Market, Ohlcv, OrderBook, Params, Ticker, Trade};
use crate::exchanges::lbank::conversions::{
    convert_lbank_funding_rate, convert_lbank_ohlcv, convert_lbank_ticker, convert_lbank_trade, resolve_market,
};
use crate::exchanges::lbank::requests::{ohlcv_request, swap_request, trades_request};
use crate::exchanges::lbank::rest::LbankRest;
use crate::exchanges::lbank::types::DEFAULT_BOOK_DEPTH;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::instrument;

/// LBank public market data for spot pairs and USDT perpetuals.
pub struct MarketData<R: RestClient> {
    rest: LbankRest<R>,
}

impl<R: RestClient + Clone> MarketData<R> {
    pub fn new(rest: &LbankRest<R>) -> Self {
        Self { rest: rest.clone() }
    }
}

impl<R: RestClient> MarketData<R> {
    /// Every perpetual's ticker and funding snapshot in one list.
    async fn swap_market_data(&self) -> Result<Vec<Value>, ExchangeError> {
        let response = self
            .rest
            .contract("cfd/openApi/v1/pub/marketData", swap_request())
            .await?;
        Ok(safe::array(&response, "data").to_vec())
    }

    async fn fetch_ohlcv_page(
        &self,
        market: &Market,
        interval: &str,
        timeframe_ms: i64,
        since: Option<i64>,
        limit: Option<usize>,
        extra: &Params,
    ) -> Result<Vec<Ohlcv>, ExchangeError> {
        let mut request = ohlcv_request(market, interval, timeframe_ms, since, limit);
        request.extend(extra.clone());
        let response = self.rest.public("kline", request).await?;
        Ok(safe::array(&response, "data")
            .iter()
            .filter_map(convert_lbank_ohlcv)
            .collect())
    }

    fn swap_market(&self, symbol: &str) -> Result<Arc<Market>, ExchangeError> {
        let market = self.rest.markets().market(symbol)?;
        if !market.is_contract() {
            return Err(ExchangeError::BadSymbol(format!(
                "lbank funding rates are only available for swap markets, got {}",
                symbol
            )));
        }
        Ok(market)
    }
}

#[async_trait]
impl<R: RestClient> MarketDataSource for MarketData<R> {
    #[instrument(skip(self), fields(exchange = "lbank"))]
    async fn load_markets(&self, reload: bool) -> Result<Vec<Market>, ExchangeError> {
        self.rest
            .load_markets(reload)
            .await
            .with_exchange_context("lbank", "load_markets")
    }

    #[instrument(skip(self), fields(exchange = "lbank"))]
    async fn fetch_markets(&self) -> Result<Vec<Market>, ExchangeError> {
        self.rest
            .fetch_markets()
            .await
            .with_exchange_context("lbank", "fetch_markets")
    }

    #[instrument(skip(self), fields(exchange = "lbank"))]
    async fn fetch_ticker(&self, symbol: &str) -> Result<Ticker, ExchangeError> {
        let market = self.rest.market(symbol).await?;
        if market.is_contract() {
            let entries = self.swap_market_data().await?;
            let raw = entries
                .iter()
                .find(|raw| safe::string(raw, "symbol").as_deref() == Some(market.id.as_str()))
                .ok_or_else(|| ExchangeError::BadSymbol(format!("lbank returned no ticker for {}", market.id)))?;
            return Ok(convert_lbank_ticker(raw, &market));
        }

        let mut request = Params::new();
        request.insert("symbol".to_string(), json!(market.id));
        let response = self.rest.public("ticker/24hr", request).await?;
        let raw = safe::array(&response, "data")
            .first()
            .ok_or_else(|| ExchangeError::BadSymbol(format!("lbank returned no ticker for {}", market.id)))?;
        Ok(convert_lbank_ticker(raw, &market))
    }

    /// Spot tickers by default; perpetual tickers when every requested
    /// symbol is a contract.
    #[instrument(skip(self), fields(exchange = "lbank"))]
    async fn fetch_tickers(&self, symbols: Option<&[String]>) -> Result<BTreeMap<String, Ticker>, ExchangeError> {
        self.rest.ensure_markets().await?;
        let contracts = match symbols {
            Some(symbols) if !symbols.is_empty() => {
                let mut all_contracts = true;
                for symbol in symbols {
                    all_contracts &= self.rest.markets().market(symbol)?.is_contract();
                }
                all_contracts
            }
            _ => false,
        };

        let entries = if contracts {
            self.swap_market_data().await?
        } else {
            let mut request = Params::new();
            request.insert("symbol".to_string(), json!("all"));
            let response = self.rest.public("ticker/24hr", request).await?;
            safe::array(&response, "data").to_vec()
        };

        let mut tickers = BTreeMap::new();
        for raw in &entries {
            let Some(market) = safe::string(raw, "symbol").and_then(|id| resolve_market(self.rest.markets(), &id))
            else {
                continue;
            };
            let symbol = market.symbol().to_string();
            if symbols.map_or(true, |wanted| wanted.contains(&symbol)) {
                tickers.insert(symbol, convert_lbank_ticker(raw, &market));
            }
        }
        Ok(tickers)
    }

    #[instrument(skip(self), fields(exchange = "lbank"))]
    async fn fetch_order_book(&self, symbol: &str, limit: Option<usize>) -> Result<OrderBook, ExchangeError> {
        let market = self.rest.market(symbol).await?;
        let depth = limit.unwrap_or(DEFAULT_BOOK_DEPTH);

        let (response, price_key, amount_key) = if market.is_contract() {
            let mut request = swap_request();
            request.insert("symbol".to_string(), json!(market.id));
            request.insert("depth".to_string(), json!(depth));
            let response = self.rest.contract("cfd/openApi/v1/pub/marketOrder", request).await?;
            (response, "price", "volume")
        } else {
            let mut request = Params::new();
            request.insert("symbol".to_string(), json!(market.id));
            request.insert("size".to_string(), json!(depth));
            (self.rest.public("depth", request).await?, "price", "amount")
        };

        let data = safe::value(&response, "data").unwrap_or(&Value::Null);
        Ok(OrderBook::from_levels(
            market.symbol(),
            safe::array(data, "bids"),
            safe::array(data, "asks"),
            price_key,
            amount_key,
            safe::integer(data, "timestamp"),
        ))
    }

    #[instrument(skip(self, params), fields(exchange = "lbank"))]
    async fn fetch_trades(&self, symbol: &str, params: FetchParams) -> Result<Vec<Trade>, ExchangeError> {
        let market = self.rest.market(symbol).await?;
        if market.is_contract() {
            return Err(ExchangeError::NotSupported(
                "lbank fetch_trades() supports spot markets only".to_string(),
            ));
        }
        let mut request = trades_request(&market, params.since, params.limit);
        request.extend(params.extra.clone());
        let response = self.rest.public("trades", request).await?;
        let trades = safe::array(&response, "data")
            .iter()
            .map(|raw| convert_lbank_trade(raw, Some(&market)))
            .collect();
        Ok(filter_by_since_limit(trades, &params))
    }

    #[instrument(skip(self, params), fields(exchange = "lbank"))]
    async fn fetch_ohlcv(&self, symbol: &str, timeframe: &str, params: FetchParams) -> Result<Vec<Ohlcv>, ExchangeError> {
        let market = self.rest.market(symbol).await?;
        let interval = self.rest.descriptor().timeframe(timeframe)?.to_string();
        let timeframe_ms = parse_timeframe(timeframe)
            .map(|secs| secs * 1000)
            .ok_or_else(|| ExchangeError::NotSupported(format!("lbank does not support timeframe {}", timeframe)))?;

        if !params.paginate {
            let candles = self
                .fetch_ohlcv_page(&market, &interval, timeframe_ms, params.since, params.limit, &params.extra)
                .await?;
            return Ok(filter_by_since_limit(candles, &params));
        }

        let mode = PaginationMode::TimeWindow {
            window: self.rest.descriptor().options.ohlcv_page_size,
            step_ms: timeframe_ms,
        };
        let (market, interval, extra) = (&market, interval.as_str(), &params.extra);
        paginate(&mode, &params, DEFAULT_MAX_PAGES, move |page: PageRequest| {
            self.fetch_ohlcv_page(market, interval, timeframe_ms, page.since, page.limit, extra)
        })
        .await
        .with_exchange_context("lbank", "fetch_ohlcv")
    }

    async fn fetch_time(&self) -> Result<i64, ExchangeError> {
        self.rest.server_time().await
    }
}

#[async_trait]
impl<R: RestClient> FundingRateSource for MarketData<R> {
    #[instrument(skip(self), fields(exchange = "lbank"))]
    async fn fetch_funding_rate(&self, symbol: &str) -> Result<FundingRate, ExchangeError> {
        self.rest.ensure_markets().await?;
        let market = self.swap_market(symbol)?;
        let entries = self.swap_market_data().await?;
        let raw = entries
            .iter()
            .find(|raw| safe::string(raw, "symbol").as_deref() == Some(market.id.as_str()))
            .ok_or_else(|| ExchangeError::BadSymbol(format!("lbank returned no funding rate for {}", market.id)))?;
        Ok(convert_lbank_funding_rate(raw, market.symbol()))
    }

    #[instrument(skip(self), fields(exchange = "lbank"))]
    async fn fetch_funding_rates(
        &self,
        symbols: Option<&[String]>,
    ) -> Result<BTreeMap<String, FundingRate>, ExchangeError> {
        self.rest.ensure_markets().await?;
        for symbol in symbols.unwrap_or_default() {
            self.swap_market(symbol)?;
        }
        let entries = self.swap_market_data().await?;

        let mut rates = BTreeMap::new();
        for raw in &entries {
            let Some(market) = safe::string(raw, "symbol").and_then(|id| self.rest.markets().get(&id)) else {
                continue;
            };
            let symbol = market.symbol().to_string();
            if symbols.map_or(true, |wanted| wanted.contains(&symbol)) {
                rates.insert(symbol.clone(), convert_lbank_funding_rate(raw, &symbol));
            }
        }
        Ok(rates)
    }
}
