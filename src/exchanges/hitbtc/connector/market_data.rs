use crate::core::errors::{ExchangeError, ResultExt};
use crate::core::kernel::RestClient;
use crate::core::pagination::{
    filter_by_since_limit, paginate, parse_timeframe, PageRequest, PaginationMode, DEFAULT_MAX_PAGES,
};
use crate::core::safe;
use crate::core::traits::{FundingRateSource, MarketDataSource};
use crate::core::types::{Currency, FetchParams, FundingRate, Market, Ohlcv, OrderBook, Params, Ticker, Trade};
use crate::exchanges::hitbtc::conversions::{
    convert_hitbtc_funding_rate, convert_hitbtc_ohlcv, convert_hitbtc_ticker, convert_hitbtc_trade, resolve_market,
};
use crate::exchanges::hitbtc::requests::{ohlcv_request, trades_request};
use crate::exchanges::hitbtc::rest::HitbtcRest;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::instrument;

/// Candle series selected by the `price` extra parameter.
fn candles_path(price: Option<&str>, market_id: &str) -> Result<String, ExchangeError> {
    let prefix = match price {
        None => "public/candles",
        Some("mark") => "public/futures/candles/mark_price",
        Some("index") => "public/futures/candles/index_price",
        Some("premiumIndex") => "public/futures/candles/premium_index",
        Some(other) => {
            return Err(ExchangeError::BadRequest(format!(
                "hitbtc fetch_ohlcv() price must be mark, index or premiumIndex, got {}",
                other
            )))
        }
    };
    Ok(format!("{}/{}", prefix, market_id))
}

/// HitBTC public market data.
pub struct MarketData<R: RestClient> {
    rest: HitbtcRest<R>,
}

impl<R: RestClient + Clone> MarketData<R> {
    pub fn new(rest: &HitbtcRest<R>) -> Self {
        Self { rest: rest.clone() }
    }
}

impl<R: RestClient> MarketData<R> {
    fn tickers_from_map(&self, response: &Value, symbols: Option<&[String]>) -> BTreeMap<String, Ticker> {
        let mut tickers = BTreeMap::new();
        for (id, raw) in response.as_object().into_iter().flatten() {
            let Some(market) = resolve_market(self.rest.markets(), id) else {
                continue;
            };
            let symbol = market.symbol().to_string();
            if symbols.map_or(true, |wanted| wanted.contains(&symbol)) {
                tickers.insert(symbol, convert_hitbtc_ticker(raw, &market));
            }
        }
        tickers
    }

    async fn fetch_ohlcv_page(
        &self,
        path: &str,
        period: &str,
        page: PageRequest,
        extra: &Params,
    ) -> Result<Vec<Ohlcv>, ExchangeError> {
        let mut request = ohlcv_request(period, page.since, page.until, page.limit);
        request.extend(extra.clone());
        let response = self.rest.public(path, request).await?;
        Ok(response
            .as_array()
            .map(Vec::as_slice)
            .unwrap_or_default()
            .iter()
            .filter_map(convert_hitbtc_ohlcv)
            .collect())
    }

    fn swap_market(&self, symbol: &str) -> Result<Arc<Market>, ExchangeError> {
        let market = self.rest.markets().market(symbol)?;
        if !market.is_contract() {
            return Err(ExchangeError::BadSymbol(format!(
                "hitbtc funding rates are only available for swap markets, got {}",
                symbol
            )));
        }
        Ok(market)
    }
}

#[async_trait]
impl<R: RestClient> MarketDataSource for MarketData<R> {
    #[instrument(skip(self), fields(exchange = "hitbtc"))]
    async fn load_markets(&self, reload: bool) -> Result<Vec<Market>, ExchangeError> {
        self.rest
            .load_markets(reload)
            .await
            .with_exchange_context("hitbtc", "load_markets")
    }

    #[instrument(skip(self), fields(exchange = "hitbtc"))]
    async fn fetch_markets(&self) -> Result<Vec<Market>, ExchangeError> {
        self.rest
            .fetch_markets()
            .await
            .with_exchange_context("hitbtc", "fetch_markets")
    }

    #[instrument(skip(self), fields(exchange = "hitbtc"))]
    async fn fetch_currencies(&self) -> Result<Vec<Currency>, ExchangeError> {
        self.rest
            .fetch_currencies()
            .await
            .with_exchange_context("hitbtc", "fetch_currencies")
    }

    #[instrument(skip(self), fields(exchange = "hitbtc"))]
    async fn fetch_ticker(&self, symbol: &str) -> Result<Ticker, ExchangeError> {
        let market = self.rest.market(symbol).await?;
        let response = self
            .rest
            .public(&format!("public/ticker/{}", market.id), Params::new())
            .await
            .with_exchange_context("hitbtc", "fetch_ticker")?;
        Ok(convert_hitbtc_ticker(&response, &market))
    }

    #[instrument(skip(self), fields(exchange = "hitbtc"))]
    async fn fetch_tickers(&self, symbols: Option<&[String]>) -> Result<BTreeMap<String, Ticker>, ExchangeError> {
        self.rest.ensure_markets().await?;
        let mut request = Params::new();
        if let Some(symbols) = symbols.filter(|s| !s.is_empty()) {
            let mut ids = Vec::with_capacity(symbols.len());
            for symbol in symbols {
                ids.push(self.rest.markets().market(symbol)?.id.clone());
            }
            request.insert("symbols".to_string(), json!(ids.join(",")));
        }
        let response = self.rest.public("public/ticker", request).await?;
        Ok(self.tickers_from_map(&response, symbols))
    }

    #[instrument(skip(self), fields(exchange = "hitbtc"))]
    async fn fetch_order_book(&self, symbol: &str, limit: Option<usize>) -> Result<OrderBook, ExchangeError> {
        let market = self.rest.market(symbol).await?;
        let mut request = Params::new();
        if let Some(depth) = limit {
            request.insert("depth".to_string(), json!(depth));
        }
        let response = self
            .rest
            .public(&format!("public/orderbook/{}", market.id), request)
            .await?;
        Ok(OrderBook::from_levels(
            market.symbol(),
            safe::array(&response, "bid"),
            safe::array(&response, "ask"),
            "price",
            "size",
            safe::string(&response, "timestamp").and_then(|s| safe::parse8601(&s)),
        ))
    }

    #[instrument(skip(self, params), fields(exchange = "hitbtc"))]
    async fn fetch_trades(&self, symbol: &str, params: FetchParams) -> Result<Vec<Trade>, ExchangeError> {
        let market = self.rest.market(symbol).await?;
        let mut request = trades_request(params.since, params.limit);
        request.extend(params.extra.clone());
        let response = self
            .rest
            .public(&format!("public/trades/{}", market.id), request)
            .await?;
        let trades = response
            .as_array()
            .map(Vec::as_slice)
            .unwrap_or_default()
            .iter()
            .map(|raw| convert_hitbtc_trade(self.rest.markets(), raw, Some(&market)))
            .collect();
        Ok(filter_by_since_limit(trades, &params))
    }

    /// `price` in the extra parameters selects the mark, index or premium
    /// index series of a contract.
    #[instrument(skip(self, params), fields(exchange = "hitbtc"))]
    async fn fetch_ohlcv(&self, symbol: &str, timeframe: &str, params: FetchParams) -> Result<Vec<Ohlcv>, ExchangeError> {
        let market = self.rest.market(symbol).await?;
        let period = self.rest.descriptor().timeframe(timeframe)?.to_string();
        let timeframe_ms = parse_timeframe(timeframe)
            .map(|secs| secs * 1000)
            .ok_or_else(|| ExchangeError::NotSupported(format!("hitbtc does not support timeframe {}", timeframe)))?;

        let mut extra = params.extra.clone();
        let price = extra.remove("price").and_then(|v| v.as_str().map(str::to_string));
        let path = candles_path(price.as_deref(), &market.id)?;

        if !params.paginate {
            let page = PageRequest {
                since: params.since,
                until: params.until,
                limit: params.limit,
                ..PageRequest::default()
            };
            let candles = self.fetch_ohlcv_page(&path, &period, page, &extra).await?;
            return Ok(filter_by_since_limit(candles, &params));
        }

        let mode = PaginationMode::TimeWindow {
            window: self.rest.descriptor().options.ohlcv_page_size,
            step_ms: timeframe_ms,
        };
        let (path, period, extra) = (path.as_str(), period.as_str(), &extra);
        paginate(&mode, &params, DEFAULT_MAX_PAGES, move |page: PageRequest| {
            self.fetch_ohlcv_page(path, period, page, extra)
        })
        .await
        .with_exchange_context("hitbtc", "fetch_ohlcv")
    }
}

#[async_trait]
impl<R: RestClient> FundingRateSource for MarketData<R> {
    #[instrument(skip(self), fields(exchange = "hitbtc"))]
    async fn fetch_funding_rate(&self, symbol: &str) -> Result<FundingRate, ExchangeError> {
        self.rest.ensure_markets().await?;
        let market = self.swap_market(symbol)?;
        let response = self
            .rest
            .public(&format!("public/futures/info/{}", market.id), Params::new())
            .await
            .with_exchange_context("hitbtc", "fetch_funding_rate")?;
        Ok(convert_hitbtc_funding_rate(&response, market.symbol()))
    }

    #[instrument(skip(self), fields(exchange = "hitbtc"))]
    async fn fetch_funding_rates(
        &self,
        symbols: Option<&[String]>,
    ) -> Result<BTreeMap<String, FundingRate>, ExchangeError> {
        self.rest.ensure_markets().await?;
        let mut request = Params::new();
        if let Some(symbols) = symbols.filter(|s| !s.is_empty()) {
            let mut ids = Vec::with_capacity(symbols.len());
            for symbol in symbols {
                ids.push(self.swap_market(symbol)?.id.clone());
            }
            request.insert("symbols".to_string(), json!(ids.join(",")));
        }
        let response = self.rest.public("public/futures/info", request).await?;

        let mut rates = BTreeMap::new();
        for (id, raw) in response.as_object().into_iter().flatten() {
            let Some(market) = self.rest.markets().get(id) else {
                continue;
            };
            let symbol = market.symbol().to_string();
            if symbols.map_or(true, |wanted| wanted.contains(&symbol)) {
                rates.insert(symbol.clone(), convert_hitbtc_funding_rate(raw, &symbol));
            }
        }
        Ok(rates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn candle_series_paths() {
        assert_eq!(candles_path(None, "BTCUSDT").unwrap(), "public/candles/BTCUSDT");
        assert_eq!(
            candles_path(Some("mark"), "BTCUSDT_PERP").unwrap(),
            "public/futures/candles/mark_price/BTCUSDT_PERP"
        );
        assert!(matches!(candles_path(Some("last"), "BTCUSDT"), Err(ExchangeError::BadRequest(_))));
    }
}
