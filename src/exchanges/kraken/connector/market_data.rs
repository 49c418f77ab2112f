use crate::core::errors::{ExchangeError, ResultExt};
use crate::core::kernel::RestClient;
use crate::core::pagination::{
    filter_by_since_limit, paginate, parse_timeframe, PageRequest, PaginationMode, DEFAULT_MAX_PAGES,
};
use crate::core::safe;
use crate::core::traits::MarketDataSource;
use crate::core::types::{
    Currency, ExchangeStatus, FetchParams, Market, Ohlcv, OrderBook, Params, Ticker, Trade,
};
use crate::exchanges::kraken::conversions::{
    convert_kraken_ohlcv, convert_kraken_status, convert_kraken_ticker, convert_kraken_trade,
    resolve_market,
};
use crate::exchanges::kraken::rest::KrakenRest;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use tracing::instrument;

/// Kraken public market data.
pub struct MarketData<R: RestClient> {
    rest: KrakenRest<R>,
}

impl<R: RestClient + Clone> MarketData<R> {
    pub fn new(rest: &KrakenRest<R>) -> Self {
        Self { rest: rest.clone() }
    }
}

impl<R: RestClient> MarketData<R> {
    async fn fetch_ohlcv_page(
        &self,
        market: &Market,
        interval: &str,
        timeframe_secs: i64,
        since: Option<i64>,
        extra: &Params,
    ) -> Result<Vec<Ohlcv>, ExchangeError> {
        let mut request = extra.clone();
        request.insert("pair".to_string(), json!(market.id));
        request.insert("interval".to_string(), json!(interval));
        if let Some(since) = since {
            // Kraken returns candles strictly after `since`.
            request.insert(
                "since".to_string(),
                json!((since / 1000 - timeframe_secs).to_string()),
            );
        }
        let result = self.rest.public("OHLC", request).await?;
        Ok(safe::array(&result, &market.id)
            .iter()
            .filter_map(convert_kraken_ohlcv)
            .collect())
    }
}

#[async_trait]
impl<R: RestClient> MarketDataSource for MarketData<R> {
    #[instrument(skip(self), fields(exchange = "kraken"))]
    async fn load_markets(&self, reload: bool) -> Result<Vec<Market>, ExchangeError> {
        self.rest
            .load_markets(reload)
            .await
            .with_exchange_context("kraken", "load_markets")
    }

    #[instrument(skip(self), fields(exchange = "kraken"))]
    async fn fetch_markets(&self) -> Result<Vec<Market>, ExchangeError> {
        self.rest
            .fetch_markets()
            .await
            .with_exchange_context("kraken", "fetch_markets")
    }

    #[instrument(skip(self), fields(exchange = "kraken"))]
    async fn fetch_currencies(&self) -> Result<Vec<Currency>, ExchangeError> {
        self.rest.ensure_markets().await?;
        Ok(self
            .rest
            .markets()
            .currencies()
            .iter()
            .map(|c| c.as_ref().clone())
            .collect())
    }

    #[instrument(skip(self), fields(exchange = "kraken"))]
    async fn fetch_ticker(&self, symbol: &str) -> Result<Ticker, ExchangeError> {
        let market = self.rest.market(symbol).await?;
        let mut request = Params::new();
        request.insert("pair".to_string(), json!(market.id));
        let result = self.rest.public("Ticker", request).await?;
        let raw = safe::value(&result, &market.id).ok_or_else(|| {
            ExchangeError::Exchange(format!("kraken returned no ticker for {}", market.id))
        })?;
        Ok(convert_kraken_ticker(raw, market.symbol()))
    }

    #[instrument(skip(self), fields(exchange = "kraken"))]
    async fn fetch_tickers(
        &self,
        symbols: Option<&[String]>,
    ) -> Result<BTreeMap<String, Ticker>, ExchangeError> {
        self.rest.ensure_markets().await?;
        let mut request = Params::new();
        if let Some(symbols) = symbols {
            let mut ids = Vec::with_capacity(symbols.len());
            for symbol in symbols {
                let market = self.rest.markets().market(symbol)?;
                if market.active {
                    ids.push(market.id.clone());
                }
            }
            request.insert("pair".to_string(), json!(ids.join(",")));
        }

        let result = self.rest.public("Ticker", request).await?;
        let mut tickers = BTreeMap::new();
        for (id, raw) in result.as_object().into_iter().flatten() {
            let Some(market) = resolve_market(self.rest.markets(), id) else {
                continue;
            };
            let symbol = market.symbol().to_string();
            if symbols.map_or(true, |wanted| wanted.contains(&symbol)) {
                tickers.insert(symbol.clone(), convert_kraken_ticker(raw, &symbol));
            }
        }
        Ok(tickers)
    }

    #[instrument(skip(self), fields(exchange = "kraken"))]
    async fn fetch_order_book(
        &self,
        symbol: &str,
        limit: Option<usize>,
    ) -> Result<OrderBook, ExchangeError> {
        let market = self.rest.market(symbol).await?;
        let mut request = Params::new();
        request.insert("pair".to_string(), json!(market.id));
        if let Some(limit) = limit {
            request.insert("count".to_string(), json!(limit));
        }
        let result = self.rest.public("Depth", request).await?;

        // Some pairs come back keyed by their wsname.
        let book = safe::string(&market.info, "wsname")
            .and_then(|ws| safe::value(&result, &ws))
            .or_else(|| safe::value(&result, &market.id))
            .cloned()
            .unwrap_or(Value::Null);
        Ok(OrderBook::from_levels(
            market.symbol(),
            safe::array(&book, "bids"),
            safe::array(&book, "asks"),
            "price",
            "volume",
            None,
        ))
    }

    #[instrument(skip(self, params), fields(exchange = "kraken"))]
    async fn fetch_trades(&self, symbol: &str, params: FetchParams) -> Result<Vec<Trade>, ExchangeError> {
        let market = self.rest.market(symbol).await?;
        let mut request = params.extra.clone();
        request.insert("pair".to_string(), json!(market.id));
        if let Some(since) = params.since {
            request.insert("since".to_string(), json!((since / 1000).to_string()));
        }
        if let Some(limit) = params.limit {
            request.insert("count".to_string(), json!(limit));
        }
        let result = self.rest.public("Trades", request).await?;

        let mut rows = safe::array(&result, &market.id).to_vec();
        // The paging id applies to the newest trade.
        if let (Some(Value::Array(last)), Some(last_id)) = (rows.last_mut(), safe::string(&result, "last")) {
            last.push(Value::String(last_id));
        }
        let trades = rows
            .iter()
            .map(|row| convert_kraken_trade(self.rest.markets(), row, Some(&market)))
            .collect();
        Ok(filter_by_since_limit(trades, &params))
    }

    #[instrument(skip(self, params), fields(exchange = "kraken"))]
    async fn fetch_ohlcv(
        &self,
        symbol: &str,
        timeframe: &str,
        params: FetchParams,
    ) -> Result<Vec<Ohlcv>, ExchangeError> {
        let market = self.rest.market(symbol).await?;
        let interval = self.rest.descriptor().timeframe(timeframe)?.to_string();
        let timeframe_secs = parse_timeframe(timeframe).ok_or_else(|| {
            ExchangeError::NotSupported(format!("kraken does not support timeframe {}", timeframe))
        })?;

        if !params.paginate {
            let candles = self
                .fetch_ohlcv_page(&market, &interval, timeframe_secs, params.since, &params.extra)
                .await?;
            return Ok(filter_by_since_limit(candles, &params));
        }

        let mode = PaginationMode::TimeWindow {
            window: self.rest.descriptor().options.ohlcv_page_size,
            step_ms: timeframe_secs * 1000,
        };
        let (market, interval, extra) = (&market, interval.as_str(), &params.extra);
        paginate(&mode, &params, DEFAULT_MAX_PAGES, move |page: PageRequest| {
            self.fetch_ohlcv_page(market, interval, timeframe_secs, page.since, extra)
        })
        .await
        .with_exchange_context("kraken", "fetch_ohlcv")
    }

    async fn fetch_time(&self) -> Result<i64, ExchangeError> {
        self.rest.server_time().await
    }

    #[instrument(skip(self), fields(exchange = "kraken"))]
    async fn fetch_status(&self) -> Result<ExchangeStatus, ExchangeError> {
        let result = self.rest.public("SystemStatus", Params::new()).await?;
        Ok(convert_kraken_status(&result))
    }
}
