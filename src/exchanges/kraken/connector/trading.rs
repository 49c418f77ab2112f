use crate::core::errors::{ExchangeError, ResultExt};
use crate::core::kernel::RestClient;
use crate::core::pagination::filter_by_since_limit;
use crate::core::safe;
use crate::core::traits::OrderPlacer;
use crate::core::types::{EditOrderRequest, FetchParams, Order, OrderRequest, Params, Trade};
use crate::exchanges::kraken::conversions::{convert_kraken_order, convert_kraken_trade, keyed_entries};
use crate::exchanges::kraken::requests::{cancel_after_request, edit_request, funding_window, order_request};
use crate::exchanges::kraken::rest::KrakenRest;
use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{info, instrument};

/// Kraken order management.
pub struct Trading<R: RestClient> {
    rest: KrakenRest<R>,
}

impl<R: RestClient + Clone> Trading<R> {
    pub fn new(rest: &KrakenRest<R>) -> Self {
        Self { rest: rest.clone() }
    }
}

impl<R: RestClient> Trading<R> {
    fn parse_orders(&self, entries: &[Value], symbol: Option<&str>, params: &FetchParams) -> Vec<Order> {
        let orders = entries
            .iter()
            .map(|raw| convert_kraken_order(self.rest.markets(), raw, None, false))
            .filter(|order| symbol.map_or(true, |s| order.symbol.as_deref() == Some(s)))
            .collect();
        filter_by_since_limit(orders, params)
    }

    fn order_reference(id: &str) -> Params {
        let mut request = Params::new();
        request.insert("txid".to_string(), json!(id));
        request
    }
}

#[async_trait]
impl<R: RestClient> OrderPlacer for Trading<R> {
    #[instrument(skip(self, order), fields(exchange = "kraken", symbol = %order.symbol))]
    async fn create_order(&self, order: OrderRequest) -> Result<Order, ExchangeError> {
        let market = self.rest.market(&order.symbol).await?;
        let (request, using_cost) = order_request(&market, &order)?;
        let result = self
            .rest
            .private("AddOrder", request)
            .await
            .with_exchange_context("kraken", "create_order")?;
        let created = convert_kraken_order(self.rest.markets(), &result, Some(market), using_cost);
        info!(order_id = %created.id, "Placed kraken order");
        Ok(created)
    }

    #[instrument(skip(self, edit), fields(exchange = "kraken", order_id = %edit.id))]
    async fn edit_order(&self, edit: EditOrderRequest) -> Result<Order, ExchangeError> {
        let market = self.rest.market(&edit.symbol).await?;
        let request = edit_request(&market, &edit)?;
        let result = self.rest.private("AmendOrder", request).await?;
        Ok(convert_kraken_order(self.rest.markets(), &result, Some(market), false))
    }

    #[instrument(skip(self), fields(exchange = "kraken"))]
    async fn cancel_order(&self, id: &str, _symbol: Option<&str>) -> Result<Order, ExchangeError> {
        let request = Self::order_reference(id);
        let result = self
            .rest
            .private("CancelOrder", request)
            .await
            .with_exchange_context("kraken", "cancel_order")?;
        Ok(Order {
            id: id.to_string(),
            info: result,
            ..Order::default()
        })
    }

    #[instrument(skip(self), fields(exchange = "kraken", count = ids.len()))]
    async fn cancel_orders(&self, ids: &[String], _symbol: Option<&str>) -> Result<Vec<Order>, ExchangeError> {
        let mut request = Params::new();
        request.insert("orders".to_string(), json!(ids));
        let result = self.rest.private("CancelOrderBatch", request).await?;
        Ok(ids
            .iter()
            .map(|id| Order {
                id: id.clone(),
                info: result.clone(),
                ..Order::default()
            })
            .collect())
    }

    #[instrument(skip(self), fields(exchange = "kraken"))]
    async fn cancel_all_orders(&self, _symbol: Option<&str>) -> Result<Vec<Order>, ExchangeError> {
        let result = self.rest.private("CancelAll", Params::new()).await?;
        Ok(vec![Order {
            info: result,
            ..Order::default()
        }])
    }

    #[instrument(skip(self), fields(exchange = "kraken"))]
    async fn cancel_all_orders_after(&self, timeout_ms: i64) -> Result<Value, ExchangeError> {
        let request = cancel_after_request(timeout_ms)?;
        self.rest.private("CancelAllOrdersAfter", request).await
    }

    #[instrument(skip(self), fields(exchange = "kraken"))]
    async fn fetch_order(&self, id: &str, _symbol: Option<&str>) -> Result<Order, ExchangeError> {
        self.rest.ensure_markets().await?;
        let mut request = Self::order_reference(id);
        request.insert("trades".to_string(), json!(true));
        let result = self.rest.private("QueryOrders", request).await?;

        let raw = safe::value(&result, id)
            .or_else(|| result.as_object().and_then(|entries| entries.values().next()))
            .ok_or_else(|| ExchangeError::OrderNotFound(format!("kraken fetch_order() could not find order id {}", id)))?;
        let mut raw = raw.clone();
        if let Value::Object(fields) = &mut raw {
            fields.entry("id".to_string()).or_insert_with(|| json!(id));
        }
        Ok(convert_kraken_order(self.rest.markets(), &raw, None, false))
    }

    #[instrument(skip(self, params), fields(exchange = "kraken"))]
    async fn fetch_open_orders(&self, symbol: Option<&str>, params: FetchParams) -> Result<Vec<Order>, ExchangeError> {
        self.rest.ensure_markets().await?;
        let mut request = params.extra.clone();
        request.insert("trades".to_string(), json!(true));
        if let Some(since) = params.since {
            request.insert("start".to_string(), json!(since / 1000));
        }
        let result = self.rest.private("OpenOrders", request).await?;
        let entries = keyed_entries(safe::value(&result, "open"));
        Ok(self.parse_orders(&entries, symbol, &params))
    }

    #[instrument(skip(self, params), fields(exchange = "kraken"))]
    async fn fetch_closed_orders(
        &self,
        symbol: Option<&str>,
        params: FetchParams,
    ) -> Result<Vec<Order>, ExchangeError> {
        self.rest.ensure_markets().await?;
        let mut request = params.extra.clone();
        request.insert("trades".to_string(), json!(true));
        if let Some(since) = params.since {
            request.insert("start".to_string(), json!(since / 1000));
        }
        if let Some(until) = params.until {
            request.insert("end".to_string(), json!(until / 1000));
        }
        let result = self.rest.private("ClosedOrders", request).await?;
        let entries = keyed_entries(safe::value(&result, "closed"));
        Ok(self.parse_orders(&entries, symbol, &params))
    }

    #[instrument(skip(self, params), fields(exchange = "kraken"))]
    async fn fetch_my_trades(&self, symbol: Option<&str>, params: FetchParams) -> Result<Vec<Trade>, ExchangeError> {
        self.rest.ensure_markets().await?;
        let mut request = params.extra.clone();
        funding_window(&mut request, params.since, params.until);
        let result = self.rest.private("TradesHistory", request).await?;

        let trades = keyed_entries(safe::value(&result, "trades"))
            .iter()
            .map(|raw| convert_kraken_trade(self.rest.markets(), raw, None))
            .filter(|trade| symbol.map_or(true, |s| trade.symbol.as_deref() == Some(s)))
            .collect();
        Ok(filter_by_since_limit(trades, &params))
    }
}
