use crate::core::errors::{ExchangeError, ResultExt};
use crate::core::kernel::RestClient;
use crate::core::pagination::{filter_by_since_limit, paginate, PageRequest, PaginationMode, DEFAULT_MAX_PAGES};
use crate::core::safe;
use crate::core::traits::OrderPlacer;
use crate::core::types::{FetchParams, Market, Order, OrderRequest, OrderStatus, Params, Trade};
use crate::exchanges::lbank::conversions::{convert_lbank_order, convert_lbank_trade};
use crate::exchanges::lbank::requests::{my_trades_request, order_request};
use crate::exchanges::lbank::rest::LbankRest;
use crate::exchanges::lbank::types::DEFAULT_ORDER_PAGE;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{info, instrument};

/// LBank spot order management. Every query is scoped to one market.
pub struct Trading<R: RestClient> {
    rest: LbankRest<R>,
}

impl<R: RestClient + Clone> Trading<R> {
    pub fn new(rest: &LbankRest<R>) -> Self {
        Self { rest: rest.clone() }
    }
}

impl<R: RestClient> Trading<R> {
    async fn required_market(&self, symbol: Option<&str>, operation: &str) -> Result<Arc<Market>, ExchangeError> {
        let symbol = symbol.ok_or_else(|| {
            ExchangeError::BadRequest(format!("lbank {}() requires a symbol argument", operation))
        })?;
        self.rest.market(symbol).await
    }

    fn parse_orders(&self, entries: &[Value], market: &Arc<Market>) -> Vec<Order> {
        entries
            .iter()
            .map(|raw| convert_lbank_order(self.rest.markets(), raw, Some(Arc::clone(market))))
            .collect()
    }

    /// One page of an order list endpoint, read from `data.orders`.
    async fn fetch_order_page(
        &self,
        path: &str,
        market: &Arc<Market>,
        page: usize,
        page_length: usize,
        extra: &Params,
    ) -> Result<Vec<Order>, ExchangeError> {
        let mut request = extra.clone();
        request.insert("symbol".to_string(), json!(market.id));
        request.insert("current_page".to_string(), json!(page));
        request.insert("page_length".to_string(), json!(page_length));
        let response = self.rest.private(path, request).await?;
        let data = safe::value(&response, "data").unwrap_or(&Value::Null);
        Ok(self.parse_orders(safe::array(data, "orders"), market))
    }

    async fn fetch_order_list(
        &self,
        path: &str,
        market: &Arc<Market>,
        params: &FetchParams,
    ) -> Result<Vec<Order>, ExchangeError> {
        if !params.paginate {
            let page_length = params.limit.unwrap_or(DEFAULT_ORDER_PAGE);
            let orders = self.fetch_order_page(path, market, 1, page_length, &params.extra).await?;
            return Ok(filter_by_since_limit(orders, params));
        }

        let mode = PaginationMode::PageNumber {
            page_size: DEFAULT_ORDER_PAGE,
        };
        let extra = &params.extra;
        paginate(&mode, params, DEFAULT_MAX_PAGES, move |page: PageRequest| {
            let page_length = page.limit.unwrap_or(DEFAULT_ORDER_PAGE);
            self.fetch_order_page(path, market, page.page, page_length, extra)
        })
        .await
    }
}

#[async_trait]
impl<R: RestClient> OrderPlacer for Trading<R> {
    #[instrument(skip(self, order), fields(exchange = "lbank", symbol = %order.symbol))]
    async fn create_order(&self, order: OrderRequest) -> Result<Order, ExchangeError> {
        let market = self.rest.market(&order.symbol).await?;
        let request = order_request(&market, &order, &self.rest.descriptor().options)?;
        let response = self
            .rest
            .private("supplement/create_order", request)
            .await
            .with_exchange_context("lbank", "create_order")?;

        let data = safe::value(&response, "data").unwrap_or(&Value::Null);
        let created = Order {
            id: safe::string_n(data, &["order_id", "orderId"]).unwrap_or_default(),
            client_order_id: order.params.client_order_id.clone(),
            timestamp: safe::integer(&response, "ts"),
            status: Some(OrderStatus::Open),
            symbol: Some(market.symbol().to_string()),
            order_type: Some(order.order_type),
            side: Some(order.side),
            price: order.price,
            amount: Some(order.amount),
            info: response.clone(),
            ..Order::default()
        }
        .complete();
        info!(order_id = %created.id, "Placed lbank order");
        Ok(created)
    }

    #[instrument(skip(self), fields(exchange = "lbank"))]
    async fn cancel_order(&self, id: &str, symbol: Option<&str>) -> Result<Order, ExchangeError> {
        let market = self.required_market(symbol, "cancel_order").await?;
        let mut request = Params::new();
        request.insert("symbol".to_string(), json!(market.id));
        request.insert("orderId".to_string(), json!(id));
        let response = self
            .rest
            .private("supplement/cancel_order", request)
            .await
            .with_exchange_context("lbank", "cancel_order")?;
        let data = safe::value(&response, "data").cloned().unwrap_or(Value::Null);
        let mut order = convert_lbank_order(self.rest.markets(), &data, Some(market));
        if order.id.is_empty() {
            order.id = id.to_string();
        }
        Ok(order)
    }

    #[instrument(skip(self), fields(exchange = "lbank"))]
    async fn cancel_all_orders(&self, symbol: Option<&str>) -> Result<Vec<Order>, ExchangeError> {
        let market = self.required_market(symbol, "cancel_all_orders").await?;
        let mut request = Params::new();
        request.insert("symbol".to_string(), json!(market.id));
        let response = self.rest.private("supplement/cancel_order_by_symbol", request).await?;
        Ok(self.parse_orders(safe::array(&response, "data"), &market))
    }

    #[instrument(skip(self), fields(exchange = "lbank"))]
    async fn fetch_order(&self, id: &str, symbol: Option<&str>) -> Result<Order, ExchangeError> {
        let market = self.required_market(symbol, "fetch_order").await?;
        let mut request = Params::new();
        request.insert("symbol".to_string(), json!(market.id));
        request.insert("orderId".to_string(), json!(id));
        let response = self.rest.private("supplement/orders_info", request).await?;

        let raw = match safe::value(&response, "data") {
            Some(Value::Array(entries)) => entries.first(),
            other => other.filter(|data| data.is_object()),
        }
        .ok_or_else(|| ExchangeError::OrderNotFound(format!("lbank fetch_order() could not find order id {}", id)))?;
        Ok(convert_lbank_order(self.rest.markets(), raw, Some(market)))
    }

    #[instrument(skip(self, params), fields(exchange = "lbank"))]
    async fn fetch_open_orders(&self, symbol: Option<&str>, params: FetchParams) -> Result<Vec<Order>, ExchangeError> {
        let market = self.required_market(symbol, "fetch_open_orders").await?;
        self.fetch_order_list("supplement/orders_info_no_deal", &market, &params)
            .await
            .with_exchange_context("lbank", "fetch_open_orders")
    }

    /// The history endpoint lists filled and cancelled orders.
    #[instrument(skip(self, params), fields(exchange = "lbank"))]
    async fn fetch_closed_orders(
        &self,
        symbol: Option<&str>,
        params: FetchParams,
    ) -> Result<Vec<Order>, ExchangeError> {
        let market = self.required_market(symbol, "fetch_closed_orders").await?;
        self.fetch_order_list("supplement/orders_info_history", &market, &params)
            .await
            .with_exchange_context("lbank", "fetch_closed_orders")
    }

    #[instrument(skip(self, params), fields(exchange = "lbank"))]
    async fn fetch_my_trades(&self, symbol: Option<&str>, params: FetchParams) -> Result<Vec<Trade>, ExchangeError> {
        let market = self.required_market(symbol, "fetch_my_trades").await?;
        let mut request = my_trades_request(&market, params.since, params.limit);
        request.extend(params.extra.clone());
        let response = self.rest.private("transaction_history", request).await?;
        let trades = safe::array(&response, "data")
            .iter()
            .map(|raw| convert_lbank_trade(raw, Some(&market)))
            .collect();
        Ok(filter_by_since_limit(trades, &params))
    }
}
