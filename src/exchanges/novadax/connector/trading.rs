use crate::core::errors::{ExchangeError, ResultExt};
use crate::core::kernel::RestClient;
use crate::core::pagination::{filter_by_since_limit, paginate, PageRequest, PaginationMode, DEFAULT_MAX_PAGES};
use crate::core::traits::OrderPlacer;
use crate::core::types::{FetchParams, Market, Order, OrderRequest, Params, Trade};
use crate::exchanges::novadax::conversions::{convert_novadax_order, convert_novadax_trade};
use crate::exchanges::novadax::requests::{history_request, order_request};
use crate::exchanges::novadax::rest::NovadaxRest;
use crate::exchanges::novadax::types::{CLOSED_STATUSES, OPEN_STATUSES};
use async_trait::async_trait;
use reqwest::Method;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{info, instrument};

fn entries(data: &Value) -> &[Value] {
    data.as_array().map(Vec::as_slice).unwrap_or_default()
}

/// Later pages of `orders/list` and `orders/fills` continue from the id of
/// the last entry.
fn history_mode() -> PaginationMode {
    PaginationMode::Cursor {
        field: "id".to_string(),
    }
}

/// NovaDAX spot order management.
pub struct Trading<R: RestClient> {
    rest: NovadaxRest<R>,
}

impl<R: RestClient + Clone> Trading<R> {
    pub fn new(rest: &NovadaxRest<R>) -> Self {
        Self { rest: rest.clone() }
    }
}

impl<R: RestClient> Trading<R> {
    async fn market_for(&self, symbol: Option<&str>) -> Result<Option<Arc<Market>>, ExchangeError> {
        match symbol {
            Some(symbol) => Ok(Some(self.rest.market(symbol).await?)),
            None => {
                self.rest.ensure_markets().await?;
                Ok(None)
            }
        }
    }

    async fn fetch_orders_page(
        &self,
        market: Option<&Arc<Market>>,
        status: &str,
        page: PageRequest,
        extra: &Params,
    ) -> Result<Vec<Order>, ExchangeError> {
        let mut request = history_request(
            market.map(|m| m.id.as_str()),
            Some(status),
            page.since,
            page.limit,
            page.cursor.as_deref(),
        );
        request.extend(extra.clone());
        let data = self.rest.private(Method::GET, "orders/list", request).await?;
        Ok(entries(&data)
            .iter()
            .map(|raw| convert_novadax_order(self.rest.markets(), raw, market))
            .collect())
    }

    async fn fetch_orders(
        &self,
        symbol: Option<&str>,
        status: &str,
        params: &FetchParams,
    ) -> Result<Vec<Order>, ExchangeError> {
        let market = self.market_for(symbol).await?;
        let market = market.as_ref();
        let extra = &params.extra;

        if !params.paginate {
            let page = PageRequest {
                since: params.since,
                limit: params.limit,
                ..PageRequest::default()
            };
            let orders = self.fetch_orders_page(market, status, page, extra).await?;
            return Ok(filter_by_since_limit(orders, params));
        }

        paginate(&history_mode(), params, DEFAULT_MAX_PAGES, move |page: PageRequest| {
            self.fetch_orders_page(market, status, page, extra)
        })
        .await
    }

    async fn fetch_fills_page(
        &self,
        market: Option<&Arc<Market>>,
        page: PageRequest,
        extra: &Params,
    ) -> Result<Vec<Trade>, ExchangeError> {
        let mut request = history_request(
            market.map(|m| m.id.as_str()),
            None,
            page.since,
            page.limit,
            page.cursor.as_deref(),
        );
        request.extend(extra.clone());
        let data = self.rest.private(Method::GET, "orders/fills", request).await?;
        Ok(entries(&data)
            .iter()
            .map(|raw| convert_novadax_trade(self.rest.markets(), raw, market))
            .collect())
    }

    /// Fills of a single order.
    #[instrument(skip(self), fields(exchange = "novadax"))]
    pub async fn fetch_order_trades(&self, id: &str, symbol: Option<&str>) -> Result<Vec<Trade>, ExchangeError> {
        let market = self.market_for(symbol).await?;
        let mut request = Params::new();
        request.insert("id".to_string(), json!(id));
        let data = self
            .rest
            .private(Method::GET, "orders/fill", request)
            .await
            .with_exchange_context("novadax", "fetch_order_trades")?;
        Ok(entries(&data)
            .iter()
            .map(|raw| convert_novadax_trade(self.rest.markets(), raw, market.as_ref()))
            .collect())
    }
}

#[async_trait]
impl<R: RestClient> OrderPlacer for Trading<R> {
    #[instrument(skip(self, order), fields(exchange = "novadax", symbol = %order.symbol))]
    async fn create_order(&self, order: OrderRequest) -> Result<Order, ExchangeError> {
        let market = self.rest.market(&order.symbol).await?;
        let request = order_request(&market, &order, &self.rest.descriptor().options)?;
        let data = self
            .rest
            .private(Method::POST, "orders/create", request)
            .await
            .with_exchange_context("novadax", "create_order")?;

        let created = convert_novadax_order(self.rest.markets(), &data, Some(&market));
        info!(order_id = %created.id, "Placed novadax order");
        Ok(created)
    }

    #[instrument(skip(self), fields(exchange = "novadax"))]
    async fn cancel_order(&self, id: &str, symbol: Option<&str>) -> Result<Order, ExchangeError> {
        let market = self.market_for(symbol).await?;
        let mut request = Params::new();
        request.insert("id".to_string(), json!(id));
        let data = self
            .rest
            .private(Method::POST, "orders/cancel", request)
            .await
            .with_exchange_context("novadax", "cancel_order")?;
        let mut order = convert_novadax_order(self.rest.markets(), &data, market.as_ref());
        if order.id.is_empty() {
            order.id = id.to_string();
        }
        Ok(order)
    }

    #[instrument(skip(self), fields(exchange = "novadax"))]
    async fn fetch_order(&self, id: &str, symbol: Option<&str>) -> Result<Order, ExchangeError> {
        let market = self.market_for(symbol).await?;
        let mut request = Params::new();
        request.insert("id".to_string(), json!(id));
        let data = self
            .rest
            .private(Method::GET, "orders/get", request)
            .await
            .with_exchange_context("novadax", "fetch_order")?;
        if !data.is_object() {
            return Err(ExchangeError::OrderNotFound(format!(
                "novadax fetch_order() could not find order id {}",
                id
            )));
        }
        Ok(convert_novadax_order(self.rest.markets(), &data, market.as_ref()))
    }

    #[instrument(skip(self, params), fields(exchange = "novadax"))]
    async fn fetch_open_orders(&self, symbol: Option<&str>, params: FetchParams) -> Result<Vec<Order>, ExchangeError> {
        self.fetch_orders(symbol, OPEN_STATUSES, &params)
            .await
            .with_exchange_context("novadax", "fetch_open_orders")
    }

    #[instrument(skip(self, params), fields(exchange = "novadax"))]
    async fn fetch_closed_orders(
        &self,
        symbol: Option<&str>,
        params: FetchParams,
    ) -> Result<Vec<Order>, ExchangeError> {
        self.fetch_orders(symbol, CLOSED_STATUSES, &params)
            .await
            .with_exchange_context("novadax", "fetch_closed_orders")
    }

    #[instrument(skip(self, params), fields(exchange = "novadax"))]
    async fn fetch_my_trades(&self, symbol: Option<&str>, params: FetchParams) -> Result<Vec<Trade>, ExchangeError> {
        let market = self.market_for(symbol).await?;
        let market = market.as_ref();
        let extra = &params.extra;

        if !params.paginate {
            let page = PageRequest {
                since: params.since,
                limit: params.limit,
                ..PageRequest::default()
            };
            let trades = self
                .fetch_fills_page(market, page, extra)
                .await
                .with_exchange_context("novadax", "fetch_my_trades")?;
            return Ok(filter_by_since_limit(trades, &params));
        }

        paginate(&history_mode(), &params, DEFAULT_MAX_PAGES, move |page: PageRequest| {
            self.fetch_fills_page(market, page, extra)
        })
        .await
        .with_exchange_context("novadax", "fetch_my_trades")
    }
}
