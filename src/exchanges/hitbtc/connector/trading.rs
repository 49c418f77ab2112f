use crate::core::errors::{ExchangeError, ResultExt};
use crate::core::kernel::RestClient;
use crate::core::pagination::filter_by_since_limit;
use crate::core::traits::OrderPlacer;
use crate::core::types::{
    EditOrderRequest, FetchParams, Market, Order, OrderRequest, OrderStatus, Params, Trade,
};
use crate::exchanges::hitbtc::conversions::{convert_hitbtc_order, convert_hitbtc_trade};
use crate::exchanges::hitbtc::requests::{edit_order_request, history_request, order_request};
use crate::exchanges::hitbtc::rest::HitbtcRest;
use crate::exchanges::hitbtc::types::Venue;
use async_trait::async_trait;
use reqwest::Method;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{info, instrument};

fn entries(response: &Value) -> &[Value] {
    response.as_array().map(Vec::as_slice).unwrap_or_default()
}

/// HitBTC order management across the spot, margin and futures venues.
/// Orders are addressed by their client order id.
pub struct Trading<R: RestClient> {
    rest: HitbtcRest<R>,
}

impl<R: RestClient + Clone> Trading<R> {
    pub fn new(rest: &HitbtcRest<R>) -> Self {
        Self { rest: rest.clone() }
    }
}

impl<R: RestClient> Trading<R> {
    /// The market for an optional symbol and the venue its orders live on.
    /// Without a symbol the spot venue is used.
    async fn venue(&self, symbol: Option<&str>) -> Result<(Option<Arc<Market>>, Venue), ExchangeError> {
        let market = match symbol {
            Some(symbol) => Some(self.rest.market(symbol).await?),
            None => {
                self.rest.ensure_markets().await?;
                None
            }
        };
        let venue = Venue::for_market(market.as_deref(), false);
        Ok((market, venue))
    }

    fn parse_orders(&self, response: &Value, market: Option<&Arc<Market>>) -> Vec<Order> {
        entries(response)
            .iter()
            .map(|raw| convert_hitbtc_order(self.rest.markets(), raw, market.cloned()))
            .collect()
    }

    async fn fetch_history_orders(
        &self,
        symbol: Option<&str>,
        params: &FetchParams,
    ) -> Result<Vec<Order>, ExchangeError> {
        let (market, venue) = self.venue(symbol).await?;
        let mut request = history_request(market.as_deref(), params.since, params.limit);
        request.extend(params.extra.clone());
        let response = self
            .rest
            .private(Method::GET, &venue.path("history/order"), request)
            .await?;
        Ok(self.parse_orders(&response, market.as_ref()))
    }
}

#[async_trait]
impl<R: RestClient> OrderPlacer for Trading<R> {
    #[instrument(skip(self, order), fields(exchange = "hitbtc", symbol = %order.symbol))]
    async fn create_order(&self, order: OrderRequest) -> Result<Order, ExchangeError> {
        let market = self.rest.market(&order.symbol).await?;
        let venue = Venue::for_market(Some(&market), order.params.margin_mode.is_some());
        let request = order_request(&market, &order)?;
        let response = self
            .rest
            .private(Method::POST, &venue.path("order"), request)
            .await
            .with_exchange_context("hitbtc", "create_order")?;

        let created = convert_hitbtc_order(self.rest.markets(), &response, Some(market));
        info!(order_id = %created.id, venue = venue.as_str(), "Placed hitbtc order");
        Ok(created)
    }

    #[instrument(skip(self, edit), fields(exchange = "hitbtc", id = %edit.id))]
    async fn edit_order(&self, edit: EditOrderRequest) -> Result<Order, ExchangeError> {
        let market = self.rest.market(&edit.symbol).await?;
        let venue = Venue::for_market(Some(&market), edit.params.margin_mode.is_some());
        let request = edit_order_request(&market, &edit)?;
        let response = self
            .rest
            .private(Method::PATCH, &venue.path(&format!("order/{}", edit.id)), request)
            .await
            .with_exchange_context("hitbtc", "edit_order")?;
        Ok(convert_hitbtc_order(self.rest.markets(), &response, Some(market)))
    }

    #[instrument(skip(self), fields(exchange = "hitbtc"))]
    async fn cancel_order(&self, id: &str, symbol: Option<&str>) -> Result<Order, ExchangeError> {
        let (market, venue) = self.venue(symbol).await?;
        let response = self
            .rest
            .private(Method::DELETE, &venue.path(&format!("order/{}", id)), Params::new())
            .await
            .with_exchange_context("hitbtc", "cancel_order")?;
        let mut order = convert_hitbtc_order(self.rest.markets(), &response, market);
        if order.id.is_empty() {
            order.id = id.to_string();
        }
        Ok(order)
    }

    #[instrument(skip(self), fields(exchange = "hitbtc"))]
    async fn cancel_all_orders(&self, symbol: Option<&str>) -> Result<Vec<Order>, ExchangeError> {
        let (market, venue) = self.venue(symbol).await?;
        let mut request = Params::new();
        if let Some(market) = &market {
            request.insert("symbol".to_string(), json!(market.id));
        }
        let response = self
            .rest
            .private(Method::DELETE, &venue.path("order"), request)
            .await
            .with_exchange_context("hitbtc", "cancel_all_orders")?;
        Ok(self.parse_orders(&response, market.as_ref()))
    }

    /// History first, then the active order of the same id.
    #[instrument(skip(self), fields(exchange = "hitbtc"))]
    async fn fetch_order(&self, id: &str, symbol: Option<&str>) -> Result<Order, ExchangeError> {
        let (market, venue) = self.venue(symbol).await?;
        let mut request = Params::new();
        request.insert("client_order_id".to_string(), json!(id));
        let response = self
            .rest
            .private(Method::GET, &venue.path("history/order"), request)
            .await?;
        if let Some(raw) = entries(&response).first() {
            return Ok(convert_hitbtc_order(self.rest.markets(), raw, market));
        }

        let response = self
            .rest
            .private(Method::GET, &venue.path(&format!("order/{}", id)), Params::new())
            .await
            .with_exchange_context("hitbtc", "fetch_order")?;
        if !response.is_object() {
            return Err(ExchangeError::OrderNotFound(format!(
                "hitbtc fetch_order() could not find order id {}",
                id
            )));
        }
        Ok(convert_hitbtc_order(self.rest.markets(), &response, market))
    }

    #[instrument(skip(self, params), fields(exchange = "hitbtc"))]
    async fn fetch_open_orders(&self, symbol: Option<&str>, params: FetchParams) -> Result<Vec<Order>, ExchangeError> {
        let (market, venue) = self.venue(symbol).await?;
        let mut request = params.extra.clone();
        if let Some(market) = &market {
            request.insert("symbol".to_string(), json!(market.id));
        }
        let response = self
            .rest
            .private(Method::GET, &venue.path("order"), request)
            .await
            .with_exchange_context("hitbtc", "fetch_open_orders")?;
        Ok(filter_by_since_limit(self.parse_orders(&response, market.as_ref()), &params))
    }

    /// Filled, cancelled and expired orders from the order history.
    #[instrument(skip(self, params), fields(exchange = "hitbtc"))]
    async fn fetch_closed_orders(
        &self,
        symbol: Option<&str>,
        params: FetchParams,
    ) -> Result<Vec<Order>, ExchangeError> {
        let orders = self
            .fetch_history_orders(symbol, &params)
            .await
            .with_exchange_context("hitbtc", "fetch_closed_orders")?;
        let closed = orders
            .into_iter()
            .filter(|order| {
                matches!(
                    order.status,
                    Some(OrderStatus::Closed | OrderStatus::Canceled | OrderStatus::Expired)
                )
            })
            .collect();
        Ok(filter_by_since_limit(closed, &params))
    }

    #[instrument(skip(self, params), fields(exchange = "hitbtc"))]
    async fn fetch_my_trades(&self, symbol: Option<&str>, params: FetchParams) -> Result<Vec<Trade>, ExchangeError> {
        let (market, venue) = self.venue(symbol).await?;
        let mut request = history_request(market.as_deref(), params.since, params.limit);
        request.extend(params.extra.clone());
        let response = self
            .rest
            .private(Method::GET, &venue.path("history/trade"), request)
            .await
            .with_exchange_context("hitbtc", "fetch_my_trades")?;
        let trades = entries(&response)
            .iter()
            .map(|raw| convert_hitbtc_trade(self.rest.markets(), raw, market.as_ref()))
            .collect();
        Ok(filter_by_since_limit(trades, &params))
    }
}
