use super::types::{DEFAULT_KLINES, DEFAULT_NETWORKS, MAX_KLINES, MAX_TRADES, SWAP_PRODUCT_GROUP};
use crate::core::config::AdapterOptions;
use crate::core::errors::ExchangeError;
use crate::core::kernel::signer::param_to_string;
use crate::core::precision::{amount_to_precision, cost_to_precision, format_decimal, price_to_precision};
use crate::core::safe;
use crate::core::types::{Market, OrderRequest, OrderSide, OrderType, Params, TimeInForce, WithdrawRequest};
use rust_decimal::Decimal;
use serde_json::{json, Value};

const DAY_MS: i64 = 86_400_000;

fn put(request: &mut Params, key: &str, value: impl Into<String>) {
    request.insert(key.to_string(), Value::String(value.into()));
}

/// Contract endpoints are scoped to the USDT perpetual product group.
pub fn swap_request() -> Params {
    let mut request = Params::new();
    put(&mut request, "productGroup", SWAP_PRODUCT_GROUP);
    request
}

/// `supplement/create_order` parameters.
///
/// The time in force travels as a suffix on `type`. Market buys are sized
/// in quote currency, so `price` carries the cost.
pub fn order_request(
    market: &Market,
    order: &OrderRequest,
    options: &AdapterOptions,
) -> Result<Params, ExchangeError> {
    let params = &order.params;
    let side = order.side.as_str();
    let post_only = params.is_post_only();
    let tif = params.time_in_force.filter(|tif| *tif != TimeInForce::PO);

    let mut request = params.extra.clone();
    put(&mut request, "symbol", market.id.as_str());
    if let Some(client_id) = &params.client_order_id {
        put(&mut request, "custom_id", client_id.as_str());
    }

    match order.order_type {
        OrderType::Limit => {
            let price = order.price.ok_or_else(|| {
                ExchangeError::InvalidOrder("lbank limit orders require a price".to_string())
            })?;
            // ioc and fok outrank post-only
            let order_type = match tif {
                Some(TimeInForce::IOC) => format!("{}_ioc", side),
                Some(TimeInForce::FOK) => format!("{}_fok", side),
                _ if post_only => format!("{}_maker", side),
                _ => side.to_string(),
            };
            put(&mut request, "type", order_type);
            put(&mut request, "price", price_to_precision(market, price));
            put(&mut request, "amount", amount_to_precision(market, order.amount)?);
        }
        OrderType::Market => {
            if post_only || matches!(tif, Some(TimeInForce::IOC | TimeInForce::FOK)) {
                return Err(ExchangeError::InvalidOrder(
                    "lbank market orders cannot be post only, IOC or FOK".to_string(),
                ));
            }
            put(&mut request, "type", format!("{}_market", side));
            if order.side == OrderSide::Sell {
                put(&mut request, "amount", amount_to_precision(market, order.amount)?);
            } else {
                let cost = market_buy_cost(order, options)?;
                put(&mut request, "price", cost_to_precision(market, cost));
            }
        }
    }
    Ok(request)
}

fn market_buy_cost(order: &OrderRequest, options: &AdapterOptions) -> Result<Decimal, ExchangeError> {
    if let Some(cost) = order.params.cost {
        return Ok(cost);
    }
    if !options.create_market_buy_order_requires_price {
        return Ok(order.amount);
    }
    let price = order.price.ok_or_else(|| {
        ExchangeError::InvalidOrder(
            "lbank market buy orders require a price or a cost to compute the quote amount; \
             disable create_market_buy_order_requires_price to pass the cost as the amount"
                .to_string(),
        )
    })?;
    order
        .amount
        .checked_mul(price)
        .ok_or_else(|| {
            ExchangeError::InvalidOrder(format!("lbank market buy cost overflows: {} * {}", order.amount, price))
        })
}

/// `kline` parameters. Without `since` the window ends now.
pub fn ohlcv_request(
    market: &Market,
    interval: &str,
    timeframe_ms: i64,
    since: Option<i64>,
    limit: Option<usize>,
) -> Params {
    let limit = limit.unwrap_or(DEFAULT_KLINES);
    let since = since.unwrap_or_else(|| safe::milliseconds() - timeframe_ms * limit as i64);

    let mut request = Params::new();
    put(&mut request, "symbol", market.id.as_str());
    put(&mut request, "type", interval);
    request.insert("time".to_string(), json!(since / 1000));
    request.insert("size".to_string(), json!((limit + 1).min(MAX_KLINES)));
    request
}

pub fn trades_request(market: &Market, since: Option<i64>, limit: Option<usize>) -> Params {
    let mut request = Params::new();
    put(&mut request, "symbol", market.id.as_str());
    request.insert("size".to_string(), json!(limit.unwrap_or(MAX_TRADES).min(MAX_TRADES)));
    if let Some(since) = since {
        request.insert("time".to_string(), json!(since));
    }
    request
}

/// `transaction_history` covers at most one day starting at `since`.
pub fn my_trades_request(market: &Market, since: Option<i64>, limit: Option<usize>) -> Params {
    let mut request = Params::new();
    put(&mut request, "symbol", market.id.as_str());
    if let Some(limit) = limit {
        request.insert("size".to_string(), json!(limit));
    }
    if let Some(since) = since {
        if let (Some(start), Some(end)) = (safe::ymd(since), safe::ymd(since + DAY_MS)) {
            put(&mut request, "start_date", start);
            put(&mut request, "end_date", end);
        }
    }
    request
}

/// Exchange network id: the explicit network, then the configured default,
/// then the per-currency default.
pub fn network_id(options: &AdapterOptions, code: &str, network: Option<&str>) -> Option<String> {
    let unified = network
        .map(str::to_uppercase)
        .or_else(|| options.default_network.clone())
        .or_else(|| {
            DEFAULT_NETWORKS
                .iter()
                .find(|(currency, _)| *currency == code)
                .map(|(_, network)| network.to_string())
        })?;
    Some(
        options
            .networks
            .get(&unified)
            .cloned()
            .unwrap_or_else(|| unified.to_lowercase()),
    )
}

/// `supplement/withdraw` parameters. The caller must name the fee.
pub fn withdraw_request(
    options: &AdapterOptions,
    currency_id: &str,
    request: &WithdrawRequest,
) -> Result<Params, ExchangeError> {
    let mut params = request.params.clone();
    let fee = params.remove("fee").ok_or_else(|| {
        ExchangeError::BadRequest("lbank withdraw() requires a fee in params".to_string())
    })?;
    put(&mut params, "fee", param_to_string(&fee));
    put(&mut params, "address", request.address.as_str());
    put(&mut params, "coin", currency_id);
    put(&mut params, "amount", format_decimal(request.amount));
    if let Some(tag) = &request.tag {
        put(&mut params, "memo", tag.as_str());
    }
    if let Some(network) = network_id(options, &request.code, request.network.as_deref()) {
        put(&mut params, "networkName", network);
    }
    Ok(params)
}
