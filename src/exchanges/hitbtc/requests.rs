use super::types::{MAX_CANDLES, MAX_TRADES};
use crate::core::config::AdapterOptions;
use crate::core::errors::ExchangeError;
use crate::core::precision::{amount_to_precision, format_decimal, price_to_precision};
use crate::core::safe;
use crate::core::types::{
    EditOrderRequest, MarginMode, Market, MarketType, OrderRequest, OrderType, Params, TimeInForce,
    TransferRequest, WithdrawRequest,
};
use serde_json::{json, Value};

/// Only USDT withdrawals take an explicit network.
const NETWORK_AWARE_CURRENCY: &str = "USDT";

fn put(request: &mut Params, key: &str, value: impl Into<String>) {
    request.insert(key.to_string(), Value::String(value.into()));
}

fn margin_mode_str(mode: MarginMode) -> &'static str {
    match mode {
        MarginMode::Cross => "cross",
        MarginMode::Isolated => "isolated",
    }
}

/// Conditional order type for a base type and trigger kind.
fn conditional_type(order_type: OrderType, take_profit: bool) -> &'static str {
    match (order_type, take_profit) {
        (OrderType::Limit, false) => "stopLimit",
        (OrderType::Market, false) => "stopMarket",
        (OrderType::Limit, true) => "takeProfitLimit",
        (OrderType::Market, true) => "takeProfitMarket",
    }
}

/// `{venue}/order` body.
///
/// A trigger or stop-loss price turns the order into `stopLimit` or
/// `stopMarket`; a take-profit price into the `takeProfit` variants.
/// Reduce-only is accepted on swap markets and on margin orders only.
pub fn order_request(market: &Market, order: &OrderRequest) -> Result<Params, ExchangeError> {
    let params = &order.params;
    let mut request = params.extra.clone();
    put(&mut request, "symbol", market.id.as_str());
    put(&mut request, "side", order.side.as_str());
    put(&mut request, "quantity", amount_to_precision(market, order.amount)?);
    if let Some(client_id) = &params.client_order_id {
        put(&mut request, "client_order_id", client_id.as_str());
    }

    let is_swap = market.market_type() == MarketType::Swap;
    if let Some(reduce_only) = params.reduce_only {
        let margin = market.market_type() == MarketType::Margin || params.margin_mode.is_some();
        if !is_swap && !margin {
            return Err(ExchangeError::InvalidOrder(format!(
                "hitbtc reduce_only orders are supported for swap and margin markets only, got {}",
                market.symbol()
            )));
        }
        if reduce_only {
            request.insert("reduce_only".to_string(), json!(true));
        }
    }

    if params.is_post_only() {
        if order.order_type == OrderType::Market {
            return Err(ExchangeError::InvalidOrder(
                "hitbtc market orders cannot be post only".to_string(),
            ));
        }
        request.insert("post_only".to_string(), json!(true));
    }
    match params.time_in_force {
        Some(TimeInForce::PO) | None => {}
        Some(TimeInForce::GTD) => {
            let expire_time = params.expire_time.as_deref().ok_or_else(|| {
                ExchangeError::InvalidOrder("hitbtc GTD orders require an expire_time".to_string())
            })?;
            put(&mut request, "time_in_force", TimeInForce::GTD.as_str());
            put(&mut request, "expire_time", expire_time);
        }
        Some(tif) => put(&mut request, "time_in_force", tif.as_str()),
    }

    if order.order_type == OrderType::Limit {
        let price = order
            .price
            .ok_or_else(|| ExchangeError::InvalidOrder("hitbtc limit orders require a price".to_string()))?;
        put(&mut request, "price", price_to_precision(market, price));
    }

    let stop = params.trigger_price.or(params.stop_loss_price);
    let trigger = match (stop, params.take_profit_price) {
        (Some(_), Some(_)) => {
            return Err(ExchangeError::InvalidOrder(
                "hitbtc orders take either a stop or a take profit price, not both".to_string(),
            ))
        }
        (Some(price), None) => Some((price, false)),
        (None, Some(price)) => Some((price, true)),
        (None, None) => None,
    };
    let order_type = match trigger {
        Some((price, take_profit)) => {
            put(&mut request, "stop_price", price_to_precision(market, price));
            conditional_type(order.order_type, take_profit)
        }
        None => order.order_type.as_str(),
    };
    put(&mut request, "type", order_type);

    if is_swap {
        let mode = params.margin_mode.unwrap_or(MarginMode::Cross);
        put(&mut request, "margin_mode", margin_mode_str(mode));
    }
    Ok(request)
}

/// `PATCH {venue}/order/{client_order_id}` body.
pub fn edit_order_request(market: &Market, edit: &EditOrderRequest) -> Result<Params, ExchangeError> {
    let mut request = edit.params.extra.clone();
    let amount = edit
        .amount
        .ok_or_else(|| ExchangeError::InvalidOrder("hitbtc edit_order() requires an amount".to_string()))?;
    put(&mut request, "quantity", amount_to_precision(market, amount)?);
    if edit.order_type == OrderType::Limit {
        let price = edit
            .price
            .ok_or_else(|| ExchangeError::InvalidOrder("hitbtc edit_order() requires a price for limit orders".to_string()))?;
        put(&mut request, "price", price_to_precision(market, price));
    }
    Ok(request)
}

pub fn trades_request(since: Option<i64>, limit: Option<usize>) -> Params {
    let mut request = Params::new();
    if let Some(limit) = limit {
        request.insert("limit".to_string(), json!(limit.min(MAX_TRADES)));
    }
    if let Some(since) = since {
        request.insert("from".to_string(), json!(since));
    }
    request
}

/// `candles` parameters. Bounds are ISO-8601 strings.
pub fn ohlcv_request(period: &str, since: Option<i64>, until: Option<i64>, limit: Option<usize>) -> Params {
    let mut request = Params::new();
    put(&mut request, "period", period);
    if let Some(from) = since.and_then(safe::iso8601) {
        put(&mut request, "from", from);
    }
    if let Some(till) = until.and_then(safe::iso8601) {
        put(&mut request, "till", till);
    }
    if let Some(limit) = limit {
        request.insert("limit".to_string(), json!(limit.min(MAX_CANDLES)));
    }
    request
}

/// `history/order` and `history/trade` filters.
pub fn history_request(market: Option<&Market>, since: Option<i64>, limit: Option<usize>) -> Params {
    let mut request = Params::new();
    if let Some(market) = market {
        put(&mut request, "symbol", market.id.as_str());
    }
    if let Some(from) = since.and_then(safe::iso8601) {
        put(&mut request, "from", from);
    }
    if let Some(limit) = limit {
        request.insert("limit".to_string(), json!(limit));
    }
    request
}

/// `wallet/transactions` filter for one direction.
pub fn transactions_request(
    kind: &str,
    currency_id: Option<&str>,
    since: Option<i64>,
    limit: Option<usize>,
) -> Params {
    let mut request = Params::new();
    put(&mut request, "types", kind);
    if let Some(currency_id) = currency_id {
        put(&mut request, "currencies", currency_id);
    }
    if let Some(from) = since.and_then(safe::iso8601) {
        put(&mut request, "from", from);
    }
    if let Some(limit) = limit {
        request.insert("limit".to_string(), json!(limit));
    }
    request
}

/// Exchange network id for a unified network code, falling back to the
/// code itself.
pub fn network_id(options: &AdapterOptions, network: &str) -> String {
    options
        .networks
        .get(network)
        .cloned()
        .unwrap_or_else(|| network.to_string())
}

/// `wallet/crypto/withdraw` body.
pub fn withdraw_request(options: &AdapterOptions, currency_id: &str, request: &WithdrawRequest) -> Params {
    let mut body = request.params.clone();
    put(&mut body, "currency", currency_id);
    put(&mut body, "amount", format_decimal(request.amount));
    put(&mut body, "address", request.address.as_str());
    if let Some(tag) = &request.tag {
        put(&mut body, "payment_id", tag.as_str());
    }
    if request.code == NETWORK_AWARE_CURRENCY {
        if let Some(network) = &request.network {
            put(&mut body, "network_code", network_id(options, network));
        }
    }
    body
}

/// Account name the exchange uses for a unified account type.
pub fn account_id(options: &AdapterOptions, account: &str) -> String {
    options
        .accounts_by_type
        .get(account)
        .cloned()
        .unwrap_or_else(|| account.to_string())
}

/// `wallet/transfer` body. Moving funds onto the same account is rejected.
pub fn transfer_request(
    options: &AdapterOptions,
    currency_id: &str,
    request: &TransferRequest,
) -> Result<Params, ExchangeError> {
    let source = account_id(options, &request.from_account);
    let destination = account_id(options, &request.to_account);
    if source == destination {
        return Err(ExchangeError::BadRequest(format!(
            "hitbtc transfer() from and to accounts must differ, both are {}",
            source
        )));
    }
    let mut body = request.params.clone();
    put(&mut body, "currency", currency_id);
    put(&mut body, "amount", format_decimal(request.amount));
    put(&mut body, "source", source);
    put(&mut body, "destination", destination);
    Ok(body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{Asset, OrderParams, OrderSide};
    use crate::exchanges::hitbtc::types::hitbtc_descriptor;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn spot() -> Market {
        let mut market = Market::spot("ETHBTC", Asset::new("ETH", "ETH"), Asset::new("BTC", "BTC"));
        market.precision.amount = Some(dec!(0.001));
        market.precision.price = Some(dec!(0.000001));
        market
    }

    fn swap() -> Market {
        let mut market = Market::new(
            "BTCUSDT_PERP",
            MarketType::Swap,
            Asset::new("BTC", "BTC"),
            Asset::new("USDT", "USDT"),
            Some(Asset::new("USDT", "USDT")),
            None,
        );
        market.precision.amount = Some(dec!(0.0001));
        market.precision.price = Some(dec!(0.01));
        market
    }

    fn limit(market: &Market, params: OrderParams) -> OrderRequest {
        OrderRequest {
            symbol: market.symbol().to_string(),
            order_type: OrderType::Limit,
            side: OrderSide::Buy,
            amount: dec!(1.5),
            price: Some(dec!(0.05)),
            params,
        }
    }

    fn text<'a>(request: &'a Params, key: &str) -> Option<&'a str> {
        request.get(key).and_then(Value::as_str)
    }

    #[test]
    fn plain_limit_order() {
        let market = spot();
        let request = order_request(&market, &limit(&market, OrderParams::default())).unwrap();
        assert_eq!(text(&request, "type"), Some("limit"));
        assert_eq!(text(&request, "quantity"), Some("1.5"));
        assert_eq!(text(&request, "price"), Some("0.05"));
        assert!(!request.contains_key("margin_mode"));
    }

    #[test]
    fn trigger_turns_limit_into_stop_limit() {
        let market = spot();
        let params = OrderParams {
            trigger_price: Some(dec!(0.049)),
            ..OrderParams::default()
        };
        let request = order_request(&market, &limit(&market, params)).unwrap();
        assert_eq!(text(&request, "type"), Some("stopLimit"));
        assert_eq!(text(&request, "stop_price"), Some("0.049"));

        let mut market_order = limit(&market, OrderParams {
            take_profit_price: Some(dec!(0.06)),
            ..OrderParams::default()
        });
        market_order.order_type = OrderType::Market;
        market_order.price = None;
        let request = order_request(&market, &market_order).unwrap();
        assert_eq!(text(&request, "type"), Some("takeProfitMarket"));
        assert!(!request.contains_key("price"));
    }

    #[test]
    fn reduce_only_needs_swap_or_margin() {
        let market = spot();
        let params = OrderParams {
            reduce_only: Some(true),
            ..OrderParams::default()
        };
        assert!(matches!(
            order_request(&market, &limit(&market, params.clone())),
            Err(ExchangeError::InvalidOrder(_))
        ));

        let margin = OrderParams {
            margin_mode: Some(MarginMode::Isolated),
            ..params.clone()
        };
        let request = order_request(&market, &limit(&market, margin)).unwrap();
        assert_eq!(request.get("reduce_only"), Some(&json!(true)));

        let swap = swap();
        let request = order_request(&swap, &limit(&swap, params)).unwrap();
        assert_eq!(text(&request, "margin_mode"), Some("cross"));
    }

    #[test]
    fn gtd_requires_expire_time() {
        let market = spot();
        let params = OrderParams {
            time_in_force: Some(TimeInForce::GTD),
            ..OrderParams::default()
        };
        assert!(matches!(
            order_request(&market, &limit(&market, params.clone())),
            Err(ExchangeError::InvalidOrder(_))
        ));
        let with_expiry = OrderParams {
            expire_time: Some("2021-06-15T17:01:05.092Z".to_string()),
            ..params
        };
        let request = order_request(&market, &limit(&market, with_expiry)).unwrap();
        assert_eq!(text(&request, "time_in_force"), Some("GTD"));
        assert_eq!(text(&request, "expire_time"), Some("2021-06-15T17:01:05.092Z"));
    }

    #[test]
    fn post_only_sets_flag_not_time_in_force() {
        let market = spot();
        let params = OrderParams {
            time_in_force: Some(TimeInForce::PO),
            ..OrderParams::default()
        };
        let request = order_request(&market, &limit(&market, params)).unwrap();
        assert_eq!(request.get("post_only"), Some(&json!(true)));
        assert!(!request.contains_key("time_in_force"));
    }

    #[test]
    fn limit_without_price_is_rejected() {
        let market = spot();
        let mut order = limit(&market, OrderParams::default());
        order.price = None;
        assert!(matches!(order_request(&market, &order), Err(ExchangeError::InvalidOrder(_))));
    }

    #[test]
    fn withdraw_network_only_for_usdt() {
        let options = hitbtc_descriptor().options;
        let mut request = WithdrawRequest {
            code: "USDT".to_string(),
            amount: dec!(10),
            address: "T-addr".to_string(),
            tag: None,
            network: Some("TRC20".to_string()),
            params: Params::new(),
        };
        let body = withdraw_request(&options, "USDT", &request);
        assert_eq!(text(&body, "network_code"), Some("TRX"));

        request.code = "ETH".to_string();
        let body = withdraw_request(&options, "ETH", &request);
        assert!(!body.contains_key("network_code"));
    }

    #[test]
    fn transfer_maps_accounts_and_rejects_same_account() {
        let options = hitbtc_descriptor().options;
        let mut request = TransferRequest {
            code: "USDT".to_string(),
            amount: Decimal::ONE,
            from_account: "funding".to_string(),
            to_account: "spot".to_string(),
            params: Params::new(),
        };
        let body = transfer_request(&options, "USDT", &request).unwrap();
        assert_eq!(text(&body, "source"), Some("wallet"));
        assert_eq!(text(&body, "destination"), Some("spot"));

        request.from_account = "swap".to_string();
        request.to_account = "future".to_string();
        assert!(matches!(
            transfer_request(&options, "USDT", &request),
            Err(ExchangeError::BadRequest(_))
        ));
    }

    #[test]
    fn ohlcv_bounds_are_iso() {
        let request = ohlcv_request("H1", Some(1_622_505_600_000), None, Some(5000));
        assert_eq!(text(&request, "from"), Some("2021-06-01T00:00:00.000Z"));
        assert_eq!(request.get("limit"), Some(&json!(1000)));
    }
}
