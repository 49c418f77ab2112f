use super::types::{MAIN_ACCOUNT, MAX_CANDLES, MAX_ORDERS};
use crate::core::config::AdapterOptions;
use crate::core::errors::ExchangeError;
use crate::core::precision::{amount_to_precision, cost_to_precision, format_decimal, price_to_precision};
use crate::core::safe;
use crate::core::types::{Market, OrderRequest, OrderSide, OrderType, Params, TransferRequest, WithdrawRequest};
use rust_decimal::Decimal;
use serde_json::{json, Value};

fn put(request: &mut Params, key: &str, value: impl Into<String>) {
    request.insert(key.to_string(), Value::String(value.into()));
}

/// `orders/create` body.
///
/// A trigger price turns LIMIT and MARKET into STOP_LIMIT and STOP_MARKET.
/// Market buys are sized in quote currency through `value`.
pub fn order_request(market: &Market, order: &OrderRequest, options: &AdapterOptions) -> Result<Params, ExchangeError> {
    let params = &order.params;
    let trigger = params.trigger_price.or(params.stop_loss_price);
    let mut request = params.extra.clone();
    put(&mut request, "symbol", market.id.as_str());
    put(&mut request, "side", order.side.as_str().to_uppercase());

    let order_type = match (order.order_type, trigger) {
        (OrderType::Limit, None) => "LIMIT",
        (OrderType::Market, None) => "MARKET",
        (OrderType::Limit, Some(_)) => "STOP_LIMIT",
        (OrderType::Market, Some(_)) => "STOP_MARKET",
    };
    if let Some(trigger) = trigger {
        let default_operator = match order.side {
            OrderSide::Buy => "LTE",
            OrderSide::Sell => "GTE",
        };
        if !request.contains_key("operator") {
            put(&mut request, "operator", default_operator);
        }
        put(&mut request, "stopPrice", price_to_precision(market, trigger));
    }

    match (order.order_type, order.side) {
        (OrderType::Limit, _) => {
            let price = order.price.ok_or_else(|| {
                ExchangeError::InvalidOrder(format!("novadax {} orders require a price", order_type))
            })?;
            put(&mut request, "price", price_to_precision(market, price));
            put(&mut request, "amount", amount_to_precision(market, order.amount)?);
        }
        (OrderType::Market, OrderSide::Sell) => {
            put(&mut request, "amount", amount_to_precision(market, order.amount)?);
        }
        (OrderType::Market, OrderSide::Buy) => {
            let cost = market_buy_cost(order, options)?;
            put(&mut request, "value", cost_to_precision(market, cost));
        }
    }
    put(&mut request, "type", order_type);
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
            "novadax market buy orders require a price or a cost to compute the total to spend; \
             disable create_market_buy_order_requires_price to pass the cost as the amount"
                .to_string(),
        )
    })?;
    order
        .amount
        .checked_mul(price)
        .ok_or_else(|| {
            ExchangeError::InvalidOrder(format!("novadax market buy cost overflows: {} * {}", order.amount, price))
        })
}

/// `market/kline/history` window in seconds. Without `since` the window
/// ends now (or at `until`).
pub fn ohlcv_request(
    market_id: &str,
    unit: &str,
    timeframe_secs: i64,
    since: Option<i64>,
    until: Option<i64>,
    limit: Option<usize>,
) -> Params {
    let span = timeframe_secs * limit.unwrap_or(MAX_CANDLES).min(MAX_CANDLES) as i64;
    let (from, to) = match since {
        Some(since) => {
            let from = since / 1000;
            let to = until.map_or(from + span, |until| (until / 1000).min(from + span));
            (from, to)
        }
        None => {
            let to = until.unwrap_or_else(safe::milliseconds) / 1000;
            (to - span, to)
        }
    };

    let mut request = Params::new();
    put(&mut request, "symbol", market_id);
    put(&mut request, "unit", unit);
    request.insert("from".to_string(), json!(from));
    request.insert("to".to_string(), json!(to));
    request
}

pub fn trades_request(market_id: &str, limit: Option<usize>) -> Params {
    let mut request = Params::new();
    put(&mut request, "symbol", market_id);
    if let Some(limit) = limit {
        request.insert("limit".to_string(), json!(limit));
    }
    request
}

/// `orders/list` and `orders/fills` filters. `from_id` continues after the
/// last entry of the previous page.
pub fn history_request(
    market_id: Option<&str>,
    status: Option<&str>,
    since: Option<i64>,
    limit: Option<usize>,
    from_id: Option<&str>,
) -> Params {
    let mut request = Params::new();
    if let Some(id) = market_id {
        put(&mut request, "symbol", id);
    }
    if let Some(status) = status {
        put(&mut request, "status", status);
    }
    if let Some(since) = since {
        request.insert("fromTimestamp".to_string(), json!(since));
    }
    if let Some(limit) = limit {
        request.insert("limit".to_string(), json!(limit.min(MAX_ORDERS)));
    }
    if let Some(from_id) = from_id {
        put(&mut request, "fromId", from_id);
    }
    request
}

/// `wallet/query/deposit-withdraw`. `kind` is `coin_in` or `coin_out`;
/// `start` is the id to continue from.
pub fn transactions_request(
    kind: &str,
    currency_id: Option<&str>,
    limit: Option<usize>,
    start: Option<&str>,
) -> Params {
    let mut request = Params::new();
    put(&mut request, "type", kind);
    if let Some(id) = currency_id {
        put(&mut request, "currency", id);
    }
    if let Some(limit) = limit {
        request.insert("size".to_string(), json!(limit));
    }
    if let Some(start) = start {
        put(&mut request, "start", start);
    }
    request
}

pub fn withdraw_request(currency_id: &str, withdraw: &WithdrawRequest) -> Params {
    let mut request = withdraw.params.clone();
    put(&mut request, "code", currency_id);
    put(&mut request, "amount", format_decimal(withdraw.amount));
    put(&mut request, "wallet", withdraw.address.as_str());
    if let Some(tag) = &withdraw.tag {
        put(&mut request, "tag", tag.as_str());
    }
    if let Some(chain) = &withdraw.network {
        if !request.contains_key("chainAlias") {
            put(&mut request, "chainAlias", chain.as_str());
        }
    }
    request
}

/// Transfers run between the master account and one sub account only.
pub fn transfer_request(currency_id: &str, transfer: &TransferRequest) -> Result<Params, ExchangeError> {
    let (transfer_type, sub_id) = match (transfer.from_account.as_str(), transfer.to_account.as_str()) {
        (MAIN_ACCOUNT, MAIN_ACCOUNT) => {
            return Err(ExchangeError::BadRequest(
                "novadax transfer() needs a sub account on one side".to_string(),
            ))
        }
        (MAIN_ACCOUNT, sub) => ("master-transfer-in", sub),
        (sub, MAIN_ACCOUNT) => ("master-transfer-out", sub),
        _ => {
            return Err(ExchangeError::BadRequest(
                "novadax transfer() supports transfers between main account and subaccounts only".to_string(),
            ))
        }
    };

    let mut request = transfer.params.clone();
    put(&mut request, "transferAmount", format_decimal(transfer.amount));
    put(&mut request, "currency", currency_id);
    put(&mut request, "subId", sub_id);
    put(&mut request, "transferType", transfer_type);
    Ok(request)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Asset;
    use crate::exchanges::novadax::types::novadax_descriptor;
    use rust_decimal_macros::dec;

    fn market() -> Market {
        let mut market = Market::spot("BTC_BRL", Asset::new("BTC", "BTC"), Asset::new("BRL", "BRL"));
        market.precision.amount = Some(dec!(0.0001));
        market.precision.price = Some(dec!(0.01));
        market
    }

    fn options() -> AdapterOptions {
        novadax_descriptor().options
    }

    fn get<'a>(request: &'a Params, key: &str) -> Option<&'a str> {
        request.get(key).and_then(Value::as_str)
    }

    #[test]
    fn limit_order_is_uppercased_and_rounded() {
        let order = OrderRequest::limit("BTC/BRL", OrderSide::Buy, dec!(0.123456), dec!(34000.129));
        let request = order_request(&market(), &order, &options()).unwrap();
        assert_eq!(get(&request, "type"), Some("LIMIT"));
        assert_eq!(get(&request, "side"), Some("BUY"));
        assert_eq!(get(&request, "amount"), Some("0.1234"));
        assert_eq!(get(&request, "price"), Some("34000.13"));
        assert!(request.get("operator").is_none());
    }

    #[test]
    fn trigger_price_makes_stop_orders() {
        let buy = OrderRequest::limit("BTC/BRL", OrderSide::Buy, dec!(1), dec!(30000)).with_trigger(dec!(31000));
        let request = order_request(&market(), &buy, &options()).unwrap();
        assert_eq!(get(&request, "type"), Some("STOP_LIMIT"));
        assert_eq!(get(&request, "operator"), Some("LTE"));
        assert_eq!(get(&request, "stopPrice"), Some("31000"));

        let sell = OrderRequest::market("BTC/BRL", OrderSide::Sell, dec!(1)).with_trigger(dec!(29000));
        let request = order_request(&market(), &sell, &options()).unwrap();
        assert_eq!(get(&request, "type"), Some("STOP_MARKET"));
        assert_eq!(get(&request, "operator"), Some("GTE"));
        assert_eq!(get(&request, "amount"), Some("1"));
    }

    #[test]
    fn explicit_operator_is_kept() {
        let mut order = OrderRequest::limit("BTC/BRL", OrderSide::Buy, dec!(1), dec!(30000)).with_trigger(dec!(31000));
        order.params.extra.insert("operator".to_string(), json!("GTE"));
        let request = order_request(&market(), &order, &options()).unwrap();
        assert_eq!(get(&request, "operator"), Some("GTE"));
    }

    #[test]
    fn market_buy_sends_value() {
        let mut order = OrderRequest::market("BTC/BRL", OrderSide::Buy, dec!(0.5));
        assert!(matches!(
            order_request(&market(), &order, &options()),
            Err(ExchangeError::InvalidOrder(_))
        ));

        order.price = Some(dec!(30000));
        let request = order_request(&market(), &order, &options()).unwrap();
        assert_eq!(get(&request, "value"), Some("15000"));
        assert!(request.get("amount").is_none());

        let with_cost = OrderRequest::market("BTC/BRL", OrderSide::Buy, dec!(0.5)).with_cost(dec!(100.555));
        let request = order_request(&market(), &with_cost, &options()).unwrap();
        assert_eq!(get(&request, "value"), Some("100.55"));

        let mut relaxed = options();
        relaxed.create_market_buy_order_requires_price = false;
        let request = order_request(&market(), &OrderRequest::market("BTC/BRL", OrderSide::Buy, dec!(50)), &relaxed).unwrap();
        assert_eq!(get(&request, "value"), Some("50"));
    }

    #[test]
    fn limit_without_price_is_rejected() {
        let mut order = OrderRequest::limit("BTC/BRL", OrderSide::Sell, dec!(1), dec!(1));
        order.price = None;
        assert!(matches!(
            order_request(&market(), &order, &options()),
            Err(ExchangeError::InvalidOrder(_))
        ));
    }

    #[test]
    fn ohlcv_window_from_since() {
        let request = ohlcv_request("BTC_BRL", "ONE_MIN", 60, Some(1_600_000_000_000), None, Some(10));
        assert_eq!(request["from"], json!(1_600_000_000_i64));
        assert_eq!(request["to"], json!(1_600_000_600_i64));
        assert_eq!(get(&request, "unit"), Some("ONE_MIN"));
    }

    #[test]
    fn ohlcv_window_ending_at_until() {
        let request = ohlcv_request("BTC_BRL", "ONE_HOU", 3600, None, Some(1_600_000_000_000), Some(2));
        assert_eq!(request["to"], json!(1_600_000_000_i64));
        assert_eq!(request["from"], json!(1_600_000_000_i64 - 7200));
    }

    #[test]
    fn history_caps_limit() {
        let request = history_request(Some("BTC_BRL"), Some("FILLED"), Some(5), Some(500), Some("123"));
        assert_eq!(request["limit"], json!(100));
        assert_eq!(request["fromTimestamp"], json!(5));
        assert_eq!(get(&request, "fromId"), Some("123"));
    }

    fn transfer(from: &str, to: &str) -> TransferRequest {
        TransferRequest {
            code: "BTC".to_string(),
            amount: dec!(0.25),
            from_account: from.to_string(),
            to_account: to.to_string(),
            params: Params::new(),
        }
    }

    #[test]
    fn transfer_direction() {
        let request = transfer_request("BTC", &transfer("main", "sub-1")).unwrap();
        assert_eq!(get(&request, "transferType"), Some("master-transfer-in"));
        assert_eq!(get(&request, "subId"), Some("sub-1"));
        assert_eq!(get(&request, "transferAmount"), Some("0.25"));

        let request = transfer_request("BTC", &transfer("sub-2", "main")).unwrap();
        assert_eq!(get(&request, "transferType"), Some("master-transfer-out"));
        assert_eq!(get(&request, "subId"), Some("sub-2"));
    }

    #[test]
    fn transfer_between_subs_is_rejected() {
        assert!(matches!(
            transfer_request("BTC", &transfer("sub-1", "sub-2")),
            Err(ExchangeError::BadRequest(_))
        ));
        assert!(matches!(
            transfer_request("BTC", &transfer("main", "main")),
            Err(ExchangeError::BadRequest(_))
        ));
    }

    #[test]
    fn withdraw_with_tag() {
        let request = withdraw_request(
            "XLM",
            &WithdrawRequest {
                code: "XLM".to_string(),
                amount: dec!(10),
                address: "GBXX".to_string(),
                tag: Some("1234".to_string()),
                network: None,
                params: Params::new(),
            },
        );
        assert_eq!(get(&request, "code"), Some("XLM"));
        assert_eq!(get(&request, "wallet"), Some("GBXX"));
        assert_eq!(get(&request, "tag"), Some("1234"));
        assert!(request.get("chainAlias").is_none());
    }
}
