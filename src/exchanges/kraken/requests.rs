use super::types::MAX_CANCEL_AFTER_MS;
use crate::core::errors::ExchangeError;
use crate::core::precision::{amount_to_precision, cost_to_precision, format_decimal, price_to_precision};
use crate::core::types::{
    EditOrderRequest, Market, OffsetSign, OrderParams, OrderRequest, OrderType, Params,
};
use rust_decimal::Decimal;
use serde_json::{json, Value};

fn put(request: &mut Params, key: &str, value: impl Into<String>) {
    request.insert(key.to_string(), Value::String(value.into()));
}

fn append_flag(flags: Option<String>, flag: &str) -> String {
    match flags {
        Some(existing) if !existing.is_empty() => format!("{},{}", existing, flag),
        _ => flag.to_string(),
    }
}

fn percent(sign: char, value: Decimal) -> String {
    format!("{}{}%", sign, format_decimal(value))
}

/// `AddOrder` parameters, plus whether the volume is expressed in quote
/// currency (needed later to read the order description back).
pub fn order_request(market: &Market, order: &OrderRequest) -> Result<(Params, bool), ExchangeError> {
    let params = &order.params;
    let is_market = order.order_type == OrderType::Market;
    let is_limit = order.order_type == OrderType::Limit;

    if params.stop_loss_price.is_some() && params.take_profit_price.is_some() {
        return Err(ExchangeError::InvalidOrder(
            "kraken accepts either a stop loss or a take profit price, not both".to_string(),
        ));
    }
    if is_market && params.is_post_only() {
        return Err(ExchangeError::InvalidOrder(
            "kraken market orders cannot be post only".to_string(),
        ));
    }

    let mut request = Params::new();
    put(&mut request, "pair", market.id.as_str());
    put(&mut request, "type", order.side.as_str());
    put(&mut request, "ordertype", order.order_type.as_str());
    put(&mut request, "volume", amount_to_precision(market, order.amount)?);

    if let Some(client_id) = &params.client_order_id {
        put(&mut request, "cl_ord_id", client_id.as_str());
    }

    let mut flags = params.extra.get("oflags").and_then(Value::as_str).map(str::to_string);
    let viqc = flags.as_deref().is_some_and(|f| f.contains("viqc"));
    let trailing = params.trailing_amount.is_some() || params.trailing_percent.is_some();
    let mut using_cost = false;

    if is_market && (params.cost.is_some() || viqc) {
        let cost = params.cost.unwrap_or(order.amount);
        put(&mut request, "volume", cost_to_precision(market, cost));
        flags = Some(append_flag(flags, "viqc"));
        using_cost = true;
    } else if is_limit && !trailing {
        let price = limit_price(order)?;
        put(&mut request, "price", price_to_precision(market, price));
    }

    if let Some(trigger) = params.stop_loss_price.or(params.take_profit_price) {
        let kind = if params.stop_loss_price.is_some() { "stop-loss" } else { "take-profit" };
        put(&mut request, "price", price_to_precision(market, trigger));
        if is_limit {
            put(&mut request, "ordertype", format!("{}-limit", kind));
            put(&mut request, "price2", price_to_precision(market, limit_price(order)?));
        } else {
            put(&mut request, "ordertype", kind);
        }
    } else if trailing {
        apply_trailing(&mut request, params, is_limit)?;
    }

    if params.reduce_only == Some(true) {
        put(&mut request, "reduce_only", "true");
    }

    if let Some(close) = &params.close {
        let mut nested = Params::new();
        put(&mut nested, "ordertype", close.order_type.as_str());
        if let Some(price) = close.price {
            put(&mut nested, "price", price_to_precision(market, price));
        }
        if let Some(price2) = close.price2 {
            put(&mut nested, "price2", price_to_precision(market, price2));
        }
        request.insert("close".to_string(), Value::Object(nested));
    }

    if let Some(tif) = params.time_in_force {
        put(&mut request, "timeinforce", tif.as_str());
    }

    if params.is_post_only() {
        flags = Some(append_flag(flags, "post"));
    }
    if let Some(flags) = flags {
        put(&mut request, "oflags", flags);
    }

    for (key, value) in &params.extra {
        if key != "oflags" {
            request.entry(key.clone()).or_insert_with(|| value.clone());
        }
    }
    Ok((request, using_cost))
}

fn limit_price(order: &OrderRequest) -> Result<Decimal, ExchangeError> {
    order.price.ok_or_else(|| {
        ExchangeError::InvalidOrder(format!("kraken {} limit order requires a price", order.symbol))
    })
}

/// Trailing stops are always quoted as `+offset`; the limit leg takes the
/// caller's sign (default `-`).
fn apply_trailing(request: &mut Params, params: &OrderParams, is_limit: bool) -> Result<(), ExchangeError> {
    let activation = params
        .trailing_percent
        .map(|p| percent('+', p))
        .or_else(|| params.trailing_amount.map(|a| format!("+{}", format_decimal(a))));
    let offset = params.trailing_offset.unwrap_or(OffsetSign::Minus).as_char();
    put(request, "trigger", params.trailing_trigger.as_deref().unwrap_or("last"));

    let wants_limit =
        is_limit || params.trailing_limit_amount.is_some() || params.trailing_limit_percent.is_some();
    if !wants_limit {
        put(request, "ordertype", "trailing-stop");
        if let Some(price) = activation {
            put(request, "price", price);
        }
        return Ok(());
    }

    put(request, "ordertype", "trailing-stop-limit");
    let (price, price2) = match (params.trailing_limit_percent, params.trailing_limit_amount) {
        (Some(limit_pct), _) => (
            params.trailing_percent.map(|p| percent('+', p)),
            percent(offset, limit_pct),
        ),
        (None, Some(limit_amount)) => (
            params.trailing_amount.map(|a| format!("+{}", format_decimal(a))),
            format!("{}{}", offset, format_decimal(limit_amount)),
        ),
        (None, None) => {
            return Err(ExchangeError::InvalidOrder(
                "kraken trailing-stop-limit orders need a trailing limit amount or percent".to_string(),
            ))
        }
    };
    if let Some(price) = price {
        put(request, "price", price);
    }
    put(request, "price2", price2);
    Ok(())
}

/// `AmendOrder` parameters. Only spot orders can be amended.
pub fn edit_request(market: &Market, edit: &EditOrderRequest) -> Result<Params, ExchangeError> {
    if !market.is_spot() {
        return Err(ExchangeError::NotSupported(format!(
            "kraken edit_order does not support {} orders, only spot orders are accepted",
            market.symbol()
        )));
    }
    let params = &edit.params;
    let mut request = Params::new();
    match &params.client_order_id {
        Some(client_id) => put(&mut request, "cl_ord_id", client_id.as_str()),
        None => put(&mut request, "txid", edit.id.as_str()),
    }
    if params.is_post_only() {
        if edit.order_type == OrderType::Market {
            return Err(ExchangeError::InvalidOrder(
                "kraken market orders cannot be post only".to_string(),
            ));
        }
        put(&mut request, "post_only", "true");
    }
    if let Some(amount) = edit.amount {
        put(&mut request, "order_qty", amount_to_precision(market, amount)?);
    }
    if let Some(price) = edit.price {
        put(&mut request, "limit_price", price_to_precision(market, price));
    }

    let trigger = params
        .stop_loss_price
        .or(params.take_profit_price)
        .or(params.trailing_amount)
        .or(params.trailing_percent)
        .or(params.trailing_limit_amount)
        .or(params.trailing_limit_percent);
    if let Some(trigger) = trigger {
        let value = match params.trailing_offset {
            Some(sign) => format!("{}{}", sign.as_char(), format_decimal(trigger)),
            None => price_to_precision(market, trigger),
        };
        put(&mut request, "trigger_price", value);
    }

    for (key, value) in &params.extra {
        request.entry(key.clone()).or_insert_with(|| value.clone());
    }
    Ok(request)
}

/// `CancelAllOrdersAfter` takes whole seconds; zero disarms the switch.
pub fn cancel_after_request(timeout_ms: i64) -> Result<Params, ExchangeError> {
    if timeout_ms > MAX_CANCEL_AFTER_MS {
        return Err(ExchangeError::BadRequest(format!(
            "kraken cancel_all_orders_after timeout should be less than {} milliseconds",
            MAX_CANCEL_AFTER_MS
        )));
    }
    let seconds = if timeout_ms > 0 { timeout_ms / 1000 } else { 0 };
    let mut request = Params::new();
    request.insert("timeout".to_string(), json!(seconds));
    Ok(request)
}

/// `start`/`end` bounds of the funding history endpoints, in seconds.
/// `end` is exclusive on Kraken's side, hence the extra second.
pub fn funding_window(request: &mut Params, since: Option<i64>, until: Option<i64>) {
    if let Some(since) = since {
        request.insert("start".to_string(), json!(since / 1000));
    }
    if let Some(until) = until {
        request.insert("end".to_string(), json!(until / 1000 + 1));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{Asset, CloseOrder, OrderSide, TimeInForce};
    use rust_decimal_macros::dec;

    fn market() -> Market {
        let mut m = Market::spot("XXBTZUSD", Asset::new("XXBT", "BTC"), Asset::new("ZUSD", "USD"));
        m.precision.price = Some(dec!(0.1));
        m.precision.amount = Some(dec!(0.00000001));
        m
    }

    fn get<'a>(request: &'a Params, key: &str) -> Option<&'a str> {
        request.get(key).and_then(Value::as_str)
    }

    #[test]
    fn plain_limit_order() {
        let order = OrderRequest::limit("BTC/USD", OrderSide::Buy, dec!(1.25), dec!(37500.04))
            .with_client_order_id("my-id");
        let (request, using_cost) = order_request(&market(), &order).unwrap();
        assert_eq!(get(&request, "pair"), Some("XXBTZUSD"));
        assert_eq!(get(&request, "type"), Some("buy"));
        assert_eq!(get(&request, "ordertype"), Some("limit"));
        assert_eq!(get(&request, "volume"), Some("1.25"));
        assert_eq!(get(&request, "price"), Some("37500"));
        assert_eq!(get(&request, "cl_ord_id"), Some("my-id"));
        assert!(!request.contains_key("oflags"));
        assert!(!using_cost);
    }

    #[test]
    fn stop_loss_limit_uses_trigger_then_limit() {
        let order = OrderRequest::limit("BTC/USD", OrderSide::Sell, dec!(0.5), dec!(27000))
            .with_stop_loss(dec!(27500));
        let (request, _) = order_request(&market(), &order).unwrap();
        assert_eq!(get(&request, "ordertype"), Some("stop-loss-limit"));
        assert_eq!(get(&request, "price"), Some("27500"));
        assert_eq!(get(&request, "price2"), Some("27000"));
    }

    #[test]
    fn market_take_profit() {
        let order = OrderRequest::market("BTC/USD", OrderSide::Sell, dec!(0.5)).with_take_profit(dec!(40000));
        let (request, _) = order_request(&market(), &order).unwrap();
        assert_eq!(get(&request, "ordertype"), Some("take-profit"));
        assert_eq!(get(&request, "price"), Some("40000"));
        assert!(!request.contains_key("price2"));
    }

    #[test]
    fn both_stop_loss_and_take_profit_are_rejected() {
        let order = OrderRequest::market("BTC/USD", OrderSide::Sell, dec!(1))
            .with_stop_loss(dec!(1))
            .with_take_profit(dec!(2));
        assert!(matches!(order_request(&market(), &order), Err(ExchangeError::InvalidOrder(_))));
    }

    #[test]
    fn market_post_only_is_rejected() {
        let order = OrderRequest::market("BTC/USD", OrderSide::Buy, dec!(1)).with_post_only();
        assert!(matches!(order_request(&market(), &order), Err(ExchangeError::InvalidOrder(_))));
    }

    #[test]
    fn cost_order_is_sized_in_quote() {
        let order = OrderRequest::market("BTC/USD", OrderSide::Buy, dec!(1)).with_cost(dec!(25.567));
        let (request, using_cost) = order_request(&market(), &order).unwrap();
        assert_eq!(get(&request, "volume"), Some("25.5"));
        assert_eq!(get(&request, "oflags"), Some("viqc"));
        assert!(using_cost);
    }

    #[test]
    fn post_only_extends_existing_flags() {
        let mut params = OrderParams {
            post_only: Some(true),
            ..OrderParams::default()
        };
        params.extra.insert("oflags".into(), json!("fciq"));
        let order = OrderRequest::limit("BTC/USD", OrderSide::Buy, dec!(1), dec!(100)).with_params(params);
        let (request, _) = order_request(&market(), &order).unwrap();
        assert_eq!(get(&request, "oflags"), Some("fciq,post"));
    }

    #[test]
    fn trailing_stop_percent_and_limit_amount() {
        let params = OrderParams {
            trailing_percent: Some(dec!(5)),
            ..OrderParams::default()
        };
        let order = OrderRequest::market("BTC/USD", OrderSide::Sell, dec!(1)).with_params(params);
        let (request, _) = order_request(&market(), &order).unwrap();
        assert_eq!(get(&request, "ordertype"), Some("trailing-stop"));
        assert_eq!(get(&request, "price"), Some("+5%"));
        assert_eq!(get(&request, "trigger"), Some("last"));

        let params = OrderParams {
            trailing_amount: Some(dec!(100)),
            trailing_limit_amount: Some(dec!(20)),
            ..OrderParams::default()
        };
        let order = OrderRequest::market("BTC/USD", OrderSide::Sell, dec!(1)).with_params(params);
        let (request, _) = order_request(&market(), &order).unwrap();
        assert_eq!(get(&request, "ordertype"), Some("trailing-stop-limit"));
        assert_eq!(get(&request, "price"), Some("+100"));
        assert_eq!(get(&request, "price2"), Some("-20"));
    }

    #[test]
    fn trailing_limit_without_limit_offset_is_rejected() {
        let params = OrderParams {
            trailing_amount: Some(dec!(100)),
            ..OrderParams::default()
        };
        let order = OrderRequest::limit("BTC/USD", OrderSide::Sell, dec!(1), dec!(100)).with_params(params);
        assert!(matches!(order_request(&market(), &order), Err(ExchangeError::InvalidOrder(_))));
    }

    #[test]
    fn modifiers_and_close_order() {
        let params = OrderParams {
            reduce_only: Some(true),
            time_in_force: Some(TimeInForce::IOC),
            close: Some(CloseOrder {
                order_type: "limit".into(),
                price: Some(dec!(31000.04)),
                price2: None,
            }),
            ..OrderParams::default()
        };
        let order = OrderRequest::limit("BTC/USD", OrderSide::Buy, dec!(1), dec!(30000)).with_params(params);
        let (request, _) = order_request(&market(), &order).unwrap();
        assert_eq!(get(&request, "reduce_only"), Some("true"));
        assert_eq!(get(&request, "timeinforce"), Some("IOC"));
        assert_eq!(request["close"]["ordertype"], "limit");
        assert_eq!(request["close"]["price"], "31000");
    }

    #[test]
    fn amend_by_client_id() {
        let edit = EditOrderRequest {
            id: "OABC".into(),
            symbol: "BTC/USD".into(),
            order_type: OrderType::Limit,
            side: OrderSide::Buy,
            amount: Some(dec!(2)),
            price: Some(dec!(30000)),
            params: OrderParams {
                client_order_id: Some("cid".into()),
                post_only: Some(true),
                ..OrderParams::default()
            },
        };
        let request = edit_request(&market(), &edit).unwrap();
        assert_eq!(get(&request, "cl_ord_id"), Some("cid"));
        assert!(!request.contains_key("txid"));
        assert_eq!(get(&request, "order_qty"), Some("2"));
        assert_eq!(get(&request, "limit_price"), Some("30000"));
        assert_eq!(get(&request, "post_only"), Some("true"));
    }

    #[test]
    fn cancel_after_bounds() {
        assert_eq!(cancel_after_request(60_000).unwrap()["timeout"], 60);
        assert_eq!(cancel_after_request(0).unwrap()["timeout"], 0);
        assert!(matches!(
            cancel_after_request(MAX_CANCEL_AFTER_MS + 1),
            Err(ExchangeError::BadRequest(_))
        ));
    }

    #[test]
    fn funding_window_is_in_seconds() {
        let mut request = Params::new();
        funding_window(&mut request, Some(1_700_000_000_500), Some(1_700_000_100_000));
        assert_eq!(request["start"], 1_700_000_000);
        assert_eq!(request["end"], 1_700_000_101);
    }
}
