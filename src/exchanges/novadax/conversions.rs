use crate::core::markets::MarketCache;
use crate::core::precision::precision_from_digits;
use crate::core::safe;
use crate::core::types::{
    Asset, Balance, Balances, Fee, Market, MinMax, Ohlcv, Order, OrderSide, OrderStatus, OrderType,
    TakerOrMaker, Ticker, Trade, Transaction, TransactionStatus, TransactionType,
};
use serde_json::Value;
use std::sync::Arc;

/// Entry of `common/symbols`. Ids look like `BTC_BRL`.
pub fn convert_novadax_market(cache: &MarketCache, raw: &Value) -> Option<Market> {
    let id = safe::string(raw, "symbol")?;
    let base_id = safe::string(raw, "baseCurrency")?;
    let quote_id = safe::string(raw, "quoteCurrency")?;
    let base = cache.safe_currency_code(&base_id);
    let quote = cache.safe_currency_code(&quote_id);

    let mut market = Market::spot(id, Asset::new(base_id, base), Asset::new(quote_id, quote));
    market.active = safe::string(raw, "status").as_deref() == Some("ONLINE");
    market.precision.amount = safe::integer(raw, "amountPrecision").and_then(precision_from_digits);
    market.precision.price = safe::integer(raw, "pricePrecision").and_then(precision_from_digits);
    market.limits.amount = MinMax::new(safe::decimal(raw, "minOrderAmount"), None);
    market.limits.cost = MinMax::new(safe::decimal(raw, "minOrderValue"), None);
    market.info = raw.clone();
    Some(market)
}

/// Market for an id, building an inactive pair from `BASE_QUOTE` ids the
/// cache has never seen.
pub fn resolve_market(cache: &MarketCache, id: &str) -> Option<Arc<Market>> {
    cache.resolve(id, |id| {
        let (base_id, quote_id) = id.split_once('_')?;
        let mut market = Market::spot(
            id,
            Asset::new(base_id, cache.safe_currency_code(base_id)),
            Asset::new(quote_id, cache.safe_currency_code(quote_id)),
        );
        market.active = false;
        Some(market)
    })
}

fn symbol_of(cache: &MarketCache, raw: &Value, market: Option<&Arc<Market>>) -> Option<Arc<Market>> {
    safe::string(raw, "symbol")
        .and_then(|id| resolve_market(cache, &id))
        .or_else(|| market.cloned())
}

pub fn convert_novadax_ticker(raw: &Value, market: &Market) -> Ticker {
    Ticker {
        symbol: market.symbol().to_string(),
        timestamp: safe::integer(raw, "timestamp"),
        high: safe::decimal(raw, "high24h"),
        low: safe::decimal(raw, "low24h"),
        bid: safe::decimal(raw, "bid"),
        ask: safe::decimal(raw, "ask"),
        open: safe::decimal(raw, "open24h"),
        last: safe::decimal(raw, "lastPrice"),
        base_volume: safe::decimal(raw, "baseVolume24h"),
        quote_volume: safe::decimal(raw, "quoteVolume24h"),
        info: raw.clone(),
        ..Ticker::default()
    }
    .complete()
}

/// `{score, openPrice, highPrice, lowPrice, closePrice, amount, vol}`.
/// `volume_key` selects base (`amount`) or quote (`vol`) volume.
pub fn convert_novadax_ohlcv(raw: &Value, volume_key: &str) -> Option<Ohlcv> {
    Some(Ohlcv {
        timestamp: safe::timestamp_secs(raw, "score")?,
        open: safe::decimal(raw, "openPrice"),
        high: safe::decimal(raw, "highPrice"),
        low: safe::decimal(raw, "lowPrice"),
        close: safe::decimal(raw, "closePrice"),
        volume: safe::decimal(raw, volume_key),
    })
}

/// Public trades carry only price, amount, side and time; fills from
/// `orders/fill(s)` add ids, role and fee.
pub fn convert_novadax_trade(cache: &MarketCache, raw: &Value, market: Option<&Arc<Market>>) -> Trade {
    let market = symbol_of(cache, raw, market);
    let fee = safe::string(raw, "fee").map(|_| Fee {
        cost: safe::decimal(raw, "feeAmount"),
        currency: safe::string(raw, "feeCurrency").map(|id| cache.safe_currency_code(&id)),
        rate: None,
    });
    let taker_or_maker = match safe::string_lower(raw, "role").as_deref() {
        Some("maker") => Some(TakerOrMaker::Maker),
        Some("taker") => Some(TakerOrMaker::Taker),
        _ => None,
    };

    Trade {
        id: safe::string(raw, "id"),
        order: safe::string(raw, "orderId"),
        symbol: market.as_ref().map(|m| m.symbol().to_string()),
        timestamp: safe::integer(raw, "timestamp"),
        side: safe::string(raw, "side").and_then(|s| OrderSide::parse(&s)),
        taker_or_maker,
        price: safe::decimal(raw, "price"),
        amount: safe::decimal(raw, "amount"),
        fee,
        info: raw.clone(),
        ..Trade::default()
    }
    .complete()
}

/// `account/getBalance` data: one entry per currency.
pub fn convert_novadax_balance(cache: &MarketCache, data: &Value) -> Balances {
    let mut balances = Balances::new(data.clone());
    for entry in data.as_array().into_iter().flatten() {
        let Some(id) = safe::string(entry, "currency") else {
            continue;
        };
        balances.insert(
            cache.safe_currency_code(&id),
            Balance {
                free: safe::decimal(entry, "available"),
                used: safe::decimal(entry, "hold"),
                total: safe::decimal(entry, "balance"),
            },
        );
    }
    balances
}

pub fn order_status(raw: &str) -> OrderStatus {
    OrderStatus::from_table(
        raw,
        &[
            ("SUBMITTED", OrderStatus::Open),
            ("PROCESSING", OrderStatus::Open),
            ("PARTIAL_FILLED", OrderStatus::Open),
            ("CANCELING", OrderStatus::Open),
            ("FILLED", OrderStatus::Closed),
            ("CANCELED", OrderStatus::Canceled),
            ("REJECTED", OrderStatus::Rejected),
        ],
    )
}

/// `STOP_LIMIT` and `STOP_MARKET` are limit and market orders with a
/// trigger price.
fn order_type(raw: &str) -> Option<OrderType> {
    OrderType::parse(raw.trim_start_matches("STOP_").trim_start_matches("stop_"))
}

pub fn convert_novadax_order(cache: &MarketCache, raw: &Value, market: Option<&Arc<Market>>) -> Order {
    let market = symbol_of(cache, raw, market);
    Order {
        id: safe::string(raw, "id").unwrap_or_default(),
        timestamp: safe::integer(raw, "timestamp"),
        status: safe::string(raw, "status").map(|s| order_status(&s)),
        symbol: market.as_ref().map(|m| m.symbol().to_string()),
        order_type: safe::string(raw, "type").and_then(|t| order_type(&t)),
        side: safe::string(raw, "side").and_then(|s| OrderSide::parse(&s)),
        price: safe::decimal(raw, "price"),
        average: safe::decimal(raw, "averagePrice"),
        amount: safe::decimal(raw, "amount"),
        filled: safe::decimal(raw, "filledAmount"),
        cost: safe::decimal_n(raw, &["filledValue", "value"]),
        trigger_price: safe::decimal(raw, "stopPrice"),
        fee: safe::decimal(raw, "filledFee").map(|cost| Fee {
            cost: Some(cost),
            currency: None,
            rate: None,
        }),
        info: raw.clone(),
        ..Order::default()
    }
    .complete()
}

/// States look like `"Deposit SUCCESS"`; the second word is the state.
pub fn transaction_status(raw: &str) -> TransactionStatus {
    let state = raw.split(' ').nth(1).unwrap_or(raw);
    TransactionStatus::from_table(
        state,
        &[
            ("Pending", TransactionStatus::Pending),
            ("confirming", TransactionStatus::Pending),
            ("SUCCESS", TransactionStatus::Ok),
            ("FAIL", TransactionStatus::Failed),
        ],
    )
}

/// Entries of `wallet/query/deposit-withdraw`.
pub fn convert_novadax_transaction(cache: &MarketCache, raw: &Value) -> Transaction {
    let transaction_type = match safe::string(raw, "type").as_deref() {
        Some("COIN_IN") => Some(TransactionType::Deposit),
        Some("COIN_OUT") => Some(TransactionType::Withdrawal),
        _ => None,
    };
    let address = safe::string(raw, "address");
    let tag = safe::string(raw, "addressTag");
    let timestamp = safe::integer(raw, "createdAt");

    Transaction {
        id: safe::string(raw, "id"),
        txid: safe::string(raw, "txHash"),
        transaction_type,
        currency: safe::string(raw, "currency").map(|id| cache.safe_currency_code(&id)),
        network: safe::string(raw, "chain"),
        amount: safe::decimal(raw, "amount"),
        address_to: address.clone(),
        address,
        tag_to: tag.clone(),
        tag,
        status: safe::string(raw, "state").map(|s| transaction_status(&s)),
        updated: safe::integer(raw, "updatedAt"),
        timestamp,
        datetime: safe::iso8601_opt(timestamp),
        info: raw.clone(),
        ..Transaction::default()
    }
}
