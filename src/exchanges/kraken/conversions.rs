use super::types::{DescriptionRaw, OrderDescription, TradeRaw};
use crate::core::errors::ExchangeError;
use crate::core::markets::MarketCache;
use crate::core::precision::{omit_zero_str, precision_from_digits};
use crate::core::safe;
use crate::core::types::{
    Asset, Balance, Balances, Currency, DepositAddress, ExchangeHealth, ExchangeStatus, Fee,
    LedgerDirection, LedgerEntry, Market, MinMax, Ohlcv, Order, OrderSide, OrderStatus, OrderType,
    Position, PositionSide, TakerOrMaker, Ticker, Trade, Transaction, TransactionStatus,
    TransactionType, Transfer,
};
use rust_decimal::Decimal;
use serde_json::{json, Value};
use std::sync::Arc;

/// Unified code for a Kraken currency id, keeping staking/opt-in suffixes
/// (`DOT.S`, `ETH2.M`) attached to the converted base code.
pub fn currency_code(cache: &MarketCache, id: &str) -> String {
    match id.split_once('.') {
        Some((first, rest)) if !first.is_empty() => {
            let suffix = rest.split('.').next().unwrap_or_default();
            format!("{}.{}", cache.safe_currency_code(first), suffix)
        }
        _ => cache.safe_currency_code(id),
    }
}

fn percent_to_rate(value: Option<String>) -> Option<Decimal> {
    value
        .and_then(|v| safe::parse_decimal(&v))
        .map(|v| v / Decimal::ONE_HUNDRED)
}

/// One entry of `Assets`. X/Z-prefixed legacy ids are remembered as aliases
/// of their altname.
pub fn convert_kraken_currency(cache: &MarketCache, id: &str, raw: &Value) -> Currency {
    let altname = safe::string(raw, "altname");
    let code = if id.contains('.') {
        currency_code(cache, id)
    } else {
        match altname.as_deref() {
            Some(alt) if alt != id && (id.starts_with('X') || id.starts_with('Z')) => {
                let code = cache.safe_currency_code(alt);
                cache.learn_alias(id, code.clone());
                code
            }
            _ => cache.safe_currency_code(id),
        }
    };

    Currency {
        id: id.to_string(),
        code,
        name: altname,
        precision: safe::integer(raw, "decimals").and_then(precision_from_digits),
        active: Some(safe::string(raw, "status").as_deref() == Some("enabled")),
        info: raw.clone(),
        ..Currency::default()
    }
}

/// One entry of `AssetPairs`.
pub fn convert_kraken_market(cache: &MarketCache, id: &str, raw: &Value) -> Market {
    let base_id = safe::string(raw, "base").unwrap_or_default();
    let quote_id = safe::string(raw, "quote").unwrap_or_default();
    let base = currency_code(cache, &base_id);
    let quote = currency_code(cache, &quote_id);

    let mut market = Market::spot(id, Asset::new(base_id, base.clone()), Asset::new(quote_id, quote));

    let first_tier = |key: &str| {
        safe::value(raw, key)
            .and_then(|tiers| safe::index(tiers, 0))
            .and_then(|tier| safe::string_at(tier, 1))
    };
    market.maker = percent_to_rate(first_tier("fees_maker"));
    market.taker = percent_to_rate(first_tier("fees"));

    let leverage_buy = safe::array(raw, "leverage_buy");
    market.margin = !leverage_buy.is_empty();
    market.active = safe::string(raw, "status").as_deref() == Some("online");

    market.precision.price = safe::integer(raw, "pair_decimals").and_then(precision_from_digits);
    market.precision.amount = safe::integer(raw, "lot_decimals").and_then(precision_from_digits);
    // Some assets trade in coarser steps than the pair's lot size.
    if let Some(step) = cache.currency(&base).and_then(|c| c.precision) {
        if market.precision.amount.map_or(true, |amount| step > amount) {
            market.precision.amount = Some(step);
        }
    }

    let max_leverage = leverage_buy
        .last()
        .and_then(|v| safe::parse_decimal(&crate::core::kernel::signer::param_to_string(v)))
        .unwrap_or(Decimal::ONE);
    market.limits.leverage = MinMax::new(Some(Decimal::ONE), Some(max_leverage));
    market.limits.amount = MinMax::new(safe::decimal(raw, "ordermin"), None);
    market.limits.cost = MinMax::new(safe::decimal(raw, "costmin"), None);

    market.alt_names = ["altname", "wsname"]
        .iter()
        .filter_map(|key| safe::string(raw, key))
        .collect();
    market.info = raw.clone();
    market
}

/// Split an unknown pair id into base and quote. Kraken ids are mostly
/// 3+3 characters; 7 and 8 character ids carry a 4 character base.
pub fn delisted_market(cache: &MarketCache, id: &str) -> Market {
    let chars: Vec<char> = id.chars().collect();
    let (base_end, quote_end) = match chars.len() {
        8 => (4, 8),
        7 => (4, 7),
        _ => (3, 6),
    };
    let slice = |from: usize, to: usize| -> String {
        let to = to.min(chars.len());
        chars.get(from.min(to)..to).map(String::from_iter).unwrap_or_default()
    };
    let base_id = slice(0, base_end);
    let quote_id = slice(base_end, quote_end);
    let base = currency_code(cache, &base_id);
    let quote = currency_code(cache, &quote_id);

    let mut market = Market::spot(id, Asset::new(base_id, base), Asset::new(quote_id, quote));
    market.active = false;
    market
}

/// Market for a payload's pair id, reconstructing delisted pairs.
pub fn resolve_market(cache: &MarketCache, id: &str) -> Option<Arc<Market>> {
    cache.resolve(id, |id| Some(delisted_market(cache, id)))
}

/// `Ticker` entry. Array fields carry `[today, last 24h]`; the 24h value is used.
pub fn convert_kraken_ticker(raw: &Value, symbol: &str) -> Ticker {
    let at = |key: &str, i: usize| safe::value(raw, key).and_then(|v| safe::decimal_at(v, i));

    let base_volume = at("v", 1);
    let vwap = at("p", 1);
    let last = at("c", 0);

    Ticker {
        symbol: symbol.to_string(),
        high: at("h", 1),
        low: at("l", 1),
        bid: at("b", 0),
        bid_volume: at("b", 2),
        ask: at("a", 0),
        ask_volume: at("a", 2),
        vwap,
        open: safe::decimal(raw, "o"),
        close: last,
        last,
        base_volume,
        quote_volume: base_volume.zip(vwap).and_then(|(volume, vwap)| volume.checked_mul(vwap)),
        info: raw.clone(),
        ..Ticker::default()
    }
    .complete()
}

/// `[time, open, high, low, close, vwap, volume, count]`
pub fn convert_kraken_ohlcv(row: &Value) -> Option<Ohlcv> {
    Some(Ohlcv {
        timestamp: safe::timestamp_secs_at(row, 0)?,
        open: safe::decimal_at(row, 1),
        high: safe::decimal_at(row, 2),
        low: safe::decimal_at(row, 3),
        close: safe::decimal_at(row, 4),
        volume: safe::decimal_at(row, 6),
    })
}

pub fn convert_kraken_trade(cache: &MarketCache, raw: &Value, market: Option<&Market>) -> Trade {
    let mut market = market.map(|m| Arc::new(m.clone()));
    let mut trade = Trade {
        info: raw.clone(),
        ..Trade::default()
    };
    let mut datetime = None;

    match TradeRaw::classify(raw) {
        TradeRaw::Array(row) => {
            trade.timestamp = safe::timestamp_secs_at(raw, 2);
            trade.side = Some(if safe::string_at(raw, 3).as_deref() == Some("s") {
                OrderSide::Sell
            } else {
                OrderSide::Buy
            });
            trade.order_type = Some(if safe::string_at(raw, 4).as_deref() == Some("l") {
                OrderType::Limit
            } else {
                OrderType::Market
            });
            trade.price = safe::decimal_at(raw, 0);
            trade.amount = safe::decimal_at(raw, 1);
            if row.len() > 6 {
                trade.id = safe::string_at(raw, 6);
            }
        }
        TradeRaw::Id(id) => trade.id = Some(id.to_string()),
        TradeRaw::Private(v) => {
            if let Some(found) = safe::string(v, "pair").and_then(|pair| resolve_market(cache, &pair)) {
                market = Some(found);
            }
            trade.order = safe::string(v, "ordertxid");
            trade.id = safe::string_n(v, &["id", "postxid"]);
            trade.timestamp = safe::timestamp_secs(v, "time");
            trade.side = safe::string(v, "type").and_then(|s| OrderSide::parse(&s));
            trade.order_type = safe::string(v, "ordertype").and_then(|t| OrderType::parse(&t));
            trade.price = safe::decimal(v, "price");
            trade.amount = safe::decimal(v, "vol");
            if v.get("fee").is_some() {
                trade.fee = Some(Fee {
                    cost: safe::decimal(v, "fee"),
                    currency: market.as_ref().map(|m| m.quote().to_string()),
                    rate: None,
                });
            }
        }
        TradeRaw::Object(v) => {
            trade.symbol = safe::string(v, "symbol");
            datetime = safe::string(v, "timestamp");
            trade.id = safe::string(v, "trade_id");
            trade.side = safe::string(v, "side").and_then(|s| OrderSide::parse(&s));
            trade.order_type = safe::string(v, "ord_type").and_then(|t| OrderType::parse(&t));
            trade.price = safe::decimal(v, "price");
            trade.amount = safe::decimal(v, "qty");
        }
    }

    if let Some(market) = &market {
        trade.symbol = Some(market.symbol().to_string());
    }
    trade.cost = safe::decimal(raw, "cost");
    trade.taker_or_maker = safe::bool(raw, "maker").map(|maker| {
        if maker {
            TakerOrMaker::Maker
        } else {
            TakerOrMaker::Taker
        }
    });
    if let Some(datetime) = datetime {
        trade.timestamp = safe::parse8601(&datetime);
        trade.datetime = Some(datetime);
    }
    trade.complete()
}

fn order_status(raw: &str) -> OrderStatus {
    OrderStatus::from_table(
        raw,
        &[
            ("pending", OrderStatus::Open),
            ("open", OrderStatus::Open),
            ("closed", OrderStatus::Closed),
            ("canceled", OrderStatus::Canceled),
            ("expired", OrderStatus::Expired),
        ],
    )
}

/// Unified order type for a raw Kraken type; conditional types collapse
/// onto the type of the order they release.
fn order_type(raw_type: &str, price_known: bool) -> Option<OrderType> {
    match raw_type {
        "take-profit" | "stop-loss" => Some(OrderType::Market),
        "stop-loss-limit" | "take-profit-limit" | "trailing-stop-limit" => Some(OrderType::Limit),
        "stop loss" | "take profit" => Some(if price_known {
            OrderType::Limit
        } else {
            OrderType::Market
        }),
        other => OrderType::parse(other),
    }
}

/// A price that is an offset or a placeholder is no price at all.
fn meaningful_price(price: Option<String>) -> Option<String> {
    price.filter(|p| !p.ends_with('%') && safe::parse_decimal(p).map_or(true, |d| !d.is_zero()))
}

fn decimal_of(s: Option<String>) -> Option<Decimal> {
    s.and_then(|s| safe::parse_decimal(&s))
}

/// Normalise any order payload: AddOrder/AmendOrder results, QueryOrders,
/// OpenOrders and ClosedOrders entries.
///
/// The description sentence is decoded first; structured `descr` fields
/// and top-level fields then take precedence over it.
pub fn convert_kraken_order(
    cache: &MarketCache,
    raw: &Value,
    market: Option<Arc<Market>>,
    using_cost: bool,
) -> Order {
    let descr = DescriptionRaw::classify(raw);
    let parsed = descr
        .sentence()
        .map(|s| OrderDescription::parse(s, using_cost))
        .unwrap_or_default();

    let side = descr.field("type").or(parsed.side);
    let raw_type = descr.field("ordertype").or(parsed.raw_type);
    let market_id = descr.field("pair").or(parsed.market_id);
    let market = market_id
        .as_deref()
        .and_then(|id| resolve_market(cache, id))
        .or(market);

    let amount = safe::string(raw, "vol").or(parsed.amount);
    let mut price = meaningful_price(descr.field("price").or(parsed.price));
    if price.is_none() {
        price = safe::string_n(raw, &["limitprice", "price"]).or_else(|| descr.field("price2"));
    }

    let flags = safe::string(raw, "oflags").unwrap_or_default();
    let mut post_only = Some(flags.contains("post"));

    let fee = market.as_ref().filter(|_| raw.get("fee").is_some()).map(|m| Fee {
        cost: safe::decimal(raw, "fee"),
        currency: if flags.contains("fciq") {
            Some(m.quote().to_string())
        } else if flags.contains("fcib") {
            Some(m.base().to_string())
        } else {
            None
        },
        rate: None,
    });

    let id = safe::string_n(raw, &["id", "txid", "order_id", "amend_id"])
        .filter(|id| !id.starts_with('['))
        .or_else(|| safe::value(raw, "txid").and_then(|txid| safe::string_at(txid, 0)))
        .unwrap_or_default();
    let client_order_id = safe::string(raw, "cl_ord_id").or_else(|| safe::string(raw, "userref"));
    let symbol = market.as_ref().map(|m| m.symbol().to_string());

    let trades = safe::array(raw, "trades")
        .iter()
        .map(|t| match t {
            Value::String(trade_id) => Trade {
                id: Some(trade_id.clone()),
                order: Some(id.clone()),
                symbol: symbol.clone(),
                info: json!({}),
                ..Trade::default()
            },
            other => convert_kraken_trade(cache, other, market.as_deref()),
        })
        .collect();

    let mut stop_loss_price = None;
    let mut take_profit_price = None;
    match raw_type.as_deref() {
        Some(t) if t.starts_with("take-profit") => {
            take_profit_price = descr.field("price");
            price = omit_zero_str(descr.field("price2"));
        }
        Some(t) if t.starts_with("stop-loss") => {
            stop_loss_price = descr.field("price");
            price = omit_zero_str(descr.field("price2"));
        }
        Some("take profit") => take_profit_price = parsed.trigger_price.clone(),
        Some("stop loss") => stop_loss_price = parsed.trigger_price.clone(),
        _ => {}
    }

    if safe::string(raw, "amend_id").is_some() {
        post_only = None;
    }

    Order {
        id,
        client_order_id,
        timestamp: safe::timestamp_secs(raw, "opentm"),
        status: safe::string(raw, "status").map(|s| order_status(&s)),
        symbol,
        order_type: raw_type.as_deref().and_then(|t| order_type(t, price.is_some())),
        post_only,
        reduce_only: safe::bool_n(raw, &["reduceOnly", "reduce_only"]),
        side: side.and_then(|s| OrderSide::parse(&s)),
        price: decimal_of(price),
        average: safe::decimal(raw, "price"),
        amount: decimal_of(amount),
        filled: safe::decimal(raw, "vol_exec"),
        cost: decimal_of(parsed.cost),
        trigger_price: decimal_of(parsed.trigger_price),
        stop_loss_price: decimal_of(stop_loss_price),
        take_profit_price: decimal_of(take_profit_price),
        fee,
        trades,
        info: raw.clone(),
        ..Order::default()
    }
    .complete()
}

/// Entries keyed by id (`{"OABC-...": {...}}`) flattened into a list with
/// the key injected as `id`.
pub fn keyed_entries(map: Option<&Value>) -> Vec<Value> {
    map.and_then(Value::as_object)
        .map(|entries| {
            entries
                .iter()
                .map(|(id, entry)| {
                    let mut entry = entry.clone();
                    if let Value::Object(fields) = &mut entry {
                        fields.insert("id".to_string(), Value::String(id.clone()));
                    }
                    entry
                })
                .collect()
        })
        .unwrap_or_default()
}

fn ledger_entry_type(raw: &str) -> String {
    match raw {
        "withdrawal" | "deposit" => "transaction",
        other => other,
    }
    .to_string()
}

pub fn convert_kraken_ledger_entry(cache: &MarketCache, raw: &Value) -> LedgerEntry {
    let code = safe::string(raw, "asset").map(|id| currency_code(cache, &id));
    let amount = safe::decimal(raw, "amount");
    let direction = if amount.is_some_and(|a| a.is_sign_negative()) {
        LedgerDirection::Out
    } else {
        LedgerDirection::In
    };
    let timestamp = safe::timestamp_secs(raw, "time");

    LedgerEntry {
        id: safe::string(raw, "id"),
        direction,
        reference_id: safe::string(raw, "refid"),
        entry_type: safe::string(raw, "type").map(|t| ledger_entry_type(&t)),
        currency: code.clone(),
        amount: amount.map(|a| a.abs()),
        after: safe::decimal(raw, "balance"),
        status: Some("ok".to_string()),
        timestamp,
        datetime: safe::iso8601_opt(timestamp),
        fee: Some(Fee {
            cost: safe::decimal(raw, "fee"),
            currency: code,
            rate: None,
        }),
        info: raw.clone(),
    }
}

fn transaction_status(raw: &str) -> TransactionStatus {
    TransactionStatus::from_table(
        raw,
        &[
            ("Initial", TransactionStatus::Pending),
            ("Pending", TransactionStatus::Pending),
            ("Success", TransactionStatus::Ok),
            ("Settled", TransactionStatus::Pending),
            ("Failure", TransactionStatus::Failed),
            ("Partial", TransactionStatus::Ok),
        ],
    )
}

/// Deposit, withdrawal or Withdraw result. Holds and cancellation requests
/// reported in `status-prop` override the primary status.
pub fn convert_kraken_transaction(
    cache: &MarketCache,
    raw: &Value,
    kind: Option<TransactionType>,
    code_hint: Option<&str>,
) -> Transaction {
    let code = safe::string(raw, "asset")
        .map(|id| currency_code(cache, &id))
        .or_else(|| code_hint.map(str::to_string));

    let held = matches!(
        safe::string(raw, "status-prop").as_deref(),
        Some("on-hold" | "onhold" | "cancel-pending")
    );
    let status = if held {
        Some(TransactionStatus::Pending)
    } else {
        safe::string(raw, "status").map(|s| transaction_status(&s))
    };

    let fee_cost = safe::decimal(raw, "fee").or_else(|| {
        (kind == Some(TransactionType::Deposit)).then_some(Decimal::ZERO)
    });
    let timestamp = safe::timestamp_secs(raw, "time");

    Transaction {
        id: safe::string(raw, "refid"),
        txid: safe::string(raw, "txid"),
        transaction_type: kind,
        currency: code.clone(),
        network: safe::string(raw, "network"),
        amount: safe::decimal(raw, "amount"),
        address: safe::string(raw, "info"),
        status,
        timestamp,
        datetime: safe::iso8601_opt(timestamp),
        fee: Some(Fee {
            cost: fee_cost,
            currency: code,
            rate: None,
        }),
        info: raw.clone(),
        ..Transaction::default()
    }
}

/// Withdrawal pages put the cursor beside the list; move it onto the last entry.
pub fn withdrawals_with_cursor(result: &Value) -> Vec<Value> {
    if let Value::Array(items) = result {
        return items.clone();
    }
    let mut items = safe::array(result, "withdrawals").to_vec();
    if let (Some(cursor), Some(Value::Object(last))) = (safe::string(result, "next_cursor"), items.last_mut()) {
        last.insert("next_cursor".to_string(), Value::String(cursor));
    }
    items
}

/// `BalanceEx`: `balance` is the total, `hold_trade` is reserved by orders.
pub fn convert_kraken_balance(cache: &MarketCache, result: &Value) -> Balances {
    let mut balances = Balances::new(result.clone());
    if let Some(entries) = result.as_object() {
        for (id, entry) in entries {
            balances.insert(
                currency_code(cache, id),
                Balance {
                    free: None,
                    used: safe::decimal(entry, "hold_trade"),
                    total: safe::decimal(entry, "balance"),
                },
            );
        }
    }
    balances
}

pub fn convert_kraken_position(cache: &MarketCache, raw: &Value) -> Position {
    let symbol = safe::string(raw, "pair")
        .and_then(|pair| resolve_market(cache, &pair))
        .map(|m| m.symbol().to_string());
    let side = if safe::string(raw, "type").as_deref() == Some("buy") {
        PositionSide::Long
    } else {
        PositionSide::Short
    };
    Position {
        id: None,
        symbol,
        side: Some(side),
        contracts: safe::decimal(raw, "vol"),
        initial_margin: safe::decimal(raw, "margin"),
        leverage: safe::decimal(raw, "leverage"),
        unrealized_pnl: safe::decimal(raw, "net"),
        timestamp: None,
        info: raw.clone(),
    }
}

pub fn convert_kraken_deposit_address(raw: &Value, code: &str) -> Result<DepositAddress, ExchangeError> {
    let address = safe::string(raw, "address").ok_or_else(|| {
        ExchangeError::InvalidAddress(format!("kraken returned no deposit address for {}", code))
    })?;
    Ok(DepositAddress {
        currency: code.to_string(),
        network: None,
        address,
        tag: safe::string(raw, "tag"),
        info: raw.clone(),
    })
}

pub fn convert_kraken_transfer(result: &Value, code: &str) -> Transfer {
    Transfer {
        id: safe::string(result, "refid"),
        currency: Some(code.to_string()),
        status: Some("ok".to_string()),
        info: result.clone(),
        ..Transfer::default()
    }
}

pub fn convert_kraken_status(result: &Value) -> ExchangeStatus {
    let online = safe::string(result, "status").is_some_and(|s| s == "online");
    ExchangeStatus {
        status: if online {
            ExchangeHealth::Ok
        } else {
            ExchangeHealth::Maintenance
        },
        updated: None,
        eta: None,
        url: None,
        info: result.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::string_map;
    use rust_decimal_macros::dec;

    fn cache() -> MarketCache {
        let cache = MarketCache::new(string_map(&[("XBT", "BTC"), ("XDG", "DOGE")]));
        let currencies = [
            ("XXBT", json!({"altname": "XBT", "decimals": 10, "status": "enabled"})),
            ("ZUSD", json!({"altname": "USD", "decimals": 4, "status": "enabled"})),
            ("ADA", json!({"altname": "ADA", "decimals": 8, "status": "enabled"})),
        ]
        .iter()
        .map(|(id, raw)| convert_kraken_currency(&cache, id, raw))
        .collect();
        cache.replace_currencies(currencies);
        let pair = json!({
            "altname": "XBTUSD", "wsname": "XBT/USD", "base": "XXBT", "quote": "ZUSD",
            "pair_decimals": 1, "lot_decimals": 8, "status": "online",
            "fees": [[0, 0.26], [50000, 0.24]], "fees_maker": [[0, 0.16]],
            "leverage_buy": [2, 3, 4, 5], "ordermin": "0.0001", "costmin": "0.5"
        });
        let market = convert_kraken_market(&cache, "XXBTZUSD", &pair);
        cache.replace_all(vec![market]);
        cache
    }

    #[test]
    fn market_from_asset_pair() {
        let cache = cache();
        let market = cache.get("XXBTZUSD").unwrap();
        assert_eq!(market.symbol(), "BTC/USD");
        assert_eq!(market.taker, Some(dec!(0.0026)));
        assert_eq!(market.maker, Some(dec!(0.0016)));
        assert_eq!(market.precision.price, Some(dec!(0.1)));
        assert_eq!(market.precision.amount, Some(dec!(0.00000001)));
        assert!(market.margin);
        assert_eq!(market.limits.leverage.max, Some(dec!(5)));
        assert_eq!(market.limits.amount.min, Some(dec!(0.0001)));
        assert!(cache.by_alt_name("XBT/USD").is_some());
    }

    #[test]
    fn legacy_currency_ids_become_aliases() {
        let cache = cache();
        assert_eq!(currency_code(&cache, "XXBT"), "BTC");
        assert_eq!(currency_code(&cache, "ZUSD"), "USD");
        assert_eq!(currency_code(&cache, "XBT.M"), "BTC.M");
        assert_eq!(currency_code(&cache, "XDG"), "DOGE");
    }

    #[test]
    fn ticker_uses_24h_aggregates() {
        let raw = json!({
            "a": ["100", "1", "1"], "b": ["99", "2", "2"], "c": ["99.5", "10"],
            "v": ["50", "100"], "p": ["99", "99.4"], "h": ["101", "102"],
            "l": ["98", "97"], "o": "98.5"
        });
        let ticker = convert_kraken_ticker(&raw, "BTC/USD");
        assert_eq!(ticker.bid, Some(dec!(99)));
        assert_eq!(ticker.ask, Some(dec!(100)));
        assert_eq!(ticker.last, Some(dec!(99.5)));
        assert_eq!(ticker.open, Some(dec!(98.5)));
        assert_eq!(ticker.high, Some(dec!(102)));
        assert_eq!(ticker.low, Some(dec!(97)));
        assert_eq!(ticker.vwap, Some(dec!(99.4)));
        assert_eq!(ticker.base_volume, Some(dec!(100)));
        assert_eq!(ticker.quote_volume, Some(dec!(9940)));
        assert_eq!(ticker.change, Some(dec!(1)));
    }

    #[test]
    fn ohlcv_volume_is_seventh_column() {
        let row = json!([1_688_671_200, "30306.1", "30306.2", "30305.7", "30305.7", "30306.1", "3.39243896", 23]);
        let candle = convert_kraken_ohlcv(&row).unwrap();
        assert_eq!(candle.timestamp, 1_688_671_200_000);
        assert_eq!(candle.volume, Some(dec!(3.39243896)));
        assert_eq!(candle.close, Some(dec!(30305.7)));
    }

    #[test]
    fn public_trade_row() {
        let cache = cache();
        let market = cache.get("XXBTZUSD").unwrap();
        let row = json!(["30243.40000", "0.34507674", 1_688_669_597.8277, "b", "m", "", 61_044_952]);
        let trade = convert_kraken_trade(&cache, &row, Some(&market));
        assert_eq!(trade.symbol.as_deref(), Some("BTC/USD"));
        assert_eq!(trade.side, Some(OrderSide::Buy));
        assert_eq!(trade.order_type, Some(OrderType::Market));
        assert_eq!(trade.id.as_deref(), Some("61044952"));
        assert_eq!(trade.timestamp, Some(1_688_669_597_827));
        assert_eq!(trade.cost, Some(dec!(30243.40000) * dec!(0.34507674)));
    }

    #[test]
    fn private_trade_resolves_pair_and_fee_currency() {
        let cache = cache();
        let raw = json!({
            "id": "TZX2WP-XSEOP-FYZNO6", "ordertxid": "OQCLML-BW3P3-BUCMWZ", "pair": "XXBTZUSD",
            "time": 1_688_667_796.8802, "type": "buy", "ordertype": "limit",
            "price": "30010.00000", "cost": "600.20000", "fee": "0.00000", "vol": "0.02000000", "maker": true
        });
        let trade = convert_kraken_trade(&cache, &raw, None);
        assert_eq!(trade.order.as_deref(), Some("OQCLML-BW3P3-BUCMWZ"));
        assert_eq!(trade.symbol.as_deref(), Some("BTC/USD"));
        assert_eq!(trade.taker_or_maker, Some(TakerOrMaker::Maker));
        assert_eq!(trade.fee.unwrap().currency.as_deref(), Some("USD"));
        assert_eq!(trade.cost, Some(dec!(600.20000)));
    }

    #[test]
    fn stop_loss_limit_order_from_description_object() {
        let cache = cache();
        let raw = json!({
            "id": "OLQCVY-B27XU-MBPCL5", "status": "open", "opentm": 1_688_665_899.5699,
            "vol": "0.00100000", "vol_exec": "0.00000000", "oflags": "fciq",
            "descr": {
                "pair": "XBTUSD", "type": "sell", "ordertype": "stop-loss-limit",
                "price": "27500.0", "price2": "27000.0",
                "order": "sell 0.00100000 XBTUSD @ stop loss 27500.0 -> limit 27000.0"
            }
        });
        let order = convert_kraken_order(&cache, &raw, None, false);
        assert_eq!(order.id, "OLQCVY-B27XU-MBPCL5");
        assert_eq!(order.symbol.as_deref(), Some("BTC/USD"));
        assert_eq!(order.side, Some(OrderSide::Sell));
        assert_eq!(order.order_type, Some(OrderType::Limit));
        assert_eq!(order.stop_loss_price, Some(dec!(27500.0)));
        assert_eq!(order.price, Some(dec!(27000.0)));
        assert_eq!(order.status, Some(OrderStatus::Open));
        assert_eq!(order.remaining, Some(dec!(0.001)));
        assert_eq!(order.post_only, Some(false));
    }

    #[test]
    fn sentence_only_order_uses_delisted_market() {
        let cache = cache();
        let raw = json!({
            "txid": ["OAVY7T-MV5VK-KHDF5X"],
            "descr": "sell 167.28002676 ADAXBT @ stop loss 0.00003280 -> limit 0.00003212"
        });
        let order = convert_kraken_order(&cache, &raw, None, false);
        assert_eq!(order.id, "OAVY7T-MV5VK-KHDF5X");
        assert_eq!(order.symbol.as_deref(), Some("ADA/BTC"));
        assert_eq!(order.amount, Some(dec!(167.28002676)));
        assert_eq!(order.trigger_price, Some(dec!(0.00003280)));
        assert_eq!(order.stop_loss_price, Some(dec!(0.00003280)));
        assert_eq!(order.price, Some(dec!(0.00003212)));
        assert_eq!(order.order_type, Some(OrderType::Limit));
    }

    #[test]
    fn placeholder_prices_are_absent() {
        let cache = cache();
        let raw = json!({
            "id": "O1", "status": "closed", "price": "30000.0", "vol": "1", "vol_exec": "1",
            "descr": {"pair": "XBTUSD", "type": "buy", "ordertype": "market", "price": "0", "price2": "0"}
        });
        let order = convert_kraken_order(&cache, &raw, None, false);
        // falls through to the top-level price
        assert_eq!(order.price, Some(dec!(30000.0)));
        assert_eq!(order.average, Some(dec!(30000.0)));
        assert_eq!(order.status, Some(OrderStatus::Closed));
        assert_eq!(order.filled, Some(dec!(1)));
    }

    #[test]
    fn amend_result_clears_post_only_and_reads_client_id() {
        let cache = cache();
        let raw = json!({"amend_id": "TP3P3S-JJK2X-XSQC2G", "userref": 42, "oflags": "post"});
        let order = convert_kraken_order(&cache, &raw, None, false);
        assert_eq!(order.id, "TP3P3S-JJK2X-XSQC2G");
        assert_eq!(order.client_order_id.as_deref(), Some("42"));
        assert_eq!(order.post_only, None);
    }

    #[test]
    fn ledger_sign_gives_direction() {
        let cache = cache();
        let raw = json!({
            "id": "L4UESK-KG3EQ-UFO4T5", "refid": "TJKLXX-PWVIH-MXQWNN", "time": 1_688_464_484.1787,
            "type": "withdrawal", "asset": "XXBT", "amount": "-0.2", "fee": "0.0001", "balance": "1.5"
        });
        let entry = convert_kraken_ledger_entry(&cache, &raw);
        assert_eq!(entry.direction, LedgerDirection::Out);
        assert_eq!(entry.amount, Some(dec!(0.2)));
        assert_eq!(entry.entry_type.as_deref(), Some("transaction"));
        assert_eq!(entry.currency.as_deref(), Some("BTC"));
    }

    #[test]
    fn status_prop_hold_overrides_success() {
        let cache = cache();
        let raw = json!({"refid": "R1", "asset": "XXBT", "status": "Success", "status-prop": "on-hold", "time": 1_617_014_586});
        let tx = convert_kraken_transaction(&cache, &raw, Some(TransactionType::Deposit), None);
        assert_eq!(tx.status, Some(TransactionStatus::Pending));
        assert_eq!(tx.fee.unwrap().cost, Some(Decimal::ZERO));

        let raw = json!({"refid": "R2", "asset": "XXBT", "status": "Success"});
        let tx = convert_kraken_transaction(&cache, &raw, Some(TransactionType::Withdrawal), None);
        assert_eq!(tx.status, Some(TransactionStatus::Ok));
        assert_eq!(tx.fee.unwrap().cost, None);
    }

    #[test]
    fn withdrawal_cursor_moves_to_last_entry() {
        let result = json!({"withdrawals": [{"refid": "A"}, {"refid": "B"}], "next_cursor": "abc"});
        let items = withdrawals_with_cursor(&result);
        assert_eq!(items.len(), 2);
        assert_eq!(items[1]["next_cursor"], "abc");
        assert!(items[0].get("next_cursor").is_none());
    }

    #[test]
    fn balance_derives_free_from_hold() {
        let cache = cache();
        let result = json!({"ZUSD": {"balance": "25435.21", "hold_trade": "8249.76"}});
        let balances = convert_kraken_balance(&cache, &result);
        let usd = balances.get("USD").unwrap();
        assert_eq!(usd.total, Some(dec!(25435.21)));
        assert_eq!(usd.used, Some(dec!(8249.76)));
        assert_eq!(usd.free, Some(dec!(17185.45)));
    }

    #[test]
    fn delisted_id_splits() {
        let cache = cache();
        assert_eq!(delisted_market(&cache, "ADAXBT").symbol(), "ADA/BTC");
        assert_eq!(delisted_market(&cache, "XXBTZEUR").symbol(), "BTC/ZEUR");
        assert_eq!(delisted_market(&cache, "DASHXBT").symbol(), "DASH/BTC");
        assert!(!delisted_market(&cache, "ADAXBT").active);
    }

    #[test]
    fn missing_deposit_address_is_invalid() {
        assert!(matches!(
            convert_kraken_deposit_address(&json!({}), "BTC"),
            Err(ExchangeError::InvalidAddress(_))
        ));
        let address = convert_kraken_deposit_address(&json!({"address": "bc1q", "tag": "7"}), "BTC").unwrap();
        assert_eq!(address.tag.as_deref(), Some("7"));
    }
}
