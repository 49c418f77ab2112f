use crate::core::markets::MarketCache;
use crate::core::safe;
use crate::core::types::{
    Asset, Balance, Balances, Currency, CurrencyNetwork, DepositAddress, DepositWithdrawFee, Fee, FeeSchedule,
    FundingRate, Market, MarketType, MinMax, NetworkFees, Ohlcv, Order, OrderSide, OrderStatus, OrderType,
    Position, PositionSide, TakerOrMaker, Ticker, TimeInForce, Trade, Transaction, TransactionStatus,
    TransactionType,
};
use rust_decimal::Decimal;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Millisecond timestamp from an ISO-8601 field.
fn iso_ms(raw: &Value, key: &str) -> Option<i64> {
    safe::string(raw, key).and_then(|s| safe::parse8601(&s))
}

/// Expiry arrives as either epoch milliseconds or an ISO string.
fn expiry_ms(raw: &Value) -> Option<i64> {
    safe::integer(raw, "expiry").or_else(|| iso_ms(raw, "expiry"))
}

/// One entry of the `public/symbol` map. Futures without an expiry are
/// perpetual swaps settled in the fee currency.
pub fn convert_hitbtc_market(cache: &MarketCache, id: &str, raw: &Value) -> Option<Market> {
    let raw_type = safe::string(raw, "type")?;
    let base_id = safe::string_n(raw, &["base_currency", "underlying"])?;
    let quote_id = safe::string(raw, "quote_currency")?;
    let base = Asset::new(base_id.clone(), cache.safe_currency_code(&base_id));
    let quote = Asset::new(quote_id.clone(), cache.safe_currency_code(&quote_id));

    let mut market = if raw_type == "futures" {
        let settle_id = safe::string(raw, "fee_currency").unwrap_or_else(|| quote_id.clone());
        let settle = Asset::new(settle_id.clone(), cache.safe_currency_code(&settle_id));
        let expiry = expiry_ms(raw);
        let market_type = if expiry.is_some() {
            MarketType::Future
        } else {
            MarketType::Swap
        };
        let mut market = Market::new(id, market_type, base, quote, Some(settle), expiry);
        market.contract_size = Some(Decimal::ONE);
        market
    } else {
        let mut market = Market::spot(id, base, quote);
        market.margin = safe::bool(raw, "margin_trading").unwrap_or(false);
        market
    };

    let lot = safe::decimal(raw, "quantity_increment");
    let step = safe::decimal(raw, "tick_size");
    market.precision.amount = lot;
    market.precision.price = step;
    market.limits.amount = MinMax::new(lot, None);
    market.limits.price = MinMax::new(step, None);
    market.limits.cost = MinMax::new(lot.zip(step).and_then(|(lot, step)| lot.checked_mul(step)), None);
    market.limits.leverage = MinMax::new(
        Some(Decimal::ONE),
        Some(safe::decimal(raw, "max_initial_leverage").unwrap_or(Decimal::ONE)),
    );
    market.taker = safe::decimal(raw, "take_rate");
    market.maker = safe::decimal(raw, "make_rate");
    market.active = true;
    market.info = raw.clone();
    Some(market)
}

/// Known market for an id. Symbol ids carry no separator, so unknown ids
/// cannot be rebuilt.
pub fn resolve_market(cache: &MarketCache, id: &str) -> Option<Arc<Market>> {
    cache.resolve(id, |_| None)
}

fn network_code(networks_by_id: &BTreeMap<String, String>, id: &str) -> String {
    networks_by_id
        .get(id)
        .cloned()
        .unwrap_or_else(|| id.to_uppercase())
}

/// One entry of the `public/currency` map. The currency-level fee is only
/// meaningful when a single network exists.
pub fn convert_hitbtc_currency(
    cache: &MarketCache,
    id: &str,
    raw: &Value,
    networks_by_id: &BTreeMap<String, String>,
) -> Currency {
    let payin = safe::bool(raw, "payin_enabled").unwrap_or(false);
    let payout = safe::bool(raw, "payout_enabled").unwrap_or(false);
    let transfer = safe::bool(raw, "transfer_enabled").unwrap_or(false);

    let mut networks = BTreeMap::new();
    for entry in safe::array(raw, "networks") {
        let Some(network_id) = safe::string_n(entry, &["protocol", "network"]).filter(|n| !n.is_empty()) else {
            continue;
        };
        let code = network_code(networks_by_id, &network_id.to_uppercase());
        let deposit = safe::bool(entry, "payin_enabled");
        let withdraw = safe::bool(entry, "payout_enabled");
        networks.insert(
            code.clone(),
            CurrencyNetwork {
                id: network_id,
                network: code,
                active: Some(deposit == Some(true) && withdraw == Some(true)),
                deposit,
                withdraw,
                fee: safe::decimal(entry, "payout_fee"),
                precision: safe::decimal(entry, "precision_payout"),
                info: entry.clone(),
                ..CurrencyNetwork::default()
            },
        );
    }
    let fee = if networks.len() <= 1 {
        networks.values().next().and_then(|n| n.fee)
    } else {
        None
    };

    Currency {
        id: id.to_string(),
        code: cache.safe_currency_code(id),
        name: safe::string(raw, "full_name"),
        precision: safe::decimal(raw, "precision_transfer"),
        active: Some(payin && payout && transfer),
        deposit: Some(payin),
        withdraw: Some(payout),
        fee,
        networks,
        info: raw.clone(),
    }
}

pub fn convert_hitbtc_ticker(raw: &Value, market: &Market) -> Ticker {
    let timestamp = iso_ms(raw, "timestamp");
    Ticker {
        symbol: market.symbol().to_string(),
        timestamp,
        high: safe::decimal(raw, "high"),
        low: safe::decimal(raw, "low"),
        bid: safe::decimal(raw, "bid"),
        ask: safe::decimal(raw, "ask"),
        open: safe::decimal(raw, "open"),
        last: safe::decimal(raw, "last"),
        base_volume: safe::decimal(raw, "volume"),
        quote_volume: safe::decimal(raw, "volume_quote"),
        info: raw.clone(),
        ..Ticker::default()
    }
    .complete()
}

/// `{"timestamp": "...", "open", "close", "min", "max", "volume"}`
pub fn convert_hitbtc_ohlcv(raw: &Value) -> Option<Ohlcv> {
    Some(Ohlcv {
        timestamp: iso_ms(raw, "timestamp")?,
        open: safe::decimal(raw, "open"),
        high: safe::decimal(raw, "max"),
        low: safe::decimal(raw, "min"),
        close: safe::decimal(raw, "close"),
        volume: safe::decimal(raw, "volume"),
    })
}

/// Public trades and `history/trade` entries. The fee is charged in the
/// market's fee currency, and a missing `taker` flag means taker.
pub fn convert_hitbtc_trade(cache: &MarketCache, raw: &Value, market: Option<&Arc<Market>>) -> Trade {
    let market = safe::string(raw, "symbol")
        .and_then(|id| resolve_market(cache, &id))
        .or_else(|| market.cloned());

    let fee = safe::decimal(raw, "fee").map(|cost| Fee {
        cost: Some(cost),
        currency: market
            .as_ref()
            .and_then(|m| safe::string(&m.info, "fee_currency"))
            .map(|id| cache.safe_currency_code(&id)),
        rate: None,
    });
    let taker_or_maker = safe::value(raw, "taker").map(|taker| {
        if taker.as_bool() == Some(false) {
            TakerOrMaker::Maker
        } else {
            TakerOrMaker::Taker
        }
    });
    let timestamp = iso_ms(raw, "timestamp");

    Trade {
        id: safe::string(raw, "id"),
        order: safe::string_n(raw, &["client_order_id", "clientOrderId"]),
        symbol: market.as_ref().map(|m| m.symbol().to_string()),
        timestamp,
        datetime: safe::iso8601_opt(timestamp),
        side: safe::string(raw, "side").and_then(|s| OrderSide::parse(&s)),
        taker_or_maker,
        price: safe::decimal(raw, "price"),
        amount: safe::decimal_n(raw, &["quantity", "qty"]),
        fee,
        info: raw.clone(),
        ..Trade::default()
    }
    .complete()
}

/// `[{"currency": "BTC", "available": "1", "reserved": "0"}]`
pub fn convert_hitbtc_balance(cache: &MarketCache, response: &Value) -> Balances {
    let mut balances = Balances::new(response.clone());
    for entry in response.as_array().map(Vec::as_slice).unwrap_or_default() {
        let Some(id) = safe::string(entry, "currency") else {
            continue;
        };
        balances.insert(
            cache.safe_currency_code(&id),
            Balance {
                free: safe::decimal(entry, "available"),
                used: safe::decimal(entry, "reserved"),
                total: None,
            },
        );
    }
    balances
}

fn order_status(raw: &str) -> OrderStatus {
    OrderStatus::from_table(
        raw,
        &[
            ("new", OrderStatus::Open),
            ("suspended", OrderStatus::Open),
            ("partiallyFilled", OrderStatus::Open),
            ("filled", OrderStatus::Closed),
            ("canceled", OrderStatus::Canceled),
            ("expired", OrderStatus::Expired),
        ],
    )
}

/// `stopLimit`, `takeProfitMarket` and friends reduce to their base type.
fn base_order_type(raw: &str) -> Option<OrderType> {
    let lower = raw.to_lowercase();
    if lower.ends_with("limit") {
        Some(OrderType::Limit)
    } else if lower.ends_with("market") {
        Some(OrderType::Market)
    } else {
        None
    }
}

/// Orders are addressed by `client_order_id`, which becomes the unified id.
pub fn convert_hitbtc_order(cache: &MarketCache, raw: &Value, market: Option<Arc<Market>>) -> Order {
    let market = safe::string(raw, "symbol")
        .and_then(|id| resolve_market(cache, &id))
        .or(market);

    let created = iso_ms(raw, "created_at");
    let updated = iso_ms(raw, "updated_at");
    let trades: Vec<Trade> = safe::array(raw, "trades")
        .iter()
        .map(|trade| convert_hitbtc_trade(cache, trade, market.as_ref()))
        .collect();

    Order {
        id: safe::string_n(raw, &["client_order_id", "clientOrderId"]).unwrap_or_default(),
        client_order_id: safe::string_n(raw, &["client_order_id", "clientOrderId"]),
        timestamp: created,
        last_trade_timestamp: updated.filter(|u| Some(*u) != created),
        status: safe::string(raw, "status").map(|s| order_status(&s)),
        symbol: market.as_ref().map(|m| m.symbol().to_string()),
        order_type: safe::string(raw, "type").and_then(|t| base_order_type(&t)),
        time_in_force: safe::string(raw, "time_in_force").and_then(|t| TimeInForce::parse(&t)),
        post_only: safe::bool(raw, "post_only"),
        reduce_only: safe::bool(raw, "reduce_only"),
        side: safe::string(raw, "side").and_then(|s| OrderSide::parse(&s)),
        price: safe::decimal(raw, "price"),
        average: safe::decimal(raw, "price_average"),
        amount: safe::decimal(raw, "quantity"),
        filled: safe::decimal(raw, "quantity_cumulative"),
        trigger_price: safe::decimal(raw, "stop_price"),
        trades,
        info: raw.clone(),
        ..Order::default()
    }
    .complete()
}

fn transaction_status(raw: &str) -> TransactionStatus {
    TransactionStatus::from_table(
        raw,
        &[
            ("CREATED", TransactionStatus::Pending),
            ("PENDING", TransactionStatus::Pending),
            ("FAILED", TransactionStatus::Failed),
            ("ROLLED_BACK", TransactionStatus::Failed),
            ("SUCCESS", TransactionStatus::Ok),
        ],
    )
}

/// `wallet/transactions` entries; the on-chain details sit under `native`.
pub fn convert_hitbtc_transaction(cache: &MarketCache, raw: &Value) -> Transaction {
    let native = safe::value(raw, "native").unwrap_or(&Value::Null);
    let code = safe::string(native, "currency").map(|id| cache.safe_currency_code(&id));
    let transaction_type = match safe::string(raw, "type").as_deref() {
        Some("DEPOSIT") => Some(TransactionType::Deposit),
        Some("WITHDRAW") => Some(TransactionType::Withdrawal),
        _ => None,
    };
    let address = safe::string(native, "address");
    let timestamp = iso_ms(raw, "created_at");

    Transaction {
        id: safe::string_n(raw, &["operation_id", "id"]),
        txid: safe::string(native, "hash"),
        transaction_type,
        currency: code.clone(),
        amount: safe::decimal(native, "amount"),
        address_from: safe::value(native, "senders").and_then(|s| safe::string_at(s, 0)),
        address_to: address.clone(),
        address,
        tag: safe::string(native, "payment_id"),
        status: safe::string(raw, "status").map(|s| transaction_status(&s)),
        updated: iso_ms(raw, "updated_at"),
        timestamp,
        datetime: safe::iso8601_opt(timestamp),
        internal: Some(safe::string(raw, "subtype").as_deref() == Some("OFFCHAIN")),
        fee: safe::decimal(native, "fee").map(|cost| Fee {
            cost: Some(cost),
            currency: code,
            rate: None,
        }),
        info: raw.clone(),
        ..Transaction::default()
    }
}

pub fn convert_hitbtc_deposit_address(
    cache: &MarketCache,
    raw: &Value,
    code: &str,
    network: Option<&str>,
) -> Option<DepositAddress> {
    Some(DepositAddress {
        currency: safe::string(raw, "currency")
            .map(|id| cache.safe_currency_code(&id))
            .unwrap_or_else(|| code.to_string()),
        network: network.map(str::to_string),
        address: safe::string(raw, "address")?,
        tag: safe::string(raw, "payment_id"),
        info: raw.clone(),
    })
}

/// Withdrawal fees per network from `public/currency`. The default
/// network's fee is also the currency-level fee.
pub fn convert_hitbtc_deposit_withdraw_fee(
    raw: &Value,
    networks_by_id: &BTreeMap<String, String>,
) -> DepositWithdrawFee {
    let mut fee = DepositWithdrawFee {
        info: raw.clone(),
        ..DepositWithdrawFee::default()
    };
    for entry in safe::array(raw, "networks") {
        let Some(network_id) = safe::string_n(entry, &["protocol", "network"]).filter(|n| !n.is_empty()) else {
            continue;
        };
        let schedule = FeeSchedule {
            fee: safe::decimal(entry, "payout_fee"),
            percentage: Some(false),
        };
        if safe::bool(entry, "default") == Some(true) {
            fee.withdraw = schedule.clone();
        }
        fee.networks.insert(
            network_code(networks_by_id, &network_id.to_uppercase()),
            NetworkFees {
                withdraw: schedule,
                deposit: FeeSchedule::default(),
            },
        );
    }
    fee.complete()
}

/// `public/futures/info` entry.
pub fn convert_hitbtc_funding_rate(raw: &Value, symbol: &str) -> FundingRate {
    let timestamp = iso_ms(raw, "timestamp");
    let funding_timestamp = iso_ms(raw, "next_funding_time");
    FundingRate {
        symbol: symbol.to_string(),
        mark_price: safe::decimal(raw, "mark_price"),
        index_price: safe::decimal(raw, "index_price"),
        interest_rate: safe::decimal(raw, "interest_rate"),
        funding_rate: safe::decimal(raw, "funding_rate"),
        funding_timestamp,
        funding_datetime: safe::iso8601_opt(funding_timestamp),
        next_funding_rate: safe::decimal(raw, "indicative_funding_rate"),
        timestamp,
        datetime: safe::iso8601_opt(timestamp),
        info: raw.clone(),
        ..FundingRate::default()
    }
}

/// One margin account from `futures/account` or `margin/account`. The
/// sign of the position quantity gives the side.
pub fn convert_hitbtc_position(cache: &MarketCache, raw: &Value) -> Option<Position> {
    let market = safe::string(raw, "symbol").and_then(|id| resolve_market(cache, &id))?;
    let position = safe::array(raw, "positions").first();
    let contracts = position.and_then(|p| safe::decimal(p, "quantity"));
    let side = contracts.and_then(|q| {
        if q.is_sign_positive() && !q.is_zero() {
            Some(PositionSide::Long)
        } else if q.is_sign_negative() {
            Some(PositionSide::Short)
        } else {
            None
        }
    });

    Some(Position {
        id: position.and_then(|p| safe::string(p, "id")),
        symbol: Some(market.symbol().to_string()),
        side,
        contracts: contracts.map(|q| q.abs()),
        initial_margin: safe::array(raw, "currencies")
            .first()
            .and_then(|c| safe::decimal(c, "margin_balance")),
        leverage: safe::decimal(raw, "leverage"),
        unrealized_pnl: position.and_then(|p| safe::decimal(p, "pnl")),
        timestamp: iso_ms(raw, "updated_at"),
        info: raw.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exchanges::hitbtc::types::hitbtc_descriptor;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn cache() -> MarketCache {
        MarketCache::new(hitbtc_descriptor().common_currencies)
    }

    fn networks_by_id() -> BTreeMap<String, String> {
        hitbtc_descriptor().options.networks_by_id
    }

    fn eth_btc(cache: &MarketCache) -> Market {
        convert_hitbtc_market(
            cache,
            "ETHBTC",
            &json!({
                "type": "spot",
                "base_currency": "ETH",
                "quote_currency": "BTC",
                "quantity_increment": "0.001",
                "tick_size": "0.000001",
                "take_rate": "0.0025",
                "make_rate": "0.001",
                "fee_currency": "BTC",
                "margin_trading": true,
                "max_initial_leverage": "5.00"
            }),
        )
        .unwrap()
    }

    fn loaded_cache() -> MarketCache {
        let c = cache();
        let swap = convert_hitbtc_market(
            &c,
            "BTCUSDT_PERP",
            &json!({
                "type": "futures",
                "expiry": null,
                "underlying": "BTC",
                "base_currency": null,
                "quote_currency": "USDT",
                "quantity_increment": "0.0001",
                "tick_size": "0.01",
                "fee_currency": "USDT",
                "margin_trading": true,
                "max_initial_leverage": "100.00"
            }),
        )
        .unwrap();
        c.replace_all(vec![eth_btc(&c), swap]);
        c
    }

    #[test]
    fn spot_market_limits_follow_increments() {
        let market = eth_btc(&cache());
        assert_eq!(market.symbol(), "ETH/BTC");
        assert!(market.margin);
        assert_eq!(market.limits.cost.min, Some(dec!(0.000000001)));
        assert_eq!(market.limits.leverage.max, Some(dec!(5)));
        assert_eq!(market.taker, Some(dec!(0.0025)));
    }

    #[test]
    fn futures_without_expiry_are_swaps() {
        let c = loaded_cache();
        let swap = c.get("BTCUSDT_PERP").unwrap();
        assert_eq!(swap.symbol(), "BTC/USDT:USDT");
        assert_eq!(swap.market_type(), MarketType::Swap);
        assert_eq!(swap.linear, Some(true));
        assert_eq!(swap.contract_size, Some(Decimal::ONE));
        assert_eq!(swap.base_id, "BTC");
    }

    #[test]
    fn common_currency_codes_apply() {
        let c = cache();
        assert_eq!(c.safe_currency_code("XPNT"), "PNT");
        assert_eq!(c.safe_currency_code("BCC"), "BCC");
    }

    #[test]
    fn currency_networks_and_single_network_fee() {
        let c = cache();
        let raw = json!({
            "full_name": "Tether",
            "payin_enabled": true,
            "payout_enabled": true,
            "transfer_enabled": true,
            "precision_transfer": "0.000001",
            "networks": [
                {"network": "ETH", "protocol": "ERC20", "payin_enabled": true, "payout_enabled": true, "payout_fee": "20", "precision_payout": "0.000001"},
                {"network": "TRX", "protocol": "TRC20", "payin_enabled": true, "payout_enabled": false, "payout_fee": "1"}
            ]
        });
        let currency = convert_hitbtc_currency(&c, "USDT", &raw, &networks_by_id());
        assert_eq!(currency.active, Some(true));
        assert_eq!(currency.fee, None);
        let trc = currency.networks.get("TRC20").unwrap();
        assert_eq!(trc.active, Some(false));
        assert_eq!(trc.fee, Some(dec!(1)));

        let single = json!({"networks": [{"network": "BTC", "payout_fee": "0.0005"}]});
        let btc = convert_hitbtc_currency(&c, "BTC", &single, &networks_by_id());
        assert_eq!(btc.fee, Some(dec!(0.0005)));
        assert_eq!(btc.active, Some(false));
    }

    #[test]
    fn ticker_reads_iso_timestamp() {
        let c = cache();
        let raw = json!({
            "ask": "0.050", "bid": "0.049", "last": "0.0495", "low": "0.048", "high": "0.051",
            "open": "0.049", "volume": "100", "volume_quote": "4.95", "timestamp": "2021-06-01T00:00:00.000Z"
        });
        let ticker = convert_hitbtc_ticker(&raw, &eth_btc(&c));
        assert_eq!(ticker.timestamp, Some(1_622_505_600_000));
        assert_eq!(ticker.close, Some(dec!(0.0495)));
        assert_eq!(ticker.quote_volume, Some(dec!(4.95)));
    }

    #[test]
    fn candle_maps_min_and_max() {
        let candle = convert_hitbtc_ohlcv(&json!({
            "timestamp": "2021-06-01T00:00:00.000Z", "open": "1", "close": "2", "min": "0.5", "max": "3", "volume": "10"
        }))
        .unwrap();
        assert_eq!(candle.high, Some(dec!(3)));
        assert_eq!(candle.low, Some(dec!(0.5)));
    }

    #[test]
    fn private_trade_fee_in_fee_currency() {
        let c = loaded_cache();
        let trade = convert_hitbtc_trade(
            &c,
            &json!({
                "id": 9, "order_id": 1, "client_order_id": "abc", "symbol": "ETHBTC", "side": "sell",
                "quantity": "2", "price": "0.05", "fee": "0.0001", "timestamp": "2021-06-01T00:00:00.000Z",
                "taker": false
            }),
            None,
        );
        assert_eq!(trade.order.as_deref(), Some("abc"));
        assert_eq!(trade.taker_or_maker, Some(TakerOrMaker::Maker));
        assert_eq!(trade.cost, Some(dec!(0.1)));
        assert_eq!(trade.fee.unwrap().currency.as_deref(), Some("BTC"));
    }

    #[test]
    fn order_uses_client_id_and_reduces_stop_types() {
        let c = loaded_cache();
        let order = convert_hitbtc_order(
            &c,
            &json!({
                "id": 828680665, "client_order_id": "f4307c6e", "symbol": "ETHBTC", "side": "buy",
                "status": "partiallyFilled", "type": "stopLimit", "time_in_force": "GTC",
                "quantity": "2", "quantity_cumulative": "0.5", "price": "0.05", "stop_price": "0.049",
                "post_only": false, "created_at": "2021-06-01T00:00:00.000Z", "updated_at": "2021-06-01T00:00:01.000Z"
            }),
            None,
        );
        assert_eq!(order.id, "f4307c6e");
        assert_eq!(order.status, Some(OrderStatus::Open));
        assert_eq!(order.order_type, Some(OrderType::Limit));
        assert_eq!(order.trigger_price, Some(dec!(0.049)));
        assert_eq!(order.remaining, Some(dec!(1.5)));
        assert_eq!(order.last_trade_timestamp, Some(1_622_505_601_000));

        let expired = convert_hitbtc_order(&c, &json!({"client_order_id": "x", "status": "expired"}), None);
        assert_eq!(expired.status, Some(OrderStatus::Expired));
    }

    #[test]
    fn transaction_reads_native_block() {
        let c = cache();
        let tx = convert_hitbtc_transaction(
            &c,
            &json!({
                "id": 10, "operation_id": "op-1", "status": "SUCCESS", "type": "DEPOSIT", "subtype": "OFFCHAIN",
                "created_at": "2021-06-01T00:00:00.000Z", "updated_at": "2021-06-01T00:10:00.000Z",
                "native": {"currency": "BTC", "amount": "0.1", "fee": "0.0001", "hash": "0xabc",
                           "address": "1addr", "payment_id": "memo", "senders": ["1from"]}
            }),
        );
        assert_eq!(tx.id.as_deref(), Some("op-1"));
        assert_eq!(tx.transaction_type, Some(TransactionType::Deposit));
        assert_eq!(tx.status, Some(TransactionStatus::Ok));
        assert_eq!(tx.internal, Some(true));
        assert_eq!(tx.address_from.as_deref(), Some("1from"));
        assert_eq!(tx.tag.as_deref(), Some("memo"));
        assert_eq!(tx.fee.unwrap().currency.as_deref(), Some("BTC"));
    }

    #[test]
    fn fees_promote_default_network() {
        let fee = convert_hitbtc_deposit_withdraw_fee(
            &json!({"networks": [
                {"network": "ETH", "protocol": "ERC20", "default": true, "payout_fee": "20"},
                {"network": "TRX", "protocol": "TRC20", "payout_fee": "1"}
            ]}),
            &networks_by_id(),
        );
        assert_eq!(fee.withdraw.fee, Some(dec!(20)));
        assert_eq!(fee.networks.get("TRC20").unwrap().withdraw.fee, Some(dec!(1)));
    }

    #[test]
    fn short_position_from_negative_quantity() {
        let c = loaded_cache();
        let position = convert_hitbtc_position(
            &c,
            &json!({
                "symbol": "BTCUSDT_PERP", "type": "isolated", "leverage": "10.00",
                "updated_at": "2021-06-01T00:00:00.000Z",
                "currencies": [{"code": "USDT", "margin_balance": "100"}],
                "positions": [{"id": 1, "quantity": "-0.5", "price_entry": "30000", "pnl": "-2"}]
            }),
        )
        .unwrap();
        assert_eq!(position.side, Some(PositionSide::Short));
        assert_eq!(position.contracts, Some(dec!(0.5)));
        assert_eq!(position.initial_margin, Some(dec!(100)));
        assert_eq!(position.unrealized_pnl, Some(dec!(-2)));
    }
}
