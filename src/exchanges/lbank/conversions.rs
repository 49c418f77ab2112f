use super::types::TypeSuffix;
use crate::core::markets::MarketCache;
use crate::core::precision::precision_from_digits;
use crate::core::safe;
use crate::core::types::{
    Asset, Balance, Balances, DepositAddress, DepositWithdrawFee, Fee, FeeSchedule, FundingRate,
    Market, MarketType, MinMax, NetworkFees, Ohlcv, Order, OrderSide, OrderStatus, OrderType,
    TakerOrMaker, Ticker, TimeInForce, Trade, Transaction, TransactionStatus, TransactionType,
};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Deposit status 5: moved between LBank accounts rather than on chain.
const DEPOSIT_TRANSFER: &str = "5";

/// Spot pair from `accuracy`. Ids look like `eth_btc`.
pub fn convert_lbank_spot_market(cache: &MarketCache, raw: &Value) -> Option<Market> {
    let id = safe::string(raw, "symbol")?;
    let (base_id, quote_id) = id.split_once('_')?;
    let base = cache.safe_currency_code(base_id);
    let quote = cache.safe_currency_code(quote_id);

    let mut market = Market::spot(id.clone(), Asset::new(base_id, base), Asset::new(quote_id, quote));
    market.precision.amount = safe::integer(raw, "quantityAccuracy").and_then(precision_from_digits);
    market.precision.price = safe::integer(raw, "priceAccuracy").and_then(precision_from_digits);
    market.limits.amount = MinMax::new(safe::decimal(raw, "minTranQua"), None);
    market.info = raw.clone();
    Some(market)
}

/// USDT-margined perpetual from `cfd/openApi/v1/pub/instrument`.
/// The quote is the clearing currency.
pub fn convert_lbank_swap_market(cache: &MarketCache, raw: &Value) -> Option<Market> {
    let id = safe::string(raw, "symbol")?;
    let base_id = safe::string(raw, "baseCurrency")?;
    let settle_id = safe::string(raw, "clearCurrency")?;
    let base = cache.safe_currency_code(&base_id);
    let settle = cache.safe_currency_code(&settle_id);

    let mut market = Market::new(
        id,
        MarketType::Swap,
        Asset::new(base_id, base),
        Asset::new(settle_id.clone(), settle.clone()),
        Some(Asset::new(settle_id, settle)),
        None,
    );
    market.contract_size = safe::decimal(raw, "volumeMultiple");
    market.precision.amount = safe::decimal(raw, "volumeTick");
    market.precision.price = safe::decimal(raw, "priceTick");
    market.limits.amount = MinMax::new(safe::decimal(raw, "minOrderVolume"), safe::decimal(raw, "maxOrderVolume"));
    market.limits.price = MinMax::new(
        safe::decimal(raw, "priceLimitLowerValue"),
        safe::decimal(raw, "priceLimitUpperValue"),
    );
    market.limits.cost = MinMax::new(safe::decimal(raw, "minOrderCost"), None);
    market.info = raw.clone();
    Some(market)
}

/// Market for an id, building an inactive spot pair from `base_quote` ids
/// the cache has never seen.
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

/// Spot tickers nest their numbers under `ticker`; contract tickers are flat.
pub fn convert_lbank_ticker(raw: &Value, market: &Market) -> Ticker {
    let data = if market.is_contract() {
        raw
    } else {
        safe::value(raw, "ticker").unwrap_or(raw)
    };
    let pick = |keys: &[&str]| safe::decimal_n(data, keys);

    Ticker {
        symbol: market.symbol().to_string(),
        timestamp: safe::integer(raw, "timestamp"),
        high: pick(&["high", "highestPrice"]),
        low: pick(&["low", "lowestPrice"]),
        open: safe::decimal(data, "openPrice"),
        last: pick(&["latest", "lastPrice"]),
        percentage: safe::decimal(data, "change"),
        base_volume: pick(&["vol", "volume"]),
        quote_volume: safe::decimal(data, "turnover"),
        info: raw.clone(),
        ..Ticker::default()
    }
    .complete()
}

/// `[time_s, open, high, low, close, volume]`
pub fn convert_lbank_ohlcv(row: &Value) -> Option<Ohlcv> {
    Some(Ohlcv {
        timestamp: safe::timestamp_secs_at(row, 0)?,
        open: safe::decimal_at(row, 1),
        high: safe::decimal_at(row, 2),
        low: safe::decimal_at(row, 3),
        close: safe::decimal_at(row, 4),
        volume: safe::decimal_at(row, 5),
    })
}

/// Public trades and `transaction_history` entries.
pub fn convert_lbank_trade(raw: &Value, market: Option<&Market>) -> Trade {
    let raw_type = safe::string_n(raw, &["tradeType", "type"]);
    let suffix = raw_type.as_deref().map(TypeSuffix::parse);

    let side = suffix.and_then(|t| OrderSide::parse(t.side));
    let (order_type, taker_or_maker) = match suffix.map(|t| t.modifier) {
        Some(Some("market")) => (Some(OrderType::Market), Some(TakerOrMaker::Taker)),
        Some(Some("maker")) => (Some(OrderType::Limit), Some(TakerOrMaker::Maker)),
        Some(_) => (Some(OrderType::Limit), Some(TakerOrMaker::Taker)),
        None => (None, None),
    };

    let fee = safe::decimal(raw, "tradeFee").map(|cost| Fee {
        cost: Some(cost),
        currency: market.map(|m| {
            if side == Some(OrderSide::Buy) {
                m.base().to_string()
            } else {
                m.quote().to_string()
            }
        }),
        rate: safe::decimal(raw, "tradeFeeRate"),
    });

    Trade {
        id: safe::string_n(raw, &["tid", "id", "txUuid"]),
        order: safe::string(raw, "orderUuid"),
        symbol: market.map(|m| m.symbol().to_string()),
        timestamp: safe::integer_n(raw, &["date_ms", "time", "dealTime"]),
        side,
        order_type,
        taker_or_maker,
        price: safe::decimal_n(raw, &["price", "dealPrice"]),
        amount: safe::decimal_n(raw, &["amount", "qty", "dealQuantity"]),
        cost: safe::decimal_n(raw, &["quoteQty", "dealVolumePrice"]),
        fee,
        info: raw.clone(),
        ..Trade::default()
    }
    .complete()
}

/// Account balances from any of the three `user_info` payload shapes.
pub fn convert_lbank_balance(cache: &MarketCache, response: &Value) -> Balances {
    let mut balances = Balances::new(response.clone());
    balances.timestamp = safe::integer(response, "ts");
    balances.datetime = safe::iso8601_opt(balances.timestamp);
    let data = safe::value(response, "data").unwrap_or(&Value::Null);

    if safe::value(data, "toBtc").is_some() {
        let frozen = safe::value(data, "freeze").unwrap_or(&Value::Null);
        let free = safe::value(data, "free").and_then(Value::as_object);
        for id in free.into_iter().flat_map(|m| m.keys()) {
            let available = safe::value(data, "free").and_then(|f| safe::decimal(f, id));
            balances.insert(
                cache.safe_currency_code(id),
                Balance {
                    free: available,
                    used: safe::decimal(frozen, id),
                    total: None,
                },
            );
        }
    } else if let Some(list) = safe::value(data, "balances").and_then(Value::as_array) {
        for item in list {
            let Some(id) = safe::string(item, "asset") else {
                continue;
            };
            balances.insert(
                cache.safe_currency_code(&id),
                Balance {
                    free: safe::decimal(item, "free"),
                    used: safe::decimal(item, "locked"),
                    total: None,
                },
            );
        }
    } else if let Some(list) = data.as_array() {
        for item in list {
            let Some(id) = safe::string(item, "coin") else {
                continue;
            };
            balances.insert(
                cache.safe_currency_code(&id),
                Balance {
                    free: safe::decimal(item, "usableAmt"),
                    used: safe::decimal(item, "freezeAmt"),
                    total: None,
                },
            );
        }
    }
    balances
}

fn order_status(raw: &str) -> OrderStatus {
    OrderStatus::from_table(
        raw,
        &[
            ("-1", OrderStatus::Canceled),
            ("0", OrderStatus::Open),
            ("1", OrderStatus::Open),
            ("2", OrderStatus::Closed),
            ("3", OrderStatus::Canceled),
            ("4", OrderStatus::Closed),
        ],
    )
}

/// Order payloads from the `supplement` endpoints and the legacy ones.
/// The order type and time in force are both encoded in the type suffix.
pub fn convert_lbank_order(cache: &MarketCache, raw: &Value, market: Option<Arc<Market>>) -> Order {
    let market = safe::string(raw, "symbol")
        .and_then(|id| resolve_market(cache, &id))
        .or(market);

    let raw_type = safe::string_n(raw, &["type", "tradeType"]).unwrap_or_default();
    let suffix = TypeSuffix::parse(&raw_type);
    let (order_type, time_in_force) = match suffix.modifier {
        Some("market") => (OrderType::Market, None),
        Some("maker") => (OrderType::Limit, Some(TimeInForce::PO)),
        Some("ioc") => (OrderType::Limit, Some(TimeInForce::IOC)),
        Some("fok") => (OrderType::Limit, Some(TimeInForce::FOK)),
        _ => (OrderType::Limit, None),
    };

    // Market buys are sized in quote currency; their amount is not a base amount.
    let amount = if raw_type == "buy_market" {
        None
    } else {
        safe::decimal_n(raw, &["origQty", "amount"])
    };

    Order {
        id: safe::string_n(raw, &["orderId", "order_id"]).unwrap_or_default(),
        client_order_id: safe::string_n(raw, &["clientOrderId", "custom_id"]),
        timestamp: safe::integer_n(raw, &["time", "create_time"]),
        status: safe::string(raw, "status").map(|s| order_status(&s)),
        symbol: market.as_ref().map(|m| m.symbol().to_string()),
        order_type: Some(order_type),
        time_in_force,
        post_only: Some(time_in_force == Some(TimeInForce::PO)),
        side: OrderSide::parse(suffix.side),
        price: safe::decimal(raw, "price"),
        amount,
        filled: safe::decimal_n(raw, &["executedQty", "deal_amount"]),
        cost: safe::decimal(raw, "cummulativeQuoteQty"),
        info: raw.clone(),
        ..Order::default()
    }
    .complete()
}

/// Deposit and withdrawal statuses share codes with different meanings.
fn transaction_status(raw: &str, kind: TransactionType) -> TransactionStatus {
    match kind {
        TransactionType::Deposit => TransactionStatus::from_table(
            raw,
            &[
                ("1", TransactionStatus::Pending),
                ("2", TransactionStatus::Ok),
                ("3", TransactionStatus::Failed),
                ("4", TransactionStatus::Canceled),
                (DEPOSIT_TRANSFER, TransactionStatus::Ok),
            ],
        ),
        TransactionType::Withdrawal => TransactionStatus::from_table(
            raw,
            &[
                ("1", TransactionStatus::Pending),
                ("2", TransactionStatus::Canceled),
                ("3", TransactionStatus::Failed),
                ("4", TransactionStatus::Ok),
            ],
        ),
    }
}

fn network_code(networks_by_id: &BTreeMap<String, String>, id: &str) -> String {
    networks_by_id
        .get(id)
        .cloned()
        .unwrap_or_else(|| id.to_uppercase())
}

/// Entries of `deposit_history` and `withdraws`. Only withdrawals carry an `id`.
pub fn convert_lbank_transaction(
    cache: &MarketCache,
    raw: &Value,
    networks_by_id: &BTreeMap<String, String>,
) -> Transaction {
    let id = safe::string(raw, "id");
    let kind = if id.is_some() {
        TransactionType::Withdrawal
    } else {
        TransactionType::Deposit
    };
    let address = safe::string(raw, "address");
    let code = safe::string_n(raw, &["coin", "coid"]).map(|id| cache.safe_currency_code(&id));
    let raw_status = safe::string(raw, "status");
    let internal = kind == TransactionType::Deposit && raw_status.as_deref() == Some(DEPOSIT_TRANSFER);
    let timestamp = safe::integer_n(raw, &["insertTime", "applyTime"]);

    Transaction {
        id,
        txid: safe::string(raw, "txId"),
        transaction_type: Some(kind),
        currency: code.clone(),
        network: safe::string(raw, "networkName").map(|n| network_code(networks_by_id, &n)),
        amount: safe::decimal(raw, "amount"),
        address_from: address.clone().filter(|_| kind == TransactionType::Deposit),
        address_to: address.clone().filter(|_| kind == TransactionType::Withdrawal),
        address,
        status: raw_status.map(|s| transaction_status(&s, kind)),
        timestamp,
        datetime: safe::iso8601_opt(timestamp),
        internal: Some(internal),
        fee: safe::decimal(raw, "fee").map(|cost| Fee {
            cost: Some(cost),
            currency: code,
            rate: None,
        }),
        info: raw.clone(),
        ..Transaction::default()
    }
}

pub fn convert_lbank_deposit_address(
    raw: &Value,
    code: &str,
    networks_by_id: &BTreeMap<String, String>,
) -> Option<DepositAddress> {
    Some(DepositAddress {
        currency: code.to_string(),
        network: safe::string(raw, "netWork").map(|n| network_code(networks_by_id, &n)),
        address: safe::string(raw, "address")?,
        tag: safe::string(raw, "memo").filter(|memo| !memo.is_empty()),
        info: raw.clone(),
    })
}

fn withdraw_only(fee: Option<rust_decimal::Decimal>) -> NetworkFees {
    NetworkFees {
        withdraw: FeeSchedule { fee, percentage: None },
        deposit: FeeSchedule::default(),
    }
}

/// `supplement/user_info`: one entry per coin with its `networkList`.
/// The default network's fee is also the top-level withdrawal fee.
pub fn convert_lbank_private_fees(
    cache: &MarketCache,
    data: &[Value],
    codes: Option<&[String]>,
    networks_by_id: &BTreeMap<String, String>,
) -> BTreeMap<String, DepositWithdrawFee> {
    let mut result = BTreeMap::new();
    for entry in data {
        let Some(id) = safe::string(entry, "coin") else {
            continue;
        };
        let code = cache.safe_currency_code(&id);
        if codes.is_some_and(|wanted| !wanted.contains(&code)) {
            continue;
        }
        let mut fee = DepositWithdrawFee {
            info: entry.clone(),
            ..DepositWithdrawFee::default()
        };
        for network in safe::array(entry, "networkList") {
            let Some(withdraw_fee) = safe::decimal(network, "withdrawFee") else {
                continue;
            };
            let name = safe::string(network, "name").unwrap_or_default();
            if safe::bool(network, "isDefault") == Some(true) {
                fee.withdraw = FeeSchedule {
                    fee: Some(withdraw_fee),
                    percentage: None,
                };
            }
            fee.networks
                .insert(network_code(networks_by_id, &name), withdraw_only(Some(withdraw_fee)));
        }
        result.insert(code, fee.complete());
    }
    result
}

/// Public `withdrawConfigs`: one entry per coin and chain. Entries that
/// cannot be withdrawn or carry no fee are skipped.
pub fn convert_lbank_public_fees(
    cache: &MarketCache,
    data: &[Value],
    codes: Option<&[String]>,
    networks_by_id: &BTreeMap<String, String>,
) -> BTreeMap<String, DepositWithdrawFee> {
    let mut result: BTreeMap<String, DepositWithdrawFee> = BTreeMap::new();
    for entry in data {
        if safe::bool(entry, "canWithDraw") != Some(true) {
            continue;
        }
        let (Some(id), Some(withdraw_fee)) = (safe::string(entry, "assetCode"), safe::decimal(entry, "fee")) else {
            continue;
        };
        let code = cache.safe_currency_code(&id);
        if codes.is_some_and(|wanted| !wanted.contains(&code)) {
            continue;
        }

        let fee = result.entry(code).or_insert_with(|| DepositWithdrawFee {
            info: Value::Array(Vec::new()),
            ..DepositWithdrawFee::default()
        });
        if let Value::Array(items) = &mut fee.info {
            items.push(entry.clone());
        }
        match safe::string(entry, "chain") {
            Some(chain) => {
                fee.networks
                    .insert(network_code(networks_by_id, &chain), withdraw_only(Some(withdraw_fee)));
            }
            None => {
                fee.withdraw = FeeSchedule {
                    fee: Some(withdraw_fee),
                    percentage: None,
                };
            }
        }
    }
    result.into_iter().map(|(code, fee)| (code, fee.complete())).collect()
}

/// Contract `marketData` entry.
pub fn convert_lbank_funding_rate(raw: &Value, symbol: &str) -> FundingRate {
    let funding_timestamp = safe::integer(raw, "nextFeeTime");
    FundingRate {
        symbol: symbol.to_string(),
        mark_price: safe::decimal(raw, "markedPrice"),
        index_price: safe::decimal(raw, "underlyingPrice"),
        funding_rate: safe::decimal(raw, "fundingRate"),
        funding_timestamp,
        funding_datetime: safe::iso8601_opt(funding_timestamp),
        interval: safe::integer(raw, "positionFeeTime").map(|secs| format!("{}h", secs / 3600)),
        info: raw.clone(),
        ..FundingRate::default()
    }
}
