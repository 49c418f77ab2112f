use crate::core::safe;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use tracing::warn;

/// Free-form exchange-specific parameters merged into a request after every
/// unified field has been consumed.
pub type Params = Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarketType {
    Spot,
    Margin,
    Swap,
    Future,
    Option,
}

impl MarketType {
    pub fn is_contract(self) -> bool {
        matches!(self, Self::Swap | Self::Future | Self::Option)
    }
}

impl fmt::Display for MarketType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Spot => "spot",
            Self::Margin => "margin",
            Self::Swap => "swap",
            Self::Future => "future",
            Self::Option => "option",
        };
        f.write_str(s)
    }
}

/// Unified symbol for a market.
///
/// Spot and margin markets render as `BASE/QUOTE`, contracts with a settle
/// currency as `BASE/QUOTE:SETTLE`, and dated futures append `-YYMMDD`.
pub fn market_symbol(
    base: &str,
    quote: &str,
    settle: Option<&str>,
    market_type: MarketType,
    expiry: Option<i64>,
) -> String {
    let mut symbol = format!("{}/{}", base, quote);
    if market_type.is_contract() {
        if let Some(settle) = settle {
            symbol.push(':');
            symbol.push_str(settle);
            if let Some(date) = expiry.and_then(safe::ymd) {
                // yyyy-mm-dd -> yymmdd
                let compact: String = date.chars().filter(char::is_ascii_digit).skip(2).collect();
                symbol.push('-');
                symbol.push_str(&compact);
            }
        }
    }
    symbol
}

/// An exchange-native currency id paired with its unified code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    pub id: String,
    pub code: String,
}

impl Asset {
    pub fn new(id: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            code: code.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MinMax {
    pub min: Option<Decimal>,
    pub max: Option<Decimal>,
}

impl MinMax {
    pub fn new(min: Option<Decimal>, max: Option<Decimal>) -> Self {
        Self { min, max }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketLimits {
    pub amount: MinMax,
    pub price: MinMax,
    pub cost: MinMax,
    pub leverage: MinMax,
}

/// Step sizes, not digit counts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketPrecision {
    pub amount: Option<Decimal>,
    pub price: Option<Decimal>,
}

/// A tradable market.
///
/// The identity fields (`symbol`, `base`, `quote`, `settle`, type, expiry)
/// are fixed at construction so the symbol always matches them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Market {
    pub id: String,
    symbol: String,
    base: String,
    quote: String,
    settle: Option<String>,
    pub base_id: String,
    pub quote_id: String,
    pub settle_id: Option<String>,
    #[serde(rename = "type")]
    market_type: MarketType,
    expiry: Option<i64>,
    pub margin: bool,
    pub active: bool,
    pub linear: Option<bool>,
    pub inverse: Option<bool>,
    pub contract_size: Option<Decimal>,
    pub precision: MarketPrecision,
    pub limits: MarketLimits,
    pub taker: Option<Decimal>,
    pub maker: Option<Decimal>,
    /// Alternate names the exchange uses for this market (altname, wsname).
    pub alt_names: Vec<String>,
    pub info: Value,
}

impl Market {
    pub fn new(
        id: impl Into<String>,
        market_type: MarketType,
        base: Asset,
        quote: Asset,
        settle: Option<Asset>,
        expiry: Option<i64>,
    ) -> Self {
        let settle_code = settle.as_ref().map(|s| s.code.clone());
        let symbol = market_symbol(
            &base.code,
            &quote.code,
            settle_code.as_deref(),
            market_type,
            expiry,
        );
        let (linear, inverse) = match settle_code.as_deref() {
            Some(s) if market_type.is_contract() => (Some(s == quote.code), Some(s == base.code)),
            _ => (None, None),
        };
        Self {
            id: id.into(),
            symbol,
            base: base.code,
            quote: quote.code,
            settle: settle_code,
            base_id: base.id,
            quote_id: quote.id,
            settle_id: settle.map(|s| s.id),
            market_type,
            expiry,
            margin: market_type == MarketType::Margin,
            active: true,
            linear,
            inverse,
            contract_size: None,
            precision: MarketPrecision::default(),
            limits: MarketLimits::default(),
            taker: None,
            maker: None,
            alt_names: Vec::new(),
            info: Value::Null,
        }
    }

    /// Convenience constructor for a spot market.
    pub fn spot(id: impl Into<String>, base: Asset, quote: Asset) -> Self {
        Self::new(id, MarketType::Spot, base, quote, None, None)
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn quote(&self) -> &str {
        &self.quote
    }

    pub fn settle(&self) -> Option<&str> {
        self.settle.as_deref()
    }

    pub fn market_type(&self) -> MarketType {
        self.market_type
    }

    pub fn expiry(&self) -> Option<i64> {
        self.expiry
    }

    pub fn is_spot(&self) -> bool {
        self.market_type == MarketType::Spot
    }

    pub fn is_contract(&self) -> bool {
        self.market_type.is_contract()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CurrencyNetwork {
    pub id: String,
    pub network: String,
    pub active: Option<bool>,
    pub deposit: Option<bool>,
    pub withdraw: Option<bool>,
    pub fee: Option<Decimal>,
    pub precision: Option<Decimal>,
    pub withdraw_limits: MinMax,
    pub info: Value,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Currency {
    pub id: String,
    pub code: String,
    pub name: Option<String>,
    pub precision: Option<Decimal>,
    pub active: Option<bool>,
    pub deposit: Option<bool>,
    pub withdraw: Option<bool>,
    pub fee: Option<Decimal>,
    pub networks: BTreeMap<String, CurrencyNetwork>,
    pub info: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.to_lowercase().as_str() {
            "buy" | "b" => Some(Self::Buy),
            "sell" | "s" => Some(Self::Sell),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Buy => "buy",
            Self::Sell => "sell",
        }
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Base order type. Conditional variants are expressed through the trigger
/// fields of [`Order`] and [`OrderParams`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderType {
    Market,
    Limit,
}

impl OrderType {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.to_lowercase().as_str() {
            "market" => Some(Self::Market),
            "limit" => Some(Self::Limit),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Market => "market",
            Self::Limit => "limit",
        }
    }
}

impl fmt::Display for OrderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimeInForce {
    GTC,
    IOC,
    FOK,
    PO,
    GTD,
    Day,
}

impl TimeInForce {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.to_uppercase().as_str() {
            "GTC" => Some(Self::GTC),
            "IOC" => Some(Self::IOC),
            "FOK" => Some(Self::FOK),
            "PO" => Some(Self::PO),
            "GTD" => Some(Self::GTD),
            "DAY" => Some(Self::Day),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::GTC => "GTC",
            Self::IOC => "IOC",
            Self::FOK => "FOK",
            Self::PO => "PO",
            Self::GTD => "GTD",
            Self::Day => "Day",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TakerOrMaker {
    Taker,
    Maker,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarginMode {
    Cross,
    Isolated,
}

/// Look a raw exchange status up in a closed table, passing unknown values
/// through so new exchange states stay visible.
fn lookup_status<T: Clone>(
    raw: &str,
    table: &[(&str, T)],
    unrecognized: impl FnOnce(String) -> T,
) -> T {
    table
        .iter()
        .find(|(key, _)| *key == raw)
        .map_or_else(
            || {
                warn!(status = %raw, "Unmapped exchange status passed through");
                unrecognized(raw.to_string())
            },
            |(_, status)| status.clone(),
        )
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum OrderStatus {
    Open,
    Closed,
    Canceled,
    Expired,
    Rejected,
    /// Raw value that no table entry recognised.
    Unrecognized(String),
}

impl OrderStatus {
    pub fn from_table(raw: &str, table: &[(&str, Self)]) -> Self {
        lookup_status(raw, table, Self::Unrecognized)
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Open => "open",
            Self::Closed => "closed",
            Self::Canceled => "canceled",
            Self::Expired => "expired",
            Self::Rejected => "rejected",
            Self::Unrecognized(raw) => raw,
        }
    }

    pub fn is_unified(&self) -> bool {
        !matches!(self, Self::Unrecognized(_))
    }
}

impl Serialize for OrderStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for OrderStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(match raw.as_str() {
            "open" => Self::Open,
            "closed" => Self::Closed,
            "canceled" => Self::Canceled,
            "expired" => Self::Expired,
            "rejected" => Self::Rejected,
            _ => Self::Unrecognized(raw),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TransactionStatus {
    Pending,
    Ok,
    Failed,
    Canceled,
    Unrecognized(String),
}

impl TransactionStatus {
    pub fn from_table(raw: &str, table: &[(&str, Self)]) -> Self {
        lookup_status(raw, table, Self::Unrecognized)
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Pending => "pending",
            Self::Ok => "ok",
            Self::Failed => "failed",
            Self::Canceled => "canceled",
            Self::Unrecognized(raw) => raw,
        }
    }

    pub fn is_unified(&self) -> bool {
        !matches!(self, Self::Unrecognized(_))
    }
}

impl Serialize for TransactionStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for TransactionStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(match raw.as_str() {
            "pending" => Self::Pending,
            "ok" => Self::Ok,
            "failed" => Self::Failed,
            "canceled" => Self::Canceled,
            _ => Self::Unrecognized(raw),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Deposit,
    Withdrawal,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Fee {
    pub cost: Option<Decimal>,
    pub currency: Option<String>,
    pub rate: Option<Decimal>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Ticker {
    pub symbol: String,
    pub timestamp: Option<i64>,
    pub datetime: Option<String>,
    pub high: Option<Decimal>,
    pub low: Option<Decimal>,
    pub bid: Option<Decimal>,
    pub bid_volume: Option<Decimal>,
    pub ask: Option<Decimal>,
    pub ask_volume: Option<Decimal>,
    pub vwap: Option<Decimal>,
    pub open: Option<Decimal>,
    pub close: Option<Decimal>,
    pub last: Option<Decimal>,
    pub previous_close: Option<Decimal>,
    pub change: Option<Decimal>,
    pub percentage: Option<Decimal>,
    pub average: Option<Decimal>,
    pub base_volume: Option<Decimal>,
    pub quote_volume: Option<Decimal>,
    pub info: Value,
}

impl Ticker {
    /// Derive change, percentage and average from open/last when absent.
    pub fn complete(mut self) -> Self {
        if self.close.is_none() {
            self.close = self.last;
        }
        if self.last.is_none() {
            self.last = self.close;
        }
        if self.datetime.is_none() {
            self.datetime = safe::iso8601_opt(self.timestamp);
        }
        if let (Some(open), Some(last)) = (self.open, self.last) {
            if self.change.is_none() {
                self.change = last.checked_sub(open);
            }
            if self.average.is_none() {
                self.average = last.checked_add(open).and_then(|sum| sum.checked_div(Decimal::TWO));
            }
            if self.percentage.is_none() && !open.is_zero() {
                self.percentage = self
                    .change
                    .and_then(|c| c.checked_div(open))
                    .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED));
            }
        }
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ohlcv {
    pub timestamp: i64,
    pub open: Option<Decimal>,
    pub high: Option<Decimal>,
    pub low: Option<Decimal>,
    pub close: Option<Decimal>,
    pub volume: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderBookEntry {
    pub price: Decimal,
    pub amount: Decimal,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderBook {
    pub symbol: String,
    pub bids: Vec<OrderBookEntry>,
    pub asks: Vec<OrderBookEntry>,
    pub timestamp: Option<i64>,
    pub datetime: Option<String>,
    pub nonce: Option<i64>,
}

impl OrderBook {
    /// Build a book from `[price, amount, ...]` rows (or objects addressed by
    /// the given keys), sorted bids descending and asks ascending.
    pub fn from_levels(
        symbol: impl Into<String>,
        bids: &[Value],
        asks: &[Value],
        price_key: &str,
        amount_key: &str,
        timestamp: Option<i64>,
    ) -> Self {
        let parse = |rows: &[Value]| -> Vec<OrderBookEntry> {
            rows.iter()
                .filter_map(|row| {
                    let (price, amount) = if row.is_array() {
                        (safe::decimal_at(row, 0), safe::decimal_at(row, 1))
                    } else {
                        (safe::decimal(row, price_key), safe::decimal(row, amount_key))
                    };
                    Some(OrderBookEntry {
                        price: price?,
                        amount: amount?,
                    })
                })
                .collect()
        };
        let mut bids = parse(bids);
        let mut asks = parse(asks);
        bids.sort_by(|a, b| b.price.cmp(&a.price));
        asks.sort_by(|a, b| a.price.cmp(&b.price));
        Self {
            symbol: symbol.into(),
            bids,
            asks,
            timestamp,
            datetime: safe::iso8601_opt(timestamp),
            nonce: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub id: Option<String>,
    pub order: Option<String>,
    pub symbol: Option<String>,
    pub timestamp: Option<i64>,
    pub datetime: Option<String>,
    pub side: Option<OrderSide>,
    #[serde(rename = "type")]
    pub order_type: Option<OrderType>,
    pub taker_or_maker: Option<TakerOrMaker>,
    pub price: Option<Decimal>,
    pub amount: Option<Decimal>,
    pub cost: Option<Decimal>,
    pub fee: Option<Fee>,
    pub info: Value,
}

impl Trade {
    pub fn complete(mut self) -> Self {
        if self.cost.is_none() {
            if let (Some(price), Some(amount)) = (self.price, self.amount) {
                self.cost = price.checked_mul(amount);
            }
        }
        if self.datetime.is_none() {
            self.datetime = safe::iso8601_opt(self.timestamp);
        }
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    pub client_order_id: Option<String>,
    pub timestamp: Option<i64>,
    pub datetime: Option<String>,
    pub last_trade_timestamp: Option<i64>,
    pub status: Option<OrderStatus>,
    pub symbol: Option<String>,
    #[serde(rename = "type")]
    pub order_type: Option<OrderType>,
    pub time_in_force: Option<TimeInForce>,
    pub post_only: Option<bool>,
    pub reduce_only: Option<bool>,
    pub side: Option<OrderSide>,
    pub price: Option<Decimal>,
    pub average: Option<Decimal>,
    pub amount: Option<Decimal>,
    pub filled: Option<Decimal>,
    pub remaining: Option<Decimal>,
    pub cost: Option<Decimal>,
    pub trigger_price: Option<Decimal>,
    pub stop_loss_price: Option<Decimal>,
    pub take_profit_price: Option<Decimal>,
    pub fee: Option<Fee>,
    pub trades: Vec<Trade>,
    pub info: Value,
}

impl Order {
    /// Fill in the derivable quantities the exchange left out.
    pub fn complete(mut self) -> Self {
        if self.remaining.is_none() {
            if let (Some(amount), Some(filled)) = (self.amount, self.filled) {
                self.remaining = amount.checked_sub(filled).map(|left| left.max(Decimal::ZERO));
            }
        }
        if self.filled.is_none() {
            if let (Some(amount), Some(remaining)) = (self.amount, self.remaining) {
                self.filled = amount.checked_sub(remaining).map(|done| done.max(Decimal::ZERO));
            }
        }
        if self.average.is_none() {
            if let (Some(cost), Some(filled)) = (self.cost, self.filled) {
                if !filled.is_zero() {
                    self.average = cost.checked_div(filled);
                }
            }
        }
        if self.cost.is_none() {
            if let Some(filled) = self.filled {
                if let Some(px) = self.average.or(self.price) {
                    self.cost = filled.checked_mul(px);
                }
            }
        }
        if self.datetime.is_none() {
            self.datetime = safe::iso8601_opt(self.timestamp);
        }
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Option<String>,
    pub txid: Option<String>,
    #[serde(rename = "type")]
    pub transaction_type: Option<TransactionType>,
    pub currency: Option<String>,
    pub network: Option<String>,
    pub amount: Option<Decimal>,
    pub address: Option<String>,
    pub address_to: Option<String>,
    pub address_from: Option<String>,
    pub tag: Option<String>,
    pub tag_to: Option<String>,
    pub tag_from: Option<String>,
    pub status: Option<TransactionStatus>,
    pub updated: Option<i64>,
    pub timestamp: Option<i64>,
    pub datetime: Option<String>,
    pub internal: Option<bool>,
    pub comment: Option<String>,
    pub fee: Option<Fee>,
    pub info: Value,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Balance {
    pub free: Option<Decimal>,
    pub used: Option<Decimal>,
    pub total: Option<Decimal>,
}

impl Balance {
    /// Derive whichever of free/used/total is missing.
    pub fn complete(mut self) -> Self {
        match (self.free, self.used, self.total) {
            (None, Some(used), Some(total)) => self.free = total.checked_sub(used),
            (Some(free), None, Some(total)) => self.used = total.checked_sub(free),
            (Some(free), Some(used), None) => self.total = free.checked_add(used),
            _ => {}
        }
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Balances {
    pub timestamp: Option<i64>,
    pub datetime: Option<String>,
    pub currencies: BTreeMap<String, Balance>,
    pub info: Value,
}

impl Balances {
    pub fn new(info: Value) -> Self {
        Self {
            info,
            ..Self::default()
        }
    }

    pub fn insert(&mut self, code: impl Into<String>, balance: Balance) {
        self.currencies.insert(code.into(), balance.complete());
    }

    pub fn get(&self, code: &str) -> Option<&Balance> {
        self.currencies.get(code)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Transfer {
    pub id: Option<String>,
    pub timestamp: Option<i64>,
    pub datetime: Option<String>,
    pub currency: Option<String>,
    pub amount: Option<Decimal>,
    pub from_account: Option<String>,
    pub to_account: Option<String>,
    pub status: Option<String>,
    pub info: Value,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FundingRate {
    pub symbol: String,
    pub mark_price: Option<Decimal>,
    pub index_price: Option<Decimal>,
    pub interest_rate: Option<Decimal>,
    pub funding_rate: Option<Decimal>,
    pub funding_timestamp: Option<i64>,
    pub funding_datetime: Option<String>,
    pub next_funding_rate: Option<Decimal>,
    pub next_funding_timestamp: Option<i64>,
    pub interval: Option<String>,
    pub timestamp: Option<i64>,
    pub datetime: Option<String>,
    pub info: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LedgerDirection {
    In,
    Out,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: Option<String>,
    pub direction: LedgerDirection,
    pub reference_id: Option<String>,
    #[serde(rename = "type")]
    pub entry_type: Option<String>,
    pub currency: Option<String>,
    pub amount: Option<Decimal>,
    pub after: Option<Decimal>,
    pub status: Option<String>,
    pub timestamp: Option<i64>,
    pub datetime: Option<String>,
    pub fee: Option<Fee>,
    pub info: Value,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DepositAddress {
    pub currency: String,
    pub network: Option<String>,
    pub address: String,
    pub tag: Option<String>,
    pub info: Value,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeeSchedule {
    pub fee: Option<Decimal>,
    pub percentage: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkFees {
    pub withdraw: FeeSchedule,
    pub deposit: FeeSchedule,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DepositWithdrawFee {
    pub withdraw: FeeSchedule,
    pub deposit: FeeSchedule,
    pub networks: BTreeMap<String, NetworkFees>,
    pub info: Value,
}

impl DepositWithdrawFee {
    /// Promote the single network's fees to the top level, as venues with
    /// one network usually only report per-network numbers.
    pub fn complete(mut self) -> Self {
        if self.networks.len() == 1 && self.withdraw.fee.is_none() {
            if let Some(only) = self.networks.values().next() {
                self.withdraw = only.withdraw.clone();
                self.deposit = only.deposit.clone();
            }
        }
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PositionSide {
    Long,
    Short,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub id: Option<String>,
    pub symbol: Option<String>,
    pub side: Option<PositionSide>,
    pub contracts: Option<Decimal>,
    pub initial_margin: Option<Decimal>,
    pub leverage: Option<Decimal>,
    pub unrealized_pnl: Option<Decimal>,
    pub timestamp: Option<i64>,
    pub info: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExchangeHealth {
    Ok,
    Maintenance,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExchangeStatus {
    pub status: ExchangeHealth,
    pub updated: Option<i64>,
    pub eta: Option<i64>,
    pub url: Option<String>,
    pub info: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OffsetSign {
    Plus,
    Minus,
}

impl OffsetSign {
    pub fn as_char(self) -> char {
        match self {
            Self::Plus => '+',
            Self::Minus => '-',
        }
    }
}

/// Conditional close order attached to a primary order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CloseOrder {
    pub order_type: String,
    pub price: Option<Decimal>,
    pub price2: Option<Decimal>,
}

/// Unified order modifiers. Each adapter consumes the fields it understands
/// and forwards `extra` verbatim.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderParams {
    pub client_order_id: Option<String>,
    pub trigger_price: Option<Decimal>,
    pub stop_loss_price: Option<Decimal>,
    pub take_profit_price: Option<Decimal>,
    pub trailing_amount: Option<Decimal>,
    pub trailing_percent: Option<Decimal>,
    pub trailing_limit_amount: Option<Decimal>,
    pub trailing_limit_percent: Option<Decimal>,
    pub trailing_offset: Option<OffsetSign>,
    /// Price the trailing activation follows (`last`, `index`).
    pub trailing_trigger: Option<String>,
    pub cost: Option<Decimal>,
    pub post_only: Option<bool>,
    pub reduce_only: Option<bool>,
    pub time_in_force: Option<TimeInForce>,
    pub expire_time: Option<String>,
    pub close: Option<CloseOrder>,
    pub margin_mode: Option<MarginMode>,
    pub extra: Params,
}

impl OrderParams {
    pub fn is_post_only(&self) -> bool {
        self.post_only == Some(true) || self.time_in_force == Some(TimeInForce::PO)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderRequest {
    pub symbol: String,
    pub order_type: OrderType,
    pub side: OrderSide,
    pub amount: Decimal,
    pub price: Option<Decimal>,
    pub params: OrderParams,
}

impl OrderRequest {
    pub fn limit(symbol: impl Into<String>, side: OrderSide, amount: Decimal, price: Decimal) -> Self {
        Self {
            symbol: symbol.into(),
            order_type: OrderType::Limit,
            side,
            amount,
            price: Some(price),
            params: OrderParams::default(),
        }
    }

    pub fn market(symbol: impl Into<String>, side: OrderSide, amount: Decimal) -> Self {
        Self {
            symbol: symbol.into(),
            order_type: OrderType::Market,
            side,
            amount,
            price: None,
            params: OrderParams::default(),
        }
    }

    pub fn with_params(mut self, params: OrderParams) -> Self {
        self.params = params;
        self
    }

    pub fn with_client_order_id(mut self, id: impl Into<String>) -> Self {
        self.params.client_order_id = Some(id.into());
        self
    }

    pub fn with_stop_loss(mut self, trigger: Decimal) -> Self {
        self.params.stop_loss_price = Some(trigger);
        self
    }

    pub fn with_take_profit(mut self, trigger: Decimal) -> Self {
        self.params.take_profit_price = Some(trigger);
        self
    }

    pub fn with_trigger(mut self, trigger: Decimal) -> Self {
        self.params.trigger_price = Some(trigger);
        self
    }

    pub fn with_post_only(mut self) -> Self {
        self.params.post_only = Some(true);
        self
    }

    pub fn with_reduce_only(mut self) -> Self {
        self.params.reduce_only = Some(true);
        self
    }

    pub fn with_time_in_force(mut self, tif: TimeInForce) -> Self {
        self.params.time_in_force = Some(tif);
        self
    }

    pub fn with_cost(mut self, cost: Decimal) -> Self {
        self.params.cost = Some(cost);
        self
    }
}

/// Amendment of a live order. Absent fields are left unchanged.
#[derive(Debug, Clone, PartialEq)]
pub struct EditOrderRequest {
    pub id: String,
    pub symbol: String,
    pub order_type: OrderType,
    pub side: OrderSide,
    pub amount: Option<Decimal>,
    pub price: Option<Decimal>,
    pub params: OrderParams,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WithdrawRequest {
    pub code: String,
    pub amount: Decimal,
    pub address: String,
    pub tag: Option<String>,
    pub network: Option<String>,
    pub params: Params,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TransferRequest {
    pub code: String,
    pub amount: Decimal,
    pub from_account: String,
    pub to_account: String,
    pub params: Params,
}

/// Common window and paging knobs for history endpoints.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchParams {
    pub since: Option<i64>,
    pub until: Option<i64>,
    pub limit: Option<usize>,
    /// Walk every page instead of returning the first one.
    pub paginate: bool,
    pub extra: Params,
}

impl FetchParams {
    pub fn since(mut self, since: i64) -> Self {
        self.since = Some(since);
        self
    }

    pub fn until(mut self, until: i64) -> Self {
        self.until = Some(until);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn paginate(mut self) -> Self {
        self.paginate = true;
        self
    }
}
