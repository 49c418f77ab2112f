use crate::core::config::{
    string_map, AdapterOptionsPatch, Capability, DescriptorPatch, ExchangeDescriptor, Merge,
    Support, TradingFees,
};
use crate::core::errors::ErrorKind;
use rust_decimal_macros::dec;
use serde::Deserialize;
use serde_json::Value;

pub const KRAKEN_API_URL: &str = "https://api.kraken.com";
pub const API_VERSION: &str = "0";

/// OHLC endpoint returns at most this many candles per call.
pub const OHLCV_PAGE: usize = 720;

/// Longest dead man's switch Kraken accepts, in milliseconds.
pub const MAX_CANCEL_AFTER_MS: i64 = 86_400_000;

/// Static description of the Kraken spot API.
pub fn kraken_descriptor() -> ExchangeDescriptor {
    use Capability::*;

    let has = [
        (FetchMarkets, Support::Yes),
        (FetchCurrencies, Support::Yes),
        (FetchTicker, Support::Yes),
        (FetchTickers, Support::Yes),
        (FetchOrderBook, Support::Yes),
        (FetchTrades, Support::Yes),
        (FetchOhlcv, Support::Yes),
        (FetchTime, Support::Yes),
        (FetchStatus, Support::Yes),
        (CreateOrder, Support::Yes),
        (EditOrder, Support::Yes),
        (CancelOrder, Support::Yes),
        (CancelOrders, Support::Yes),
        (CancelAllOrders, Support::Yes),
        (CancelAllOrdersAfter, Support::Yes),
        (FetchOrder, Support::Yes),
        (FetchOpenOrders, Support::Yes),
        (FetchClosedOrders, Support::Yes),
        (FetchMyTrades, Support::Yes),
        (FetchBalance, Support::Yes),
        (FetchDeposits, Support::Yes),
        (FetchWithdrawals, Support::Yes),
        (FetchDepositAddress, Support::Yes),
        (Withdraw, Support::Yes),
        (Transfer, Support::Yes),
        (FetchLedger, Support::Yes),
        (FetchPositions, Support::Yes),
        (FetchDepositWithdrawFees, Support::No),
        (FetchFundingRate, Support::No),
        (FetchFundingRates, Support::No),
    ]
    .into_iter()
    .collect();

    ExchangeDescriptor::base().merged(DescriptorPatch {
        id: Some("kraken".to_string()),
        name: Some("Kraken".to_string()),
        version: Some(API_VERSION.to_string()),
        rate_limit_ms: Some(1000),
        has,
        timeframes: string_map(&[
            ("1m", "1"),
            ("5m", "5"),
            ("15m", "15"),
            ("30m", "30"),
            ("1h", "60"),
            ("4h", "240"),
            ("1d", "1440"),
            ("1w", "10080"),
            ("2w", "21600"),
        ]),
        urls: string_map(&[("public", KRAKEN_API_URL), ("private", KRAKEN_API_URL)]),
        fees: TradingFees {
            taker: Some(dec!(0.0026)),
            maker: Some(dec!(0.0016)),
        },
        common_currencies: string_map(&[
            ("LUNA", "LUNC"),
            ("LUNA2", "LUNA"),
            ("REPV2", "REP"),
            ("REP", "REPV1"),
            ("UST", "USTC"),
            ("XBT", "BTC"),
            ("XDG", "DOGE"),
            ("FEE", "KFEE"),
        ]),
        http_exceptions: [(520, ErrorKind::ExchangeNotAvailable)].into_iter().collect(),
        options: AdapterOptionsPatch {
            networks: string_map(&[("ETH", "ERC20"), ("TRX", "TRC20")]),
            accounts_by_type: string_map(&[
                ("spot", "Spot Wallet"),
                ("swap", "Futures Wallet"),
                ("future", "Futures Wallet"),
            ]),
            ohlcv_page_size: Some(OHLCV_PAGE),
            ..AdapterOptionsPatch::default()
        },
        ..DescriptorPatch::default()
    })
}

/// Every Kraken response: `{"error": [...], "result": ...}`.
#[derive(Debug, Clone, Deserialize)]
pub struct KrakenEnvelope {
    #[serde(default)]
    pub error: Vec<String>,
    #[serde(default)]
    pub result: Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct KrakenServerTime {
    pub unixtime: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct KrakenSystemStatus {
    pub status: String,
    #[serde(default)]
    pub timestamp: Option<String>,
}

/// The shapes a trade arrives in, depending on the endpoint.
#[derive(Debug, Clone, Copy)]
pub enum TradeRaw<'a> {
    /// Public trade row `[price, volume, time, side, ordertype, misc, id?]`.
    Array(&'a [Value]),
    /// Bare trade id listed on an order.
    Id(&'a str),
    /// Private history entry, keyed by `ordertxid`.
    Private(&'a Value),
    /// Object form with `trade_id`, `qty` and an ISO timestamp.
    Object(&'a Value),
}

impl<'a> TradeRaw<'a> {
    pub fn classify(raw: &'a Value) -> Self {
        match raw {
            Value::Array(row) => Self::Array(row),
            Value::String(id) => Self::Id(id),
            other if other.get("ordertxid").is_some() => Self::Private(other),
            other => Self::Object(other),
        }
    }
}

/// `descr` is either a structured object or, on older payloads, the bare
/// order sentence.
#[derive(Debug, Clone, Copy)]
pub enum DescriptionRaw<'a> {
    Structured(&'a Value),
    Sentence(&'a str),
    Missing,
}

impl<'a> DescriptionRaw<'a> {
    pub fn classify(order: &'a Value) -> Self {
        match order.get("descr") {
            Some(Value::Object(_)) => Self::Structured(&order["descr"]),
            Some(Value::String(s)) => Self::Sentence(s),
            _ => Self::Missing,
        }
    }

    pub fn sentence(&self) -> Option<&'a str> {
        match self {
            Self::Structured(descr) => descr.get("order").and_then(Value::as_str),
            Self::Sentence(s) => Some(s),
            Self::Missing => None,
        }
    }

    pub fn field(&self, key: &str) -> Option<String> {
        match self {
            Self::Structured(descr) => crate::core::safe::string(descr, key),
            _ => None,
        }
    }
}

/// Positional decode of an order sentence such as
/// `sell 167.28002676 ADAXBT @ stop loss 0.00003280 -> limit 0.00003212`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderDescription {
    pub side: Option<String>,
    pub amount: Option<String>,
    pub cost: Option<String>,
    pub market_id: Option<String>,
    /// First word of the type clause: `limit`, `market`, `stop`, `take`, `trailing`.
    pub type_token: Option<String>,
    /// Full type clause: `limit`, `market`, `stop loss`, `take profit`, `trailing stop`.
    pub raw_type: Option<String>,
    pub trigger_price: Option<String>,
    pub price: Option<String>,
}

impl OrderDescription {
    pub fn parse(sentence: &str, using_cost: bool) -> Self {
        let parts: Vec<&str> = sentence.split(' ').collect();
        let part = |i: usize| parts.get(i).filter(|p| !p.is_empty()).map(|p| (*p).to_string());

        let mut description = Self {
            side: part(0),
            market_id: part(2),
            type_token: part(4),
            ..Self::default()
        };
        if using_cost {
            description.cost = part(1);
        } else {
            description.amount = part(1);
        }

        description.raw_type = match (part(4), part(5)) {
            (Some(t), _) if t == "limit" || t == "market" => Some(t),
            (Some(a), Some(b)) => Some(format!("{} {}", a, b)),
            (Some(a), None) => Some(a),
            _ => None,
        };
        match description.raw_type.as_deref() {
            Some("stop loss" | "take profit") => {
                description.trigger_price = part(6);
                description.price = part(9);
            }
            Some("limit") => description.price = part(5),
            _ => {}
        }
        description
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn stop_loss_sentence_is_decoded_positionally() {
        let d = OrderDescription::parse(
            "sell 167.28002676 ADAXBT @ stop loss 0.00003280 -> limit 0.00003212",
            false,
        );
        assert_eq!(d.side.as_deref(), Some("sell"));
        assert_eq!(d.amount.as_deref(), Some("167.28002676"));
        assert_eq!(d.market_id.as_deref(), Some("ADAXBT"));
        assert_eq!(d.type_token.as_deref(), Some("stop"));
        assert_eq!(d.raw_type.as_deref(), Some("stop loss"));
        assert_eq!(d.trigger_price.as_deref(), Some("0.00003280"));
        assert_eq!(d.price.as_deref(), Some("0.00003212"));
    }

    #[test]
    fn limit_sentence_and_cost_orders() {
        let d = OrderDescription::parse("buy 0.02100000 ETHUSDT @ limit 330.00", false);
        assert_eq!(d.raw_type.as_deref(), Some("limit"));
        assert_eq!(d.price.as_deref(), Some("330.00"));

        let d = OrderDescription::parse("buy 25.00 XBTUSD @ market", true);
        assert_eq!(d.cost.as_deref(), Some("25.00"));
        assert_eq!(d.amount, None);
        assert_eq!(d.price, None);
    }

    #[test]
    fn trade_shapes() {
        let row = json!(["30000.1", "0.1", 1_688_669_448.123, "b", "l", "", 123]);
        assert!(matches!(TradeRaw::classify(&row), TradeRaw::Array(_)));
        assert!(matches!(TradeRaw::classify(&json!("TID-1")), TradeRaw::Id("TID-1")));
        assert!(matches!(
            TradeRaw::classify(&json!({"ordertxid": "O1", "pair": "XXBTZUSD"})),
            TradeRaw::Private(_)
        ));
        assert!(matches!(TradeRaw::classify(&json!({"trade_id": 1})), TradeRaw::Object(_)));
    }

    #[test]
    fn descriptor_merges_kraken_aliases_over_base() {
        let d = kraken_descriptor();
        assert_eq!(d.common_currencies.get("XDG").map(String::as_str), Some("DOGE"));
        assert_eq!(d.common_currencies.get("BCC").map(String::as_str), Some("BCH"));
        assert_eq!(d.timeframe("1h").unwrap(), "60");
        assert!(d.supports(Capability::CancelAllOrdersAfter));
        assert!(!d.supports(Capability::FetchFundingRate));
    }
}
