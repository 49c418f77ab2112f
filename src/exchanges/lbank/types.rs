use crate::core::config::{
    string_map, AdapterOptionsPatch, Capability, DescriptorPatch, ExchangeDescriptor, Merge,
    Support, TradingFees,
};
use rust_decimal_macros::dec;
use serde::Deserialize;
use serde_json::Value;

pub const LBANK_API_URL: &str = "https://api.lbank.info";
pub const LBANK_CONTRACT_URL: &str = "https://lbkperp.lbank.com";
pub const API_VERSION: &str = "v2";

/// Contract endpoints only list the USDT-margined perpetual group.
pub const SWAP_PRODUCT_GROUP: &str = "SwapU";

pub const DEFAULT_BOOK_DEPTH: usize = 60;
pub const MAX_TRADES: usize = 600;
pub const MAX_KLINES: usize = 2000;
pub const DEFAULT_KLINES: usize = 100;
pub const DEFAULT_ORDER_PAGE: usize = 100;

/// `echostr` must be 30 to 40 characters long.
pub const ECHOSTR_LEN: usize = 38;

/// Network used for a currency when the caller names none.
pub const DEFAULT_NETWORKS: &[(&str, &str)] = &[("USDT", "TRC20")];

pub fn lbank_descriptor() -> ExchangeDescriptor {
    use Capability::*;

    let has = [
        (FetchMarkets, Support::Yes),
        (FetchCurrencies, Support::No),
        (FetchTicker, Support::Yes),
        (FetchTickers, Support::Yes),
        (FetchOrderBook, Support::Yes),
        (FetchTrades, Support::Yes),
        (FetchOhlcv, Support::Yes),
        (FetchTime, Support::Yes),
        (FetchStatus, Support::No),
        (CreateOrder, Support::Yes),
        (EditOrder, Support::No),
        (CancelOrder, Support::Yes),
        (CancelOrders, Support::No),
        (CancelAllOrders, Support::Yes),
        (CancelAllOrdersAfter, Support::No),
        (FetchOrder, Support::Yes),
        (FetchOpenOrders, Support::Yes),
        (FetchClosedOrders, Support::Yes),
        (FetchMyTrades, Support::Yes),
        (FetchBalance, Support::Yes),
        (FetchDeposits, Support::Yes),
        (FetchWithdrawals, Support::Yes),
        (FetchDepositAddress, Support::Yes),
        (Withdraw, Support::Yes),
        (Transfer, Support::No),
        (FetchLedger, Support::No),
        (FetchPositions, Support::No),
        (FetchDepositWithdrawFees, Support::Yes),
        (FetchFundingRate, Support::Yes),
        (FetchFundingRates, Support::Yes),
    ]
    .into_iter()
    .collect();

    ExchangeDescriptor::base().merged(DescriptorPatch {
        id: Some("lbank".to_string()),
        name: Some("LBank".to_string()),
        version: Some(API_VERSION.to_string()),
        rate_limit_ms: Some(20),
        has,
        timeframes: string_map(&[
            ("1m", "minute1"),
            ("5m", "minute5"),
            ("15m", "minute15"),
            ("30m", "minute30"),
            ("1h", "hour1"),
            ("2h", "hour2"),
            ("4h", "hour4"),
            ("6h", "hour6"),
            ("8h", "hour8"),
            ("12h", "hour12"),
            ("1d", "day1"),
            ("1w", "week1"),
        ]),
        urls: string_map(&[("rest", LBANK_API_URL), ("contract", LBANK_CONTRACT_URL)]),
        fees: TradingFees {
            taker: Some(dec!(0.001)),
            maker: Some(dec!(0.001)),
        },
        common_currencies: string_map(&[("HIT", "Hiver"), ("VET_ERC20", "VEN"), ("PNT", "Penta")]),
        options: AdapterOptionsPatch {
            cache_secret_as_pem: Some(true),
            create_market_buy_order_requires_price: Some(true),
            networks: string_map(&[
                ("ERC20", "erc20"),
                ("ETH", "erc20"),
                ("TRC20", "trc20"),
                ("TRX", "trc20"),
                ("OMNI", "omni"),
                ("ASA", "asa"),
                ("BEP20", "bep20(bsc)"),
                ("BSC", "bep20(bsc)"),
                ("HT", "heco"),
                ("BNB", "bep2"),
                ("BTC", "btc"),
                ("DOGE", "dogecoin"),
                ("MATIC", "matic"),
                ("POLYGON", "matic"),
                ("OEC", "oec"),
                ("BTCTRON", "btctron"),
                ("XRP", "xrp"),
            ]),
            networks_by_id: string_map(&[
                ("erc20", "ERC20"),
                ("trc20", "TRC20"),
                ("omni", "OMNI"),
                ("asa", "ASA"),
                ("bep20(bsc)", "BSC"),
                ("bep20", "BSC"),
                ("heco", "HT"),
                ("bep2", "BNB"),
                ("btc", "BTC"),
                ("dogecoin", "DOGE"),
                ("matic", "MATIC"),
                ("oec", "OEC"),
                ("btctron", "BTCTRON"),
                ("xrp", "XRP"),
            ]),
            ohlcv_page_size: Some(MAX_KLINES),
            ..AdapterOptionsPatch::default()
        },
        ..DescriptorPatch::default()
    })
}

/// Spot and contract responses: `{"result": ..., "data": ..., "error_code": ...}`.
#[derive(Debug, Clone, Deserialize)]
pub struct LbankEnvelope {
    #[serde(default)]
    pub result: Value,
    #[serde(default)]
    pub data: Value,
    #[serde(default)]
    pub error_code: Value,
    #[serde(default)]
    pub ts: Value,
}

impl LbankEnvelope {
    /// `result` arrives as a boolean or as the strings `"true"`/`"false"`.
    /// A missing flag is a failure.
    pub fn succeeded(&self) -> bool {
        match &self.result {
            Value::Bool(ok) => *ok,
            Value::String(s) => s != "false" && !s.is_empty(),
            Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
            Value::Null => false,
            _ => true,
        }
    }
}

/// Decoded `type` of an order or trade, e.g. `buy_maker` or `sell_market`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeSuffix<'a> {
    pub side: &'a str,
    pub modifier: Option<&'a str>,
}

impl<'a> TypeSuffix<'a> {
    pub fn parse(raw: &'a str) -> Self {
        match raw.split_once('_') {
            Some((side, modifier)) => Self {
                side,
                modifier: Some(modifier),
            },
            None => Self {
                side: raw,
                modifier: None,
            },
        }
    }
}
