use crate::core::config::{
    string_map, AdapterOptionsPatch, Capability, DescriptorPatch, ExchangeDescriptor, Merge,
    Support, TradingFees,
};
use crate::core::types::{Market, MarketType};
use rust_decimal_macros::dec;
use serde::Deserialize;
use serde_json::Value;

pub const HITBTC_API_URL: &str = "https://api.hitbtc.com/api/3";
pub const HITBTC_TESTNET_URL: &str = "https://api.demo.hitbtc.com/api/3";
pub const API_VERSION: &str = "3";

/// Path prefix covered by the request signature.
pub const SIGNED_PATH_PREFIX: &str = "/api/3/";

pub const MAX_TRADES: usize = 1000;
pub const MAX_CANDLES: usize = 1000;

/// Ids the symbol list carries but the exchange rejects individually.
pub const INVALID_SYMBOL_SUFFIX: &str = "_BQX";

pub fn hitbtc_descriptor() -> ExchangeDescriptor {
    use Capability::*;

    let has = [
        (FetchMarkets, Support::Yes),
        (FetchCurrencies, Support::Yes),
        (FetchTicker, Support::Yes),
        (FetchTickers, Support::Yes),
        (FetchOrderBook, Support::Yes),
        (FetchTrades, Support::Yes),
        (FetchOhlcv, Support::Yes),
        (FetchTime, Support::No),
        (FetchStatus, Support::No),
        (CreateOrder, Support::Yes),
        (EditOrder, Support::Yes),
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
        (Transfer, Support::Yes),
        (FetchLedger, Support::No),
        (FetchPositions, Support::Yes),
        (FetchDepositWithdrawFees, Support::Yes),
        (FetchFundingRate, Support::Yes),
        (FetchFundingRates, Support::Yes),
    ]
    .into_iter()
    .collect();

    ExchangeDescriptor::base().merged(DescriptorPatch {
        id: Some("hitbtc".to_string()),
        name: Some("HitBTC".to_string()),
        version: Some(API_VERSION.to_string()),
        rate_limit_ms: Some(4),
        has,
        timeframes: string_map(&[
            ("1m", "M1"),
            ("3m", "M3"),
            ("5m", "M5"),
            ("15m", "M15"),
            ("30m", "M30"),
            ("1h", "H1"),
            ("4h", "H4"),
            ("1d", "D1"),
            ("1w", "D7"),
            ("1M", "1M"),
        ]),
        urls: string_map(&[("rest", HITBTC_API_URL), ("test", HITBTC_TESTNET_URL)]),
        fees: TradingFees {
            taker: Some(dec!(0.0009)),
            maker: Some(dec!(0.0009)),
        },
        common_currencies: string_map(&[
            ("AUTO", "Cube"),
            ("BCC", "BCC"),
            ("BDP", "BidiPass"),
            ("BET", "DAO.Casino"),
            ("BIT", "BitRewards"),
            ("BOX", "BOX Token"),
            ("CPT", "Cryptaur"),
            ("GET", "Themis"),
            ("GMT", "GMT Token"),
            ("HSR", "HC"),
            ("IQ", "IQ.Cash"),
            ("LNC", "LinkerCoin"),
            ("PLA", "PlayChip"),
            ("PNT", "Penta"),
            ("SBTC", "Super Bitcoin"),
            ("STEPN", "GMT"),
            ("STX", "STOX"),
            ("TV", "Tokenville"),
            ("XMT", "MTL"),
            ("XPNT", "PNT"),
        ]),
        options: AdapterOptionsPatch {
            default_network: Some("ERC20".to_string()),
            networks: string_map(&[
                ("BTC", "btc"),
                ("OMNI", "BTC"),
                ("ETH", "eth"),
                ("ERC20", "ETH"),
                ("ETC", "ETC"),
                ("BEP20", "BSC"),
                ("TRC20", "TRX"),
                ("NEAR", "NEAR"),
                ("ADA", "ADA"),
                ("ALGO", "ALGO"),
                ("ATOM", "ATOM"),
                ("AVAXC", "AVAC"),
                ("BSV", "BCHSV"),
                ("BEP2", "BNB"),
                ("DOGE", "doge"),
                ("LTC", "ltc"),
                ("MATIC", "POLYGON"),
                ("OPTIMISM", "OP"),
                ("SOL", "SOL"),
                ("XMR", "xmr"),
                ("XRP", "XRP"),
                ("XLM", "XLM"),
            ]),
            networks_by_id: string_map(&[
                ("ETH", "ERC20"),
                ("BSC", "BEP20"),
                ("TRX", "TRC20"),
                ("AVAC", "AVAXC"),
                ("BCHSV", "BSV"),
                ("BNB", "BEP2"),
                ("POLYGON", "MATIC"),
                ("OP", "OPTIMISM"),
            ]),
            accounts_by_type: string_map(&[
                ("spot", "spot"),
                ("funding", "wallet"),
                ("wallet", "wallet"),
                ("swap", "derivatives"),
                ("future", "derivatives"),
                ("derivatives", "derivatives"),
            ]),
            ohlcv_page_size: Some(MAX_CANDLES),
            ..AdapterOptionsPatch::default()
        },
        ..DescriptorPatch::default()
    })
}

/// Product line an order endpoint belongs to: `spot/order`, `margin/order`
/// or `futures/order`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Venue {
    Spot,
    Margin,
    Futures,
}

impl Venue {
    /// Contracts trade on the futures venue; spot markets move to the
    /// margin venue when a margin mode is requested.
    pub fn for_market(market: Option<&Market>, margin: bool) -> Self {
        match market.map(Market::market_type) {
            Some(MarketType::Swap | MarketType::Future) => Self::Futures,
            Some(MarketType::Margin) => Self::Margin,
            _ if margin => Self::Margin,
            _ => Self::Spot,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Spot => "spot",
            Self::Margin => "margin",
            Self::Futures => "futures",
        }
    }

    /// `{venue}/{path}`.
    pub fn path(self, path: &str) -> String {
        format!("{}/{}", self.as_str(), path)
    }
}

/// `{"error": {"code": 20001, "message": "...", "description": "..."}}`.
#[derive(Debug, Clone, Deserialize)]
pub struct HitbtcErrorEnvelope {
    pub error: HitbtcError,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HitbtcError {
    #[serde(default)]
    pub code: Value,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl HitbtcError {
    /// The code as text, whether sent as a number or a string.
    pub fn code(&self) -> Option<String> {
        match &self.code {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    pub fn text(&self) -> Option<&str> {
        self.message.as_deref().or(self.description.as_deref())
    }
}
