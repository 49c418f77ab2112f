use crate::core::config::{
    string_map, AdapterOptionsPatch, Capability, DescriptorPatch, ExchangeDescriptor, Merge,
    Support, TradingFees,
};
use rust_decimal_macros::dec;
use serde::Deserialize;
use serde_json::Value;

pub const NOVADAX_API_URL: &str = "https://api.novadax.com";
pub const API_VERSION: &str = "v1";

/// `code` of every successful response.
pub const SUCCESS_CODE: &str = "A10000";

pub const MAX_ORDERS: usize = 100;
pub const MAX_CANDLES: usize = 3000;

/// Account name of the master account in transfers.
pub const MAIN_ACCOUNT: &str = "main";

pub fn novadax_descriptor() -> ExchangeDescriptor {
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
        (CancelAllOrders, Support::No),
        (CancelAllOrdersAfter, Support::No),
        (FetchOrder, Support::Yes),
        (FetchOpenOrders, Support::Yes),
        (FetchClosedOrders, Support::Yes),
        (FetchMyTrades, Support::Yes),
        (FetchBalance, Support::Yes),
        (FetchDeposits, Support::Yes),
        (FetchWithdrawals, Support::Yes),
        (FetchDepositAddress, Support::No),
        (Withdraw, Support::Yes),
        (Transfer, Support::Yes),
        (FetchLedger, Support::No),
        (FetchPositions, Support::No),
        (FetchDepositWithdrawFees, Support::No),
        (FetchFundingRate, Support::No),
        (FetchFundingRates, Support::No),
    ]
    .into_iter()
    .collect();

    ExchangeDescriptor::base().merged(DescriptorPatch {
        id: Some("novadax".to_string()),
        name: Some("NovaDAX".to_string()),
        version: Some(API_VERSION.to_string()),
        rate_limit_ms: Some(10),
        has,
        timeframes: string_map(&[
            ("1m", "ONE_MIN"),
            ("5m", "FIVE_MIN"),
            ("15m", "FIFTEEN_MIN"),
            ("30m", "HALF_HOU"),
            ("1h", "ONE_HOU"),
            ("1d", "ONE_DAY"),
            ("1w", "ONE_WEE"),
            ("1M", "ONE_MON"),
        ]),
        urls: string_map(&[("rest", NOVADAX_API_URL)]),
        fees: TradingFees {
            taker: Some(dec!(0.005)),
            maker: Some(dec!(0.0025)),
        },
        options: AdapterOptionsPatch {
            create_market_buy_order_requires_price: Some(true),
            ohlcv_page_size: Some(MAX_CANDLES),
            ..AdapterOptionsPatch::default()
        },
        ..DescriptorPatch::default()
    })
}

/// `{"code": "A10000", "data": ..., "message": "Success"}`.
#[derive(Debug, Clone, Deserialize)]
pub struct NovadaxEnvelope {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub data: Value,
    #[serde(default)]
    pub message: Option<String>,
}

impl NovadaxEnvelope {
    pub fn succeeded(&self) -> bool {
        self.code.as_deref().map_or(true, |code| code == SUCCESS_CODE)
    }
}

/// Order states accepted by the `status` filter of `orders/list`.
pub const OPEN_STATUSES: &str = "SUBMITTED,PROCESSING,PARTIAL_FILLED,CANCELING";
pub const CLOSED_STATUSES: &str = "FILLED,CANCELED,REJECTED";
