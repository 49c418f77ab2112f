mod common;

use async_trait::async_trait;
use common::{form_value, MockRest};
use parking_lot::Mutex;
use reqwest::Method;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use rust_decimal_macros::dec;
use serde_json::json;
use unifiedx::core::config::ExchangeConfig;
use unifiedx::core::errors::ExchangeError;
use unifiedx::core::kernel::{HttpRequest, HttpResponse, RestClient};
use unifiedx::core::traits::{AccountInfo, MarketDataSource, OrderPlacer};
use unifiedx::core::types::{FetchParams, OrderRequest, OrderSide};
use unifiedx::exchanges::kraken::{KrakenBuilder, KrakenConnector};

const SECRET: &str = "dGVzdF9zZWNyZXQ=";

fn script_markets(mock: &MockRest) {
    mock.get(
        "public/Assets",
        json!({"error": [], "result": {
            "XXBT": {"altname": "XBT", "decimals": 10, "status": "enabled"},
            "ZUSD": {"altname": "USD", "decimals": 4, "status": "enabled"}
        }}),
    );
    mock.get(
        "public/AssetPairs",
        json!({"error": [], "result": {
            "XXBTZUSD": {
                "altname": "XBTUSD", "wsname": "XBT/USD", "base": "XXBT", "quote": "ZUSD",
                "pair_decimals": 1, "lot_decimals": 8, "status": "online",
                "fees": [[0, 0.26]], "fees_maker": [[0, 0.16]],
                "ordermin": "0.0001", "costmin": "0.5"
            }
        }}),
    );
}

fn connector(mock: &MockRest, authenticated: bool) -> KrakenConnector<MockRest> {
    let builder = KrakenBuilder::new().with_base_url("https://kraken.test".to_string());
    let builder = if authenticated {
        builder.with_credentials("test_key".to_string(), SECRET.to_string())
    } else {
        builder.with_config(ExchangeConfig::read_only().base_url("https://kraken.test".to_string()))
    };
    builder.build_with_client(mock.clone())
}

#[tokio::test]
async fn test_kraken_markets_use_unified_codes() {
    let mock = MockRest::new();
    script_markets(&mock);
    let kraken = connector(&mock, false);

    let markets = kraken.load_markets(false).await.unwrap();
    assert_eq!(markets.len(), 1);
    assert_eq!(markets[0].symbol(), "BTC/USD");
    assert_eq!(markets[0].precision.price, Some(dec!(0.1)));

    // cached on the second call
    kraken.load_markets(false).await.unwrap();
    assert_eq!(mock.requests_to("public/AssetPairs").len(), 1);
}

#[tokio::test]
async fn test_kraken_ticker_is_read_from_the_pair_entry() {
    let mock = MockRest::new();
    script_markets(&mock);
    mock.get(
        "public/Ticker",
        json!({"error": [], "result": {"XXBTZUSD": {
            "a": ["100", "1", "1"], "b": ["99", "2", "2"], "c": ["99.5", "10"],
            "v": ["50", "100"], "p": ["99", "99.4"], "h": ["101", "102"],
            "l": ["98", "97"], "o": "98.5"
        }}}),
    );
    let kraken = connector(&mock, false);

    let ticker = kraken.fetch_ticker("BTC/USD").await.unwrap();
    assert_eq!(ticker.symbol, "BTC/USD");
    assert_eq!(ticker.last, Some(dec!(99.5)));
    assert_eq!(ticker.bid, Some(dec!(99)));
    assert!(mock.last_request_to("public/Ticker").url.contains("pair=XXBTZUSD"));
}

#[tokio::test]
async fn test_kraken_oversized_ticker_values_do_not_panic() {
    let mock = MockRest::new();
    script_markets(&mock);
    mock.get(
        "public/Ticker",
        json!({"error": [], "result": {"XXBTZUSD": {
            "a": ["100", "1", "1"], "b": ["99", "2", "2"], "c": ["99.5", "10"],
            "v": ["50", "100000000000000000000"], "p": ["99", "10000000000"],
            "h": ["101", "102"], "l": ["98", "97"], "o": "98.5"
        }}}),
    );
    let kraken = connector(&mock, false);

    let ticker = kraken.fetch_ticker("BTC/USD").await.unwrap();
    assert_eq!(ticker.base_volume, Some(dec!(100000000000000000000)));
    assert_eq!(ticker.quote_volume, None);
    assert_eq!(ticker.last, Some(dec!(99.5)));
}

#[tokio::test]
async fn test_kraken_limit_order_is_signed_form_post() {
    let mock = MockRest::new();
    script_markets(&mock);
    mock.post(
        "private/AddOrder",
        json!({"error": [], "result": {
            "descr": {"order": "buy 1.25000000 XBTUSD @ limit 27500.0"},
            "txid": ["OU22CG-KLAF2-FWUDD7"]
        }}),
    );
    let kraken = connector(&mock, true);

    let order = kraken
        .create_order(OrderRequest::limit("BTC/USD", OrderSide::Buy, dec!(1.25), dec!(27500.04)))
        .await
        .unwrap();
    assert_eq!(order.id, "OU22CG-KLAF2-FWUDD7");

    let request = mock.last_request_to("private/AddOrder");
    assert_eq!(request.url, "https://kraken.test/0/private/AddOrder");
    assert_eq!(request.headers.get("API-Key").map(String::as_str), Some("test_key"));
    assert!(request.headers.contains_key("API-Sign"));
    let body = request.body.unwrap();
    assert!(body.starts_with("nonce="));
    assert_eq!(form_value(&body, "pair").as_deref(), Some("XXBTZUSD"));
    assert_eq!(form_value(&body, "type").as_deref(), Some("buy"));
    assert_eq!(form_value(&body, "ordertype").as_deref(), Some("limit"));
    assert_eq!(form_value(&body, "volume").as_deref(), Some("1.25"));
    assert_eq!(form_value(&body, "price").as_deref(), Some("27500"));
}

#[tokio::test]
async fn test_kraken_stop_loss_and_take_profit_conflict() {
    let mock = MockRest::new();
    script_markets(&mock);
    let kraken = connector(&mock, true);

    let order = OrderRequest::limit("BTC/USD", OrderSide::Sell, dec!(1), dec!(30000))
        .with_stop_loss(dec!(29000))
        .with_take_profit(dec!(31000));
    let err = kraken.create_order(order).await.unwrap_err();
    assert!(matches!(err, ExchangeError::InvalidOrder(_)));
    assert!(mock.requests_to("private/").is_empty());
}

#[tokio::test]
async fn test_kraken_private_call_without_credentials_fails_fast() {
    let mock = MockRest::new();
    script_markets(&mock);
    let kraken = connector(&mock, false);

    let err = kraken.fetch_balance().await.unwrap_err();
    assert!(matches!(err, ExchangeError::Authentication(_)));
    assert!(mock.requests_to("private/").is_empty());
}

#[tokio::test]
async fn test_kraken_balance_derives_free() {
    let mock = MockRest::new();
    script_markets(&mock);
    mock.post(
        "private/BalanceEx",
        json!({"error": [], "result": {"XXBT": {"balance": "1.5", "hold_trade": "0.5"}}}),
    );
    let kraken = connector(&mock, true);

    let balances = kraken.fetch_balance().await.unwrap();
    let btc = balances.get("BTC").unwrap();
    assert_eq!(btc.total, Some(dec!(1.5)));
    assert_eq!(btc.used, Some(dec!(0.5)));
    assert_eq!(btc.free, Some(dec!(1.0)));
}

#[tokio::test]
async fn test_kraken_error_strings_are_classified() {
    let mock = MockRest::new();
    script_markets(&mock);
    mock.post("private/CancelOrder", json!({"error": ["EOrder:Unknown order"]}));
    let kraken = connector(&mock, true);

    let err = kraken.cancel_order("MISSING", None).await.unwrap_err();
    assert!(matches!(err, ExchangeError::OrderNotFound(_)));
}

#[tokio::test]
async fn test_kraken_withdrawals_send_the_same_window_as_deposits() {
    let mock = MockRest::new();
    script_markets(&mock);
    mock.post("private/DepositStatus", json!({"error": [], "result": []}));
    mock.post("private/WithdrawStatus", json!({"error": [], "result": {"withdrawals": []}}));
    let kraken = connector(&mock, true);

    let window = || FetchParams::default().since(1_700_000_000_000).until(1_700_000_100_000);
    kraken.fetch_deposits(Some("BTC"), window()).await.unwrap();
    kraken.fetch_withdrawals(Some("BTC"), window()).await.unwrap();
    kraken.fetch_withdrawals(Some("BTC"), window().paginate()).await.unwrap();

    let deposit = mock.last_request_to("private/DepositStatus").body.unwrap();
    assert_eq!(form_value(&deposit, "end").as_deref(), Some("1700000101"));
    let withdrawals = mock.requests_to("private/WithdrawStatus");
    assert_eq!(withdrawals.len(), 2);
    for request in withdrawals {
        let body = request.body.unwrap();
        assert_eq!(form_value(&body, "start").as_deref(), Some("1700000000"));
        assert_eq!(form_value(&body, "end").as_deref(), Some("1700000101"));
        assert_eq!(form_value(&body, "asset").as_deref(), Some("XXBT"));
    }
}

/// Holds the first private request back, as a slow network path would, and
/// records nonces in the order they reach the server.
#[derive(Clone, Default)]
struct SlowFirstPost {
    inner: MockRest,
    posts: Arc<AtomicUsize>,
    arrivals: Arc<Mutex<Vec<u64>>>,
}

#[async_trait]
impl RestClient for SlowFirstPost {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ExchangeError> {
        if request.method == Method::POST {
            if self.posts.fetch_add(1, Ordering::SeqCst) == 0 {
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
            let nonce = form_value(request.body.as_deref().unwrap_or_default(), "nonce").unwrap();
            self.arrivals.lock().push(nonce.parse().unwrap());
        }
        self.inner.send(request).await
    }
}

#[tokio::test]
async fn test_kraken_concurrent_private_calls_arrive_in_nonce_order() {
    let transport = SlowFirstPost::default();
    script_markets(&transport.inner);
    transport.inner.post(
        "private/BalanceEx",
        json!({"error": [], "result": {"XXBT": {"balance": "1", "hold_trade": "0"}}}),
    );
    let kraken = KrakenBuilder::new()
        .with_base_url("https://kraken.test".to_string())
        .with_credentials("test_key".to_string(), SECRET.to_string())
        .build_with_client(transport.clone());
    kraken.load_markets(false).await.unwrap();

    let (first, second, third) = tokio::join!(kraken.fetch_balance(), kraken.fetch_balance(), kraken.fetch_balance());
    first.unwrap();
    second.unwrap();
    third.unwrap();

    let arrivals = transport.arrivals.lock().clone();
    assert_eq!(arrivals.len(), 3);
    assert!(arrivals.windows(2).all(|pair| pair[0] < pair[1]), "nonces arrived as {:?}", arrivals);
}
