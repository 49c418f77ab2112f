mod common;

use common::MockRest;
use rust_decimal_macros::dec;
use serde_json::json;
use unifiedx::core::config::ExchangeConfig;
use unifiedx::core::errors::{ErrorKind, ExchangeError};
use unifiedx::core::precision::{amount_to_precision, cost_to_precision, precision_from_digits, price_to_precision};
use unifiedx::core::traits::{AccountInfo, ExchangeConnector, MarketDataSource};
use unifiedx::core::types::{Asset, Balance, Balances, Market, OrderStatus, TransactionStatus};
use unifiedx::exchanges::{hitbtc, kraken, lbank, novadax};

fn btc_usdt() -> Market {
    let mut market = Market::spot("BTCUSDT", Asset::new("BTC", "BTC"), Asset::new("USDT", "USDT"));
    market.precision.amount = precision_from_digits(3);
    market.precision.price = Some(dec!(0.5));
    market
}

/// Every adapter wired to the same scripted transport, without credentials.
fn read_only_connectors(mock: &MockRest) -> Vec<Box<dyn ExchangeConnector>> {
    let config = |url: &str| ExchangeConfig::read_only().base_url(url.to_string());
    vec![
        Box::new(
            kraken::KrakenBuilder::new()
                .with_config(config("https://kraken.test"))
                .build_with_client(mock.clone()),
        ),
        Box::new(
            lbank::LbankBuilder::new()
                .with_config(config("https://lbank.test"))
                .build_with_client(mock.clone()),
        ),
        Box::new(
            hitbtc::HitbtcBuilder::new()
                .with_config(config("https://hitbtc.test/api/3"))
                .build_with_client(mock.clone()),
        ),
        Box::new(
            novadax::NovadaxBuilder::new()
                .with_config(config("https://novadax.test"))
                .build_with_client(mock.clone()),
        ),
    ]
}

#[test]
fn test_precision_formats_on_the_market_grid() {
    let market = btc_usdt();
    assert_eq!(amount_to_precision(&market, dec!(1.23456)).unwrap(), "1.234");
    assert_eq!(price_to_precision(&market, dec!(27000.26)), "27000.5");
    assert_eq!(price_to_precision(&market, dec!(27000.24)), "27000");
    assert_eq!(cost_to_precision(&market, dec!(10.99)), "10.5");

    // a formatted value survives a second pass unchanged
    let once = amount_to_precision(&market, dec!(0.98765)).unwrap();
    let twice = amount_to_precision(&market, once.parse().unwrap()).unwrap();
    assert_eq!(once, twice);
}

#[test]
fn test_amount_below_the_step_is_an_invalid_order() {
    let market = btc_usdt();
    assert!(matches!(
        amount_to_precision(&market, dec!(0.0004)),
        Err(ExchangeError::InvalidOrder(_))
    ));
    assert_eq!(amount_to_precision(&market, dec!(0)).unwrap(), "0");
}

#[test]
fn test_balances_keep_total_equal_to_free_plus_used() {
    let mut balances = Balances::new(json!({}));
    balances.insert(
        "BTC",
        Balance {
            free: Some(dec!(0.75)),
            used: Some(dec!(0.25)),
            total: None,
        },
    );
    balances.insert(
        "USDT",
        Balance {
            free: None,
            used: Some(dec!(40)),
            total: Some(dec!(100)),
        },
    );
    for balance in balances.currencies.values() {
        assert_eq!(balance.total, Some(balance.free.unwrap() + balance.used.unwrap()));
    }
}

#[test]
fn test_unknown_statuses_are_carried_verbatim() {
    let table = [("NEW", OrderStatus::Open), ("FILLED", OrderStatus::Closed)];
    assert_eq!(OrderStatus::from_table("FILLED", &table), OrderStatus::Closed);
    let unknown = OrderStatus::from_table("HALTED", &table);
    assert!(!unknown.is_unified());
    assert_eq!(unknown.as_str(), "HALTED");
    assert_eq!(serde_json::to_value(OrderStatus::Canceled).unwrap(), json!("canceled"));

    let pending = TransactionStatus::from_table("PENDING", &[("PENDING", TransactionStatus::Pending)]);
    assert_eq!(pending.as_str(), "pending");
}

#[test]
fn test_error_kinds_round_trip_and_retry_policy() {
    for kind in [
        ErrorKind::Authentication,
        ErrorKind::InsufficientFunds,
        ErrorKind::OrderNotFound,
        ErrorKind::RateLimitExceeded,
        ErrorKind::OnMaintenance,
    ] {
        assert_eq!(kind.into_error("x").kind(), kind);
    }
    assert!(ExchangeError::RateLimitExceeded("slow down".into()).is_retryable());
    assert!(ExchangeError::RequestTimeout("timeout".into()).is_retryable());
    assert!(!ExchangeError::InsufficientFunds("broke".into()).is_retryable());
    assert!(!ExchangeError::InvalidOrder("bad".into()).is_retryable());
    assert!(ExchangeError::InvalidNonce("nonce".into()).is_authentication());
}

#[tokio::test]
async fn test_private_calls_without_credentials_fail_before_sending() {
    let mock = MockRest::new();
    mock.get("public/Assets", json!({"error": [], "result": {}}));
    mock.get("public/AssetPairs", json!({"error": [], "result": {}}));
    mock.get("public/symbol", json!({}));
    mock.get("public/currency", json!({}));
    mock.get("common/symbols", json!({"code": "A10000", "data": [], "message": "Success"}));

    for connector in read_only_connectors(&mock) {
        let err = connector.fetch_balance().await.unwrap_err();
        assert!(
            matches!(err, ExchangeError::Authentication(_)),
            "{} returned {:?}",
            connector.descriptor().id,
            err
        );
    }
    assert!(mock.requests().iter().all(|r| r.method == reqwest::Method::GET));
}

#[tokio::test]
async fn test_concurrent_market_loads_agree() {
    let mock = MockRest::new();
    mock.get(
        "common/symbols",
        json!({"code": "A10000", "message": "Success", "data": [{
            "symbol": "ETH_BRL", "baseCurrency": "ETH", "quoteCurrency": "BRL",
            "amountPrecision": 4, "pricePrecision": 2, "status": "ONLINE"
        }]}),
    );
    let connector = novadax::NovadaxBuilder::new()
        .with_base_url("https://novadax.test".to_string())
        .build_with_client(mock.clone());

    let loads = futures::future::join_all((0..4).map(|_| connector.load_markets(false))).await;
    for markets in loads {
        let markets = markets.unwrap();
        assert_eq!(markets.len(), 1);
        assert_eq!(markets[0].symbol(), "ETH/BRL");
    }
    assert!(!mock.requests_to("common/symbols").is_empty());
}
