mod common;

use common::{form_value, MockRest};
use rust_decimal_macros::dec;
use serde_json::json;
use unifiedx::core::errors::ExchangeError;
use unifiedx::core::traits::{MarketDataSource, OrderPlacer};
use unifiedx::core::types::{OrderRequest, OrderSide};
use unifiedx::exchanges::lbank::{LbankBuilder, LbankConnector};

fn script_markets(mock: &MockRest) {
    mock.get(
        "v2/accuracy.do",
        json!({"result": "true", "error_code": 0, "ts": 1_700_000_000_000_i64, "data": [
            {"symbol": "eth_btc", "quantityAccuracy": "4", "priceAccuracy": "6", "minTranQua": "0.001"}
        ]}),
    );
    mock.get(
        "pub/instrument",
        json!({"result": true, "error_code": 0, "data": [{
            "symbol": "BTCUSDT", "baseCurrency": "BTC", "clearCurrency": "USDT",
            "volumeMultiple": "0.0001", "volumeTick": "0.0001", "priceTick": "0.1",
            "minOrderVolume": "0.0001", "maxOrderVolume": "30", "minOrderCost": "5"
        }]}),
    );
}

fn connector(mock: &MockRest) -> LbankConnector<MockRest> {
    LbankBuilder::new()
        .with_base_url("https://lbank.test".to_string())
        .with_credentials("apikey".to_string(), "secret".to_string())
        .build_with_client(mock.clone())
}

#[tokio::test]
async fn test_lbank_loads_spot_and_swap_markets() {
    let mock = MockRest::new();
    script_markets(&mock);
    let lbank = connector(&mock);

    let markets = lbank.load_markets(false).await.unwrap();
    let symbols: Vec<&str> = markets.iter().map(|m| m.symbol()).collect();
    assert_eq!(symbols, ["BTC/USDT:USDT", "ETH/BTC"]);
}

#[tokio::test]
async fn test_lbank_spot_ticker() {
    let mock = MockRest::new();
    script_markets(&mock);
    mock.get(
        "ticker/24hr.do",
        json!({"result": "true", "error_code": 0, "data": [{
            "symbol": "eth_btc", "timestamp": 1_700_000_000_000_i64,
            "ticker": {"high": "0.06", "low": "0.05", "latest": "0.055", "change": "2.5", "vol": "100", "turnover": "5.5"}
        }]}),
    );
    let lbank = connector(&mock);

    let ticker = lbank.fetch_ticker("ETH/BTC").await.unwrap();
    assert_eq!(ticker.last, Some(dec!(0.055)));
    assert_eq!(ticker.timestamp, Some(1_700_000_000_000));
}

#[tokio::test]
async fn test_lbank_market_buy_without_price_is_rejected_before_sending() {
    let mock = MockRest::new();
    script_markets(&mock);
    let lbank = connector(&mock);

    let err = lbank
        .create_order(OrderRequest::market("ETH/BTC", OrderSide::Buy, dec!(2)))
        .await
        .unwrap_err();
    assert!(matches!(err, ExchangeError::InvalidOrder(_)));
    assert!(mock.requests_to("create_order").is_empty());
}

#[tokio::test]
async fn test_lbank_market_buy_sends_quote_cost_as_price() {
    let mock = MockRest::new();
    script_markets(&mock);
    mock.post(
        "supplement/create_order.do",
        json!({"result": "true", "error_code": 0, "ts": 1_700_000_000_000_i64, "data": {"order_id": "abc-123"}}),
    );
    let lbank = connector(&mock);

    let mut order = OrderRequest::market("ETH/BTC", OrderSide::Buy, dec!(2));
    order.price = Some(dec!(0.05));
    let created = lbank.create_order(order).await.unwrap();
    assert_eq!(created.id, "abc-123");

    let request = mock.last_request_to("supplement/create_order.do");
    assert_eq!(request.url, "https://lbank.test/v2/supplement/create_order.do");
    let body = request.body.unwrap();
    assert_eq!(form_value(&body, "type").as_deref(), Some("buy_market"));
    assert_eq!(form_value(&body, "price").as_deref(), Some("0.1"));
    assert_eq!(form_value(&body, "symbol").as_deref(), Some("eth_btc"));
    assert_eq!(form_value(&body, "api_key").as_deref(), Some("apikey"));
    assert!(form_value(&body, "sign").is_some());
    assert!(form_value(&body, "echostr").is_none());
    assert_eq!(
        request.headers.get("signature_method").map(String::as_str),
        Some("HmacSHA256")
    );
    assert_eq!(request.headers.get("echostr").map(String::len), Some(38));
}

#[tokio::test]
async fn test_lbank_error_code_maps_to_kind() {
    let mock = MockRest::new();
    script_markets(&mock);
    mock.post(
        "supplement/create_order.do",
        json!({"result": "false", "error_code": 10014, "ts": 1_700_000_000_000_i64}),
    );
    let lbank = connector(&mock);

    let err = lbank
        .create_order(OrderRequest::limit("ETH/BTC", OrderSide::Buy, dec!(1), dec!(0.05)))
        .await
        .unwrap_err();
    match err {
        ExchangeError::InsufficientFunds(message) => assert!(message.contains("10014")),
        other => panic!("unexpected {:?}", other),
    }
}
