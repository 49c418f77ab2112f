mod common;

use base64::engine::general_purpose;
use base64::Engine;
use common::{json_body, MockRest};
use hmac::{Hmac, Mac};
use reqwest::Method;
use rust_decimal_macros::dec;
use serde_json::json;
use sha2::Sha256;
use unifiedx::core::errors::ExchangeError;
use unifiedx::core::traits::{MarketDataSource, OrderPlacer};
use unifiedx::core::types::{OrderRequest, OrderSide, OrderStatus};
use unifiedx::exchanges::hitbtc::{HitbtcBuilder, HitbtcConnector};

const ROOT: &str = "https://hitbtc.test/api/3";

fn script_markets(mock: &MockRest) {
    mock.get(
        "public/symbol",
        json!({
            "ETHBTC": {
                "type": "spot", "base_currency": "ETH", "quote_currency": "BTC",
                "quantity_increment": "0.001", "tick_size": "0.000001",
                "take_rate": "0.0025", "make_rate": "0.001", "margin_trading": true,
                "max_initial_leverage": "10"
            },
            "BTCUSDT_PERP": {
                "type": "futures", "underlying": "BTC", "base_currency": "BTC", "quote_currency": "USDT",
                "fee_currency": "USDT", "quantity_increment": "0.0001", "tick_size": "0.1",
                "max_initial_leverage": "100"
            }
        }),
    );
    mock.get(
        "public/currency",
        json!({
            "ETH": {"full_name": "Ethereum", "payin_enabled": true, "payout_enabled": true, "networks": []},
            "BTC": {"full_name": "Bitcoin", "payin_enabled": true, "payout_enabled": true, "networks": []},
            "USDT": {"full_name": "Tether", "payin_enabled": true, "payout_enabled": true, "networks": []}
        }),
    );
}

fn connector(mock: &MockRest) -> HitbtcConnector<MockRest> {
    HitbtcBuilder::new()
        .with_base_url(ROOT.to_string())
        .with_credentials("apikey".to_string(), "secret".to_string())
        .build_with_client(mock.clone())
}

#[tokio::test]
async fn test_hitbtc_markets_cover_spot_and_perpetuals() {
    let mock = MockRest::new();
    script_markets(&mock);
    let hitbtc = connector(&mock);

    let markets = hitbtc.load_markets(false).await.unwrap();
    let symbols: Vec<&str> = markets.iter().map(|m| m.symbol()).collect();
    assert_eq!(symbols, ["BTC/USDT:USDT", "ETH/BTC"]);
    let eth_btc = markets.iter().find(|m| m.symbol() == "ETH/BTC").unwrap();
    assert_eq!(eth_btc.precision.amount, Some(dec!(0.001)));
    assert_eq!(eth_btc.taker, Some(dec!(0.0025)));
}

#[tokio::test]
async fn test_hitbtc_order_body_is_signed_with_hs256() {
    let mock = MockRest::new();
    script_markets(&mock);
    mock.post(
        "spot/order",
        json!({
            "id": 828680665, "client_order_id": "f4307c6e", "symbol": "ETHBTC", "side": "buy",
            "status": "new", "type": "limit", "time_in_force": "GTC", "quantity": "2",
            "quantity_cumulative": "0", "price": "0.05", "post_only": false,
            "created_at": "2021-06-01T00:00:00.000Z", "updated_at": "2021-06-01T00:00:00.000Z"
        }),
    );
    let hitbtc = connector(&mock);

    let order = hitbtc
        .create_order(OrderRequest::limit("ETH/BTC", OrderSide::Buy, dec!(2), dec!(0.05)))
        .await
        .unwrap();
    assert_eq!(order.id, "f4307c6e");
    assert_eq!(order.status, Some(OrderStatus::Open));

    let request = mock.last_request_to("spot/order");
    assert_eq!(request.method, Method::POST);
    assert_eq!(request.url, format!("{}/spot/order", ROOT));
    let body = json_body(&request);
    assert_eq!(body["symbol"], "ETHBTC");
    assert_eq!(body["side"], "buy");
    assert_eq!(body["type"], "limit");
    assert_eq!(body["quantity"], "2");
    assert_eq!(body["price"], "0.05");

    let token = request
        .headers
        .get("Authorization")
        .and_then(|h| h.strip_prefix("HS256 "))
        .unwrap();
    let decoded = String::from_utf8(general_purpose::STANDARD.decode(token).unwrap()).unwrap();
    let parts: Vec<&str> = decoded.split(':').collect();
    assert_eq!(parts[0], "apikey");

    let payload = format!("POST/api/3/spot/order{}{}", request.body.as_deref().unwrap(), parts[2]);
    let mut mac = Hmac::<Sha256>::new_from_slice(b"secret").unwrap();
    mac.update(payload.as_bytes());
    assert_eq!(parts[1], hex::encode(mac.finalize().into_bytes()));
}

#[tokio::test]
async fn test_hitbtc_cancel_uses_delete_on_the_order_path() {
    let mock = MockRest::new();
    script_markets(&mock);
    mock.on(
        Method::DELETE,
        "spot/order/f4307c6e",
        200,
        json!({"client_order_id": "f4307c6e", "symbol": "ETHBTC", "status": "canceled"}).to_string(),
    );
    let hitbtc = connector(&mock);

    let order = hitbtc.cancel_order("f4307c6e", Some("ETH/BTC")).await.unwrap();
    assert_eq!(order.status, Some(OrderStatus::Canceled));
    let request = mock.last_request_to("spot/order/f4307c6e");
    assert_eq!(request.method, Method::DELETE);
    assert!(request.body.is_none());
}

#[tokio::test]
async fn test_hitbtc_error_envelope_is_classified() {
    let mock = MockRest::new();
    script_markets(&mock);
    mock.on(
        Method::POST,
        "spot/order",
        400,
        r#"{"error":{"code":20001,"message":"Insufficient funds","description":"Check that the funds are sufficient"}}"#,
    );
    let hitbtc = connector(&mock);

    let err = hitbtc
        .create_order(OrderRequest::limit("ETH/BTC", OrderSide::Buy, dec!(2), dec!(0.05)))
        .await
        .unwrap_err();
    assert!(matches!(err, ExchangeError::InsufficientFunds(_)));
}

#[tokio::test]
async fn test_hitbtc_reduce_only_spot_order_is_rejected() {
    let mock = MockRest::new();
    script_markets(&mock);
    let hitbtc = connector(&mock);

    let mut order = OrderRequest::limit("ETH/BTC", OrderSide::Sell, dec!(1), dec!(0.05));
    order.params.reduce_only = Some(true);
    let err = hitbtc.create_order(order).await.unwrap_err();
    assert!(matches!(err, ExchangeError::InvalidOrder(_)));
    assert!(mock.requests_to("spot/order").is_empty());
}
