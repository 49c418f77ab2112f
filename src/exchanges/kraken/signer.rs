use crate::core::errors::ExchangeError;
use crate::core::kernel::signer::{
    hmac_sha512, param_to_string, sha256_bytes, urlencode, Credentials, Encoding, SecretBytes,
};
use crate::core::kernel::{HttpRequest, NonceGenerator, RequestParts, SignatureResult, Signer};
use crate::core::types::Params;
use crate::exchanges::kraken::types::API_VERSION;
use reqwest::Method;
use serde_json::Value;

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";
const JSON_CONTENT_TYPE: &str = "application/json";

/// `API-Key` / `API-Sign` authentication for the private REST API.
pub struct KrakenSigner {
    credentials: Credentials,
    nonces: NonceGenerator,
}

impl KrakenSigner {
    pub fn new(api_key: String, secret_key: String) -> Self {
        Self {
            credentials: Credentials::new(api_key, secret_key),
            nonces: NonceGenerator::new(),
        }
    }

    /// `base64(HMAC-SHA512(base64decode(secret), path ++ SHA256(nonce ++ body)))`
    fn generate_signature(&self, secret: &str, url_path: &str, nonce: &str, body: &str) -> Result<String, ExchangeError> {
        let key = SecretBytes::from_base64(secret)?;
        let mut message = url_path.as_bytes().to_vec();
        message.extend(sha256_bytes(format!("{}{}", nonce, body).as_bytes()));
        hmac_sha512(key.as_bytes(), &message, Encoding::Base64)
    }
}

/// Batch cancels and percentage-offset trigger prices only parse as JSON.
fn wants_json_body(path: &str, params: &Params) -> bool {
    path == "CancelOrderBatch"
        || params
            .get("price")
            .map(param_to_string)
            .is_some_and(|price| price.ends_with('%'))
}

/// Flatten nested objects into `parent[child]` keys for form encoding.
pub fn flatten_nested(params: &Params) -> Params {
    let mut flat = Params::new();
    for (key, value) in params {
        match value {
            Value::Object(inner) => {
                for (child, v) in flatten_nested(inner) {
                    flat.insert(format!("{}[{}]", key, child), v);
                }
            }
            other => {
                flat.insert(key.clone(), other.clone());
            }
        }
    }
    flat
}

impl Signer for KrakenSigner {
    fn sign_request(&self, request: &RequestParts, nonce: i64) -> SignatureResult {
        let (api_key, secret) = self.credentials.require("kraken")?;

        let url_path = format!("/{}/private/{}", API_VERSION, request.path);
        let nonce = nonce.to_string();
        let json_body = wants_json_body(&request.path, &request.params);

        let body = if json_body {
            let mut payload = request.params.clone();
            payload.insert("nonce".to_string(), Value::String(nonce.clone()));
            serde_json::to_string(&payload)
                .map_err(|e| ExchangeError::Serialization(format!("Failed to encode request body: {}", e)))?
        } else {
            let encoded = urlencode(&flatten_nested(&request.params));
            if encoded.is_empty() {
                format!("nonce={}", nonce)
            } else {
                format!("nonce={}&{}", nonce, encoded)
            }
        };

        let signature = self.generate_signature(secret, &url_path, &nonce, &body)?;
        let content_type = if json_body { JSON_CONTENT_TYPE } else { FORM_CONTENT_TYPE };

        Ok(HttpRequest::new(Method::POST, format!("{}{}", request.base_url, url_path))
            .header("API-Key", api_key)
            .header("API-Sign", signature)
            .header("Content-Type", content_type)
            .body(body))
    }

    fn nonces(&self) -> &NonceGenerator {
        &self.nonces
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::engine::general_purpose;
    use base64::Engine;
    use serde_json::json;

    // Key and expected signature published in the Kraken REST authentication guide.
    const DOC_SECRET: &str =
        "kQH5HW/8p1uGOVjbgWA7FunAmGO8lsSUXNsu3eow76sz84Q18fWxnyRzBHCd3pd5nE9qa99HAZtuZuj6F1huXg==";

    fn params(value: Value) -> Params {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn matches_documented_signature() {
        let signer = KrakenSigner::new("key".into(), DOC_SECRET.into());
        let body = "nonce=1616492376594&ordertype=limit&pair=XBTUSD&price=37500&type=buy&volume=1.25";
        let signature = signer
            .generate_signature(DOC_SECRET, "/0/private/AddOrder", "1616492376594", body)
            .unwrap();
        assert_eq!(
            signature,
            "4/dpxb3iT4tp/ZCVEwSnEsLxx0bqyhLpdfOpc6fn7OR8+UClSV5n9E6aSS8MPtnRfp32bAb0nmbRn6H8ndwLUQ=="
        );
    }

    #[test]
    fn form_body_leads_with_nonce() {
        let signer = KrakenSigner::new("key".into(), DOC_SECRET.into());
        let parts = RequestParts::new(
            Method::POST,
            "https://api.kraken.com",
            "AddOrder",
            params(json!({"pair": "XBTUSD", "type": "buy", "ordertype": "limit", "price": "37500", "volume": "1.25"})),
        );
        let signed = signer.sign_request(&parts, 1_616_492_376_594).unwrap();
        assert_eq!(signed.url, "https://api.kraken.com/0/private/AddOrder");
        assert_eq!(signed.method, Method::POST);
        assert_eq!(
            signed.body.as_deref(),
            Some("nonce=1616492376594&ordertype=limit&pair=XBTUSD&price=37500&type=buy&volume=1.25")
        );
        assert_eq!(signed.headers.get("Content-Type").map(String::as_str), Some(FORM_CONTENT_TYPE));
        assert_eq!(signed.headers.get("API-Key").map(String::as_str), Some("key"));
        let sig = signed.headers.get("API-Sign").unwrap();
        assert_eq!(general_purpose::STANDARD.decode(sig).unwrap().len(), 64);
    }

    #[test]
    fn signing_is_deterministic() {
        let signer = KrakenSigner::new("key".into(), DOC_SECRET.into());
        let parts = RequestParts::new(Method::POST, "https://api.kraken.com", "Balance", Params::new());
        let a = signer.sign_request(&parts, 42).unwrap();
        let b = signer.sign_request(&parts, 42).unwrap();
        assert_eq!(a, b);
        let c = signer.sign_request(&parts, 43).unwrap();
        assert_ne!(a.headers.get("API-Sign"), c.headers.get("API-Sign"));
    }

    #[test]
    fn batch_cancel_and_percent_prices_use_json() {
        let signer = KrakenSigner::new("key".into(), DOC_SECRET.into());
        let batch = RequestParts::new(
            Method::POST,
            "https://api.kraken.com",
            "CancelOrderBatch",
            params(json!({"orders": ["A", "B"]})),
        );
        let signed = signer.sign_request(&batch, 7).unwrap();
        assert_eq!(signed.headers.get("Content-Type").map(String::as_str), Some(JSON_CONTENT_TYPE));
        let body: Value = serde_json::from_str(signed.body.as_deref().unwrap()).unwrap();
        assert_eq!(body["nonce"], "7");
        assert_eq!(body["orders"], json!(["A", "B"]));

        let trailing = RequestParts::new(
            Method::POST,
            "https://api.kraken.com",
            "AddOrder",
            params(json!({"price": "+5%"})),
        );
        let signed = signer.sign_request(&trailing, 8).unwrap();
        assert_eq!(signed.headers.get("Content-Type").map(String::as_str), Some(JSON_CONTENT_TYPE));
    }

    #[test]
    fn nested_close_order_is_flattened() {
        let flat = flatten_nested(&params(json!({
            "pair": "XBTUSD",
            "close": {"ordertype": "limit", "price": "30000"}
        })));
        assert_eq!(flat.get("close[ordertype]"), Some(&json!("limit")));
        assert_eq!(flat.get("close[price]"), Some(&json!("30000")));
        assert!(!flat.contains_key("close"));
    }

    #[test]
    fn missing_credentials_fail_before_signing() {
        let signer = KrakenSigner::new(String::new(), String::new());
        let parts = RequestParts::new(Method::POST, "https://api.kraken.com", "Balance", Params::new());
        assert!(matches!(
            signer.sign_request(&parts, 1),
            Err(ExchangeError::Authentication(_))
        ));
    }
}
