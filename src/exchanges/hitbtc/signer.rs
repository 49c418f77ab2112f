use crate::core::kernel::signer::{hmac_sha256, urlencode, with_query, Credentials, Encoding};
use crate::core::kernel::{HttpRequest, NonceGenerator, RequestParts, SignatureResult, Signer};
use crate::exchanges::hitbtc::types::SIGNED_PATH_PREFIX;
use base64::{engine::general_purpose, Engine as _};
use reqwest::Method;
use serde_json::Value;

const JSON_CONTENT_TYPE: &str = "application/json";

/// GET and DELETE carry their parameters in the query string, everything
/// else in a JSON body.
pub fn uses_query(method: &Method) -> bool {
    *method == Method::GET || *method == Method::DELETE
}

/// HS256 request signer for the v3 API.
pub struct HitbtcSigner {
    credentials: Credentials,
    nonces: NonceGenerator,
}

impl HitbtcSigner {
    pub fn new(api_key: String, secret_key: String) -> Self {
        Self {
            credentials: Credentials::new(api_key, secret_key),
            nonces: NonceGenerator::new(),
        }
    }

    pub fn sign_with(&self, request: &RequestParts, timestamp: i64) -> SignatureResult {
        let (api_key, secret) = self.credentials.require("hitbtc")?;
        let timestamp = timestamp.to_string();
        let url = format!("{}/{}", request.base_url, request.path);

        let mut payload = format!("{}{}{}", request.method.as_str(), SIGNED_PATH_PREFIX, request.path);
        let mut signed = if uses_query(&request.method) {
            if !request.params.is_empty() {
                payload.push('?');
                payload.push_str(&urlencode(&request.params));
            }
            HttpRequest::new(request.method.clone(), with_query(url, &request.params))
        } else {
            let body = Value::Object(request.params.clone()).to_string();
            payload.push_str(&body);
            HttpRequest::new(request.method.clone(), url).body(body)
        };
        payload.push_str(&timestamp);

        let signature = hmac_sha256(secret.as_bytes(), payload.as_bytes(), Encoding::Hex)?;
        let token = general_purpose::STANDARD.encode(format!("{}:{}:{}", api_key, signature, timestamp));
        signed = signed
            .header("Authorization", format!("HS256 {}", token))
            .header("Content-Type", JSON_CONTENT_TYPE);
        Ok(signed)
    }
}

impl Signer for HitbtcSigner {
    fn sign_request(&self, request: &RequestParts, nonce: i64) -> SignatureResult {
        self.sign_with(request, nonce)
    }

    fn nonces(&self) -> &NonceGenerator {
        &self.nonces
    }
}
