use crate::core::kernel::signer::{hmac_sha256, md5_hex, urlencode, with_query, Credentials, Encoding};
use crate::core::kernel::{HttpRequest, NonceGenerator, RequestParts, SignatureResult, Signer};
use crate::exchanges::novadax::types::API_VERSION;
use reqwest::Method;
use serde_json::Value;

/// Signs `METHOD\n/v1/{path}\n{query or body md5}\n{timestamp}` with
/// HMAC-SHA256.
pub struct NovadaxSigner {
    credentials: Credentials,
    nonces: NonceGenerator,
}

impl NovadaxSigner {
    pub fn new(api_key: String, secret_key: String) -> Self {
        Self {
            credentials: Credentials::new(api_key, secret_key),
            nonces: NonceGenerator::new(),
        }
    }

    pub fn sign_with(&self, request: &RequestParts, timestamp: i64) -> SignatureResult {
        let (api_key, secret) = self.credentials.require("novadax")?;
        let timestamp = timestamp.to_string();
        let path = format!("/{}/{}", API_VERSION, request.path);
        let url = format!("{}{}", request.base_url, path);

        let (signed, query) = if request.method == Method::POST {
            let body = Value::Object(request.params.clone()).to_string();
            let digest = md5_hex(body.as_bytes());
            let signed = HttpRequest::new(Method::POST, url)
                .header("Content-Type", "application/json")
                .body(body);
            (signed, digest)
        } else {
            let query = urlencode(&request.params);
            let signed = HttpRequest::new(request.method.clone(), with_query(url, &request.params));
            (signed, query)
        };

        let auth = format!("{}\n{}\n{}\n{}", request.method.as_str(), path, query, timestamp);
        let signature = hmac_sha256(secret.as_bytes(), auth.as_bytes(), Encoding::Hex)?;
        Ok(signed
            .header("X-Nova-Access-Key", api_key)
            .header("X-Nova-Timestamp", timestamp)
            .header("X-Nova-Signature", signature))
    }
}

impl Signer for NovadaxSigner {
    fn sign_request(&self, request: &RequestParts, nonce: i64) -> SignatureResult {
        self.sign_with(request, nonce)
    }

    fn nonces(&self) -> &NonceGenerator {
        &self.nonces
    }
}
