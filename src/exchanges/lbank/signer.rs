use crate::core::errors::ExchangeError;
use crate::core::kernel::signer::{
    hmac_sha256, md5_upper_hex, parse_rsa_key, random_alphanumeric, rawencode, rsa_sha256_base64,
    secret_to_pem, urlencode, Credentials, Encoding, PemCache,
};
use crate::core::kernel::{HttpRequest, NonceGenerator, RequestParts, SignatureResult, Signer};
use crate::exchanges::lbank::types::{API_VERSION, ECHOSTR_LEN};
use reqwest::Method;
use serde_json::Value;

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Secrets longer than this are RSA private keys, shorter ones HMAC keys.
const HMAC_SECRET_MAX_LEN: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureMethod {
    Rsa,
    HmacSha256,
}

impl SignatureMethod {
    pub fn for_secret(secret: &str) -> Self {
        if secret.len() > HMAC_SECRET_MAX_LEN {
            Self::Rsa
        } else {
            Self::HmacSha256
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Rsa => "RSA",
            Self::HmacSha256 => "HmacSHA256",
        }
    }
}

/// Signs private LBank calls with either an RSA key or an HMAC secret,
/// chosen by the length of the secret.
pub struct LbankSigner {
    credentials: Credentials,
    nonces: NonceGenerator,
    pem: PemCache,
    cache_pem: bool,
}

impl LbankSigner {
    pub fn new(api_key: String, secret_key: String, cache_pem: bool) -> Self {
        Self {
            credentials: Credentials::new(api_key, secret_key),
            nonces: NonceGenerator::new(),
            pem: PemCache::new(),
            cache_pem,
        }
    }

    fn sign_digest(&self, method: SignatureMethod, secret: &str, digest: &str) -> Result<String, ExchangeError> {
        match method {
            SignatureMethod::Rsa if self.cache_pem => {
                rsa_sha256_base64(self.pem.get_or_parse(secret)?, digest.as_bytes())
            }
            SignatureMethod::Rsa => {
                let key = parse_rsa_key(&secret_to_pem(secret))?;
                rsa_sha256_base64(&key, digest.as_bytes())
            }
            SignatureMethod::HmacSha256 => hmac_sha256(secret.as_bytes(), digest.as_bytes(), Encoding::Hex),
        }
    }

    /// Sign with an explicit timestamp and echo string.
    pub fn sign_with(&self, request: &RequestParts, timestamp: i64, echostr: &str) -> SignatureResult {
        let (api_key, secret) = self.credentials.require("lbank")?;
        let method = SignatureMethod::for_secret(secret);
        let timestamp = timestamp.to_string();

        let mut query = request.params.clone();
        query.insert("api_key".to_string(), Value::String(api_key.to_string()));

        let mut auth = query.clone();
        auth.insert("echostr".to_string(), Value::String(echostr.to_string()));
        auth.insert("signature_method".to_string(), Value::String(method.as_str().to_string()));
        auth.insert("timestamp".to_string(), Value::String(timestamp.clone()));
        let digest = md5_upper_hex(rawencode(&auth).as_bytes());

        let sign = self.sign_digest(method, secret, &digest)?;
        query.insert("sign".to_string(), Value::String(sign));

        let url = format!("{}/{}/{}.do", request.base_url, API_VERSION, request.path);
        Ok(HttpRequest::new(Method::POST, url)
            .header("Content-Type", FORM_CONTENT_TYPE)
            .header("timestamp", timestamp)
            .header("signature_method", method.as_str())
            .header("echostr", echostr)
            .body(urlencode(&query)))
    }
}

impl Signer for LbankSigner {
    fn sign_request(&self, request: &RequestParts, nonce: i64) -> SignatureResult {
        self.sign_with(request, nonce, &random_alphanumeric(ECHOSTR_LEN))
    }

    fn nonces(&self) -> &NonceGenerator {
        &self.nonces
    }
}
