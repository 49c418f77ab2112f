use crate::core::errors::{ErrorKind, ExchangeError};
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::env;

/// API credentials and connection overrides for one exchange account.
#[derive(Debug, Clone)]
pub struct ExchangeConfig {
    pub api_key: Secret<String>,
    pub secret_key: Secret<String>,
    /// Passphrase for venues that issue one alongside the key pair.
    pub password: Option<Secret<String>>,
    pub testnet: bool,
    pub base_url: Option<String>,
}

// Secrets never leave the process through serialization
impl Serialize for ExchangeConfig {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        use serde::ser::SerializeStruct;
        let mut state = serializer.serialize_struct("ExchangeConfig", 5)?;
        state.serialize_field("api_key", "[REDACTED]")?;
        state.serialize_field("secret_key", "[REDACTED]")?;
        state.serialize_field("password", &self.password.as_ref().map(|_| "[REDACTED]"))?;
        state.serialize_field("testnet", &self.testnet)?;
        state.serialize_field("base_url", &self.base_url)?;
        state.end()
    }
}

impl<'de> Deserialize<'de> for ExchangeConfig {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct Raw {
            api_key: String,
            secret_key: String,
            #[serde(default)]
            password: Option<String>,
            #[serde(default)]
            testnet: bool,
            #[serde(default)]
            base_url: Option<String>,
        }

        let raw = Raw::deserialize(deserializer)?;
        Ok(Self {
            api_key: Secret::new(raw.api_key),
            secret_key: Secret::new(raw.secret_key),
            password: raw.password.map(Secret::new),
            testnet: raw.testnet,
            base_url: raw.base_url,
        })
    }
}

impl ExchangeConfig {
    #[must_use]
    pub fn new(api_key: String, secret_key: String) -> Self {
        Self {
            api_key: Secret::new(api_key),
            secret_key: Secret::new(secret_key),
            password: None,
            testnet: false,
            base_url: None,
        }
    }

    /// Read credentials from the environment.
    ///
    /// Expected variables, for a prefix such as `KRAKEN`:
    /// - `KRAKEN_API_KEY`
    /// - `KRAKEN_SECRET_KEY`
    /// - `KRAKEN_PASSWORD` (optional)
    /// - `KRAKEN_TESTNET` (optional, defaults to false)
    /// - `KRAKEN_BASE_URL` (optional)
    pub fn from_env(exchange_prefix: &str) -> Result<Self, ConfigError> {
        let prefix = exchange_prefix.to_uppercase();
        let required = |suffix: &str| {
            let name = format!("{}_{}", prefix, suffix);
            env::var(&name).map_err(|_| ConfigError::MissingEnvironmentVariable(name))
        };
        let optional = |suffix: &str| env::var(format!("{}_{}", prefix, suffix)).ok();

        Ok(Self {
            api_key: Secret::new(required("API_KEY")?),
            secret_key: Secret::new(required("SECRET_KEY")?),
            password: optional("PASSWORD").map(Secret::new),
            testnet: optional("TESTNET")
                .and_then(|v| v.parse::<bool>().ok())
                .unwrap_or(false),
            base_url: optional("BASE_URL"),
        })
    }

    /// Load `.env` (if present) and then read the environment.
    ///
    /// **Security Warning**: keep `.env` files out of version control.
    #[cfg(feature = "env-file")]
    pub fn from_env_file(exchange_prefix: &str) -> Result<Self, ConfigError> {
        Self::from_env_file_with_path(exchange_prefix, ".env")
    }

    #[cfg(feature = "env-file")]
    pub fn from_env_file_with_path(
        exchange_prefix: &str,
        env_file_path: &str,
    ) -> Result<Self, ConfigError> {
        load_env_file(env_file_path)?;
        Self::from_env(exchange_prefix)
    }

    /// Load the first env file found among `.env.local`,
    /// `.env.{ENVIRONMENT}` and `.env`, then read the environment.
    #[cfg(feature = "env-file")]
    pub fn from_env_auto(exchange_prefix: &str) -> Result<Self, ConfigError> {
        let environment = env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());
        let candidates = [
            ".env.local".to_string(),
            format!(".env.{}", environment),
            ".env".to_string(),
        ];
        for path in &candidates {
            if load_env_file(path)? {
                break;
            }
        }
        Self::from_env(exchange_prefix)
    }

    /// Configuration for public endpoints only.
    #[must_use]
    pub fn read_only() -> Self {
        Self::new(String::new(), String::new())
    }

    #[must_use]
    pub fn has_credentials(&self) -> bool {
        !self.api_key.expose_secret().is_empty() && !self.secret_key.expose_secret().is_empty()
    }

    #[must_use]
    pub const fn testnet(mut self, testnet: bool) -> Self {
        self.testnet = testnet;
        self
    }

    #[must_use]
    pub fn base_url(mut self, base_url: String) -> Self {
        self.base_url = Some(base_url);
        self
    }

    #[must_use]
    pub fn password(mut self, password: String) -> Self {
        self.password = Some(Secret::new(password));
        self
    }

    /// Get API key (use carefully - exposes secret)
    pub fn api_key(&self) -> &str {
        self.api_key.expose_secret()
    }

    /// Get secret key (use carefully - exposes secret)
    pub fn secret_key(&self) -> &str {
        self.secret_key.expose_secret()
    }
}

/// Returns whether the file existed. A missing file is not an error.
#[cfg(feature = "env-file")]
fn load_env_file(path: &str) -> Result<bool, ConfigError> {
    match dotenv::from_path(path) {
        Ok(()) => Ok(true),
        Err(dotenv::Error::Io(io_err)) if io_err.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(ConfigError::InvalidConfiguration(format!(
            "Failed to load .env file '{}': {}",
            path, e
        ))),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvironmentVariable(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

/// Deep merge of an overlay onto a base value. Maps merge key-wise with the
/// overlay winning, options take the overlay when it is set, records recurse.
pub trait Merge<Overlay = Self> {
    fn merge(&mut self, overlay: Overlay);

    fn merged(mut self, overlay: Overlay) -> Self
    where
        Self: Sized,
    {
        self.merge(overlay);
        self
    }
}

impl<K: Ord, V> Merge for BTreeMap<K, V> {
    fn merge(&mut self, overlay: Self) {
        self.extend(overlay);
    }
}

impl<T> Merge for Option<T> {
    fn merge(&mut self, overlay: Self) {
        if overlay.is_some() {
            *self = overlay;
        }
    }
}

/// Unified operations an adapter may expose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Capability {
    FetchMarkets,
    FetchCurrencies,
    FetchTicker,
    FetchTickers,
    FetchOrderBook,
    FetchTrades,
    FetchOhlcv,
    FetchTime,
    FetchStatus,
    CreateOrder,
    EditOrder,
    CancelOrder,
    CancelOrders,
    CancelAllOrders,
    CancelAllOrdersAfter,
    FetchOrder,
    FetchOpenOrders,
    FetchClosedOrders,
    FetchMyTrades,
    FetchBalance,
    FetchDeposits,
    FetchWithdrawals,
    FetchDepositAddress,
    Withdraw,
    Transfer,
    FetchLedger,
    FetchPositions,
    FetchDepositWithdrawFees,
    FetchFundingRate,
    FetchFundingRates,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Support {
    Yes,
    No,
    /// Provided by the adapter on top of other endpoints.
    Emulated,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TradingFees {
    pub taker: Option<Decimal>,
    pub maker: Option<Decimal>,
}

impl Merge for TradingFees {
    fn merge(&mut self, overlay: Self) {
        self.taker.merge(overlay.taker);
        self.maker.merge(overlay.maker);
    }
}

/// Typed adapter switches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdapterOptions {
    /// Market buys are sized in quote currency and need a price to compute it.
    pub create_market_buy_order_requires_price: bool,
    /// Derive the RSA PEM from the secret once per signer.
    pub cache_secret_as_pem: bool,
    /// Offset the nonce clock by the measured server time difference.
    pub adjust_for_time_difference: bool,
    /// Unified network code to exchange network id.
    pub networks: BTreeMap<String, String>,
    pub networks_by_id: BTreeMap<String, String>,
    /// Unified account name to exchange account id.
    pub accounts_by_type: BTreeMap<String, String>,
    pub default_network: Option<String>,
    pub ohlcv_page_size: usize,
}

impl Default for AdapterOptions {
    fn default() -> Self {
        Self {
            create_market_buy_order_requires_price: false,
            cache_secret_as_pem: false,
            adjust_for_time_difference: false,
            networks: BTreeMap::new(),
            networks_by_id: BTreeMap::new(),
            accounts_by_type: BTreeMap::new(),
            default_network: None,
            ohlcv_page_size: 1000,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct AdapterOptionsPatch {
    pub create_market_buy_order_requires_price: Option<bool>,
    pub cache_secret_as_pem: Option<bool>,
    pub adjust_for_time_difference: Option<bool>,
    pub networks: BTreeMap<String, String>,
    pub networks_by_id: BTreeMap<String, String>,
    pub accounts_by_type: BTreeMap<String, String>,
    pub default_network: Option<String>,
    pub ohlcv_page_size: Option<usize>,
}

impl Merge<AdapterOptionsPatch> for AdapterOptions {
    fn merge(&mut self, overlay: AdapterOptionsPatch) {
        if let Some(v) = overlay.create_market_buy_order_requires_price {
            self.create_market_buy_order_requires_price = v;
        }
        if let Some(v) = overlay.cache_secret_as_pem {
            self.cache_secret_as_pem = v;
        }
        if let Some(v) = overlay.adjust_for_time_difference {
            self.adjust_for_time_difference = v;
        }
        self.networks.merge(overlay.networks);
        self.networks_by_id.merge(overlay.networks_by_id);
        self.accounts_by_type.merge(overlay.accounts_by_type);
        self.default_network.merge(overlay.default_network);
        if let Some(v) = overlay.ohlcv_page_size {
            self.ohlcv_page_size = v;
        }
    }
}

/// Static description of an exchange: identity, endpoints, capabilities
/// and the alias and error tables shared by its adapter.
#[derive(Debug, Clone)]
pub struct ExchangeDescriptor {
    pub id: String,
    pub name: String,
    pub version: Option<String>,
    pub rate_limit_ms: u64,
    pub has: BTreeMap<Capability, Support>,
    /// Unified timeframe to native interval.
    pub timeframes: BTreeMap<String, String>,
    pub urls: BTreeMap<String, String>,
    pub fees: TradingFees,
    pub common_currencies: BTreeMap<String, String>,
    pub http_exceptions: BTreeMap<u16, ErrorKind>,
    pub options: AdapterOptions,
}

/// Per-exchange overlay merged onto [`ExchangeDescriptor::base`].
#[derive(Debug, Clone, Default)]
pub struct DescriptorPatch {
    pub id: Option<String>,
    pub name: Option<String>,
    pub version: Option<String>,
    pub rate_limit_ms: Option<u64>,
    pub has: BTreeMap<Capability, Support>,
    pub timeframes: BTreeMap<String, String>,
    pub urls: BTreeMap<String, String>,
    pub fees: TradingFees,
    pub common_currencies: BTreeMap<String, String>,
    pub http_exceptions: BTreeMap<u16, ErrorKind>,
    pub options: AdapterOptionsPatch,
}

impl Merge<DescriptorPatch> for ExchangeDescriptor {
    fn merge(&mut self, overlay: DescriptorPatch) {
        if let Some(id) = overlay.id {
            self.id = id;
        }
        if let Some(name) = overlay.name {
            self.name = name;
        }
        self.version.merge(overlay.version);
        if let Some(rate) = overlay.rate_limit_ms {
            self.rate_limit_ms = rate;
        }
        self.has.merge(overlay.has);
        self.timeframes.merge(overlay.timeframes);
        self.urls.merge(overlay.urls);
        self.fees.merge(overlay.fees);
        self.common_currencies.merge(overlay.common_currencies);
        self.http_exceptions.merge(overlay.http_exceptions);
        self.options.merge(overlay.options);
    }
}

/// Turn a slice of string pairs into an owned map.
pub fn string_map(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect()
}

impl ExchangeDescriptor {
    /// Defaults shared by every adapter.
    pub fn base() -> Self {
        use ErrorKind::{Authentication, DDoSProtection, Exchange, ExchangeNotAvailable, RateLimitExceeded, RequestTimeout};

        let mut http_exceptions = BTreeMap::new();
        http_exceptions.insert(418, DDoSProtection);
        http_exceptions.insert(429, RateLimitExceeded);
        for status in [
            400, 403, 404, 405, 409, 410, 451, 500, 501, 502, 503, 520, 521, 522, 525, 526, 530,
        ] {
            http_exceptions.insert(status, ExchangeNotAvailable);
        }
        for status in [408, 504] {
            http_exceptions.insert(status, RequestTimeout);
        }
        for status in [401, 407, 511] {
            http_exceptions.insert(status, Authentication);
        }
        http_exceptions.insert(422, Exchange);

        Self {
            id: String::new(),
            name: String::new(),
            version: None,
            rate_limit_ms: 2000,
            has: BTreeMap::new(),
            timeframes: BTreeMap::new(),
            urls: BTreeMap::new(),
            fees: TradingFees::default(),
            common_currencies: string_map(&[("XBT", "BTC"), ("BCC", "BCH"), ("BCHSV", "BSV")]),
            http_exceptions,
            options: AdapterOptions::default(),
        }
    }

    pub fn supports(&self, capability: Capability) -> bool {
        matches!(
            self.has.get(&capability),
            Some(Support::Yes | Support::Emulated)
        )
    }

    /// Named API root, e.g. `public` or `contract`.
    pub fn url(&self, name: &str) -> Result<&str, ExchangeError> {
        self.urls.get(name).map(String::as_str).ok_or_else(|| {
            ExchangeError::Configuration(format!("{} has no '{}' url configured", self.id, name))
        })
    }

    /// Native interval for a unified timeframe.
    pub fn timeframe(&self, timeframe: &str) -> Result<&str, ExchangeError> {
        self.timeframes
            .get(timeframe)
            .map(String::as_str)
            .ok_or_else(|| {
                ExchangeError::NotSupported(format!(
                    "{} does not support the {} timeframe",
                    self.id, timeframe
                ))
            })
    }
}
