//! Exchange-agnostic transport and protocol plumbing.
//!
//! - [`RestClient`]: the HTTP seam. [`ReqwestRest`] is the production
//!   implementation; tests substitute a scripted client.
//! - [`Signer`]: per-exchange authentication over [`RequestParts`], plus the
//!   typed HMAC, MD5 pre-hash and RSA helpers the signers are built from.
//! - [`ErrorClassifier`]: exact and substring error tables with a
//!   per-exchange precedence and the shared HTTP status table.
//!
//! Nothing in here knows about a specific exchange.
//!
//! ```rust,no_run
//! use unifiedx::core::kernel::{HttpRequest, ReqwestRest, RestClient};
//! use reqwest::Method;
//!
//! # async fn example() -> Result<(), unifiedx::ExchangeError> {
//! let rest = ReqwestRest::new("kraken".to_string(), 1000)?;
//! let response = rest
//!     .send(HttpRequest::new(Method::GET, "https://api.kraken.com/0/public/Time"))
//!     .await?;
//! let _time = response.json()?;
//! # Ok(())
//! # }
//! ```
pub mod classifier;
pub mod rest;
pub mod signer;

pub use classifier::{ErrorClassifier, MatchOrder};
pub use rest::{HttpRequest, HttpResponse, ReqwestRest, RestClient, RestClientBuilder, RestClientConfig};
pub use signer::{
    Credentials, Encoding, NonceGenerator, PemCache, RequestParts, SignatureResult, SignedRequest,
    Signer,
};
