pub mod conversions;
pub mod errors;
pub mod requests;
pub mod signer;
pub mod types;

pub mod builder;
pub mod connector;
pub mod rest;

// Re-export main components
pub use builder::{build_connector, KrakenBuilder};
pub use connector::{Account, KrakenConnector, MarketData, Trading};
pub use rest::KrakenRest;
pub use signer::KrakenSigner;
pub use types::kraken_descriptor;
