pub mod conversions;
pub mod errors;
pub mod requests;
pub mod signer;
pub mod types;

pub mod builder;
pub mod connector;
pub mod rest;

pub use builder::{build_connector, LbankBuilder};
pub use connector::{Account, LbankConnector, MarketData, Trading};
pub use rest::LbankRest;
pub use signer::LbankSigner;
pub use types::lbank_descriptor;
