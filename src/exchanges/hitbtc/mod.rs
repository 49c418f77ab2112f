pub mod conversions;
pub mod errors;
pub mod requests;
pub mod signer;
pub mod types;

pub mod builder;
pub mod connector;
pub mod rest;

pub use builder::{build_connector, HitbtcBuilder};
pub use connector::{Account, HitbtcConnector, MarketData, Trading};
pub use rest::HitbtcRest;
pub use signer::HitbtcSigner;
pub use types::hitbtc_descriptor;
