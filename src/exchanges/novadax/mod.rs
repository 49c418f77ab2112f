pub mod conversions;
pub mod errors;
pub mod requests;
pub mod signer;
pub mod types;

pub mod builder;
pub mod connector;
pub mod rest;

pub use builder::{build_connector, NovadaxBuilder};
pub use connector::{Account, MarketData, NovadaxConnector, Trading};
pub use rest::NovadaxRest;
pub use signer::NovadaxSigner;
pub use types::novadax_descriptor;
