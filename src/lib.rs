pub mod core;
pub mod exchanges;
pub mod utils;

pub use core::{errors::ExchangeError, traits::ExchangeConnector, types::*};
pub use exchanges::hitbtc::HitbtcConnector;
pub use exchanges::kraken::KrakenConnector;
pub use exchanges::lbank::LbankConnector;
pub use exchanges::novadax::NovadaxConnector;
pub use utils::{ExchangeFactory, ExchangeType};
