use crate::core::config::ExchangeConfig;
use crate::core::errors::ExchangeError;
use crate::core::traits::ExchangeConnector;
use crate::exchanges::{hitbtc, kraken, lbank, novadax};
use std::fmt;
use std::str::FromStr;

/// Supported exchange types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExchangeType {
    Kraken,
    Lbank,
    Hitbtc,
    Novadax,
}

impl ExchangeType {
    /// Exchange id, also the prefix for `{ID}_API_KEY` style variables.
    pub const fn id(self) -> &'static str {
        match self {
            Self::Kraken => "kraken",
            Self::Lbank => "lbank",
            Self::Hitbtc => "hitbtc",
            Self::Novadax => "novadax",
        }
    }

    pub const fn all() -> [Self; 4] {
        [Self::Kraken, Self::Lbank, Self::Hitbtc, Self::Novadax]
    }
}

impl fmt::Display for ExchangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for ExchangeType {
    type Err = ExchangeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Self::all()
            .into_iter()
            .find(|kind| kind.id() == wanted)
            .ok_or_else(|| ExchangeError::Configuration(format!("unknown exchange '{}'", s)))
    }
}

/// Factory for creating exchange connectors
pub struct ExchangeFactory;

impl ExchangeFactory {
    /// Create a connector for the given exchange type. Without a config the
    /// connector is read-only.
    pub fn create_connector(
        exchange_type: ExchangeType,
        config: Option<ExchangeConfig>,
    ) -> Result<Box<dyn ExchangeConnector>, ExchangeError> {
        let cfg = config.unwrap_or_else(ExchangeConfig::read_only);
        Ok(match exchange_type {
            ExchangeType::Kraken => Box::new(kraken::build_connector(cfg)?),
            ExchangeType::Lbank => Box::new(lbank::build_connector(cfg)?),
            ExchangeType::Hitbtc => Box::new(hitbtc::build_connector(cfg)?),
            ExchangeType::Novadax => Box::new(novadax::build_connector(cfg)?),
        })
    }

    /// Create a connector from its id, picking up `{ID}_*` credentials from
    /// the environment when they are present.
    pub fn create_from_env(id: &str) -> Result<Box<dyn ExchangeConnector>, ExchangeError> {
        let exchange_type = id.parse::<ExchangeType>()?;
        let config = ExchangeConfig::from_env(exchange_type.id()).ok();
        Self::create_connector(exchange_type, config)
    }

    pub fn get_available_exchanges() -> Vec<ExchangeType> {
        ExchangeType::all().to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exchange_type_round_trips_through_its_id() {
        for kind in ExchangeType::all() {
            assert_eq!(kind.to_string().parse::<ExchangeType>().unwrap(), kind);
        }
        assert_eq!(" Kraken ".parse::<ExchangeType>().unwrap(), ExchangeType::Kraken);
        assert!(matches!(
            "binance".parse::<ExchangeType>(),
            Err(ExchangeError::Configuration(_))
        ));
    }

    #[test]
    fn factory_builds_every_exchange() {
        for kind in ExchangeFactory::get_available_exchanges() {
            let connector = ExchangeFactory::create_connector(kind, None).unwrap();
            assert_eq!(connector.descriptor().id, kind.id());
        }
    }
}
