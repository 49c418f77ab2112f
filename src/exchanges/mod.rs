pub mod hitbtc;
pub mod kraken;
pub mod lbank;
pub mod novadax;
