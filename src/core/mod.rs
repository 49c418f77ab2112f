pub mod config;
pub mod errors;
pub mod kernel;
pub mod markets;
pub mod pagination;
pub mod precision;
pub mod safe;
pub mod traits;
pub mod types;
