// model module - catalog rows, scores, prices, scenarios
pub mod model;
pub use model::*;

// catalog module - model and cost catalog traits
pub mod catalog;
pub use catalog::*;

// telemetry module - execution statistics source
pub mod telemetry;
pub use telemetry::*;

// store module - shared counter store trait
pub mod store;
pub use store::*;

// config module - engine configuration
pub mod config;
pub use self::config::*;

// error module
pub mod error;
pub use error::*;
