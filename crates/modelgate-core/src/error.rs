//! Engine-level error type
//!
//! Composes every collaborator's typed error via `#[from]` so the `?`
//! operator converts them automatically. Admission rejection is not an
//! error: `try_acquire` reports it as `Ok(false)`.

use thiserror::Error;

use crate::catalog::CatalogError;
use crate::config::ConfigError;
use crate::store::StoreError;
use crate::telemetry::TelemetryError;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum EngineError {
    /// No active model supports the requested task type. Hard stop: the
    /// engine never falls back to an unsupported model.
    #[error("No candidate model for task type: {task_type}")]
    NoCandidate { task_type: String },

    /// The shared counter store failed. Admission fails closed: the
    /// current request surfaces this instead of being silently allowed.
    #[error("Counter store error: {0}")]
    Store(#[from] StoreError),

    /// The model catalog backend failed.
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// The telemetry backend failed.
    #[error("Telemetry error: {0}")]
    Telemetry(#[from] TelemetryError),

    /// Configuration could not be loaded or did not validate.
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

pub type EngineResult<T> = Result<T, EngineError>;
