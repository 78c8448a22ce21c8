//! Catalog access traits
//!
//! Model metadata and cost figures live in some backing store owned by the
//! embedding application (a database, a config service). The engine only
//! sees these two narrow traits, injected as `Arc<dyn …>` handles so tests
//! can substitute in-memory implementations.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::{CostDescriptor, ModelDescriptor, ModelScores};

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CatalogError {
    #[error("Catalog unavailable: {0}")]
    Unavailable(String),

    #[error("Unknown model: {0}")]
    UnknownModel(String),
}

/// Read and write access to the model catalog.
#[async_trait]
pub trait ModelCatalog: Send + Sync {
    /// Every model whose active flag is set.
    async fn list_active(&self) -> Result<Vec<ModelDescriptor>, CatalogError>;

    /// Persist a fresh score snapshot for one model.
    ///
    /// Only the score refresher calls this; `refreshed_at` lands in the
    /// model's `last_score_refresh`.
    async fn update_scores(
        &self,
        code: &str,
        scores: ModelScores,
        refreshed_at: DateTime<Utc>,
    ) -> Result<(), CatalogError>;
}

/// Lookup of per-model token prices.
#[async_trait]
pub trait CostCatalog: Send + Sync {
    /// Returns `Ok(None)` when no cost figures exist for the model.
    async fn cost_for(&self, model_code: &str) -> Result<Option<CostDescriptor>, CatalogError>;
}

pub type SharedModelCatalog = Arc<dyn ModelCatalog>;
pub type SharedCostCatalog = Arc<dyn CostCatalog>;
