//! Engine facade
//!
//! [`ModelGate`] bundles the selector, the score refresher and the
//! admission controller behind one handle for callers that inject the four
//! collaborators once and want the whole operation surface in one place.
//! Each component also works standalone.

use std::sync::Arc;

use modelgate_core::catalog::{CostCatalog, ModelCatalog};
use modelgate_core::config::EngineConfig;
use modelgate_core::error::EngineResult;
use modelgate_core::model::{ModelDescriptor, Scenario};
use modelgate_core::store::CounterStore;
use modelgate_core::telemetry::TelemetrySource;

use crate::admission::AdmissionController;
use crate::refresher::{RefreshOutcome, ScoreRefresher};
use crate::selector::ModelSelector;

pub struct ModelGate {
    selector: ModelSelector,
    refresher: ScoreRefresher,
    admission: AdmissionController,
}

impl ModelGate {
    /// Validates the config and wires the three components.
    pub fn new(
        catalog: Arc<dyn ModelCatalog>,
        costs: Arc<dyn CostCatalog>,
        telemetry: Arc<dyn TelemetrySource>,
        store: Arc<dyn CounterStore>,
        config: EngineConfig,
    ) -> EngineResult<Self> {
        config.validate()?;
        Ok(Self {
            selector: ModelSelector::new(catalog.clone(), config.scoring.clone()),
            refresher: ScoreRefresher::new(catalog, costs, telemetry, config.scoring.clone()),
            admission: AdmissionController::new(store, config.admission.clone()),
        })
    }

    pub async fn select_optimal_model(&self, task_type: &str) -> EngineResult<ModelDescriptor> {
        self.selector.select_optimal_model(task_type).await
    }

    pub async fn select_optimal_model_by_scenario(
        &self,
        task_type: &str,
        scenario: Scenario,
    ) -> EngineResult<ModelDescriptor> {
        self.selector
            .select_optimal_model_by_scenario(task_type, scenario)
            .await
    }

    pub async fn candidate_models(&self, task_type: &str) -> EngineResult<Vec<ModelDescriptor>> {
        self.selector.candidate_models(task_type).await
    }

    pub async fn default_model(&self, task_type: &str) -> EngineResult<ModelDescriptor> {
        self.selector.default_model(task_type).await
    }

    pub async fn refresh_scores(&self) -> EngineResult<RefreshOutcome> {
        self.refresher.refresh_scores().await
    }

    pub async fn try_acquire(
        &self,
        user_id: &str,
        model_code: &str,
        quota_limit: i64,
    ) -> EngineResult<bool> {
        self.admission.try_acquire(user_id, model_code, quota_limit).await
    }

    pub async fn record_usage(&self, user_id: &str, model_code: &str) -> EngineResult<()> {
        self.admission.record_usage(user_id, model_code).await
    }

    pub async fn remaining_quota(
        &self,
        user_id: &str,
        model_code: &str,
        quota_limit: i64,
    ) -> EngineResult<i64> {
        self.admission
            .remaining_quota(user_id, model_code, quota_limit)
            .await
    }

    pub async fn rate_limit_current(&self, user_id: &str, model_code: &str) -> EngineResult<u64> {
        self.admission.rate_limit_current(user_id, model_code).await
    }
}
