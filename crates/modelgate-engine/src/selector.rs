//! Scenario-aware model selection
//!
//! Filters the catalog down to active models supporting the requested task
//! type, then picks the best by score. `Balanced` reads the stored
//! composite; the other scenarios blend the dimension scores with their
//! configured weight vector on the fly. An empty candidate set is a hard
//! stop, never a silent fallback to an unsupported model.

use std::sync::Arc;

use tracing::{debug, info, warn};

use modelgate_core::catalog::ModelCatalog;
use modelgate_core::config::ScoringConfig;
use modelgate_core::error::{EngineError, EngineResult};
use modelgate_core::model::{ModelDescriptor, Scenario};

pub struct ModelSelector {
    catalog: Arc<dyn ModelCatalog>,
    scoring: ScoringConfig,
}

impl ModelSelector {
    pub fn new(catalog: Arc<dyn ModelCatalog>, scoring: ScoringConfig) -> Self {
        Self { catalog, scoring }
    }

    /// Best model for a task type by composite score.
    ///
    /// Identical to [`select_optimal_model_by_scenario`] with
    /// [`Scenario::Balanced`].
    ///
    /// [`select_optimal_model_by_scenario`]: Self::select_optimal_model_by_scenario
    pub async fn select_optimal_model(&self, task_type: &str) -> EngineResult<ModelDescriptor> {
        self.select_optimal_model_by_scenario(task_type, Scenario::Balanced)
            .await
    }

    /// Best model for a task type under the given optimization scenario.
    ///
    /// Score ties go to the lower `priority` value; full ties to the
    /// lexicographically smaller `code`.
    pub async fn select_optimal_model_by_scenario(
        &self,
        task_type: &str,
        scenario: Scenario,
    ) -> EngineResult<ModelDescriptor> {
        info!("Selecting model for task type {} ({:?})", task_type, scenario);
        let candidates = self.candidate_models(task_type).await?;
        if candidates.is_empty() {
            warn!("No candidate model for task type {}", task_type);
            return Err(EngineError::NoCandidate {
                task_type: task_type.to_string(),
            });
        }

        // Candidates are (priority, code)-ordered, so keeping the first
        // among score ties yields the lower priority, then the smaller code.
        let mut best = &candidates[0];
        let mut best_score = self.scenario_score(best, scenario);
        for candidate in &candidates[1..] {
            let score = self.scenario_score(candidate, scenario);
            if score > best_score {
                best = candidate;
                best_score = score;
            }
        }

        debug!("Selected model {} with score {:.2}", best.code, best_score);
        Ok(best.clone())
    }

    /// All active models supporting the task type, ordered by ascending
    /// priority (ties by code). Empty result is not an error here; this is
    /// the audit view behind selection.
    pub async fn candidate_models(&self, task_type: &str) -> EngineResult<Vec<ModelDescriptor>> {
        let mut candidates: Vec<ModelDescriptor> = self
            .catalog
            .list_active()
            .await?
            .into_iter()
            .filter(|m| m.supports_task(task_type))
            .collect();
        candidates.sort_by(|a, b| a.priority.cmp(&b.priority).then_with(|| a.code.cmp(&b.code)));
        Ok(candidates)
    }

    /// The minimum-priority candidate, ignoring scores entirely.
    pub async fn default_model(&self, task_type: &str) -> EngineResult<ModelDescriptor> {
        let candidates = self.candidate_models(task_type).await?;
        candidates
            .into_iter()
            .next()
            .ok_or_else(|| EngineError::NoCandidate {
                task_type: task_type.to_string(),
            })
    }

    fn scenario_score(&self, model: &ModelDescriptor, scenario: Scenario) -> f64 {
        match self.scoring.scenario_weights(scenario) {
            Some(weights) => weights.blend(&model.scores),
            None => model.scores.composite,
        }
    }
}
