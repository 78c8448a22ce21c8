//! Telemetry-driven score refresh
//!
//! Recomputes the four dimension scores for every active model from
//! trailing-window telemetry and the cost catalog, then writes them back.
//! Speed and cost are normalized within each model's population: the
//! active models sharing at least one task type with it. One broken model
//! never aborts the pass; it is logged and skipped.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use modelgate_core::catalog::{CostCatalog, ModelCatalog};
use modelgate_core::config::ScoringConfig;
use modelgate_core::error::EngineResult;
use modelgate_core::model::{ModelDescriptor, ModelScores};
use modelgate_core::telemetry::{ExecutionStats, TelemetrySource};

/// Summary of one refresh pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshOutcome {
    pub refreshed: usize,
    pub failed: usize,
}

struct ModelInputs {
    stats: Option<ExecutionStats>,
    price: Option<f64>,
    failed: bool,
}

pub struct ScoreRefresher {
    catalog: Arc<dyn ModelCatalog>,
    costs: Arc<dyn CostCatalog>,
    telemetry: Arc<dyn TelemetrySource>,
    scoring: ScoringConfig,
}

impl ScoreRefresher {
    pub fn new(
        catalog: Arc<dyn ModelCatalog>,
        costs: Arc<dyn CostCatalog>,
        telemetry: Arc<dyn TelemetrySource>,
        scoring: ScoringConfig,
    ) -> Self {
        Self {
            catalog,
            costs,
            telemetry,
            scoring,
        }
    }

    /// Recompute and persist scores for every active model.
    ///
    /// Idempotent: inputs are re-read and scores overwritten on every run,
    /// and running concurrently with selection is safe since readers see
    /// whatever snapshot is persisted. Models whose telemetry, cost lookup
    /// or write-back fails are skipped and counted in
    /// [`RefreshOutcome::failed`]; their stored scores stay untouched.
    pub async fn refresh_scores(&self) -> EngineResult<RefreshOutcome> {
        let models = self.catalog.list_active().await?;
        info!("Refreshing scores for {} active models", models.len());

        let window = self.scoring.telemetry_window();
        let inputs = self.collect_inputs(&models, window).await;

        let mut outcome = RefreshOutcome::default();
        for (index, model) in models.iter().enumerate() {
            if inputs[index].failed {
                outcome.failed += 1;
                continue;
            }
            let scores = self.compute_scores(index, model, &models, &inputs);
            match self
                .catalog
                .update_scores(&model.code, scores, Utc::now())
                .await
            {
                Ok(()) => {
                    debug!(
                        "Refreshed scores for {}: speed {:.2}, reliability {:.2}, cost {:.2}, composite {:.2}",
                        model.code, scores.speed, scores.reliability, scores.cost, scores.composite
                    );
                    outcome.refreshed += 1;
                }
                Err(e) => {
                    error!("Failed to persist scores for {}: {}", model.code, e);
                    outcome.failed += 1;
                }
            }
        }

        info!(
            "Score refresh complete: {} refreshed, {} failed",
            outcome.refreshed, outcome.failed
        );
        Ok(outcome)
    }

    async fn collect_inputs(
        &self,
        models: &[ModelDescriptor],
        window: Duration,
    ) -> Vec<ModelInputs> {
        let mut inputs = Vec::with_capacity(models.len());
        for model in models {
            let mut failed = false;
            let stats = match self.telemetry.window_stats(&model.code, window).await {
                Ok(stats) => stats,
                Err(e) => {
                    error!("Telemetry fetch failed for {}: {}", model.code, e);
                    failed = true;
                    None
                }
            };
            let price = match self.costs.cost_for(&model.code).await {
                Ok(cost) => cost.map(|c| c.effective_price_per_1k()),
                Err(e) => {
                    error!("Cost lookup failed for {}: {}", model.code, e);
                    failed = true;
                    None
                }
            };
            inputs.push(ModelInputs {
                stats,
                price,
                failed,
            });
        }
        inputs
    }

    fn compute_scores(
        &self,
        index: usize,
        model: &ModelDescriptor,
        models: &[ModelDescriptor],
        inputs: &[ModelInputs],
    ) -> ModelScores {
        // The model's population, itself included.
        let peers: Vec<usize> = (0..models.len())
            .filter(|&j| model.shares_task_type(&models[j]))
            .collect();

        let speed = match &inputs[index].stats {
            Some(stats) => {
                let basis: Vec<f64> = peers
                    .iter()
                    .filter_map(|&j| inputs[j].stats.as_ref().map(|s| s.avg_latency_ms))
                    .collect();
                normalize_inverted(stats.avg_latency_ms, &basis)
            }
            None => self.scoring.default_score,
        };

        let reliability = match &inputs[index].stats {
            Some(stats) => stats.success_rate() * 100.0,
            None => self.scoring.default_score,
        };

        let cost = match inputs[index].price {
            Some(price) => {
                let basis: Vec<f64> = peers.iter().filter_map(|&j| inputs[j].price).collect();
                normalize_inverted(price, &basis)
            }
            None => self.scoring.default_score,
        };

        let mut scores = ModelScores::new(round2(speed), round2(reliability), round2(cost), 0.0);
        scores.composite = round2(
            self.scoring
                .composite_weights
                .blend(&scores)
                .clamp(0.0, 100.0),
        );
        scores
    }
}

/// Min-max inversion over the population basis: the smallest value scores
/// 100, the largest 0. Zero spread (or a single member) scores 100.
fn normalize_inverted(value: f64, basis: &[f64]) -> f64 {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for &v in basis {
        min = min.min(v);
        max = max.max(v);
    }
    if !(min.is_finite() && max.is_finite()) || (max - min).abs() < f64::EPSILON {
        return 100.0;
    }
    (max - value) / (max - min) * 100.0
}

/// Two decimal places, halves away from zero.
fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
