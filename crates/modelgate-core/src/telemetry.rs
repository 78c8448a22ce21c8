//! Telemetry summaries for score refresh

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Aggregated call statistics for one model over a trailing window,
/// as reported by whatever monitoring layer the deployment runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionStats {
    pub total_calls: u64,
    pub successful_calls: u64,
    pub avg_latency_ms: f64,
}

impl ExecutionStats {
    pub fn new(total_calls: u64, successful_calls: u64, avg_latency_ms: f64) -> Self {
        Self {
            total_calls,
            successful_calls,
            avg_latency_ms,
        }
    }

    /// Success ratio in `[0, 1]`. Zero calls count as zero.
    pub fn success_rate(&self) -> f64 {
        if self.total_calls == 0 {
            return 0.0;
        }
        self.successful_calls as f64 / self.total_calls as f64
    }
}

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TelemetryError {
    #[error("Telemetry unavailable: {0}")]
    Unavailable(String),
}

/// Source of per-model execution statistics.
#[async_trait]
pub trait TelemetrySource: Send + Sync {
    /// Statistics for one model over the trailing `window`.
    ///
    /// Returns `Ok(None)` when the model saw no traffic in the window.
    async fn window_stats(
        &self,
        model_code: &str,
        window: Duration,
    ) -> Result<Option<ExecutionStats>, TelemetryError>;
}

pub type SharedTelemetrySource = Arc<dyn TelemetrySource>;
