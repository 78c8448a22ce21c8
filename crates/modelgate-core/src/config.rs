//! Engine configuration
//!
//! Plain serde types with sensible defaults, loadable from any format the
//! `config` crate understands (TOML, JSON, YAML, INI, RON, JSON5) with
//! optional environment-variable overrides (`PREFIX_SECTION__FIELD`,
//! double underscore for nesting).

use std::path::Path;
use std::time::Duration;

use ::config::{Config as Cfg, Environment, File};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{ModelScores, Scenario};

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("Config parsing error: {0}")]
    Parse(String),

    #[error("Config deserialization error: {0}")]
    Serialization(String),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Result type for config operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Relative weights for blending the three score dimensions.
///
/// Weights are normalized by their sum at blend time, so `(0.7, 0.15, 0.15)`
/// and `(70, 15, 15)` mean the same thing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreWeights {
    pub speed: f64,
    pub reliability: f64,
    pub cost: f64,
}

impl ScoreWeights {
    pub fn new(speed: f64, reliability: f64, cost: f64) -> Self {
        Self {
            speed,
            reliability,
            cost,
        }
    }

    pub fn equal() -> Self {
        Self::new(1.0, 1.0, 1.0)
    }

    pub fn favoring_speed() -> Self {
        Self::new(0.70, 0.15, 0.15)
    }

    pub fn favoring_reliability() -> Self {
        Self::new(0.15, 0.70, 0.15)
    }

    pub fn favoring_cost() -> Self {
        Self::new(0.15, 0.15, 0.70)
    }

    /// Weighted mean of the three dimension scores.
    pub fn blend(&self, scores: &ModelScores) -> f64 {
        let sum = self.speed + self.reliability + self.cost;
        if sum <= f64::EPSILON {
            return 0.0;
        }
        (scores.speed * self.speed + scores.reliability * self.reliability + scores.cost * self.cost)
            / sum
    }

    /// Non-negative components with a positive sum.
    pub fn is_valid(&self) -> bool {
        self.speed >= 0.0
            && self.reliability >= 0.0
            && self.cost >= 0.0
            && self.speed + self.reliability + self.cost > 0.0
    }
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self::equal()
    }
}

/// Admission counter windows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdmissionConfig {
    /// Lifetime of a rate counter key, in seconds.
    #[serde(default = "default_rate_window_secs")]
    pub rate_window_secs: u64,
    /// Length of a quota period, in seconds. Quota keys expire after one
    /// period and the period index is part of the key.
    #[serde(default = "default_quota_period_secs")]
    pub quota_period_secs: u64,
}

impl AdmissionConfig {
    pub fn rate_window(&self) -> Duration {
        Duration::from_secs(self.rate_window_secs)
    }

    pub fn quota_period(&self) -> Duration {
        Duration::from_secs(self.quota_period_secs)
    }
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            rate_window_secs: default_rate_window_secs(),
            quota_period_secs: default_quota_period_secs(),
        }
    }
}

fn default_rate_window_secs() -> u64 {
    1
}

fn default_quota_period_secs() -> u64 {
    86_400
}

/// Score refresh and scenario weighting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Trailing telemetry window the refresher scores over, in seconds.
    #[serde(default = "default_telemetry_window_secs")]
    pub telemetry_window_secs: u64,
    /// Score assigned to a dimension when no data exists for it.
    #[serde(default = "default_score")]
    pub default_score: f64,
    /// Weights for the stored composite score.
    #[serde(default)]
    pub composite_weights: ScoreWeights,
    /// Weight vector behind [`Scenario::Speed`].
    #[serde(default = "ScoreWeights::favoring_speed")]
    pub speed_weights: ScoreWeights,
    /// Weight vector behind [`Scenario::Reliability`].
    #[serde(default = "ScoreWeights::favoring_reliability")]
    pub reliability_weights: ScoreWeights,
    /// Weight vector behind [`Scenario::Cost`].
    #[serde(default = "ScoreWeights::favoring_cost")]
    pub cost_weights: ScoreWeights,
}

impl ScoringConfig {
    pub fn telemetry_window(&self) -> Duration {
        Duration::from_secs(self.telemetry_window_secs)
    }

    /// Weight vector for a scenario. `Balanced` has none: it reads the
    /// stored composite score instead of blending on the fly.
    pub fn scenario_weights(&self, scenario: Scenario) -> Option<&ScoreWeights> {
        match scenario {
            Scenario::Speed => Some(&self.speed_weights),
            Scenario::Reliability => Some(&self.reliability_weights),
            Scenario::Cost => Some(&self.cost_weights),
            Scenario::Balanced => None,
        }
    }
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            telemetry_window_secs: default_telemetry_window_secs(),
            default_score: default_score(),
            composite_weights: ScoreWeights::equal(),
            speed_weights: ScoreWeights::favoring_speed(),
            reliability_weights: ScoreWeights::favoring_reliability(),
            cost_weights: ScoreWeights::favoring_cost(),
        }
    }
}

fn default_telemetry_window_secs() -> u64 {
    86_400
}

fn default_score() -> f64 {
    70.0
}

/// Top-level engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub admission: AdmissionConfig,
    #[serde(default)]
    pub scoring: ScoringConfig,
}

impl EngineConfig {
    /// Load from a file; the format is detected from the extension.
    pub fn from_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let config = Cfg::builder()
            .add_source(File::from(path.as_ref()))
            .build()
            .map_err(|e| ConfigError::Parse(e.to_string()))?;

        let engine: EngineConfig = config
            .try_deserialize()
            .map_err(|e| ConfigError::Serialization(e.to_string()))?;
        engine.validate()?;
        Ok(engine)
    }

    /// Load from a file with environment overrides layered on top.
    ///
    /// Variables use the given prefix and `__` for nesting, e.g.
    /// `MODELGATE_ADMISSION__RATE_WINDOW_SECS=5`.
    pub fn from_file_with_env(path: impl AsRef<Path>, env_prefix: &str) -> ConfigResult<Self> {
        let config = Cfg::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(
                Environment::with_prefix(env_prefix)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| ConfigError::Parse(e.to_string()))?;

        let engine: EngineConfig = config
            .try_deserialize()
            .map_err(|e| ConfigError::Serialization(e.to_string()))?;
        engine.validate()?;
        Ok(engine)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.admission.rate_window_secs == 0 {
            return Err(ConfigError::Invalid(
                "admission.rate_window_secs must be positive".to_string(),
            ));
        }
        if self.admission.quota_period_secs == 0 {
            return Err(ConfigError::Invalid(
                "admission.quota_period_secs must be positive".to_string(),
            ));
        }
        if self.scoring.telemetry_window_secs == 0 {
            return Err(ConfigError::Invalid(
                "scoring.telemetry_window_secs must be positive".to_string(),
            ));
        }
        if !(0.0..=100.0).contains(&self.scoring.default_score) {
            return Err(ConfigError::Invalid(format!(
                "scoring.default_score must be within [0, 100], got {}",
                self.scoring.default_score
            )));
        }
        let weight_sets = [
            ("composite_weights", &self.scoring.composite_weights),
            ("speed_weights", &self.scoring.speed_weights),
            ("reliability_weights", &self.scoring.reliability_weights),
            ("cost_weights", &self.scoring.cost_weights),
        ];
        for (name, weights) in weight_sets {
            if !weights.is_valid() {
                return Err(ConfigError::Invalid(format!(
                    "scoring.{} must be non-negative with a positive sum",
                    name
                )));
            }
        }
        Ok(())
    }
}
