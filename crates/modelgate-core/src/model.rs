//! Model catalog domain types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Normalized dimension scores in `[0, 100]`.
///
/// Written exclusively by the score refresher; everything else treats the
/// stored values as read-only snapshots.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelScores {
    /// Lower observed latency maps to a higher score.
    pub speed: f64,
    /// Success ratio over the telemetry window, scaled to `[0, 100]`.
    pub reliability: f64,
    /// Cheaper token prices map to a higher score.
    pub cost: f64,
    /// Weighted combination of the three dimensions.
    pub composite: f64,
}

impl ModelScores {
    pub fn new(speed: f64, reliability: f64, cost: f64, composite: f64) -> Self {
        Self {
            speed,
            reliability,
            cost,
            composite,
        }
    }

    /// All four dimensions set to the same value.
    pub fn uniform(score: f64) -> Self {
        Self::new(score, score, score, score)
    }
}

/// One catalog row per backing model.
///
/// `code` is the stable identifier request handlers pass around; it never
/// changes after creation. `priority` ranks models for tie-breaking and for
/// the default-model lookup: lower value means more preferred.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelDescriptor {
    pub code: String,
    pub name: String,
    pub active: bool,
    pub priority: i32,
    /// Task-type tags this model may serve. An empty list means the model
    /// serves every task type.
    #[serde(default)]
    pub task_types: Vec<String>,
    #[serde(default)]
    pub scores: ModelScores,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_score_refresh: Option<DateTime<Utc>>,
}

impl ModelDescriptor {
    pub fn new(code: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
            active: true,
            priority: 100,
            task_types: Vec::new(),
            scores: ModelScores::default(),
            last_score_refresh: None,
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_task_types<I, S>(mut self, task_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.task_types = task_types.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_scores(mut self, scores: ModelScores) -> Self {
        self.scores = scores;
        self
    }

    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }

    /// Whether this model may serve the given task type.
    ///
    /// An empty tag list means "serves everything".
    pub fn supports_task(&self, task_type: &str) -> bool {
        self.task_types.is_empty() || self.task_types.iter().any(|t| t == task_type)
    }

    /// Whether two models compete for the same traffic: they share at least
    /// one task type, with an empty tag list sharing with everyone.
    pub fn shares_task_type(&self, other: &ModelDescriptor) -> bool {
        if self.task_types.is_empty() || other.task_types.is_empty() {
            return true;
        }
        self.task_types
            .iter()
            .any(|t| other.task_types.iter().any(|o| o == t))
    }
}

/// Per-model token prices, joined to the catalog by model code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostDescriptor {
    pub model_code: String,
    pub input_price_per_1k: f64,
    pub output_price_per_1k: f64,
    pub currency: String,
}

impl CostDescriptor {
    pub fn new(model_code: impl Into<String>, input_price_per_1k: f64, output_price_per_1k: f64) -> Self {
        Self {
            model_code: model_code.into(),
            input_price_per_1k,
            output_price_per_1k,
            currency: "USD".to_string(),
        }
    }

    pub fn free(model_code: impl Into<String>) -> Self {
        Self::new(model_code, 0.0, 0.0)
    }

    /// The single price figure the cost dimension scores against:
    /// the plain average of the input and output per-1k prices.
    pub fn effective_price_per_1k(&self) -> f64 {
        (self.input_price_per_1k + self.output_price_per_1k) / 2.0
    }
}

/// Optimization scenario for model selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Scenario {
    /// Favor low latency
    Speed,
    /// Favor high success ratio
    Reliability,
    /// Favor cheap token prices
    Cost,
    /// Use the stored composite score
    Balanced,
}

impl Default for Scenario {
    fn default() -> Self {
        Scenario::Balanced
    }
}

impl Scenario {
    /// Parse a scenario tag. Unknown values fall back to [`Scenario::Balanced`].
    pub fn from_str(s: &str) -> Self {
        match s.to_ascii_uppercase().as_str() {
            "SPEED" | "FAST" | "LATENCY" => Scenario::Speed,
            "RELIABILITY" | "STABLE" => Scenario::Reliability,
            "COST" | "CHEAP" | "PRICE" => Scenario::Cost,
            _ => Scenario::Balanced,
        }
    }
}
