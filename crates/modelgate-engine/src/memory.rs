//! In-memory reference backends
//!
//! Published implementations of the collaborator traits, usable both as
//! test doubles and for single-instance deployments that need no shared
//! store. `InMemoryCounterStore` measures TTLs on [`tokio::time::Instant`],
//! so paused-clock tests can cross expiry deterministically.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tokio::time::Instant;

use modelgate_core::catalog::{CatalogError, CostCatalog, ModelCatalog};
use modelgate_core::model::{CostDescriptor, ModelDescriptor, ModelScores};
use modelgate_core::store::{CounterStore, StoreError};
use modelgate_core::telemetry::{ExecutionStats, TelemetryError, TelemetrySource};

struct CounterEntry {
    value: u64,
    expires_at: Option<Instant>,
}

impl CounterEntry {
    fn expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// Counter store backed by a process-local map.
///
/// Correct for a single process only: it honors the same atomic
/// increment-and-get contract the engine expects from a shared store, but
/// nothing is visible across processes. Expiry is lazy; expired keys are
/// treated as absent and reset on the next increment.
pub struct InMemoryCounterStore {
    entries: RwLock<HashMap<String, CounterEntry>>,
    unavailable: AtomicBool,
}

impl InMemoryCounterStore {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            unavailable: AtomicBool::new(false),
        }
    }

    /// Make every store call fail with [`StoreError::Unavailable`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of live (non-expired) keys.
    pub async fn key_count(&self) -> usize {
        let now = Instant::now();
        self.entries
            .read()
            .await
            .values()
            .filter(|e| !e.expired(now))
            .count()
    }

    fn ensure_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("simulated outage".to_string()));
        }
        Ok(())
    }
}

impl Default for InMemoryCounterStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CounterStore for InMemoryCounterStore {
    async fn increment(&self, key: &str) -> Result<u64, StoreError> {
        self.ensure_available()?;
        let mut entries = self.entries.write().await;
        let now = Instant::now();
        let entry = entries.entry(key.to_string()).or_insert(CounterEntry {
            value: 0,
            expires_at: None,
        });
        if entry.expired(now) {
            entry.value = 0;
            entry.expires_at = None;
        }
        entry.value += 1;
        Ok(entry.value)
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<(), StoreError> {
        self.ensure_available()?;
        let mut entries = self.entries.write().await;
        if let Some(entry) = entries.get_mut(key) {
            entry.expires_at = Some(Instant::now() + ttl);
        }
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<u64>, StoreError> {
        self.ensure_available()?;
        let now = Instant::now();
        let entries = self.entries.read().await;
        Ok(entries
            .get(key)
            .filter(|e| !e.expired(now))
            .map(|e| e.value))
    }
}

/// Model catalog backed by a process-local map, keyed by model code.
pub struct InMemoryModelCatalog {
    models: RwLock<HashMap<String, ModelDescriptor>>,
}

impl InMemoryModelCatalog {
    pub fn new() -> Self {
        Self {
            models: RwLock::new(HashMap::new()),
        }
    }

    pub async fn upsert(&self, model: ModelDescriptor) {
        self.models.write().await.insert(model.code.clone(), model);
    }

    pub async fn get(&self, code: &str) -> Option<ModelDescriptor> {
        self.models.read().await.get(code).cloned()
    }
}

impl Default for InMemoryModelCatalog {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ModelCatalog for InMemoryModelCatalog {
    async fn list_active(&self) -> Result<Vec<ModelDescriptor>, CatalogError> {
        Ok(self
            .models
            .read()
            .await
            .values()
            .filter(|m| m.active)
            .cloned()
            .collect())
    }

    async fn update_scores(
        &self,
        code: &str,
        scores: ModelScores,
        refreshed_at: DateTime<Utc>,
    ) -> Result<(), CatalogError> {
        let mut models = self.models.write().await;
        match models.get_mut(code) {
            Some(model) => {
                model.scores = scores;
                model.last_score_refresh = Some(refreshed_at);
                Ok(())
            }
            None => Err(CatalogError::UnknownModel(code.to_string())),
        }
    }
}

/// Cost catalog backed by a process-local map, keyed by model code.
pub struct InMemoryCostCatalog {
    costs: RwLock<HashMap<String, CostDescriptor>>,
}

impl InMemoryCostCatalog {
    pub fn new() -> Self {
        Self {
            costs: RwLock::new(HashMap::new()),
        }
    }

    pub async fn set(&self, cost: CostDescriptor) {
        self.costs.write().await.insert(cost.model_code.clone(), cost);
    }
}

impl Default for InMemoryCostCatalog {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CostCatalog for InMemoryCostCatalog {
    async fn cost_for(&self, model_code: &str) -> Result<Option<CostDescriptor>, CatalogError> {
        Ok(self.costs.read().await.get(model_code).cloned())
    }
}

/// Telemetry source answering from scripted per-model stats.
///
/// The window argument is ignored: whatever stats were scripted for a code
/// stand for the window the refresher asks about. Codes registered via
/// [`ScriptedTelemetry::fail_for`] error instead, for failure-isolation
/// tests.
pub struct ScriptedTelemetry {
    stats: RwLock<HashMap<String, ExecutionStats>>,
    failing: RwLock<HashSet<String>>,
}

impl ScriptedTelemetry {
    pub fn new() -> Self {
        Self {
            stats: RwLock::new(HashMap::new()),
            failing: RwLock::new(HashSet::new()),
        }
    }

    pub async fn set_stats(&self, model_code: &str, stats: ExecutionStats) {
        self.stats.write().await.insert(model_code.to_string(), stats);
    }

    pub async fn fail_for(&self, model_code: &str) {
        self.failing.write().await.insert(model_code.to_string());
    }
}

impl Default for ScriptedTelemetry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TelemetrySource for ScriptedTelemetry {
    async fn window_stats(
        &self,
        model_code: &str,
        _window: Duration,
    ) -> Result<Option<ExecutionStats>, TelemetryError> {
        if self.failing.read().await.contains(model_code) {
            return Err(TelemetryError::Unavailable(format!(
                "scripted failure for {}",
                model_code
            )));
        }
        Ok(self.stats.read().await.get(model_code).cloned())
    }
}
