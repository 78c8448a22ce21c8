//! Pre-wired engines and fault-injection doubles shared by the
//! integration tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use modelgate_core::config::EngineConfig;
use modelgate_core::model::{CostDescriptor, ModelDescriptor, ModelScores};
use modelgate_core::store::{CounterStore, StoreError};
use modelgate_core::telemetry::ExecutionStats;
use modelgate_engine::engine::ModelGate;
use modelgate_engine::memory::{
    InMemoryCostCatalog, InMemoryCounterStore, InMemoryModelCatalog, ScriptedTelemetry,
};

/// Install a fmt subscriber honoring `RUST_LOG`. Safe to call from every
/// test; only the first call wins.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Catalog row with the fields integration tests care about; the display
/// name just mirrors the code.
pub fn scored_model(
    code: &str,
    priority: i32,
    task_types: &[&str],
    scores: ModelScores,
) -> ModelDescriptor {
    ModelDescriptor::new(code, code)
        .with_priority(priority)
        .with_task_types(task_types.iter().copied())
        .with_scores(scores)
}

/// A [`ModelGate`] wired over the in-memory backends, with the backends
/// kept reachable so tests can script telemetry or inspect raw counter
/// keys mid-scenario.
pub struct TestBed {
    pub gate: ModelGate,
    pub catalog: Arc<InMemoryModelCatalog>,
    pub costs: Arc<InMemoryCostCatalog>,
    pub telemetry: Arc<ScriptedTelemetry>,
    pub store: Arc<InMemoryCounterStore>,
}

impl TestBed {
    pub async fn new(models: Vec<ModelDescriptor>) -> Self {
        Self::with_config(models, EngineConfig::default()).await
    }

    pub async fn with_config(models: Vec<ModelDescriptor>, config: EngineConfig) -> Self {
        let catalog = Arc::new(InMemoryModelCatalog::new());
        for model in models {
            catalog.upsert(model).await;
        }
        let costs = Arc::new(InMemoryCostCatalog::new());
        let telemetry = Arc::new(ScriptedTelemetry::new());
        let store = Arc::new(InMemoryCounterStore::new());
        let gate = ModelGate::new(
            catalog.clone(),
            costs.clone(),
            telemetry.clone(),
            store.clone(),
            config,
        )
        .expect("test config must validate");
        Self {
            gate,
            catalog,
            costs,
            telemetry,
            store,
        }
    }

    pub async fn script_stats(&self, code: &str, total: u64, successful: u64, avg_latency_ms: f64) {
        self.telemetry
            .set_stats(code, ExecutionStats::new(total, successful, avg_latency_ms))
            .await;
    }

    pub async fn price_model(&self, code: &str, input_per_1k: f64, output_per_1k: f64) {
        self.costs
            .set(CostDescriptor::new(code, input_per_1k, output_per_1k))
            .await;
    }
}

/// Counter store that fails its first `n` calls and then behaves like a
/// healthy in-memory store. Models a shared store coming back after an
/// outage.
pub struct FlakyCounterStore {
    inner: InMemoryCounterStore,
    remaining_failures: AtomicU32,
}

impl FlakyCounterStore {
    pub fn failing_times(n: u32) -> Self {
        Self {
            inner: InMemoryCounterStore::new(),
            remaining_failures: AtomicU32::new(n),
        }
    }

    fn take_failure(&self) -> bool {
        self.remaining_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }

    fn outage() -> StoreError {
        StoreError::Unavailable("flaky store outage".to_string())
    }
}

#[async_trait]
impl CounterStore for FlakyCounterStore {
    async fn increment(&self, key: &str) -> Result<u64, StoreError> {
        if self.take_failure() {
            return Err(Self::outage());
        }
        self.inner.increment(key).await
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<(), StoreError> {
        if self.take_failure() {
            return Err(Self::outage());
        }
        self.inner.expire(key, ttl).await
    }

    async fn get(&self, key: &str) -> Result<Option<u64>, StoreError> {
        if self.take_failure() {
            return Err(Self::outage());
        }
        self.inner.get(key).await
    }
}

#[macro_export]
macro_rules! assert_no_candidate {
    ($result:expr, $task_type:expr) => {
        match $result {
            Err($crate::EngineError::NoCandidate { task_type }) => {
                assert_eq!(
                    task_type, $task_type,
                    "NoCandidate named task type '{}', expected '{}'",
                    task_type, $task_type
                );
            }
            other => panic!("Expected NoCandidate for '{}', got: {:?}", $task_type, other),
        }
    };
}
