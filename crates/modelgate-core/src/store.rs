//! Counter store trait for admission keys
//!
//! Admission counters live in a store shared by every engine instance
//! (Redis in production). The engine only relies on the three operations
//! below; atomicity of `increment` across instances is the store's job.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StoreError {
    #[error("Counter store unavailable: {0}")]
    Unavailable(String),
}

/// Shared atomic counters with per-key expiry.
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Atomically increment the counter at `key` and return the new value.
    ///
    /// Creates the key with value 1 when it does not exist.
    async fn increment(&self, key: &str) -> Result<u64, StoreError>;

    /// Arm the key to self-destruct after `ttl`.
    async fn expire(&self, key: &str, ttl: Duration) -> Result<(), StoreError>;

    /// Read the counter without creating the key.
    ///
    /// Returns `Ok(None)` when the key does not exist or has expired.
    async fn get(&self, key: &str) -> Result<Option<u64>, StoreError>;
}

pub type SharedCounterStore = Arc<dyn CounterStore>;
