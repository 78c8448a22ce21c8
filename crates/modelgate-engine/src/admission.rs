//! Per-user/per-model admission control
//!
//! Two independent counter axes in the shared store:
//!
//! - rate key `model:rate:{user}:{model}`: bumped on every admitted
//!   request, expires after the rate window. Advisory only; it never
//!   rejects by itself.
//! - quota key `model:quota:{user}:{model}:p{bucket}`: bumped by
//!   [`AdmissionController::record_usage`] after the guarded call
//!   succeeded, expires after the quota period. `bucket` is the current
//!   period index (unix seconds / period length), so a stale key can never
//!   leak into the next period.
//!
//! Store failures propagate as errors; the engine never admits a request
//! it could not check.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::{debug, warn};

use modelgate_core::config::AdmissionConfig;
use modelgate_core::error::EngineResult;
use modelgate_core::store::CounterStore;

pub const RATE_KEY_PREFIX: &str = "model:rate:";
pub const QUOTA_KEY_PREFIX: &str = "model:quota:";

pub struct AdmissionController {
    store: Arc<dyn CounterStore>,
    config: AdmissionConfig,
}

impl AdmissionController {
    pub fn new(store: Arc<dyn CounterStore>, config: AdmissionConfig) -> Self {
        Self { store, config }
    }

    /// Admission check for one request.
    ///
    /// With `quota_limit <= 0` the quota axis is disabled and only the rate
    /// counter is bumped. Otherwise the current quota counter is read
    /// first: at or over the limit the request is rejected with
    /// `Ok(false)` and no counter is touched. Admission bumps the rate
    /// counter and arms its TTL when the bump created the key.
    ///
    /// The quota read and the rate increment are separate store calls, so
    /// concurrent requests racing the boundary can be admitted a request
    /// or two past the limit. Quota is a soft limit.
    pub async fn try_acquire(
        &self,
        user_id: &str,
        model_code: &str,
        quota_limit: i64,
    ) -> EngineResult<bool> {
        if quota_limit > 0 {
            let used = self.quota_used(user_id, model_code).await?;
            if used >= quota_limit as u64 {
                warn!(
                    "Quota exhausted for user {} on model {}: {} of {}",
                    user_id, model_code, used, quota_limit
                );
                return Ok(false);
            }
        }

        let rate_key = self.rate_key(user_id, model_code);
        let count = self.store.increment(&rate_key).await?;
        if count == 1 {
            self.store
                .expire(&rate_key, self.config.rate_window())
                .await?;
        }
        debug!(
            "Admitted user {} on model {} (rate count {})",
            user_id, model_code, count
        );
        Ok(true)
    }

    /// Count one completed call against the user's quota.
    ///
    /// Independent of [`try_acquire`]: callers invoke this only after the
    /// guarded operation actually succeeded. The first increment of a
    /// period creates the key and arms its TTL.
    ///
    /// [`try_acquire`]: Self::try_acquire
    pub async fn record_usage(&self, user_id: &str, model_code: &str) -> EngineResult<()> {
        let quota_key = self.quota_key(user_id, model_code);
        let used = self.store.increment(&quota_key).await?;
        if used == 1 {
            self.store
                .expire(&quota_key, self.config.quota_period())
                .await?;
        }
        debug!(
            "Recorded usage for user {} on model {} ({} this period)",
            user_id, model_code, used
        );
        Ok(())
    }

    /// Remaining quota for the current period.
    ///
    /// `quota_limit <= 0` means unlimited: returns `-1` without querying
    /// the store. Otherwise `quota_limit - used`, which can be negative
    /// when usage raced past the limit; the overshoot is reported as-is.
    pub async fn remaining_quota(
        &self,
        user_id: &str,
        model_code: &str,
        quota_limit: i64,
    ) -> EngineResult<i64> {
        if quota_limit <= 0 {
            return Ok(-1);
        }
        let used = self.quota_used(user_id, model_code).await?;
        Ok(quota_limit - used as i64)
    }

    /// Current rate counter value, `0` when the key does not exist.
    /// Read-only: never creates the key.
    pub async fn rate_limit_current(&self, user_id: &str, model_code: &str) -> EngineResult<u64> {
        let rate_key = self.rate_key(user_id, model_code);
        Ok(self.store.get(&rate_key).await?.unwrap_or(0))
    }

    async fn quota_used(&self, user_id: &str, model_code: &str) -> EngineResult<u64> {
        let quota_key = self.quota_key(user_id, model_code);
        Ok(self.store.get(&quota_key).await?.unwrap_or(0))
    }

    fn rate_key(&self, user_id: &str, model_code: &str) -> String {
        format!("{}{}:{}", RATE_KEY_PREFIX, user_id, model_code)
    }

    fn quota_key(&self, user_id: &str, model_code: &str) -> String {
        let bucket = period_bucket(self.config.quota_period_secs);
        format!("{}{}:{}:p{}", QUOTA_KEY_PREFIX, user_id, model_code, bucket)
    }
}

/// Index of the current quota period since the unix epoch (wall clock).
fn period_bucket(period_secs: u64) -> u64 {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    secs / period_secs.max(1)
}
