//! Lock coordinator.
//!
//! Serves acquire, release, heartbeat, and reads against the
//! [`LockRegistry`]. Each operation takes the resource's slot mutex, reads
//! the clock inside it, applies lazy expiry, and only then decides. The
//! background sweeper goes through [`LockCoordinator::sweep_expired`] and the
//! same slot mutex, so it can never expire a lock that was renewed a moment
//! earlier.

use std::sync::Arc;

use crate::clock::Clock;
use crate::error::CoreError;
use crate::insight::{self, TtlSuggestion};
use crate::lock::{validate_owner_id, validate_ttl, Lock, LockStatus, DEFAULT_MAX_TTL_SECS};
use crate::registry::{LockRegistry, SlotSnapshot};
use crate::resource::ResourceDirectory;
use crate::types::ResourceId;
use crate::usage::{UsageSample, DEFAULT_HISTORY_CAPACITY};

/// Tunables for [`LockCoordinator`].
#[derive(Debug, Clone, Copy)]
pub struct CoordinatorConfig {
    /// Usage samples kept per resource.
    pub history_capacity: usize,
    /// Largest TTL a caller may request.
    pub max_ttl_secs: u32,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            max_ttl_secs: DEFAULT_MAX_TTL_SECS,
        }
    }
}

pub struct LockCoordinator {
    registry: LockRegistry,
    resources: Arc<dyn ResourceDirectory>,
    clock: Arc<dyn Clock>,
    config: CoordinatorConfig,
}

fn no_active_lock(resource_id: ResourceId) -> CoreError {
    CoreError::NotFound {
        entity: "Active lock for resource",
        id: resource_id,
    }
}

impl LockCoordinator {
    pub fn new(
        resources: Arc<dyn ResourceDirectory>,
        clock: Arc<dyn Clock>,
        config: CoordinatorConfig,
    ) -> Self {
        Self {
            registry: LockRegistry::new(config.history_capacity),
            resources,
            clock,
            config,
        }
    }

    // -----------------------------------------------------------------------
    // Acquire
    // -----------------------------------------------------------------------

    /// Acquire (or re-acquire) the lease on `resource_id` for `owner_id`.
    ///
    /// Never waits for a current holder: a live lock held by someone else is
    /// an immediate `Conflict`. A lock held by the same owner is refreshed
    /// in place and keeps its id.
    pub async fn acquire(
        &self,
        resource_id: ResourceId,
        owner_id: &str,
        ttl_seconds: i64,
    ) -> Result<Lock, CoreError> {
        let ttl = validate_ttl(ttl_seconds, self.config.max_ttl_secs)?;
        let owner_id = validate_owner_id(owner_id)?;

        if !self.resources.exists(resource_id).await {
            return Err(CoreError::NotFound {
                entity: "Resource",
                id: resource_id,
            });
        }

        let slot = self.registry.slot(resource_id).await;
        let mut slot = slot.lock().await;
        slot.check_integrity()?;
        let now = self.clock.now();

        if let Some(expired) = slot.expire_if_lapsed(now) {
            tracing::info!(
                resource_id = %resource_id,
                lock_id = %expired.id,
                previous_owner = %expired.owner_id,
                "Lapsed lock reclaimed on acquire",
            );
        }

        if let Some(holder) = slot.active().map(|active| active.owner_id.clone()) {
            if holder != owner_id {
                tracing::debug!(
                    resource_id = %resource_id,
                    owner_id,
                    holder = %holder,
                    "Acquire rejected, resource held",
                );
                return Err(CoreError::Conflict(
                    "Lock already held by another owner".into(),
                ));
            }

            let lock = slot.renew(now, Some(ttl))?;
            tracing::debug!(
                resource_id = %resource_id,
                lock_id = %lock.id,
                owner_id,
                ttl_seconds = ttl,
                "Lock re-acquired by current holder",
            );
            return Ok(lock);
        }

        let lock = slot.grant(owner_id, ttl, now)?;
        tracing::info!(
            resource_id = %resource_id,
            lock_id = %lock.id,
            owner_id,
            ttl_seconds = ttl,
            "Lock acquired",
        );
        Ok(lock)
    }

    // -----------------------------------------------------------------------
    // Release
    // -----------------------------------------------------------------------

    /// Release the active lock. Only its holder may release it.
    pub async fn release(&self, resource_id: ResourceId, owner_id: &str) -> Result<Lock, CoreError> {
        let owner_id = validate_owner_id(owner_id)?;
        let slot = self
            .registry
            .existing_slot(resource_id)
            .await
            .ok_or_else(|| no_active_lock(resource_id))?;
        let mut slot = slot.lock().await;
        slot.check_integrity()?;
        let now = self.clock.now();

        if let Some(expired) = slot.expire_if_lapsed(now) {
            tracing::info!(
                resource_id = %resource_id,
                lock_id = %expired.id,
                "Lapsed lock expired on release",
            );
        }

        match slot.active().map(|active| active.is_held_by(owner_id)) {
            None => Err(no_active_lock(resource_id)),
            Some(false) => Err(CoreError::Forbidden(
                "Lock owned by different owner".into(),
            )),
            Some(true) => {
                let lock = slot
                    .finish(LockStatus::Released, now)
                    .ok_or_else(|| no_active_lock(resource_id))?;
                tracing::info!(
                    resource_id = %resource_id,
                    lock_id = %lock.id,
                    owner_id,
                    "Lock released",
                );
                Ok(lock)
            }
        }
    }

    // -----------------------------------------------------------------------
    // Heartbeat
    // -----------------------------------------------------------------------

    /// Extend the active lease by its TTL from now.
    ///
    /// A holder whose lease already lapsed gets `Expired` and must acquire
    /// again; the lapsed lock is expired as a side effect.
    pub async fn heartbeat(&self, resource_id: ResourceId, owner_id: &str) -> Result<Lock, CoreError> {
        let owner_id = validate_owner_id(owner_id)?;
        let slot = self
            .registry
            .existing_slot(resource_id)
            .await
            .ok_or_else(|| no_active_lock(resource_id))?;
        let mut slot = slot.lock().await;
        slot.check_integrity()?;
        let now = self.clock.now();

        if let Some(expired) = slot.expire_if_lapsed(now) {
            tracing::info!(
                resource_id = %resource_id,
                lock_id = %expired.id,
                "Lapsed lock expired on heartbeat",
            );
        }

        let (status, held_by_caller) = match slot.current() {
            Some(lock) => (lock.status, lock.is_held_by(owner_id)),
            None => return Err(no_active_lock(resource_id)),
        };

        match (status, held_by_caller) {
            (LockStatus::Held, true) => {
                let lock = slot.renew(now, None)?;
                tracing::debug!(
                    resource_id = %resource_id,
                    lock_id = %lock.id,
                    owner_id,
                    "Heartbeat accepted",
                );
                Ok(lock)
            }
            (LockStatus::Held, false) => Err(CoreError::Forbidden(
                "Lock owned by different owner".into(),
            )),
            (LockStatus::Expired, true) => {
                tracing::warn!(
                    resource_id = %resource_id,
                    owner_id,
                    "Heartbeat after lease expired",
                );
                Err(CoreError::Expired(
                    "Lock lease expired before heartbeat; acquire again".into(),
                ))
            }
            _ => Err(no_active_lock(resource_id)),
        }
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    /// Most recent lock record for a resource, after lazy expiry.
    pub async fn get(&self, resource_id: ResourceId) -> Result<Lock, CoreError> {
        let not_found = || CoreError::NotFound {
            entity: "Lock",
            id: resource_id,
        };
        let slot = self
            .registry
            .existing_slot(resource_id)
            .await
            .ok_or_else(not_found)?;
        let mut slot = slot.lock().await;
        slot.check_integrity()?;
        slot.expire_if_lapsed(self.clock.now());
        slot.current().cloned().ok_or_else(not_found)
    }

    /// Latest lock record of every resource, newest first.
    ///
    /// Reports stored status as-is; lapsed locks show as `HELD` until the
    /// sweeper or a per-resource operation expires them.
    pub async fn list(&self) -> Vec<Lock> {
        let mut locks = Vec::new();
        for slot in self.registry.all_slots().await {
            if let Some(lock) = slot.lock().await.current() {
                locks.push(lock.clone());
            }
        }
        locks.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        locks
    }

    /// Recorded usage for a resource, oldest first.
    pub async fn usage_samples(&self, resource_id: ResourceId) -> Vec<UsageSample> {
        match self.registry.existing_slot(resource_id).await {
            Some(slot) => slot.lock().await.usage_samples(),
            None => Vec::new(),
        }
    }

    // -----------------------------------------------------------------------
    // Sweep
    // -----------------------------------------------------------------------

    /// Expire every lapsed lock. Returns how many were expired.
    ///
    /// Each slot is re-checked under its own mutex with a fresh clock
    /// reading, so a heartbeat that won the race keeps its lock.
    pub async fn sweep_expired(&self) -> usize {
        let mut expired = 0;
        for slot in self.registry.all_slots().await {
            let mut slot = slot.lock().await;
            if let Err(e) = slot.check_integrity() {
                tracing::error!(error = %e, "Sweeper skipped corrupt slot");
                continue;
            }
            if let Some(lock) = slot.expire_if_lapsed(self.clock.now()) {
                tracing::info!(
                    resource_id = %lock.resource_id,
                    lock_id = %lock.id,
                    owner_id = %lock.owner_id,
                    "Sweeper expired lapsed lock",
                );
                expired += 1;
            }
        }
        expired
    }

    // -----------------------------------------------------------------------
    // Insight
    // -----------------------------------------------------------------------

    /// Suggest a TTL for `resource_id` from its recorded usage.
    pub async fn suggest_ttl(
        &self,
        resource_id: ResourceId,
        owner_id: &str,
        historical_ttl: Option<i64>,
    ) -> Result<TtlSuggestion, CoreError> {
        let owner_id = validate_owner_id(owner_id)?;
        let fallback = historical_ttl
            .map(|ttl| validate_ttl(ttl, u32::MAX))
            .transpose()?;

        if !self.resources.exists(resource_id).await {
            return Err(CoreError::NotFound {
                entity: "Resource",
                id: resource_id,
            });
        }

        let samples = self.usage_samples(resource_id).await;
        let suggestion = insight::suggest_ttl(&samples, fallback);
        tracing::debug!(
            resource_id = %resource_id,
            owner_id,
            samples = samples.len(),
            suggested_ttl = suggestion.suggested_ttl,
            anomaly_score = suggestion.anomaly_score,
            "TTL suggestion computed",
        );
        Ok(suggestion)
    }

    // -----------------------------------------------------------------------
    // Snapshot
    // -----------------------------------------------------------------------

    /// Capture every slot for persistence.
    pub async fn export_slots(&self) -> Vec<SlotSnapshot> {
        let mut snapshots = Vec::new();
        for slot in self.registry.all_slots().await {
            snapshots.push(slot.lock().await.to_snapshot());
        }
        snapshots.sort_by_key(|s| s.resource_id);
        snapshots
    }

    /// Replace all lock state with previously exported slots.
    pub async fn restore_slots(&self, snapshots: Vec<SlotSnapshot>) {
        self.registry.restore(snapshots).await;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
