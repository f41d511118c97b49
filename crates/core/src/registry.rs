//! Lock registry: the per-resource state behind the coordinator.
//!
//! Each resource that has ever been locked owns one [`ResourceSlot`] behind
//! its own mutex. The map lock is held only long enough to find or insert a
//! slot, so operations on different resources never wait on each other.
//! Every mutation of lock state is a method on `ResourceSlot`, called with
//! the slot mutex held.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};

use crate::error::CoreError;
use crate::lock::{seconds_between, Lock, LockStatus};
use crate::types::{ResourceId, Timestamp};
use crate::usage::{HeartbeatTrace, UsageHistory, UsageSample};

pub type SharedSlot = Arc<Mutex<ResourceSlot>>;

// ---------------------------------------------------------------------------
// Slot
// ---------------------------------------------------------------------------

/// Lock state and usage history for one resource.
#[derive(Debug)]
pub struct ResourceSlot {
    resource_id: ResourceId,
    /// Most recent lock record, active or terminal.
    current: Option<Lock>,
    heartbeats: HeartbeatTrace,
    usage: UsageHistory,
}

impl ResourceSlot {
    pub fn new(resource_id: ResourceId, history_capacity: usize) -> Self {
        Self {
            resource_id,
            current: None,
            heartbeats: HeartbeatTrace::new(),
            usage: UsageHistory::new(history_capacity),
        }
    }

    pub fn resource_id(&self) -> ResourceId {
        self.resource_id
    }

    /// Most recent lock record, whatever its status.
    pub fn current(&self) -> Option<&Lock> {
        self.current.as_ref()
    }

    /// The `HELD` lock, if any. May be lapsed; call
    /// [`expire_if_lapsed`](Self::expire_if_lapsed) first.
    pub fn active(&self) -> Option<&Lock> {
        self.current
            .as_ref()
            .filter(|lock| lock.status == LockStatus::Held)
    }

    pub fn usage_samples(&self) -> Vec<UsageSample> {
        self.usage.samples()
    }

    /// Fail if the slot holds a record that belongs to another resource.
    pub fn check_integrity(&self) -> Result<(), CoreError> {
        match &self.current {
            Some(lock) if lock.resource_id != self.resource_id => Err(CoreError::Internal(format!(
                "lock {} for resource {} is stored under resource {}",
                lock.id, lock.resource_id, self.resource_id
            ))),
            _ => Ok(()),
        }
    }

    /// Grant a fresh lock. Any previous record must already be terminal.
    pub fn grant(&mut self, owner_id: &str, ttl_seconds: u32, now: Timestamp) -> Result<Lock, CoreError> {
        if let Some(active) = self.active() {
            return Err(CoreError::Internal(format!(
                "grant on resource {} while lock {} is still held",
                self.resource_id, active.id
            )));
        }
        let lock = Lock::grant(self.resource_id, owner_id, ttl_seconds, now);
        self.heartbeats.reset();
        self.current = Some(lock.clone());
        Ok(lock)
    }

    /// Bump `last_heartbeat` on the active lock, optionally replacing its TTL.
    pub fn renew(&mut self, now: Timestamp, ttl_seconds: Option<u32>) -> Result<Lock, CoreError> {
        let resource_id = self.resource_id;
        let lock = self
            .current
            .as_mut()
            .filter(|lock| lock.status == LockStatus::Held)
            .ok_or_else(|| {
                CoreError::Internal(format!("renew on resource {resource_id} without a held lock"))
            })?;

        self.heartbeats.beat(lock.last_heartbeat, now);
        lock.last_heartbeat = now;
        if let Some(ttl) = ttl_seconds {
            lock.ttl_seconds = ttl;
        }
        Ok(lock.clone())
    }

    /// Move the active lock to a terminal status and record its usage.
    ///
    /// Returns `None` (and changes nothing) when there is no active lock, so
    /// repeated expiry of the same lock is a no-op.
    pub fn finish(&mut self, status: LockStatus, now: Timestamp) -> Option<Lock> {
        debug_assert!(status.is_terminal());
        let lock = self
            .current
            .as_mut()
            .filter(|lock| lock.status == LockStatus::Held)?;

        lock.status = status;
        let sample = UsageSample {
            hold_duration_seconds: seconds_between(lock.created_at, now),
            heartbeat_interval_seconds: self.heartbeats.intervals(),
            outcome: status,
            owner_id: lock.owner_id.clone(),
            ended_at: now,
        };
        let finished = lock.clone();

        self.heartbeats.reset();
        self.usage.record(sample);
        Some(finished)
    }

    /// Lazy expiry: if the active lock's lease is over, mark it `EXPIRED`.
    pub fn expire_if_lapsed(&mut self, now: Timestamp) -> Option<Lock> {
        let lapsed = self
            .current
            .as_ref()
            .is_some_and(|lock| lock.status == LockStatus::Held && lock.is_lapsed(now));
        if lapsed {
            self.finish(LockStatus::Expired, now)
        } else {
            None
        }
    }

    pub fn to_snapshot(&self) -> SlotSnapshot {
        SlotSnapshot {
            resource_id: self.resource_id,
            lock: self.current.clone(),
            heartbeat_intervals: self.heartbeats.intervals(),
            usage: self.usage.samples(),
        }
    }

    pub fn from_snapshot(snapshot: SlotSnapshot, history_capacity: usize) -> Self {
        let mut slot = Self::new(snapshot.resource_id, history_capacity);
        slot.current = snapshot.lock;
        slot.heartbeats.restore(&snapshot.heartbeat_intervals);
        for sample in snapshot.usage {
            slot.usage.record(sample);
        }
        slot
    }
}

/// Serializable form of a [`ResourceSlot`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotSnapshot {
    pub resource_id: ResourceId,
    pub lock: Option<Lock>,
    #[serde(default)]
    pub heartbeat_intervals: Vec<f64>,
    #[serde(default)]
    pub usage: Vec<UsageSample>,
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Map from resource id to its slot.
#[derive(Debug)]
pub struct LockRegistry {
    slots: RwLock<HashMap<ResourceId, SharedSlot>>,
    history_capacity: usize,
}

impl LockRegistry {
    pub fn new(history_capacity: usize) -> Self {
        Self {
            slots: RwLock::new(HashMap::new()),
            history_capacity,
        }
    }

    /// Slot for `resource_id`, created on first use.
    pub async fn slot(&self, resource_id: ResourceId) -> SharedSlot {
        if let Some(slot) = self.slots.read().await.get(&resource_id) {
            return Arc::clone(slot);
        }
        let mut slots = self.slots.write().await;
        Arc::clone(slots.entry(resource_id).or_insert_with(|| {
            Arc::new(Mutex::new(ResourceSlot::new(
                resource_id,
                self.history_capacity,
            )))
        }))
    }

    /// Slot for `resource_id` if it has ever been locked.
    pub async fn existing_slot(&self, resource_id: ResourceId) -> Option<SharedSlot> {
        self.slots.read().await.get(&resource_id).map(Arc::clone)
    }

    /// Every slot, for scans. The map lock is released before returning.
    pub async fn all_slots(&self) -> Vec<SharedSlot> {
        self.slots.read().await.values().map(Arc::clone).collect()
    }

    /// Replace all slots with restored state.
    pub async fn restore(&self, snapshots: Vec<SlotSnapshot>) {
        let mut slots = self.slots.write().await;
        slots.clear();
        for snapshot in snapshots {
            let resource_id = snapshot.resource_id;
            let slot = ResourceSlot::from_snapshot(snapshot, self.history_capacity);
            slots.insert(resource_id, Arc::new(Mutex::new(slot)));
        }
    }

    pub async fn len(&self) -> usize {
        self.slots.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
