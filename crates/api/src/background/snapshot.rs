//! Periodic and shutdown snapshots of coordinator state.

use std::time::Duration;

use holdfast_store::{Snapshot, SnapshotStore, StoreError};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::state::AppState;

/// Collect the current resources and lock slots.
pub async fn capture(state: &AppState) -> Snapshot {
    let resources = state.resources.list().await;
    let slots = state.coordinator.export_slots().await;
    Snapshot::new(resources, slots)
}

/// Capture and write a snapshot.
pub async fn persist(state: &AppState, store: &SnapshotStore) -> Result<(), StoreError> {
    let snapshot = capture(state).await;
    store.save(&snapshot).await
}

/// Load the snapshot at `store` into `state`. Returns whether one was found.
pub async fn restore(state: &AppState, store: &SnapshotStore) -> Result<bool, StoreError> {
    let Some(snapshot) = store.load().await? else {
        return Ok(false);
    };

    let resource_count = snapshot.resources.len();
    let slot_count = snapshot.slots.len();
    state.resources.restore(snapshot.resources).await;
    state.coordinator.restore_slots(snapshot.slots).await;

    tracing::info!(
        resources = resource_count,
        slots = slot_count,
        "Coordinator state restored from snapshot"
    );
    Ok(true)
}

/// Write a snapshot every `interval` until `cancel` is triggered.
///
/// Write failures are logged and retried on the next tick.
pub async fn run(
    state: AppState,
    store: SnapshotStore,
    interval: Duration,
    cancel: CancellationToken,
) {
    tracing::info!(
        path = %store.path().display(),
        interval_secs = interval.as_secs(),
        "Snapshot job started"
    );

    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately; nothing has changed since startup.
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Snapshot job stopping");
                break;
            }
            _ = ticker.tick() => {
                if let Err(e) = persist(&state, &store).await {
                    tracing::error!(error = %e, "Snapshot: write failed");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use assert_matches::assert_matches;
    use holdfast_core::clock::ManualClock;
    use holdfast_core::error::CoreError;
    use holdfast_core::lock::LockStatus;
    use holdfast_core::resource::CreateResource;

    use crate::config::ServerConfig;

    fn new_state(clock: &ManualClock) -> AppState {
        AppState::new(ServerConfig::default(), Arc::new(clock.clone()))
    }

    #[tokio::test]
    async fn restore_from_missing_file_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path().join("state.json"));
        let state = new_state(&ManualClock::default());

        assert!(!restore(&state, &store).await.unwrap());
        assert!(state.resources.is_empty().await);
    }

    #[tokio::test]
    async fn persisted_state_survives_a_restart() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path().join("state.json"));
        let clock = ManualClock::default();

        let before = new_state(&clock);
        let resource = before
            .resources
            .create(&CreateResource {
                resource_type: "room".into(),
                identifier: "A1".into(),
            })
            .await
            .unwrap();
        let lock = before
            .coordinator
            .acquire(resource.id, "alice", 60)
            .await
            .unwrap();
        persist(&before, &store).await.unwrap();

        let after = new_state(&clock);
        assert!(restore(&after, &store).await.unwrap());

        assert_eq!(after.resources.get(resource.id).await, Some(resource.clone()));
        let restored = after.coordinator.get(resource.id).await.unwrap();
        assert_eq!(restored.id, lock.id);
        assert_eq!(restored.status, LockStatus::Held);

        // The restored lease is still enforced.
        assert_matches!(
            after.coordinator.acquire(resource.id, "bob", 60).await,
            Err(CoreError::Conflict(_))
        );
    }
}
