//! Periodic expiry of lapsed leases.
//!
//! Lazy expiry already happens whenever a resource is touched; the sweeper
//! catches resources nobody touches so their leases move to `EXPIRED` and
//! their usage history records the outcome.

use std::sync::Arc;
use std::time::Duration;

use holdfast_core::coordinator::LockCoordinator;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// Run the sweep loop until `cancel` is triggered.
pub async fn run(coordinator: Arc<LockCoordinator>, interval: Duration, cancel: CancellationToken) {
    tracing::info!(?interval, "Expiry sweeper started");

    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Expiry sweeper stopping");
                break;
            }
            _ = ticker.tick() => {
                let expired = coordinator.sweep_expired().await;
                if expired > 0 {
                    tracing::info!(expired, "Expiry sweep: leases expired");
                } else {
                    tracing::trace!("Expiry sweep: nothing lapsed");
                }
            }
        }
    }
}
