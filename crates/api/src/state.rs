use std::sync::Arc;

use holdfast_core::clock::Clock;
use holdfast_core::coordinator::LockCoordinator;
use holdfast_core::resource::{ResourceDirectory, ResourceRegistry};

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc`).
#[derive(Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Registry of lockable resources.
    pub resources: Arc<ResourceRegistry>,
    /// Lease coordinator (acquire/release/heartbeat, sweeps, insight).
    pub coordinator: Arc<LockCoordinator>,
}

impl AppState {
    /// Wire the resource registry and coordinator around `clock`.
    pub fn new(config: ServerConfig, clock: Arc<dyn Clock>) -> Self {
        let resources = Arc::new(ResourceRegistry::new());
        let directory: Arc<dyn ResourceDirectory> = resources.clone();
        let coordinator = Arc::new(LockCoordinator::new(
            directory,
            clock,
            config.coordinator_config(),
        ));
        Self {
            config: Arc::new(config),
            resources,
            coordinator,
        }
    }
}
