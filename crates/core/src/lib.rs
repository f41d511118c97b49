//! Holdfast domain core.
//!
//! Lease-based exclusive locks over named resources: the lock model and
//! state machine, the per-resource lock registry, the coordinator that serves
//! acquire/release/heartbeat, the bounded usage recorder, and the insight
//! engine that turns recorded usage into TTL suggestions. Nothing in this
//! crate knows about HTTP.

pub mod clock;
pub mod coordinator;
pub mod error;
pub mod insight;
pub mod lock;
pub mod registry;
pub mod resource;
pub mod ring;
pub mod types;
pub mod usage;
