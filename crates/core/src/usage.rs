//! Usage recording for finished locks.
//!
//! Every lock that reaches a terminal state leaves one [`UsageSample`] in its
//! resource's [`UsageHistory`]. The history is a [`BoundedRing`], so only the
//! most recent samples are kept no matter how long a resource lives.

use serde::{Deserialize, Serialize};

use crate::lock::{seconds_between, LockStatus};
use crate::ring::BoundedRing;
use crate::types::Timestamp;

/// Default number of samples kept per resource.
pub const DEFAULT_HISTORY_CAPACITY: usize = 50;

/// Heartbeat intervals kept for a single lock.
pub const MAX_HEARTBEAT_INTERVALS: usize = 64;

/// One finished hold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageSample {
    pub hold_duration_seconds: f64,
    pub heartbeat_interval_seconds: Vec<f64>,
    pub outcome: LockStatus,
    pub owner_id: String,
    pub ended_at: Timestamp,
}

/// Bounded per-resource sample history.
#[derive(Debug, Clone)]
pub struct UsageHistory {
    samples: BoundedRing<UsageSample>,
}

impl UsageHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: BoundedRing::new(capacity),
        }
    }

    pub fn record(&mut self, sample: UsageSample) {
        self.samples.push(sample);
    }

    /// Samples oldest first.
    pub fn samples(&self) -> Vec<UsageSample> {
        self.samples.to_vec()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

impl Default for UsageHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}

/// Heartbeat cadence of the lock currently held on a resource.
///
/// Reset whenever a new lock is granted.
#[derive(Debug, Clone)]
pub struct HeartbeatTrace {
    intervals: BoundedRing<f64>,
}

impl HeartbeatTrace {
    pub fn new() -> Self {
        Self {
            intervals: BoundedRing::new(MAX_HEARTBEAT_INTERVALS),
        }
    }

    /// Record the gap between the previous heartbeat and `now`.
    pub fn beat(&mut self, previous: Timestamp, now: Timestamp) {
        self.intervals.push(seconds_between(previous, now));
    }

    /// Replace the trace with previously recorded intervals.
    pub fn restore(&mut self, intervals: &[f64]) {
        self.intervals.clear();
        for interval in intervals {
            self.intervals.push(*interval);
        }
    }

    pub fn intervals(&self) -> Vec<f64> {
        self.intervals.to_vec()
    }

    pub fn reset(&mut self) {
        self.intervals.clear();
    }
}

impl Default for HeartbeatTrace {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn sample(hold: f64) -> UsageSample {
        UsageSample {
            hold_duration_seconds: hold,
            heartbeat_interval_seconds: vec![],
            outcome: LockStatus::Released,
            owner_id: "alice".into(),
            ended_at: Utc::now(),
        }
    }

    #[test]
    fn history_keeps_most_recent_samples() {
        let mut history = UsageHistory::new(2);
        history.record(sample(1.0));
        history.record(sample(2.0));
        history.record(sample(3.0));

        let holds: Vec<f64> = history
            .samples()
            .iter()
            .map(|s| s.hold_duration_seconds)
            .collect();
        assert_eq!(holds, vec![2.0, 3.0]);
    }

    #[test]
    fn default_history_uses_default_capacity() {
        let mut history = UsageHistory::default();
        for i in 0..(DEFAULT_HISTORY_CAPACITY + 10) {
            history.record(sample(i as f64));
        }
        assert_eq!(history.len(), DEFAULT_HISTORY_CAPACITY);
    }

    #[test]
    fn heartbeat_trace_records_gaps() {
        let start = Utc::now();
        let mut trace = HeartbeatTrace::new();
        trace.beat(start, start + Duration::seconds(3));
        trace.beat(start + Duration::seconds(3), start + Duration::seconds(10));
        assert_eq!(trace.intervals(), vec![3.0, 7.0]);

        trace.reset();
        assert!(trace.intervals().is_empty());
    }

    #[test]
    fn heartbeat_trace_is_bounded() {
        let start = Utc::now();
        let mut trace = HeartbeatTrace::new();
        for _ in 0..(MAX_HEARTBEAT_INTERVALS * 2) {
            trace.beat(start, start + Duration::seconds(1));
        }
        assert_eq!(trace.intervals().len(), MAX_HEARTBEAT_INTERVALS);
    }
}
