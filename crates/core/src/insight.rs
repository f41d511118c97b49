//! TTL suggestion and anomaly scoring over recorded usage.
//!
//! Pure functions of a sample window; no clock, no randomness. The same
//! history always yields the same suggestion.
//!
//! - `suggested_ttl` is the 90th percentile (nearest rank) of hold durations,
//!   rounded up and clamped to `[MIN_SUGGESTED_TTL_SECS, MAX_SUGGESTED_TTL_SECS]`.
//! - `anomaly_score` is `min(1, max(cv_hold, cv_beat) / CV_SATURATION)`,
//!   where `cv` is the population coefficient of variation (σ / μ) of hold
//!   durations and of all heartbeat intervals in the window.

use serde::Serialize;

use crate::usage::UsageSample;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Suggested TTL when a resource has no recorded history.
pub const DEFAULT_SUGGESTED_TTL_SECS: u32 = 300;

/// Lower clamp on any suggestion.
pub const MIN_SUGGESTED_TTL_SECS: u32 = 60;

/// Upper clamp on any suggestion.
pub const MAX_SUGGESTED_TTL_SECS: u32 = 3600;

/// Percentile of hold durations used for the suggestion.
pub const SUGGESTION_PERCENTILE: usize = 90;

/// Coefficient of variation at which the anomaly score saturates at 1.0.
pub const CV_SATURATION: f64 = 1.0;

/// Fewer samples than this always score 0.
pub const MIN_SAMPLES_FOR_ANOMALY: usize = 2;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TtlSuggestion {
    pub suggested_ttl: u32,
    pub anomaly_score: f64,
}

// ---------------------------------------------------------------------------
// Suggestion
// ---------------------------------------------------------------------------

/// Suggest a TTL and score the dispersion of `samples`.
///
/// `fallback_ttl` replaces the default when there is no history at all.
pub fn suggest_ttl(samples: &[UsageSample], fallback_ttl: Option<u32>) -> TtlSuggestion {
    let holds: Vec<f64> = samples.iter().map(|s| s.hold_duration_seconds).collect();

    let suggested_ttl = match percentile(&holds, SUGGESTION_PERCENTILE) {
        Some(p) => clamp_ttl(p.ceil()),
        None => fallback_ttl
            .map(|ttl| ttl.clamp(MIN_SUGGESTED_TTL_SECS, MAX_SUGGESTED_TTL_SECS))
            .unwrap_or(DEFAULT_SUGGESTED_TTL_SECS),
    };

    TtlSuggestion {
        suggested_ttl,
        anomaly_score: anomaly_score(samples),
    }
}

/// Normalised `[0, 1]` dispersion of hold durations and heartbeat cadence.
pub fn anomaly_score(samples: &[UsageSample]) -> f64 {
    if samples.len() < MIN_SAMPLES_FOR_ANOMALY {
        return 0.0;
    }

    let holds: Vec<f64> = samples.iter().map(|s| s.hold_duration_seconds).collect();
    let intervals: Vec<f64> = samples
        .iter()
        .flat_map(|s| s.heartbeat_interval_seconds.iter().copied())
        .collect();

    let cv_hold = coefficient_of_variation(&holds);
    let cv_beat = if intervals.len() >= 2 {
        coefficient_of_variation(&intervals)
    } else {
        0.0
    };

    let score = (cv_hold.max(cv_beat) / CV_SATURATION).clamp(0.0, 1.0);
    round_to_thousandths(score)
}

// ---------------------------------------------------------------------------
// Statistics helpers
// ---------------------------------------------------------------------------

/// Nearest-rank percentile (`pct` in 1..=100). `None` for an empty slice.
pub fn percentile(values: &[f64], pct: usize) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let pct = pct.clamp(1, 100);
    let rank = (pct * sorted.len()).div_ceil(100);
    sorted.get(rank.saturating_sub(1)).copied()
}

/// Population standard deviation over the mean; 0 when the mean is not positive.
pub fn coefficient_of_variation(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    if mean <= f64::EPSILON {
        return 0.0;
    }
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    variance.sqrt() / mean
}

fn clamp_ttl(secs: f64) -> u32 {
    secs.clamp(
        f64::from(MIN_SUGGESTED_TTL_SECS),
        f64::from(MAX_SUGGESTED_TTL_SECS),
    ) as u32
}

fn round_to_thousandths(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
