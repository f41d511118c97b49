//! Lock record, status machine, and request validation.
//!
//! A lock is a lease: it stays `HELD` only while `now <= last_heartbeat +
//! ttl_seconds`. Past that point it is lapsed regardless of what the stored
//! status says, and whoever observes the lapse first moves it to `EXPIRED`.

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{LockId, ResourceId, Timestamp};

// ---------------------------------------------------------------------------
// Limits
// ---------------------------------------------------------------------------

/// TTL applied by the HTTP layer when a request omits `ttl_seconds`.
pub const DEFAULT_TTL_SECS: i64 = 300;

/// Default upper bound on a requested lease.
pub const DEFAULT_MAX_TTL_SECS: u32 = 86_400;

/// Maximum length of an owner id, in bytes.
pub const MAX_OWNER_ID_LEN: usize = 255;

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LockStatus {
    Held,
    Released,
    Expired,
}

impl LockStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Held => "HELD",
            Self::Released => "RELEASED",
            Self::Expired => "EXPIRED",
        }
    }

    /// `RELEASED` and `EXPIRED` are final; a terminal lock is never mutated.
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Held)
    }
}

impl std::fmt::Display for LockStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Lock record
// ---------------------------------------------------------------------------

/// An exclusive lease on one resource, as exposed over the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lock {
    pub id: LockId,
    pub resource_id: ResourceId,
    pub owner_id: String,
    pub status: LockStatus,
    pub ttl_seconds: u32,
    pub created_at: Timestamp,
    pub last_heartbeat: Timestamp,
}

impl Lock {
    /// Create a freshly granted lock with a new id.
    pub fn grant(resource_id: ResourceId, owner_id: &str, ttl_seconds: u32, now: Timestamp) -> Self {
        Self {
            id: uuid::Uuid::now_v7(),
            resource_id,
            owner_id: owner_id.to_string(),
            status: LockStatus::Held,
            ttl_seconds,
            created_at: now,
            last_heartbeat: now,
        }
    }

    /// `last_heartbeat + ttl_seconds`.
    pub fn expires_at(&self) -> Timestamp {
        self.last_heartbeat + Duration::seconds(i64::from(self.ttl_seconds))
    }

    /// True once `now` is strictly past the lease end.
    pub fn is_lapsed(&self, now: Timestamp) -> bool {
        now > self.expires_at()
    }

    /// `HELD` and not lapsed.
    pub fn is_live(&self, now: Timestamp) -> bool {
        self.status == LockStatus::Held && !self.is_lapsed(now)
    }

    pub fn is_held_by(&self, owner_id: &str) -> bool {
        self.owner_id == owner_id
    }
}

/// Fractional seconds from `from` to `to`, floored at zero.
pub fn seconds_between(from: Timestamp, to: Timestamp) -> f64 {
    let micros = (to - from).num_microseconds().unwrap_or(i64::MAX);
    (micros.max(0) as f64) / 1_000_000.0
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Validate a requested TTL and narrow it to `u32`.
///
/// Rules:
/// - Must be strictly positive.
/// - Must not exceed `max_ttl_secs`.
pub fn validate_ttl(ttl_seconds: i64, max_ttl_secs: u32) -> Result<u32, CoreError> {
    if ttl_seconds <= 0 {
        return Err(CoreError::Validation(format!(
            "ttl_seconds must be positive, got {ttl_seconds}"
        )));
    }
    if ttl_seconds > i64::from(max_ttl_secs) {
        return Err(CoreError::Validation(format!(
            "ttl_seconds must not exceed {max_ttl_secs}, got {ttl_seconds}"
        )));
    }
    // Bounded by max_ttl_secs above.
    Ok(ttl_seconds as u32)
}

/// Validate an owner id.
///
/// Owner ids are opaque: a blank id is rejected, but the id is returned
/// exactly as given, so `" alice"` and `"alice"` are different owners.
pub fn validate_owner_id(owner_id: &str) -> Result<&str, CoreError> {
    if owner_id.trim().is_empty() {
        return Err(CoreError::Validation("owner_id must not be empty".into()));
    }
    if owner_id.len() > MAX_OWNER_ID_LEN {
        return Err(CoreError::Validation(format!(
            "owner_id must not exceed {MAX_OWNER_ID_LEN} characters"
        )));
    }
    Ok(owner_id)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::Utc;

    fn held(ttl: u32) -> (Lock, Timestamp) {
        let now = Utc::now();
        (Lock::grant(uuid::Uuid::new_v4(), "alice", ttl, now), now)
    }

    #[test]
    fn grant_starts_held_with_heartbeat_at_creation() {
        let (lock, now) = held(30);
        assert_eq!(lock.status, LockStatus::Held);
        assert_eq!(lock.created_at, now);
        assert_eq!(lock.last_heartbeat, now);
        assert_eq!(lock.expires_at(), now + Duration::seconds(30));
    }

    #[test]
    fn grants_never_share_ids() {
        let resource = uuid::Uuid::new_v4();
        let now = Utc::now();
        let a = Lock::grant(resource, "alice", 10, now);
        let b = Lock::grant(resource, "alice", 10, now);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn lapse_is_strictly_after_expiry() {
        let (lock, now) = held(5);
        assert!(!lock.is_lapsed(now + Duration::seconds(5)));
        assert!(lock.is_lapsed(now + Duration::seconds(5) + Duration::microseconds(1)));
    }

    #[test]
    fn terminal_lock_is_never_live() {
        let (mut lock, now) = held(60);
        lock.status = LockStatus::Released;
        assert!(!lock.is_live(now));
    }

    #[test]
    fn status_serializes_as_upper_case() {
        let json = serde_json::to_string(&LockStatus::Expired).unwrap();
        assert_eq!(json, "\"EXPIRED\"");
        assert!(LockStatus::Released.is_terminal());
        assert!(!LockStatus::Held.is_terminal());
    }

    #[test]
    fn lock_serializes_with_iso_timestamps() {
        let (lock, _) = held(5);
        let json = serde_json::to_value(&lock).unwrap();
        assert_eq!(json["status"], "HELD");
        assert_eq!(json["ttl_seconds"], 5);
        let created = json["created_at"].as_str().unwrap();
        assert!(chrono::DateTime::parse_from_rfc3339(created).is_ok());
    }

    #[test]
    fn seconds_between_floors_negative_spans() {
        let now = Utc::now();
        assert_eq!(seconds_between(now, now - Duration::seconds(3)), 0.0);
        assert_eq!(seconds_between(now, now + Duration::milliseconds(1500)), 1.5);
    }

    #[test]
    fn validate_ttl_rejects_non_positive() {
        assert_matches!(validate_ttl(0, 100), Err(CoreError::Validation(_)));
        assert_matches!(validate_ttl(-5, 100), Err(CoreError::Validation(_)));
    }

    #[test]
    fn validate_ttl_rejects_above_max() {
        assert_matches!(validate_ttl(101, 100), Err(CoreError::Validation(_)));
        assert_eq!(validate_ttl(100, 100).unwrap(), 100);
    }

    #[test]
    fn validate_owner_id_keeps_id_verbatim_and_rejects_blank() {
        assert_eq!(validate_owner_id("  bob ").unwrap(), "  bob ");
        assert_matches!(validate_owner_id("   "), Err(CoreError::Validation(_)));
        let long = "x".repeat(MAX_OWNER_ID_LEN + 1);
        assert_matches!(validate_owner_id(&long), Err(CoreError::Validation(_)));
    }
}
