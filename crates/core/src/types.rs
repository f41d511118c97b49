/// Resources are keyed by random UUIDs.
pub type ResourceId = uuid::Uuid;

/// Lock ids are time-ordered UUIDs, freshly allocated on every grant.
pub type LockId = uuid::Uuid;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
