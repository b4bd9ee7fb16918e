//! Repository ports: the engine depends only on these traits, never on a
//! concrete datastore. Grounded on `iqrah-core`'s `ports::UserRepository`
//! pattern (async_trait + `mockall::automock` behind a `testing` feature),
//! which is the same re-architecture the spec's DESIGN NOTES (§9) ask for:
//! "explicit identifier-based lookups through the repository interfaces; no
//! hidden I/O on field access."

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use smartscheduler_domain::{
    Assignment, AuditRecommendation, Contractor, DistanceCacheEntry, DistanceCacheKey, EventLogEntry, Job,
    SkillCatalogue, WeightsConfig,
};

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait ContractorRepository: Send + Sync {
    async fn get(&self, id: Uuid) -> anyhow::Result<Option<Contractor>>;

    /// Candidates whose skill set is a superset of `required_skills` (the
    /// hard filter of §4.7 step 2). Implementations may push this down to
    /// SQL; the in-memory fake used in tests filters in Rust.
    async fn find_with_skills(
        &self,
        required_skills: &std::collections::BTreeSet<String>,
    ) -> anyhow::Result<Vec<Contractor>>;
}

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait JobRepository: Send + Sync {
    async fn get(&self, id: Uuid) -> anyhow::Result<Option<Job>>;
}

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait AssignmentRepository: Send + Sync {
    /// Non-cancelled assignments for a contractor overlapping `[from, to]`.
    async fn active_for_contractor_in_range(
        &self,
        contractor_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> anyhow::Result<Vec<Assignment>>;

    /// Count of non-cancelled assignments for a contractor starting within
    /// the `rotation.window_days` look-back (§4.6 rotation factor).
    async fn count_recent_for_contractor(
        &self,
        contractor_id: Uuid,
        since: DateTime<Utc>,
    ) -> anyhow::Result<u32>;

    /// Insert a new assignment as part of the unit-of-work described in §9
    /// (assignment row + audit link + event-log row commit together).
    async fn insert(&self, assignment: &Assignment) -> anyhow::Result<()>;

    async fn get(&self, id: Uuid) -> anyhow::Result<Option<Assignment>>;

    async fn cancel(&self, id: Uuid) -> anyhow::Result<()>;
}

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait AuditRepository: Send + Sync {
    async fn insert(&self, audit: &AuditRecommendation) -> anyhow::Result<()>;

    async fn latest_for_job(&self, job_id: Uuid) -> anyhow::Result<Option<AuditRecommendation>>;
}

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait EventLogRepository: Send + Sync {
    /// Append the log row. Must succeed before any subscriber is invoked
    /// (§4.9, §5 happens-after ordering).
    async fn append(&self, entry: &EventLogEntry) -> anyhow::Result<()>;

    /// True if an entry with this id has already been delivered — backs the
    /// idempotent-by-event-id invariant of §8.
    async fn already_delivered(&self, id: Uuid) -> anyhow::Result<bool>;
}

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait WeightsConfigRepository: Send + Sync {
    async fn active(&self) -> anyhow::Result<WeightsConfig>;

    async fn skill_catalogue(&self) -> anyhow::Result<SkillCatalogue>;
}

/// Durable backstop for C2's in-process `DashMap` cache (§4.1 caching
/// policy), so a freshly restarted instance doesn't cold-call the routing
/// provider for every pair it had already resolved. Never on the request
/// hot path: `DistanceService` consults the in-memory cache first and
/// treats this port as best-effort.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait DistanceCacheRepository: Send + Sync {
    async fn get(&self, key: DistanceCacheKey) -> anyhow::Result<Option<DistanceCacheEntry>>;

    async fn put(&self, key: DistanceCacheKey, entry: DistanceCacheEntry) -> anyhow::Result<()>;
}
