//! C1 — Clock & ID provider: monotonic UTC now, stable ids for requests.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Injectable source of "now", generalizing the teacher's
/// `start_time: Instant` field into a seam the engine can substitute in
/// tests so the deterministic-output invariant (§8) is actually testable.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock pinned to a fixed instant, for deterministic unit tests.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Generates request/entity ids. A trait seam (rather than calling
/// `Uuid::new_v4()` inline everywhere) so tests can assert on stable ids.
pub trait IdProvider: Send + Sync {
    fn new_id(&self) -> Uuid;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct UuidProvider;

impl IdProvider for UuidProvider {
    fn new_id(&self) -> Uuid {
        Uuid::new_v4()
    }
}
