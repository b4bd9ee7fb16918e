//! SmartScheduler's recommendation-and-booking engine: C1-C10.
//!
//! This crate has no concrete datastore dependency — every repository access
//! goes through an `async_trait` port in [`ports`], so the engine can be
//! exercised against `mockall`-generated fakes in tests and wired to real
//! Postgres-backed implementations only at the `smartscheduler-api` binary's
//! construction graph.

pub mod assignment_tx;
pub mod availability;
pub mod clock;
pub mod coordinator;
pub mod distance;
pub mod event_sink;
pub mod fatigue;
pub mod ports;
pub mod scorer;
pub mod slots;
pub mod working_hours;

pub use assignment_tx::AssignmentTransaction;
pub use clock::{Clock, FixedClock, IdProvider, SystemClock, UuidProvider};
pub use coordinator::Coordinator;
pub use distance::{DistanceCache, DistanceEta, DistanceService, FakeRoutingProvider, RoutingProvider};
pub use event_sink::{EventSink, EventSubscriber};
