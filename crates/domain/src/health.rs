//! Operability surface (§2 supplemented feature): uptime and datastore
//! connectivity, not a scheduling concern but the ambient health endpoints
//! every service in this stack ships.

use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub build_sha: String,
    pub uptime_seconds: u64,
}

#[derive(Debug, Serialize)]
pub struct ReadyResponse {
    pub status: String,
    pub database: String,
}
