//! `/health` endpoint.

use std::time::Instant;

use inkbridge_relay::RelayStatus;
use serde::Serialize;

/// Health check response body.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Always `"healthy"` while the server is running.
    pub status: &'static str,
    /// Seconds since the server started.
    pub uptime_secs: u64,
    #[serde(flatten)]
    pub relay: RelayStatus,
}

pub fn health_check(start_time: Instant, relay: RelayStatus) -> HealthResponse {
    HealthResponse {
        status: "healthy",
        uptime_secs: start_time.elapsed().as_secs(),
        relay,
    }
}
