//! API request/response types
//!
//! These types are used for JSON serialization in API endpoints.

use serde::Serialize;

/// Server status response
#[derive(Debug, Clone, Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
    pub version: &'static str,
    /// Relay session state: "idle", "active", or "closed"
    pub session: &'static str,
    pub pending_triggers: u64,
}

/// Current HMD position response
#[derive(Debug, Clone, Serialize)]
pub struct PositionResponse {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// Trigger arm response
#[derive(Debug, Clone, Serialize)]
pub struct ArmResponse {
    pub status: &'static str,
    pub count: u64,
}
