//! HMD Bridge Library
//!
//! A minimal real-time bridge between a spatial-tracking client (streams
//! 3-axis HMD position over a WebSocket) and a trigger-arming control client
//! (HTTP). The server holds the last known position and a pending-trigger
//! counter, and relays one "Pressed" notification per drained trigger.

pub mod api;
pub mod settings;
pub mod telemetry;

pub use api::{Position, SessionState, SharedState, SharedStateHandle};
pub use settings::BridgeSettings;
