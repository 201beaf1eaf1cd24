//! REST API server for HMD Bridge
//!
//! Provides the HTTP endpoints and the WebSocket relay session.

pub mod routes;
pub mod server;
pub mod shared;
pub mod types;
pub mod websocket;

pub use server::{create_shared_state, run_server};
pub use shared::{BridgeSnapshot, Position, SessionState, SharedState, SharedStateHandle};
pub use types::*;
