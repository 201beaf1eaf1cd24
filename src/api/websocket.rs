//! WebSocket relay session
//!
//! Provides the `/ws` endpoint. One session at a time owns the channel:
//! it receives position updates from the tracking client and drains at most
//! one armed trigger per inbound message, sending a `Pressed` notification
//! for each drained trigger.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};

use super::shared::{Position, SharedStateHandle};

/// Literal notification token sent for each drained trigger
const TRIGGER_NOTIFICATION: &str = "Pressed";

/// WebSocket upgrade handler
///
/// Upgrades an HTTP connection to WebSocket and runs the relay session.
/// A new connection supersedes any session already running.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<SharedStateHandle>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| run_session(socket, state))
}

/// Outcome of parsing one inbound text frame
#[derive(Debug, Clone, Copy, PartialEq)]
enum Inbound {
    /// Record carried the complete hmd_x/hmd_y/hmd_z triple
    Position(Position),
    /// Valid record without position fields; ignored silently
    NoPosition,
    /// Not a JSON mapping, or a partial/mistyped position triple
    Malformed,
}

fn parse_inbound(text: &str) -> Inbound {
    let value: serde_json::Value = match serde_json::from_str(text) {
        Ok(value) => value,
        Err(_) => return Inbound::Malformed,
    };
    let Some(record) = value.as_object() else {
        return Inbound::Malformed;
    };

    let has_position_field =
        ["hmd_x", "hmd_y", "hmd_z"].iter().any(|key| record.contains_key(*key));
    if !has_position_field {
        return Inbound::NoPosition;
    }

    let coord = |key| record.get(key).and_then(serde_json::Value::as_f64);
    match (coord("hmd_x"), coord("hmd_y"), coord("hmd_z")) {
        (Some(x), Some(y), Some(z)) => Inbound::Position(Position { x, y, z }),
        _ => Inbound::Malformed,
    }
}

/// Apply one inbound text frame to the shared state
fn handle_text(state: &SharedStateHandle, text: &str) {
    match parse_inbound(text) {
        Inbound::Position(position) => {
            state.update_position(position.x, position.y, position.z);
            tracing::debug!(x = position.x, y = position.y, z = position.z, "Position updated");
        }
        Inbound::NoPosition => {}
        Inbound::Malformed => {
            tracing::warn!("Malformed inbound message, ignoring");
        }
    }
}

/// Run the relay session loop until the channel closes
async fn run_session(socket: WebSocket, state: SharedStateHandle) {
    let (mut sender, mut receiver) = socket.split();
    // Subscribe before registering so this session's own generation bump is
    // the first change the receiver sees; later bumps mean supersession.
    let mut session_rx = state.watch_session();
    let generation = state.begin_session();
    tracing::info!(generation, "Tracking client connected");

    loop {
        let msg = tokio::select! {
            msg = receiver.next() => msg,
            changed = session_rx.changed() => {
                if changed.is_ok() && state.is_current_session(generation) {
                    continue;
                }
                tracing::info!(generation, "Session superseded by a newer connection");
                let _ = sender.send(Message::Close(None)).await;
                break;
            }
        };

        // Ping/Pong frames are transport housekeeping; only data frames
        // count as inbound records for the drain step.
        let is_record = match msg {
            None => {
                tracing::info!("Peer closed the channel");
                break;
            }
            Some(Err(e)) => {
                tracing::warn!("WebSocket receive error: {}", e);
                break;
            }
            Some(Ok(Message::Close(_))) => {
                tracing::info!("Peer requested close");
                break;
            }
            Some(Ok(Message::Text(text))) => {
                // An empty message is a peer-initiated close
                if text.is_empty() {
                    tracing::info!("Peer sent empty message, closing");
                    break;
                }
                handle_text(&state, &text);
                true
            }
            Some(Ok(Message::Binary(_))) => {
                tracing::warn!("Ignoring binary frame");
                true
            }
            Some(Ok(_)) => false,
        };

        // One drain maximum per inbound record: multiple pending triggers
        // go out one per message, never in a burst.
        if is_record && state.drain_one_trigger() {
            if sender
                .send(Message::Text(TRIGGER_NOTIFICATION.to_string()))
                .await
                .is_err()
            {
                tracing::warn!("Notification send failed, closing session");
                break;
            }
            tracing::debug!("Sent trigger notification");
        }
    }

    state.end_session(generation);
    tracing::info!(generation, "Relay session closed");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::shared::SharedState;
    use std::sync::Arc;

    #[test]
    fn test_parse_complete_position() {
        let parsed = parse_inbound(r#"{"hmd_x":1.5,"hmd_y":2.0,"hmd_z":-3.0}"#);
        assert_eq!(parsed, Inbound::Position(Position { x: 1.5, y: 2.0, z: -3.0 }));
    }

    #[test]
    fn test_parse_record_without_position_fields() {
        assert_eq!(parse_inbound(r#"{"battery":0.8}"#), Inbound::NoPosition);
        assert_eq!(parse_inbound("{}"), Inbound::NoPosition);
    }

    #[test]
    fn test_parse_partial_triple_is_malformed() {
        assert_eq!(parse_inbound(r#"{"hmd_x":1.0,"hmd_y":2.0}"#), Inbound::Malformed);
    }

    #[test]
    fn test_parse_mistyped_coordinate_is_malformed() {
        assert_eq!(
            parse_inbound(r#"{"hmd_x":"a","hmd_y":2.0,"hmd_z":3.0}"#),
            Inbound::Malformed
        );
    }

    #[test]
    fn test_parse_non_mapping_is_malformed() {
        assert_eq!(parse_inbound("not json"), Inbound::Malformed);
        assert_eq!(parse_inbound("[1,2,3]"), Inbound::Malformed);
        assert_eq!(parse_inbound("42"), Inbound::Malformed);
    }

    #[test]
    fn test_position_update_reaches_shared_state() {
        let state = Arc::new(SharedState::new(100));
        handle_text(&state, r#"{"hmd_x":1.5,"hmd_y":2.0,"hmd_z":-3.0}"#);
        assert_eq!(state.position(), Position { x: 1.5, y: 2.0, z: -3.0 });
    }

    #[test]
    fn test_malformed_update_leaves_position_unchanged() {
        let state = Arc::new(SharedState::new(100));
        handle_text(&state, r#"{"hmd_x":1.0,"hmd_y":2.0,"hmd_z":3.0}"#);
        handle_text(&state, r#"{"hmd_x":9.0}"#);
        assert_eq!(state.position(), Position { x: 1.0, y: 2.0, z: 3.0 });
    }

    #[test]
    fn test_two_pending_triggers_drain_one_per_message() {
        let state = Arc::new(SharedState::new(100));
        state.arm_trigger();
        state.arm_trigger();

        // Mirror the per-message step of the session loop for three
        // inbound records: exactly one notification per record while
        // triggers are pending, none afterwards.
        let mut notifications = Vec::new();
        for text in ["{}", r#"{"hmd_x":0.1,"hmd_y":0.2,"hmd_z":0.3}"#, "{}"] {
            handle_text(&state, text);
            notifications.push(state.drain_one_trigger());
        }
        assert_eq!(notifications, vec![true, true, false]);
        assert_eq!(state.pending_triggers(), 0);
    }
}
