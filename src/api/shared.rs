//! Shared state between the relay session and HTTP handlers
//!
//! This module provides thread-safe access to the bridge state: the last
//! known HMD position and the pending-trigger counter. All mutations go
//! through a single mutex so counter updates are never lost under
//! concurrent arming.

use std::sync::{Arc, Mutex};

use tokio::sync::watch;

/// Last known HMD position
///
/// Overwritten wholesale on every complete inbound update; partial updates
/// never reach this struct. Zero on all axes until the first update.
#[derive(Debug, Clone, Copy, PartialEq, Default, serde::Serialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// Relay session lifecycle, as reported by `/api/status`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No WebSocket connection has been established yet
    Idle,
    /// A relay session owns the channel and is running its loop
    Active,
    /// The last session ended (peer close, transport error, or supersession)
    Closed,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::Active => "active",
            SessionState::Closed => "closed",
        }
    }
}

/// Mutable record guarded by the state mutex
#[derive(Debug)]
struct RelayState {
    position: Position,
    pending_triggers: u64,
    session: SessionState,
}

/// Consistent view of the session state and pending count for status reads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BridgeSnapshot {
    pub session: SessionState,
    pub pending_triggers: u64,
}

/// Shared state accessible by the relay session and HTTP handlers
pub struct SharedState {
    inner: Mutex<RelayState>,
    /// Soft cap on the pending-trigger counter (see `BridgeSettings`)
    max_pending: u64,
    /// Generation of the most recent WebSocket connection. A watch channel
    /// retains the latest value, so a session loop that is mid-iteration
    /// when superseded still observes the change on its next await.
    session_gen: watch::Sender<u64>,
}

impl SharedState {
    pub fn new(max_pending: u64) -> Self {
        let (session_gen, _) = watch::channel(0);
        Self {
            inner: Mutex::new(RelayState {
                position: Position::default(),
                pending_triggers: 0,
                session: SessionState::Idle,
            }),
            max_pending: max_pending.max(1),
            session_gen,
        }
    }

    /// Replace the position atomically and completely
    pub fn update_position(&self, x: f64, y: f64, z: f64) {
        let mut state = self.inner.lock().unwrap();
        state.position = Position { x, y, z };
    }

    /// Snapshot of the current position
    pub fn position(&self) -> Position {
        self.inner.lock().unwrap().position
    }

    /// Increment the pending-trigger counter and return the new value
    ///
    /// At the configured cap the count is left unchanged and a warning is
    /// logged; armed triggers otherwise accumulate until a session drains
    /// them.
    pub fn arm_trigger(&self) -> u64 {
        let mut state = self.inner.lock().unwrap();
        if state.pending_triggers >= self.max_pending {
            tracing::warn!(
                pending = state.pending_triggers,
                cap = self.max_pending,
                "Pending trigger cap reached, arm ignored"
            );
            return state.pending_triggers;
        }
        state.pending_triggers += 1;
        state.pending_triggers
    }

    /// Consume one pending trigger
    ///
    /// Returns true when a trigger was drained (emit one notification),
    /// false when none were pending. Never underflows.
    pub fn drain_one_trigger(&self) -> bool {
        let mut state = self.inner.lock().unwrap();
        if state.pending_triggers > 0 {
            state.pending_triggers -= 1;
            true
        } else {
            false
        }
    }

    /// Current pending-trigger count
    pub fn pending_triggers(&self) -> u64 {
        self.inner.lock().unwrap().pending_triggers
    }

    /// Current session lifecycle state
    pub fn session_state(&self) -> SessionState {
        self.inner.lock().unwrap().session
    }

    /// Session state and pending count read under one lock acquisition
    pub fn snapshot(&self) -> BridgeSnapshot {
        let state = self.inner.lock().unwrap();
        BridgeSnapshot {
            session: state.session,
            pending_triggers: state.pending_triggers,
        }
    }

    /// Register a new relay session, superseding any active one
    ///
    /// Returns the generation token the session must hold to stay current.
    /// Bumping the generation wakes every subscribed session loop.
    pub fn begin_session(&self) -> u64 {
        let mut generation = 0;
        self.session_gen.send_modify(|gen| {
            *gen += 1;
            generation = *gen;
        });
        self.inner.lock().unwrap().session = SessionState::Active;
        generation
    }

    /// Mark the session closed, unless a newer session already took over
    pub fn end_session(&self, generation: u64) {
        if self.is_current_session(generation) {
            self.inner.lock().unwrap().session = SessionState::Closed;
        }
    }

    /// Whether `generation` still identifies the active session
    pub fn is_current_session(&self, generation: u64) -> bool {
        *self.session_gen.borrow() == generation
    }

    /// Subscribe to session generation changes
    ///
    /// The receiver observes every generation bump, including ones that
    /// happen while the subscriber is busy elsewhere.
    pub fn watch_session(&self) -> watch::Receiver<u64> {
        self.session_gen.subscribe()
    }
}

/// Type alias for the shared state handle used by API handlers
pub type SharedStateHandle = Arc<SharedState>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state() {
        let state = SharedState::new(100);
        assert_eq!(state.position(), Position::default());
        assert_eq!(state.pending_triggers(), 0);
        assert_eq!(state.session_state(), SessionState::Idle);
    }

    #[test]
    fn test_position_read_is_idempotent() {
        let state = SharedState::new(100);
        state.update_position(1.5, 2.0, -3.0);
        let first = state.position();
        let second = state.position();
        assert_eq!(first, second);
        assert_eq!(first, Position { x: 1.5, y: 2.0, z: -3.0 });
    }

    #[test]
    fn test_arm_then_drain_preserves_counter() {
        let state = SharedState::new(100);
        assert_eq!(state.arm_trigger(), 1);
        assert_eq!(state.arm_trigger(), 2);
        assert_eq!(state.arm_trigger(), 3);

        assert!(state.drain_one_trigger());
        assert_eq!(state.pending_triggers(), 2);
        assert!(state.drain_one_trigger());
        assert!(state.drain_one_trigger());

        // Counter is empty; further drains do not mutate
        assert!(!state.drain_one_trigger());
        assert_eq!(state.pending_triggers(), 0);
    }

    #[test]
    fn test_arm_saturates_at_cap() {
        let state = SharedState::new(2);
        assert_eq!(state.arm_trigger(), 1);
        assert_eq!(state.arm_trigger(), 2);
        assert_eq!(state.arm_trigger(), 2);
        assert_eq!(state.pending_triggers(), 2);
    }

    #[test]
    fn test_concurrent_arming_loses_no_updates() {
        let state = Arc::new(SharedState::new(1_000_000));
        let threads: u64 = 8;
        let arms_per_thread: u64 = 250;

        let handles: Vec<_> = (0..threads)
            .map(|_| {
                let state = state.clone();
                std::thread::spawn(move || {
                    for _ in 0..arms_per_thread {
                        state.arm_trigger();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(state.pending_triggers(), threads * arms_per_thread);
    }

    #[test]
    fn test_new_session_supersedes_previous() {
        let state = SharedState::new(100);
        let first = state.begin_session();
        assert!(state.is_current_session(first));
        assert_eq!(state.session_state(), SessionState::Active);

        let second = state.begin_session();
        assert!(!state.is_current_session(first));
        assert!(state.is_current_session(second));

        // The superseded session ending must not clobber the active one
        state.end_session(first);
        assert_eq!(state.session_state(), SessionState::Active);

        state.end_session(second);
        assert_eq!(state.session_state(), SessionState::Closed);
    }

    #[tokio::test]
    async fn test_supersession_signal_is_retained_for_busy_sessions() {
        let state = Arc::new(SharedState::new(100));
        let mut session_rx = state.watch_session();

        let first = state.begin_session();
        // Consume the wakeup for this session's own registration
        session_rx.changed().await.unwrap();
        assert!(state.is_current_session(first));

        // The new connection arrives while no waiter is parked
        let second = state.begin_session();

        // The stale session still observes the change on its next await
        tokio::time::timeout(std::time::Duration::from_millis(200), session_rx.changed())
            .await
            .expect("supersession wakeup was lost")
            .unwrap();
        assert!(!state.is_current_session(first));
        assert!(state.is_current_session(second));
    }

    #[test]
    fn test_snapshot_pairs_session_and_count() {
        let state = SharedState::new(100);
        state.arm_trigger();
        state.arm_trigger();
        let generation = state.begin_session();

        let snapshot = state.snapshot();
        assert_eq!(snapshot.session, SessionState::Active);
        assert_eq!(snapshot.pending_triggers, 2);

        state.end_session(generation);
        assert_eq!(state.snapshot().session, SessionState::Closed);
    }

    #[test]
    fn test_state_survives_session_close() {
        let state = SharedState::new(100);
        state.update_position(0.5, 0.5, 0.5);
        state.arm_trigger();

        let generation = state.begin_session();
        state.end_session(generation);

        assert_eq!(state.position(), Position { x: 0.5, y: 0.5, z: 0.5 });
        assert_eq!(state.arm_trigger(), 2);
    }
}
