//! Session gate: turns raw authentication state into a proceed-or-redirect
//! decision, and lets a long-lived view subscribe to changes of it.

use tokio::sync::watch;
use uuid::Uuid;

pub const LOGIN_PATH: &str = "/login";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unknown,
    Authenticated(Uuid),
    Unauthenticated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// Authentication has not resolved yet.
    Wait,
    Proceed(Uuid),
    Redirect(&'static str),
}

impl SessionState {
    pub fn from_user(user_id: Option<Uuid>) -> Self {
        match user_id {
            Some(id) => SessionState::Authenticated(id),
            None => SessionState::Unauthenticated,
        }
    }

    pub fn decision(&self) -> GateDecision {
        match self {
            SessionState::Unknown => GateDecision::Wait,
            SessionState::Authenticated(id) => GateDecision::Proceed(*id),
            SessionState::Unauthenticated => GateDecision::Redirect(LOGIN_PATH),
        }
    }
}

/// Holds the current session state for one view. Starts `Unknown`.
pub struct SessionGate {
    tx: watch::Sender<SessionState>,
}

impl Default for SessionGate {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionGate {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(SessionState::Unknown);
        Self { tx }
    }

    pub fn state(&self) -> SessionState {
        *self.tx.borrow()
    }

    /// Record the outcome of an authentication check. Subscribers are only
    /// woken when the state actually changes.
    pub fn resolve(&self, user_id: Option<Uuid>) {
        let next = SessionState::from_user(user_id);
        self.tx.send_if_modified(|current| {
            if *current == next {
                return false;
            }
            tracing::debug!(from = ?current, to = ?next, "Session state changed");
            *current = next;
            true
        });
    }

    pub fn observe(&self) -> SessionSubscription {
        SessionSubscription {
            rx: self.tx.subscribe(),
        }
    }
}

/// A live subscription to a [`SessionGate`]. Dropping it, or calling
/// [`SessionSubscription::unsubscribe`], releases it.
pub struct SessionSubscription {
    rx: watch::Receiver<SessionState>,
}

impl SessionSubscription {
    pub fn current(&self) -> SessionState {
        *self.rx.borrow()
    }

    /// Wait for the next state change. `None` once the gate is gone.
    pub async fn changed(&mut self) -> Option<SessionState> {
        self.rx.changed().await.ok()?;
        Some(*self.rx.borrow_and_update())
    }

    pub fn unsubscribe(self) {}
}
