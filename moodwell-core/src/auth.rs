//! Authentication-state events as a stream
//!
//! The identity provider is external. Whatever adapter talks to it pushes
//! sign-in / sign-out transitions into an [`AuthStateHub`]; consumers call
//! [`AuthStateHub::subscribe`] and await the next event when they choose to.
//! Each subscription starts with the current state, so a stream can be
//! dropped and re-created at any time without missing where things stand.

use futures::stream::{self, BoxStream, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum AuthState {
    SignedOut,
    SignedIn { user_id: String },
}

impl AuthState {
    /// The user id to pass explicitly into per-user operations.
    pub fn user_id(&self) -> Option<&str> {
        match self {
            AuthState::SignedIn { user_id } => Some(user_id),
            AuthState::SignedOut => None,
        }
    }
}

pub struct AuthStateHub {
    tx: watch::Sender<AuthState>,
}

impl Default for AuthStateHub {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthStateHub {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(AuthState::SignedOut);
        Self { tx }
    }

    pub fn current(&self) -> AuthState {
        self.tx.borrow().clone()
    }

    pub fn sign_in(&self, user_id: impl Into<String>) {
        self.publish(AuthState::SignedIn {
            user_id: user_id.into(),
        });
    }

    pub fn sign_out(&self) {
        self.publish(AuthState::SignedOut);
    }

    /// Repeated identical states are not re-emitted.
    fn publish(&self, next: AuthState) {
        let changed = self.tx.send_if_modified(|state| {
            if *state == next {
                false
            } else {
                *state = next.clone();
                true
            }
        });
        if changed {
            tracing::info!(state = ?next, "Auth state changed");
        }
    }

    /// Lazy stream: current state first, then each change. Ends when the hub
    /// is dropped.
    pub fn subscribe(&self) -> BoxStream<'static, AuthState> {
        let rx = self.tx.subscribe();
        stream::unfold((rx, true), |(mut rx, first)| async move {
            if !first && rx.changed().await.is_err() {
                return None;
            }
            let state = rx.borrow_and_update().clone();
            Some((state, (rx, false)))
        })
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscription_starts_with_current_state() {
        let hub = AuthStateHub::new();
        hub.sign_in("alice");

        let mut events = hub.subscribe();
        assert_eq!(
            events.next().await,
            Some(AuthState::SignedIn {
                user_id: "alice".to_string()
            })
        );
    }

    #[tokio::test]
    async fn test_stream_yields_transitions_in_order() {
        let hub = AuthStateHub::new();
        let mut events = hub.subscribe();
        assert_eq!(events.next().await, Some(AuthState::SignedOut));

        hub.sign_in("bob");
        assert_eq!(
            events.next().await.and_then(|s| s.user_id().map(str::to_string)),
            Some("bob".to_string())
        );

        hub.sign_out();
        assert_eq!(events.next().await, Some(AuthState::SignedOut));
    }

    #[tokio::test]
    async fn test_duplicate_state_is_not_reemitted() {
        let hub = AuthStateHub::new();
        hub.sign_in("carol");
        let mut events = hub.subscribe();
        events.next().await;

        hub.sign_in("carol");
        let pending =
            tokio::time::timeout(std::time::Duration::from_millis(50), events.next()).await;
        assert!(pending.is_err(), "no event expected for an unchanged state");
    }

    #[tokio::test]
    async fn test_stream_ends_when_hub_dropped() {
        let hub = AuthStateHub::new();
        let mut events = hub.subscribe();
        events.next().await;
        drop(hub);
        assert_eq!(events.next().await, None);
    }

    #[tokio::test]
    async fn test_resubscribing_restarts_from_latest() {
        let hub = AuthStateHub::new();
        let first = hub.subscribe();
        drop(first);

        hub.sign_in("dave");
        hub.sign_in("erin");
        let mut events = hub.subscribe();
        assert_eq!(events.next().await.unwrap().user_id(), Some("erin"));
        assert_eq!(hub.current().user_id(), Some("erin"));
    }
}
