//! Caller identity.
//!
//! Operations never look up "the current user" on their own. Whoever calls
//! them passes a [`Caller`], usually taken from an [`AuthProvider`].

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

/// The signed-in user performing an operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Caller {
    pub user_id: String,
    pub display_name: Option<String>,
    pub email: Option<String>,
}

impl Caller {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            display_name: None,
            email: None,
        }
    }

    /// Builder: set the display name.
    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    /// Builder: set the email.
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Name shown to others: display name, else email, else `fallback`.
    pub fn display_label(&self, fallback: &str) -> String {
        [&self.display_name, &self.email]
            .into_iter()
            .flatten()
            .map(|s| s.trim())
            .find(|s| !s.is_empty())
            .unwrap_or(fallback)
            .to_string()
    }
}

/// External authentication service.
pub trait AuthProvider: Send + Sync {
    /// Signed-in user, if any.
    fn current_user(&self) -> Option<Caller>;

    /// Sign-in state changes. The receiver starts at the current state.
    fn subscribe(&self) -> watch::Receiver<Option<Caller>>;

    /// Signed-in user or [`Error::Unauthenticated`].
    fn require_user(&self) -> Result<Caller> {
        self.current_user().ok_or(Error::Unauthenticated)
    }
}

/// In-process auth state, driven by explicit sign-in and sign-out.
pub struct SessionAuth {
    tx: watch::Sender<Option<Caller>>,
}

impl SessionAuth {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx }
    }

    pub fn sign_in(&self, caller: Caller) {
        tracing::info!("Signed in as {}", caller.user_id);
        self.tx.send_replace(Some(caller));
    }

    pub fn sign_out(&self) {
        if let Some(previous) = self.tx.send_replace(None) {
            tracing::info!("Signed out {}", previous.user_id);
        }
    }
}

impl Default for SessionAuth {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthProvider for SessionAuth {
    fn current_user(&self) -> Option<Caller> {
        self.tx.borrow().clone()
    }

    fn subscribe(&self) -> watch::Receiver<Option<Caller>> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_label_fallbacks() {
        let caller = Caller::new("u1");
        assert_eq!(caller.display_label("Anonymous"), "Anonymous");

        let caller = caller.with_email("aki@example.com");
        assert_eq!(caller.display_label("Anonymous"), "aki@example.com");

        let caller = caller.with_display_name("Aki");
        assert_eq!(caller.display_label("Anonymous"), "Aki");

        let blank = Caller::new("u2").with_display_name("  ");
        assert_eq!(blank.display_label("Anonymous"), "Anonymous");
    }

    #[tokio::test]
    async fn session_state_changes() {
        let auth = SessionAuth::new();
        assert!(matches!(auth.require_user(), Err(Error::Unauthenticated)));

        let mut rx = auth.subscribe();
        assert!(rx.borrow().is_none());

        auth.sign_in(Caller::new("u1"));
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow().as_ref().map(|c| c.user_id.as_str()), Some("u1"));
        assert_eq!(auth.require_user().unwrap().user_id, "u1");

        auth.sign_out();
        rx.changed().await.unwrap();
        assert!(rx.borrow().is_none());
        assert!(auth.current_user().is_none());
    }
}
