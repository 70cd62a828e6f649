//! Current-user session, as reported by the authentication provider.
//!
//! Sign-in itself happens elsewhere; this crate only consumes "who is signed
//! in right now".

use std::sync::{Arc, RwLock};

use recipeshare_core::UserId;

/// Signed-in user as seen by the app.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user_id: UserId,
    pub display_name: Option<String>,
    pub email: Option<String>,
}

impl Session {
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            display_name: None,
            email: None,
        }
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Display name, else email, else nothing.
    pub fn greeting_name(&self) -> Option<&str> {
        self.display_name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .or(self.email.as_deref())
    }
}

pub trait SessionProvider: Send + Sync {
    fn current(&self) -> Option<Session>;

    fn current_user_id(&self) -> Option<UserId> {
        self.current().map(|s| s.user_id)
    }
}

impl<S> SessionProvider for Arc<S>
where
    S: SessionProvider + ?Sized,
{
    fn current(&self) -> Option<Session> {
        (**self).current()
    }
}

/// Session holder for tests/dev.
#[derive(Debug, Default)]
pub struct InMemorySession {
    inner: RwLock<Option<Session>>,
}

impl InMemorySession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn signed_in(session: Session) -> Self {
        Self {
            inner: RwLock::new(Some(session)),
        }
    }

    pub fn sign_in(&self, session: Session) {
        if let Ok(mut s) = self.inner.write() {
            tracing::info!(user = %session.user_id, "signed in");
            *s = Some(session);
        }
    }

    pub fn sign_out(&self) {
        if let Ok(mut s) = self.inner.write() {
            if let Some(prev) = s.take() {
                tracing::info!(user = %prev.user_id, "signed out");
            }
        }
    }
}

impl SessionProvider for InMemorySession {
    fn current(&self) -> Option<Session> {
        self.inner.read().ok()?.clone()
    }
}
