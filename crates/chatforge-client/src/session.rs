use std::sync::Mutex;

use crate::domain::repository::SessionStore;
use crate::domain::types::{Identity, Session};
use crate::error::ClientError;

/// Holds the authenticated identity for the life of the application session.
///
/// The in-memory copy is the source of truth; every mutation is mirrored to
/// the durable store so the session survives restarts until destroyed.
pub struct SessionHandle<S: SessionStore> {
    current: Mutex<Option<Session>>,
    store: S,
}

impl<S: SessionStore> SessionHandle<S> {
    /// Read the durable store once at startup.
    pub fn restore(store: S) -> Self {
        let current = store.load();
        Self {
            current: Mutex::new(current),
            store,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.current.lock().unwrap().is_some()
    }

    pub fn token(&self) -> Option<String> {
        self.current
            .lock()
            .unwrap()
            .as_ref()
            .map(|s| s.token.clone())
    }

    pub fn user(&self) -> Option<Identity> {
        self.current
            .lock()
            .unwrap()
            .as_ref()
            .map(|s| s.user.clone())
    }

    /// Token for an authenticated call, or `AuthExpired` when none is held.
    pub fn require_token(&self) -> Result<String, ClientError> {
        self.token().ok_or(ClientError::AuthExpired)
    }

    /// Install a freshly obtained session (login or post-verification login).
    pub fn establish(&self, session: Session) -> Result<(), ClientError> {
        self.store.save(&session)?;
        *self.current.lock().unwrap() = Some(session);
        Ok(())
    }

    /// Destroy the session: explicit logout or an authorization failure.
    pub fn destroy(&self) -> Result<(), ClientError> {
        self.store.clear()?;
        *self.current.lock().unwrap() = None;
        Ok(())
    }
}
