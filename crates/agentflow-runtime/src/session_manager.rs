//! Session lifecycle: lookup with fallback creation.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, warn};

use crate::session::{Session, SessionKey};
use crate::session_store::{MemorySessionStore, SessionStore, SessionStoreError};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SessionError {
    #[error("Session unavailable: {key}: {source}")]
    Unavailable {
        key: String,
        #[source]
        source: SessionStoreError,
    },
}

/// Resolves sessions for runs.
pub struct SessionManager {
    store: Arc<dyn SessionStore>,
}

impl SessionManager {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self { store }
    }

    /// Manager over a fresh [`MemorySessionStore`].
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemorySessionStore::new()))
    }

    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    /// Return the session for `(app_name, user_id, session_id)`, creating
    /// it if needed.
    ///
    /// Without a `session_id` a new unique ID is generated, so every such
    /// call yields a new session. A lookup miss or lookup failure falls
    /// back to creation, which returns the existing session if another
    /// caller created it first. Only a failed creation is reported.
    pub async fn get_or_create(
        &self,
        app_name: &str,
        user_id: &str,
        session_id: Option<&str>,
    ) -> Result<Arc<Session>, SessionError> {
        let session_id = match session_id {
            Some(id) => id.to_string(),
            None => uuid::Uuid::new_v4().to_string(),
        };
        let key = SessionKey::new(app_name, user_id, session_id);

        match self.store.get(&key).await {
            Ok(Some(session)) => {
                debug!(session = %key, "Reusing session");
                return Ok(session);
            }
            Ok(None) => {}
            Err(e) => warn!(session = %key, error = %e, "Session lookup failed, creating instead"),
        }

        self.store
            .get_or_insert(key.clone())
            .await
            .map_err(|source| SessionError::Unavailable {
                key: key.to_string(),
                source,
            })
    }

    /// Look up an existing session.
    pub async fn get(
        &self,
        app_name: &str,
        user_id: &str,
        session_id: &str,
    ) -> Result<Option<Arc<Session>>, SessionStoreError> {
        self.store
            .get(&SessionKey::new(app_name, user_id, session_id))
            .await
    }

    pub async fn delete(
        &self,
        app_name: &str,
        user_id: &str,
        session_id: &str,
    ) -> Result<(), SessionStoreError> {
        self.store
            .delete(&SessionKey::new(app_name, user_id, session_id))
            .await
    }
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::in_memory()
    }
}

#[cfg(test)]
#[path = "session_manager_tests.rs"]
mod tests;
