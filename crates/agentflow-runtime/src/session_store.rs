//! Session storage.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::session::{Session, SessionKey};

/// Session store error.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SessionStoreError {
    #[error("Session not found: {0}")]
    NotFound(String),

    #[error("Session already exists: {0}")]
    AlreadyExists(String),

    #[error("Session backend error: {0}")]
    Backend(String),
}

/// Storage for live sessions.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Look up a session by key.
    async fn get(&self, key: &SessionKey) -> Result<Option<Arc<Session>>, SessionStoreError>;

    /// Create a session under `key`. Fails if the key is taken.
    async fn create(&self, key: SessionKey) -> Result<Arc<Session>, SessionStoreError>;

    /// Return the session under `key`, creating it if absent.
    ///
    /// A concurrent creator winning the race yields its session. Stores
    /// that can do this under one lock should override it.
    async fn get_or_insert(&self, key: SessionKey) -> Result<Arc<Session>, SessionStoreError> {
        match self.create(key.clone()).await {
            Err(SessionStoreError::AlreadyExists(_)) => self
                .get(&key)
                .await?
                .ok_or_else(|| SessionStoreError::NotFound(key.to_string())),
            other => other,
        }
    }

    async fn delete(&self, key: &SessionKey) -> Result<(), SessionStoreError>;

    /// Session IDs of one user of one app.
    async fn list(&self, app_name: &str, user_id: &str) -> Result<Vec<String>, SessionStoreError>;
}

/// Volatile in-process session store.
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<SessionKey, Arc<Session>>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for MemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn get(&self, key: &SessionKey) -> Result<Option<Arc<Session>>, SessionStoreError> {
        Ok(self.sessions.read().await.get(key).cloned())
    }

    async fn create(&self, key: SessionKey) -> Result<Arc<Session>, SessionStoreError> {
        let mut sessions = self.sessions.write().await;
        if sessions.contains_key(&key) {
            return Err(SessionStoreError::AlreadyExists(key.to_string()));
        }
        let session = Arc::new(Session::new(key.clone()));
        debug!(session = %key, "Created session");
        sessions.insert(key, session.clone());
        Ok(session)
    }

    async fn get_or_insert(&self, key: SessionKey) -> Result<Arc<Session>, SessionStoreError> {
        let mut sessions = self.sessions.write().await;
        if let Some(session) = sessions.get(&key) {
            return Ok(session.clone());
        }
        let session = Arc::new(Session::new(key.clone()));
        debug!(session = %key, "Created session");
        sessions.insert(key, session.clone());
        Ok(session)
    }

    async fn delete(&self, key: &SessionKey) -> Result<(), SessionStoreError> {
        self.sessions
            .write()
            .await
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| SessionStoreError::NotFound(key.to_string()))
    }

    async fn list(&self, app_name: &str, user_id: &str) -> Result<Vec<String>, SessionStoreError> {
        let sessions = self.sessions.read().await;
        let mut ids: Vec<_> = sessions
            .values()
            .filter(|s| s.app_name() == app_name && s.user_id() == user_id)
            .map(|s| (s.created_at(), s.id().to_string()))
            .collect();
        ids.sort();
        Ok(ids.into_iter().map(|(_, id)| id).collect())
    }
}
