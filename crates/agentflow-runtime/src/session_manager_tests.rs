use super::*;
use async_trait::async_trait;
use std::sync::atomic::{AtomicU32, Ordering};

/// Store whose lookups always fail.
struct BrokenLookupStore {
    inner: MemorySessionStore,
    lookups: AtomicU32,
}

#[async_trait]
impl SessionStore for BrokenLookupStore {
    async fn get(&self, _key: &SessionKey) -> Result<Option<Arc<Session>>, SessionStoreError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        Err(SessionStoreError::Backend("connection refused".to_string()))
    }

    async fn create(&self, key: SessionKey) -> Result<Arc<Session>, SessionStoreError> {
        self.inner.create(key).await
    }

    async fn get_or_insert(&self, key: SessionKey) -> Result<Arc<Session>, SessionStoreError> {
        self.inner.get_or_insert(key).await
    }

    async fn delete(&self, key: &SessionKey) -> Result<(), SessionStoreError> {
        self.inner.delete(key).await
    }

    async fn list(&self, app_name: &str, user_id: &str) -> Result<Vec<String>, SessionStoreError> {
        self.inner.list(app_name, user_id).await
    }
}

/// Store whose lookups take a moment, with the default `get_or_insert`.
struct SlowLookupStore {
    inner: MemorySessionStore,
}

#[async_trait]
impl SessionStore for SlowLookupStore {
    async fn get(&self, key: &SessionKey) -> Result<Option<Arc<Session>>, SessionStoreError> {
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        self.inner.get(key).await
    }

    async fn create(&self, key: SessionKey) -> Result<Arc<Session>, SessionStoreError> {
        self.inner.create(key).await
    }

    async fn delete(&self, key: &SessionKey) -> Result<(), SessionStoreError> {
        self.inner.delete(key).await
    }

    async fn list(&self, app_name: &str, user_id: &str) -> Result<Vec<String>, SessionStoreError> {
        self.inner.list(app_name, user_id).await
    }
}

/// Store where nothing works.
struct DownStore;

#[async_trait]
impl SessionStore for DownStore {
    async fn get(&self, _key: &SessionKey) -> Result<Option<Arc<Session>>, SessionStoreError> {
        Err(SessionStoreError::Backend("down".to_string()))
    }

    async fn create(&self, _key: SessionKey) -> Result<Arc<Session>, SessionStoreError> {
        Err(SessionStoreError::Backend("down".to_string()))
    }

    async fn delete(&self, _key: &SessionKey) -> Result<(), SessionStoreError> {
        Err(SessionStoreError::Backend("down".to_string()))
    }

    async fn list(&self, _app: &str, _user: &str) -> Result<Vec<String>, SessionStoreError> {
        Err(SessionStoreError::Backend("down".to_string()))
    }
}

#[tokio::test]
async fn test_without_id_creates_distinct_sessions() {
    let manager = SessionManager::in_memory();
    let a = manager.get_or_create("app", "alice", None).await.unwrap();
    let b = manager.get_or_create("app", "alice", None).await.unwrap();

    assert_ne!(a.id(), b.id());
    assert!(!Arc::ptr_eq(&a, &b));
}

#[tokio::test]
async fn test_same_id_returns_same_session() {
    let manager = SessionManager::default();
    let a = manager.get_or_create("app", "alice", Some("s1")).await.unwrap();
    a.state().set("seen", serde_json::json!(true));
    let b = manager.get_or_create("app", "alice", Some("s1")).await.unwrap();

    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(b.state().get("seen"), Some(serde_json::json!(true)));
}

#[tokio::test]
async fn test_same_id_different_user_is_different_session() {
    let manager = SessionManager::in_memory();
    let a = manager.get_or_create("app", "alice", Some("s1")).await.unwrap();
    let b = manager.get_or_create("app", "bob", Some("s1")).await.unwrap();
    assert!(!Arc::ptr_eq(&a, &b));
}

#[tokio::test]
async fn test_lookup_failure_falls_back_to_create() {
    let store = Arc::new(BrokenLookupStore {
        inner: MemorySessionStore::new(),
        lookups: AtomicU32::new(0),
    });
    let manager = SessionManager::new(store.clone());

    let session = manager.get_or_create("app", "alice", Some("s1")).await.unwrap();
    assert_eq!(session.id(), "s1");
    assert_eq!(store.lookups.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_lookup_failure_returns_existing_session() {
    let store = Arc::new(BrokenLookupStore {
        inner: MemorySessionStore::new(),
        lookups: AtomicU32::new(0),
    });
    let existing = store
        .inner
        .create(SessionKey::new("app", "alice", "s1"))
        .await
        .unwrap();
    let manager = SessionManager::new(store.clone());

    let session = manager.get_or_create("app", "alice", Some("s1")).await.unwrap();
    assert!(Arc::ptr_eq(&existing, &session));
}

#[tokio::test]
async fn test_concurrent_misses_share_one_session() {
    let manager = SessionManager::new(Arc::new(SlowLookupStore {
        inner: MemorySessionStore::new(),
    }));

    let (a, b) = tokio::join!(
        manager.get_or_create("app", "alice", Some("s1")),
        manager.get_or_create("app", "alice", Some("s1")),
    );
    let (a, b) = (a.unwrap(), b.unwrap());
    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(manager.store().list("app", "alice").await.unwrap(), vec!["s1"]);
}

#[tokio::test]
async fn test_concurrent_misses_in_memory() {
    let manager = Arc::new(SessionManager::in_memory());
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let manager = manager.clone();
            tokio::spawn(async move { manager.get_or_create("app", "alice", Some("s1")).await })
        })
        .collect();

    let mut sessions = Vec::new();
    for handle in handles {
        sessions.push(handle.await.unwrap().unwrap());
    }
    assert!(sessions.iter().all(|s| Arc::ptr_eq(s, &sessions[0])));
}

#[tokio::test]
async fn test_create_failure_is_unavailable() {
    let manager = SessionManager::new(Arc::new(DownStore));
    let err = manager.get_or_create("app", "alice", Some("s1")).await.unwrap_err();

    let SessionError::Unavailable { key, source } = err;
    assert_eq!(key, "app/alice/s1");
    assert_eq!(source, SessionStoreError::Backend("down".to_string()));
}

#[tokio::test]
async fn test_get_and_delete() {
    let manager = SessionManager::in_memory();
    manager.get_or_create("app", "alice", Some("s1")).await.unwrap();

    assert!(manager.get("app", "alice", "s1").await.unwrap().is_some());
    manager.delete("app", "alice", "s1").await.unwrap();
    assert!(manager.get("app", "alice", "s1").await.unwrap().is_none());
    assert!(manager.store().list("app", "alice").await.unwrap().is_empty());
}
