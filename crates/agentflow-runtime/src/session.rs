//! Sessions: per-conversation state and event log.

use std::fmt;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use agentflow_protocols::types::{Content, Event, SessionState, USER_AUTHOR};

/// Identity of a session.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionKey {
    pub app_name: String,
    pub user_id: String,
    pub session_id: String,
}

impl SessionKey {
    pub fn new(
        app_name: impl Into<String>,
        user_id: impl Into<String>,
        session_id: impl Into<String>,
    ) -> Self {
        Self {
            app_name: app_name.into(),
            user_id: user_id.into(),
            session_id: session_id.into(),
        }
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.app_name, self.user_id, self.session_id)
    }
}

/// A conversation: shared state plus the log of completed events.
///
/// Sessions are handed around as `Arc<Session>`; every node of a run sees
/// the same instance and mutates its state in place.
pub struct Session {
    key: SessionKey,
    state: SessionState,
    events: RwLock<Vec<Event>>,
    created_at: DateTime<Utc>,
}

impl Session {
    pub fn new(key: SessionKey) -> Self {
        Self {
            key,
            state: SessionState::new(),
            events: RwLock::new(Vec::new()),
            created_at: Utc::now(),
        }
    }

    pub fn key(&self) -> &SessionKey {
        &self.key
    }

    pub fn id(&self) -> &str {
        &self.key.session_id
    }

    pub fn app_name(&self) -> &str {
        &self.key.app_name
    }

    pub fn user_id(&self) -> &str {
        &self.key.user_id
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Append a completed event to the log. Partial events are not kept.
    pub fn append_event(&self, event: Event) {
        if event.partial {
            return;
        }
        self.events.write().push(event);
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.read().clone()
    }

    pub fn event_count(&self) -> usize {
        self.events.read().len()
    }

    /// Conversation history as seen by a model during `invocation_id`.
    ///
    /// Contains the content of every logged event except the run's own
    /// input message, which the model receives separately.
    pub fn history(&self, invocation_id: &str) -> Vec<Content> {
        self.events
            .read()
            .iter()
            .filter(|e| !(e.author == USER_AUTHOR && e.invocation_id == invocation_id))
            .filter_map(|e| e.content.clone())
            .filter(|c| !c.is_empty())
            .collect()
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("key", &self.key)
            .field("state", &self.state)
            .field("events", &self.event_count())
            .field("created_at", &self.created_at)
            .finish()
    }
}
