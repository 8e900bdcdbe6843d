//! Memory store protocol definitions.
//!
//! Memory stores keep per-user facts that outlive a single session.
//! Adapters over remote services are expected to be wrapped in a retrying
//! layer by the caller.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::MemoryError;
use crate::types::Metadata;

/// Core trait for long-term memory stores.
#[async_trait]
pub trait MemoryStore: Send + Sync {
    /// Returns the store ID.
    fn id(&self) -> &str;

    /// Store a memory and return the stored record.
    async fn add(&self, memory: NewMemory) -> Result<MemoryRecord, MemoryError>;

    /// Best `limit` matches, highest score first.
    ///
    /// Without `user_id` every user's memories are searched; without
    /// `query` every record matching `filters` scores 1.0.
    async fn search(
        &self,
        user_id: Option<&str>,
        query: Option<&str>,
        limit: usize,
        filters: Option<&Metadata>,
    ) -> Result<Vec<SearchResult>, MemoryError>;

    /// Delete a memory by ID. Returns `false` if no such memory existed.
    async fn delete(&self, memory_id: &str) -> Result<bool, MemoryError>;

    /// Users that have at least one memory.
    async fn users(&self) -> Result<Vec<String>, MemoryError>;

    /// Export the memories matching `filters`, shaped by a JSON schema.
    async fn export(
        &self,
        schema: &serde_json::Value,
        filters: Option<&Metadata>,
    ) -> Result<serde_json::Value, MemoryError>;
}

/// A memory to be stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewMemory {
    pub user_id: String,
    pub content: String,
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl NewMemory {
    pub fn new(user_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            content: content.into(),
            metadata: Metadata::new(),
            tags: Vec::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }
}

/// A stored memory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryRecord {
    pub id: String,
    pub user_id: String,
    pub content: String,
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default)]
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl MemoryRecord {
    /// Whether the record satisfies every filter entry.
    ///
    /// `user_id` compares the owner, `tags` (a string or an array of
    /// strings) requires each tag, and any other key must equal the
    /// metadata value under that key.
    pub fn matches(&self, filters: &Metadata) -> bool {
        filters.iter().all(|(key, expected)| match key.as_str() {
            "user_id" => expected.as_str() == Some(self.user_id.as_str()),
            "tags" => match expected {
                serde_json::Value::String(tag) => self.tags.contains(tag),
                serde_json::Value::Array(tags) => tags
                    .iter()
                    .all(|t| t.as_str().is_some_and(|t| self.tags.iter().any(|own| own == t))),
                _ => false,
            },
            _ => self.metadata.get(key) == Some(expected),
        })
    }
}

/// A search hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub record: MemoryRecord,

    /// Relevance score (0.0 - 1.0).
    pub score: f32,
}
