//! Memory store implementations.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::debug;

use agentflow_protocols::error::MemoryError;
use agentflow_protocols::memory::{MemoryRecord, MemoryStore, NewMemory, SearchResult};
use agentflow_protocols::types::Metadata;

use crate::retry::{RetryConfig, with_retry_if};

/// Volatile memory store scoring by word overlap.
pub struct InMemoryMemoryStore {
    records: RwLock<Vec<MemoryRecord>>,
}

impl InMemoryMemoryStore {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(Vec::new()),
        }
    }
}

impl Default for InMemoryMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn tokens(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Share of query words present in `content`.
fn overlap_score(query: &HashSet<String>, content: &str) -> f32 {
    if query.is_empty() {
        return 1.0;
    }
    let content = tokens(content);
    let hits = query.iter().filter(|t| content.contains(*t)).count();
    hits as f32 / query.len() as f32
}

/// Keep only the top-level record fields named in `schema.properties`.
fn project(record: &MemoryRecord, schema: &serde_json::Value) -> Result<serde_json::Value, MemoryError> {
    let value = serde_json::to_value(record)
        .map_err(|e| MemoryError::SerializationError(e.to_string()))?;
    let Some(properties) = schema.get("properties").and_then(|p| p.as_object()) else {
        return Ok(value);
    };
    match value {
        serde_json::Value::Object(mut fields) => {
            fields.retain(|key, _| properties.contains_key(key));
            Ok(serde_json::Value::Object(fields))
        }
        other => Ok(other),
    }
}

#[async_trait]
impl MemoryStore for InMemoryMemoryStore {
    fn id(&self) -> &str {
        "in-memory"
    }

    async fn add(&self, memory: NewMemory) -> Result<MemoryRecord, MemoryError> {
        let record = MemoryRecord {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: memory.user_id,
            content: memory.content,
            metadata: memory.metadata,
            tags: memory.tags,
            created_at: Utc::now(),
        };
        debug!(memory = %record.id, user = %record.user_id, "Stored memory");
        self.records.write().await.push(record.clone());
        Ok(record)
    }

    async fn search(
        &self,
        user_id: Option<&str>,
        query: Option<&str>,
        limit: usize,
        filters: Option<&Metadata>,
    ) -> Result<Vec<SearchResult>, MemoryError> {
        let query = tokens(query.unwrap_or_default());
        let records = self.records.read().await;

        let mut results: Vec<SearchResult> = records
            .iter()
            .filter(|r| user_id.is_none_or(|user| r.user_id == user))
            .filter(|r| filters.is_none_or(|f| r.matches(f)))
            .map(|r| SearchResult {
                score: overlap_score(&query, &r.content),
                record: r.clone(),
            })
            .filter(|r| r.score > 0.0)
            .collect();

        results.sort_by(|a, b| b.score.total_cmp(&a.score));
        results.truncate(limit);
        Ok(results)
    }

    async fn delete(&self, memory_id: &str) -> Result<bool, MemoryError> {
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|r| r.id != memory_id);
        Ok(records.len() != before)
    }

    async fn users(&self) -> Result<Vec<String>, MemoryError> {
        let records = self.records.read().await;
        let mut users: Vec<String> = Vec::new();
        for record in records.iter() {
            if !users.contains(&record.user_id) {
                users.push(record.user_id.clone());
            }
        }
        Ok(users)
    }

    async fn export(
        &self,
        schema: &serde_json::Value,
        filters: Option<&Metadata>,
    ) -> Result<serde_json::Value, MemoryError> {
        if !schema.is_object() {
            return Err(MemoryError::QueryError(
                "export schema must be a JSON object".to_string(),
            ));
        }

        let records = self.records.read().await;
        let memories = records
            .iter()
            .filter(|r| filters.is_none_or(|f| r.matches(f)))
            .map(|r| project(r, schema))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(serde_json::json!({
            "count": memories.len(),
            "memories": memories,
        }))
    }
}

/// Wraps another store, retrying transient failures of every call.
pub struct RetryingMemoryStore {
    inner: Arc<dyn MemoryStore>,
    config: RetryConfig,
}

impl RetryingMemoryStore {
    pub fn new(inner: Arc<dyn MemoryStore>, config: RetryConfig) -> Self {
        Self { inner, config }
    }
}

#[async_trait]
impl MemoryStore for RetryingMemoryStore {
    fn id(&self) -> &str {
        self.inner.id()
    }

    async fn add(&self, memory: NewMemory) -> Result<MemoryRecord, MemoryError> {
        with_retry_if(&self.config, MemoryError::is_retryable, || {
            self.inner.add(memory.clone())
        })
        .await
    }

    async fn search(
        &self,
        user_id: Option<&str>,
        query: Option<&str>,
        limit: usize,
        filters: Option<&Metadata>,
    ) -> Result<Vec<SearchResult>, MemoryError> {
        with_retry_if(&self.config, MemoryError::is_retryable, || {
            self.inner.search(user_id, query, limit, filters)
        })
        .await
    }

    async fn delete(&self, memory_id: &str) -> Result<bool, MemoryError> {
        with_retry_if(&self.config, MemoryError::is_retryable, || {
            self.inner.delete(memory_id)
        })
        .await
    }

    async fn users(&self) -> Result<Vec<String>, MemoryError> {
        with_retry_if(&self.config, MemoryError::is_retryable, || self.inner.users()).await
    }

    async fn export(
        &self,
        schema: &serde_json::Value,
        filters: Option<&Metadata>,
    ) -> Result<serde_json::Value, MemoryError> {
        with_retry_if(&self.config, MemoryError::is_retryable, || {
            self.inner.export(schema, filters)
        })
        .await
    }
}

#[cfg(test)]
#[path = "memory_store_tests.rs"]
mod tests;
