use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tokio::sync::RwLock;

use super::documents::{merge_object, Document, DocumentStore};
use super::manager::DatabaseError;

/// In-process document store for local development and tests.
///
/// Collections keep insertion order. The store clock can be moved forward
/// with [`MemoryDocumentStore::advance_clock`] to exercise time windows, and
/// conditional writes can be made to fail with
/// [`MemoryDocumentStore::fail_conditional_updates`].
#[derive(Default)]
pub struct MemoryDocumentStore {
    collections: RwLock<HashMap<String, Vec<Document>>>,
    clock_offset: Mutex<Duration>,
    failing_update_ifs: AtomicUsize,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shift every later `server_time` reading by `by`
    pub fn advance_clock(&self, by: Duration) {
        let mut offset = self.clock_offset.lock().unwrap_or_else(|e| e.into_inner());
        *offset = *offset + by;
    }

    fn now(&self) -> DateTime<Utc> {
        let offset = *self.clock_offset.lock().unwrap_or_else(|e| e.into_inner());
        Utc::now() + offset
    }

    /// Make the next `count` calls to `update_if` fail as if the database were unreachable
    pub fn fail_conditional_updates(&self, count: usize) {
        self.failing_update_ifs.store(count, Ordering::SeqCst);
    }

    /// Number of documents in a collection
    pub async fn count(&self, collection: &str) -> usize {
        self.collections.read().await.get(collection).map_or(0, Vec::len)
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn create(&self, collection: &str, id: &str, body: Value) -> Result<(), DatabaseError> {
        if !body.is_object() {
            return Err(DatabaseError::InvalidDocument("document must be a JSON object".to_string()));
        }
        let created_at = self.now();
        let mut collections = self.collections.write().await;
        let docs = collections.entry(collection.to_string()).or_default();
        if docs.iter().any(|d| d.id == id) {
            return Err(DatabaseError::Conflict(format!("{}/{} already exists", collection, id)));
        }
        docs.push(Document {
            id: id.to_string(),
            body,
            created_at,
        });
        Ok(())
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, DatabaseError> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .and_then(|docs| docs.iter().find(|d| d.id == id))
            .cloned())
    }

    async fn list(&self, collection: &str) -> Result<Vec<Document>, DatabaseError> {
        let collections = self.collections.read().await;
        Ok(collections.get(collection).cloned().unwrap_or_default())
    }

    async fn update(&self, collection: &str, id: &str, partial: Value) -> Result<(), DatabaseError> {
        let mut collections = self.collections.write().await;
        let doc = collections
            .get_mut(collection)
            .and_then(|docs| docs.iter_mut().find(|d| d.id == id))
            .ok_or_else(|| DatabaseError::NotFound(format!("{}/{}", collection, id)))?;
        merge_object(&mut doc.body, partial)
    }

    async fn update_if(
        &self,
        collection: &str,
        id: &str,
        field: &str,
        expected: &Value,
        partial: Value,
    ) -> Result<bool, DatabaseError> {
        let failing = self
            .failing_update_ifs
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if failing.is_ok() {
            return Err(DatabaseError::Sqlx(sqlx::Error::PoolTimedOut));
        }

        let mut collections = self.collections.write().await;
        let Some(doc) = collections
            .get_mut(collection)
            .and_then(|docs| docs.iter_mut().find(|d| d.id == id))
        else {
            return Ok(false);
        };
        if doc.body.get(field) != Some(expected) {
            return Ok(false);
        }
        merge_object(&mut doc.body, partial)?;
        Ok(true)
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<bool, DatabaseError> {
        let mut collections = self.collections.write().await;
        let Some(docs) = collections.get_mut(collection) else {
            return Ok(false);
        };
        let before = docs.len();
        docs.retain(|d| d.id != id);
        Ok(docs.len() != before)
    }

    async fn server_time(&self) -> Result<DateTime<Utc>, DatabaseError> {
        Ok(self.now())
    }

    async fn health(&self) -> Result<(), DatabaseError> {
        Ok(())
    }
}
