use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use uuid::Uuid;

use super::manager::DatabaseError;

/// A stored JSON document together with its key and server-assigned creation time
#[derive(Debug, Clone)]
pub struct Document {
    pub id: String,
    pub body: Value,
    pub created_at: DateTime<Utc>,
}

impl Document {
    /// Body with the document key folded in as `id`, the shape returned to API clients
    pub fn to_json(&self) -> Value {
        let mut out = Map::new();
        out.insert("id".to_string(), Value::String(self.id.clone()));
        if let Value::Object(fields) = &self.body {
            for (k, v) in fields {
                out.entry(k.clone()).or_insert_with(|| v.clone());
            }
        }
        Value::Object(out)
    }

    pub fn field_str(&self, field: &str) -> Option<&str> {
        self.body.get(field).and_then(Value::as_str)
    }
}

/// Keyed JSON document storage grouped into named collections.
///
/// Each call is atomic on its own; there are no multi-document transactions.
/// `update_if` is the only primitive callers may use to serialize competing writers.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Create a document under a caller-chosen key. Fails with `Conflict` if the key is taken.
    async fn create(&self, collection: &str, id: &str, body: Value) -> Result<(), DatabaseError>;

    /// Create a document under a generated key and return the key
    async fn insert(&self, collection: &str, body: Value) -> Result<String, DatabaseError> {
        let id = Uuid::new_v4().to_string();
        self.create(collection, &id, body).await?;
        Ok(id)
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, DatabaseError>;

    /// All documents of a collection in creation order
    async fn list(&self, collection: &str) -> Result<Vec<Document>, DatabaseError>;

    /// Shallow-merge `partial` into the stored body. Fails with `NotFound` if absent.
    async fn update(&self, collection: &str, id: &str, partial: Value) -> Result<(), DatabaseError>;

    /// Shallow-merge `partial` only while `body[field] == expected`.
    /// Returns false when the document is absent or the guard did not match.
    async fn update_if(
        &self,
        collection: &str,
        id: &str,
        field: &str,
        expected: &Value,
        partial: Value,
    ) -> Result<bool, DatabaseError>;

    /// Returns whether a document was removed
    async fn delete(&self, collection: &str, id: &str) -> Result<bool, DatabaseError>;

    /// Current time according to the store, used for every persisted timestamp
    async fn server_time(&self) -> Result<DateTime<Utc>, DatabaseError>;

    async fn health(&self) -> Result<(), DatabaseError>;
}

/// Shallow merge of two JSON objects; non-object partials are rejected
pub(crate) fn merge_object(target: &mut Value, partial: Value) -> Result<(), DatabaseError> {
    let Value::Object(fields) = partial else {
        return Err(DatabaseError::InvalidDocument("partial update must be a JSON object".to_string()));
    };
    match target {
        Value::Object(existing) => {
            existing.extend(fields);
            Ok(())
        }
        _ => Err(DatabaseError::InvalidDocument("stored document is not a JSON object".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn merge_overwrites_and_adds_fields() {
        let mut doc = json!({"name": "a", "status": "pending"});
        merge_object(&mut doc, json!({"status": "approved", "note": "x"})).unwrap();
        assert_eq!(doc, json!({"name": "a", "status": "approved", "note": "x"}));
    }

    #[test]
    fn merge_rejects_non_object_partial() {
        let mut doc = json!({});
        assert!(merge_object(&mut doc, json!("nope")).is_err());
    }

    #[test]
    fn to_json_puts_id_first_and_keeps_fields() {
        let doc = Document {
            id: "abc".to_string(),
            body: json!({"title": "Hello"}),
            created_at: Utc::now(),
        };
        assert_eq!(doc.to_json(), json!({"id": "abc", "title": "Hello"}));
    }
}
