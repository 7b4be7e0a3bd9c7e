use serde::Deserialize;
use serde_json::{Map, Value};
use std::sync::Arc;

use super::{or_default, present, Collection, ContentError, ContentRepository, ListOrder};
use crate::database::DocumentStore;
use crate::media::BlobStore;

pub const CONTACTS: Collection = Collection {
    name: "contacts",
    noun: "Contact",
    folder: "contacts",
    media: &[],
    created_field: "timestamp",
};

#[derive(Debug, Default, Clone, Deserialize)]
pub struct ContactInput {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub message: Option<String>,
}

impl ContactInput {
    fn into_body(self) -> Result<Map<String, Value>, ContentError> {
        if !(present(&self.name) && present(&self.email) && present(&self.message)) {
            return Err(ContentError::Invalid("Missing required fields".to_string()));
        }
        let mut body = Map::new();
        body.insert("name".to_string(), or_default(self.name, ""));
        body.insert("email".to_string(), or_default(self.email, ""));
        body.insert("phone".to_string(), or_default(self.phone, ""));
        body.insert("message".to_string(), or_default(self.message, ""));
        Ok(body)
    }
}

/// Messages submitted through the public contact form
#[derive(Clone)]
pub struct ContactService {
    repo: ContentRepository,
}

impl ContactService {
    pub fn new(store: Arc<dyn DocumentStore>, blobs: Arc<dyn BlobStore>) -> Self {
        Self {
            repo: ContentRepository::new(CONTACTS, store, blobs),
        }
    }

    pub async fn list(&self) -> Result<Vec<Value>, ContentError> {
        self.repo.select_all(ListOrder::Oldest).await
    }

    pub async fn submit(&self, input: ContactInput) -> Result<String, ContentError> {
        let body = input.into_body()?;
        self.repo.insert(None, body).await
    }

    pub async fn update(&self, id: &str, input: ContactInput) -> Result<(), ContentError> {
        let body = input.into_body()?;
        self.repo.update(id, body, false).await
    }

    pub async fn delete(&self, id: &str) -> Result<(), ContentError> {
        self.repo.delete(id).await
    }
}
