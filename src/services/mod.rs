//! Site content collections: team, clients, advertisements, contact messages
//! and internship inquiries.

use futures::future::join_all;
use serde_json::{Map, Value};
use std::sync::Arc;
use thiserror::Error;

use crate::database::{DatabaseError, Document, DocumentStore};
use crate::media::{self, BlobStore, MediaError, MediaKind};

pub mod advertisement_service;
pub mod client_service;
pub mod contact_service;
pub mod internship_service;
pub mod team_service;

pub use advertisement_service::{AdvertisementInput, AdvertisementService};
pub use client_service::{ClientInput, ClientService};
pub use contact_service::{ContactInput, ContactService};
pub use internship_service::{InquiryStatusInput, InternshipInput, InternshipService};
pub use team_service::{TeamMemberInput, TeamService};

#[derive(Debug, Error)]
pub enum ContentError {
    #[error("{0}")]
    Invalid(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Media error: {0}")]
    Media(#[from] MediaError),
}

/// A document field that may carry an inline upload
#[derive(Debug, Clone, Copy)]
pub struct MediaField {
    pub field: &'static str,
    pub kind: MediaKind,
    /// Blob name prefix inside the collection folder
    pub prefix: &'static str,
}

/// Static description of one content collection
#[derive(Debug, Clone, Copy)]
pub struct Collection {
    pub name: &'static str,
    /// Singular noun used in messages, e.g. "Client"
    pub noun: &'static str,
    pub folder: &'static str,
    pub media: &'static [MediaField],
    /// Field holding the server timestamp on creation
    pub created_field: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListOrder {
    Oldest,
    Newest,
}

/// Document and blob plumbing shared by the content services
#[derive(Clone)]
pub struct ContentRepository {
    collection: Collection,
    store: Arc<dyn DocumentStore>,
    blobs: Arc<dyn BlobStore>,
}

impl ContentRepository {
    pub fn new(collection: Collection, store: Arc<dyn DocumentStore>, blobs: Arc<dyn BlobStore>) -> Self {
        Self {
            collection,
            store,
            blobs,
        }
    }

    pub fn collection(&self) -> &Collection {
        &self.collection
    }

    pub async fn select_all(&self, order: ListOrder) -> Result<Vec<Value>, ContentError> {
        let mut docs = self.store.list(self.collection.name).await?;
        if order == ListOrder::Newest {
            docs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        }
        Ok(docs.iter().map(Document::to_json).collect())
    }

    pub async fn select_404(&self, id: &str) -> Result<Document, ContentError> {
        self.store
            .get(self.collection.name, id)
            .await?
            .ok_or_else(|| self.not_found())
    }

    /// Store a new document, stamping the creation field with server time
    pub async fn insert(&self, id: Option<String>, mut body: Map<String, Value>) -> Result<String, ContentError> {
        let now = self.store.server_time().await?;
        body.insert(self.collection.created_field.to_string(), Value::String(now.to_rfc3339()));
        let body = Value::Object(body);

        let id = match id {
            Some(id) => {
                self.store.create(self.collection.name, &id, body).await?;
                id
            }
            None => self.store.insert(self.collection.name, body).await?,
        };
        tracing::info!("Created {} {}", self.collection.name, id);
        Ok(id)
    }

    /// Merge `changes` into an existing document and drop media it replaced
    pub async fn update(&self, id: &str, mut changes: Map<String, Value>, stamp: bool) -> Result<(), ContentError> {
        let existing = self.select_404(id).await?;
        if stamp {
            let now = self.store.server_time().await?;
            changes.insert("updatedAt".to_string(), Value::String(now.to_rfc3339()));
        }

        let replaced: Vec<String> = self
            .collection
            .media
            .iter()
            .filter_map(|m| {
                let old = existing.field_str(m.field)?;
                let new = changes.get(m.field).and_then(Value::as_str);
                (new.is_some() && new != Some(old)).then(|| old.to_string())
            })
            .collect();

        match self.store.update(self.collection.name, id, Value::Object(changes)).await {
            Ok(()) => {}
            Err(DatabaseError::NotFound(_)) => return Err(self.not_found()),
            Err(e) => return Err(e.into()),
        }

        self.remove_blobs(replaced).await;
        Ok(())
    }

    /// Delete a document together with the media it references
    pub async fn delete(&self, id: &str) -> Result<(), ContentError> {
        let existing = self.select_404(id).await?;
        if !self.store.delete(self.collection.name, id).await? {
            return Err(self.not_found());
        }

        let urls = self
            .collection
            .media
            .iter()
            .filter_map(|m| existing.field_str(m.field))
            .map(str::to_string)
            .collect();
        self.remove_blobs(urls).await;

        tracing::info!("Deleted {} {}", self.collection.name, id);
        Ok(())
    }

    /// Resolve every media field of `body` in place.
    ///
    /// Inline uploads are persisted and replaced by their URL. Other values are
    /// kept as given when `keep_links` is set and blanked otherwise.
    pub async fn store_media(
        &self,
        body: &mut Map<String, Value>,
        label: &str,
        keep_links: bool,
    ) -> Result<(), ContentError> {
        for m in self.collection.media {
            let value = body.get(m.field).and_then(Value::as_str).unwrap_or_default().to_string();
            let stored = media::store_inline(
                self.blobs.as_ref(),
                self.collection.folder,
                m.prefix,
                label,
                m.kind,
                &value,
            )
            .await?;
            let resolved = match stored {
                Some(url) => url,
                None if keep_links => value,
                None => String::new(),
            };
            body.insert(m.field.to_string(), Value::String(resolved));
        }
        Ok(())
    }

    async fn remove_blobs(&self, urls: Vec<String>) {
        let blobs = self.blobs.as_ref();
        join_all(urls.iter().map(|url| media::remove_by_url(blobs, url))).await;
    }

    fn not_found(&self) -> ContentError {
        ContentError::NotFound(format!("{} not found", self.collection.noun))
    }
}

/// Truthy string check: absent and empty both count as missing
pub(crate) fn present(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| !v.is_empty())
}

pub(crate) fn or_default(value: Option<String>, default: &str) -> Value {
    match value {
        Some(v) if !v.is_empty() => Value::String(v),
        _ => Value::String(default.to_string()),
    }
}
