use serde::Deserialize;
use serde_json::{Map, Value};
use std::sync::Arc;

use super::{or_default, present, Collection, ContentError, ContentRepository, ListOrder, MediaField};
use crate::database::DocumentStore;
use crate::media::{BlobStore, MediaKind};

pub const ADVERTISEMENTS: Collection = Collection {
    name: "advertisements",
    noun: "Advertisement",
    folder: "advertisements",
    media: &[
        MediaField {
            field: "image",
            kind: MediaKind::Image,
            prefix: "image_",
        },
        MediaField {
            field: "video",
            kind: MediaKind::Video,
            prefix: "video_",
        },
    ],
    created_field: "createdAt",
};

#[derive(Debug, Default, Clone, Deserialize)]
pub struct AdvertisementInput {
    pub title: Option<String>,
    pub image: Option<String>,
    pub video: Option<String>,
}

impl AdvertisementInput {
    fn into_body(self) -> Result<Map<String, Value>, ContentError> {
        if !present(&self.title) {
            return Err(ContentError::Invalid("Missing required field: title".to_string()));
        }
        let mut body = Map::new();
        body.insert("title".to_string(), or_default(self.title, ""));
        body.insert("image".to_string(), or_default(self.image, ""));
        body.insert("video".to_string(), or_default(self.video, ""));
        Ok(body)
    }
}

#[derive(Clone)]
pub struct AdvertisementService {
    repo: ContentRepository,
}

impl AdvertisementService {
    pub fn new(store: Arc<dyn DocumentStore>, blobs: Arc<dyn BlobStore>) -> Self {
        Self {
            repo: ContentRepository::new(ADVERTISEMENTS, store, blobs),
        }
    }

    /// Newest first
    pub async fn list(&self) -> Result<Vec<Value>, ContentError> {
        self.repo.select_all(ListOrder::Newest).await
    }

    pub async fn create(&self, input: AdvertisementInput) -> Result<String, ContentError> {
        let mut body = input.into_body()?;
        self.repo.store_media(&mut body, "ad", false).await?;
        self.repo.insert(None, body).await
    }

    pub async fn update(&self, id: &str, input: AdvertisementInput) -> Result<(), ContentError> {
        let mut body = input.into_body()?;
        self.repo.store_media(&mut body, "ad", true).await?;
        self.repo.update(id, body, true).await
    }

    pub async fn delete(&self, id: &str) -> Result<(), ContentError> {
        self.repo.delete(id).await
    }
}
