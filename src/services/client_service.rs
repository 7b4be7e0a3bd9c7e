use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::sync::Arc;

use super::{or_default, present, Collection, ContentError, ContentRepository, ListOrder, MediaField};
use crate::database::DocumentStore;
use crate::media::{BlobStore, MediaKind};

pub const CLIENTS: Collection = Collection {
    name: "clients",
    noun: "Client",
    folder: "clients",
    media: &[MediaField {
        field: "logo",
        kind: MediaKind::Image,
        prefix: "logo_",
    }],
    created_field: "createdAt",
};

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientInput {
    pub name: Option<String>,
    pub logo: Option<String>,
    pub short_description: Option<String>,
    pub full_description: Option<String>,
    pub collaboration: Option<String>,
    pub impact: Option<String>,
    pub website: Option<String>,
}

impl ClientInput {
    fn into_body(self) -> Result<Map<String, Value>, ContentError> {
        if !present(&self.name) {
            return Err(ContentError::Invalid("Missing required field: name".to_string()));
        }
        let body = json!({
            "name": self.name,
            "logo": or_default(self.logo, ""),
            "shortDescription": or_default(self.short_description, ""),
            "fullDescription": or_default(self.full_description, ""),
            "collaboration": or_default(self.collaboration, ""),
            "impact": or_default(self.impact, ""),
            "website": or_default(self.website, ""),
        });
        Ok(match body {
            Value::Object(map) => map,
            _ => Map::new(),
        })
    }
}

#[derive(Clone)]
pub struct ClientService {
    repo: ContentRepository,
}

impl ClientService {
    pub fn new(store: Arc<dyn DocumentStore>, blobs: Arc<dyn BlobStore>) -> Self {
        Self {
            repo: ContentRepository::new(CLIENTS, store, blobs),
        }
    }

    pub async fn list(&self) -> Result<Vec<Value>, ContentError> {
        self.repo.select_all(ListOrder::Oldest).await
    }

    pub async fn create(&self, input: ClientInput) -> Result<String, ContentError> {
        let mut body = input.into_body()?;
        self.repo.store_media(&mut body, "client", false).await?;
        self.repo.insert(None, body).await
    }

    pub async fn update(&self, id: &str, input: ClientInput) -> Result<(), ContentError> {
        let mut body = input.into_body()?;
        self.repo.store_media(&mut body, "client", true).await?;
        self.repo.update(id, body, true).await
    }

    pub async fn delete(&self, id: &str) -> Result<(), ContentError> {
        self.repo.delete(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;

    #[tokio::test]
    async fn name_is_required() {
        let (store, blobs) = stores();
        let clients = ClientService::new(store, blobs);
        match clients.create(ClientInput::default()).await {
            Err(ContentError::Invalid(msg)) => assert_eq!(msg, "Missing required field: name"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn logo_upload_lifecycle() {
        let (store, blobs) = stores();
        let clients = ClientService::new(store, blobs.clone());
        let id = clients
            .create(ClientInput {
                name: Some("Acme".to_string()),
                logo: Some(PNG.to_string()),
                ..Default::default()
            })
            .await
            .unwrap();

        let listed = clients.list().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0]["website"], "");
        assert!(listed[0]["logo"].as_str().unwrap().starts_with("https://media.test/clients/logo_"));

        clients.delete(&id).await.unwrap();
        assert!(blobs.paths().is_empty());
        assert!(matches!(clients.delete(&id).await, Err(ContentError::NotFound(_))));
    }
}
