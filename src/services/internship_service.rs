use serde::Deserialize;
use serde_json::{Map, Value};
use std::sync::Arc;

use super::{or_default, present, Collection, ContentError, ContentRepository, ListOrder};
use crate::database::DocumentStore;
use crate::media::BlobStore;

pub const INTERNSHIP_INQUIRIES: Collection = Collection {
    name: "internship_inquiries",
    noun: "Internship inquiry",
    folder: "internships",
    media: &[],
    created_field: "timestamp",
};

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InternshipInput {
    pub name: Option<String>,
    pub email: Option<String>,
    pub message: Option<String>,
    pub role: Option<String>,
    pub status: Option<String>,
    pub resume_url: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct InquiryStatusInput {
    pub status: Option<String>,
}

#[derive(Clone)]
pub struct InternshipService {
    repo: ContentRepository,
}

impl InternshipService {
    pub fn new(store: Arc<dyn DocumentStore>, blobs: Arc<dyn BlobStore>) -> Self {
        Self {
            repo: ContentRepository::new(INTERNSHIP_INQUIRIES, store, blobs),
        }
    }

    /// Newest first
    pub async fn list(&self) -> Result<Vec<Value>, ContentError> {
        self.repo.select_all(ListOrder::Newest).await
    }

    pub async fn submit(&self, input: InternshipInput) -> Result<String, ContentError> {
        if !(present(&input.name) && present(&input.email) && present(&input.message)) {
            return Err(ContentError::Invalid("Missing required fields".to_string()));
        }
        let mut body = Map::new();
        body.insert("name".to_string(), or_default(input.name, ""));
        body.insert("email".to_string(), or_default(input.email, ""));
        body.insert("message".to_string(), or_default(input.message, ""));
        body.insert("role".to_string(), or_default(input.role, "Not specified"));
        body.insert("status".to_string(), or_default(input.status, "Pending"));
        body.insert("resumeUrl".to_string(), or_default(input.resume_url, ""));
        self.repo.insert(None, body).await
    }

    /// Set the review status; returns the confirmation message
    pub async fn set_status(&self, id: &str, input: InquiryStatusInput) -> Result<String, ContentError> {
        let status = match input.status {
            Some(s) if !s.is_empty() => s,
            _ => return Err(ContentError::Invalid("Missing required field: status".to_string())),
        };
        let message = format!("Internship inquiry {}", status.to_lowercase());

        let mut changes = Map::new();
        changes.insert("status".to_string(), Value::String(status));
        self.repo.update(id, changes, false).await?;
        Ok(message)
    }

    pub async fn delete(&self, id: &str) -> Result<(), ContentError> {
        self.repo.delete(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;

    fn inquiry() -> InternshipInput {
        InternshipInput {
            name: Some("Meera".to_string()),
            email: Some("meera@example.com".to_string()),
            message: Some("Interested in backend work".to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn defaults_and_status_update() {
        let (store, blobs) = stores();
        let service = InternshipService::new(store, blobs);
        let id = service.submit(inquiry()).await.unwrap();

        let listed = service.list().await.unwrap();
        assert_eq!(listed[0]["role"], "Not specified");
        assert_eq!(listed[0]["status"], "Pending");
        assert_eq!(listed[0]["resumeUrl"], "");

        let message = service
            .set_status(&id, InquiryStatusInput { status: Some("Accepted".to_string()) })
            .await
            .unwrap();
        assert_eq!(message, "Internship inquiry accepted");
        assert_eq!(service.list().await.unwrap()[0]["status"], "Accepted");
    }

    #[tokio::test]
    async fn status_is_required_and_target_must_exist() {
        let (store, blobs) = stores();
        let service = InternshipService::new(store, blobs);
        assert!(matches!(
            service.set_status("x", InquiryStatusInput::default()).await,
            Err(ContentError::Invalid(_))
        ));
        assert!(matches!(
            service
                .set_status("x", InquiryStatusInput { status: Some("Rejected".to_string()) })
                .await,
            Err(ContentError::NotFound(_))
        ));
        assert!(matches!(service.delete("x").await, Err(ContentError::NotFound(_))));
    }
}
