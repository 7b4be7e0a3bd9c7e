use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use uuid::Uuid;

use super::{or_default, present, Collection, ContentError, ContentRepository, ListOrder, MediaField};
use crate::database::DocumentStore;
use crate::media::{BlobStore, MediaKind};

pub const TEAM: Collection = Collection {
    name: "team",
    noun: "Team member",
    folder: "team",
    media: &[
        MediaField {
            field: "profilePicture",
            kind: MediaKind::Image,
            prefix: "",
        },
        MediaField {
            field: "video",
            kind: MediaKind::Video,
            prefix: "video_",
        },
    ],
    created_field: "createdAt",
};

/// E.164-style number: optional `+`, leading digit 1-9, 2 to 15 ASCII digits in total
static PHONE: Lazy<Regex> = Lazy::new(|| {
    RegexBuilder::new(r"^\+?[1-9]\d{1,14}$")
        .unicode(false)
        .build()
        .expect("phone pattern is valid")
});

fn valid_phone(phone: &str) -> bool {
    PHONE.is_match(phone)
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamMemberInput {
    pub name: Option<String>,
    pub role: Option<String>,
    pub short_bio: Option<String>,
    pub full_bio: Option<String>,
    pub skills: Option<Value>,
    pub achievements: Option<String>,
    pub video: Option<String>,
    pub employee_id: Option<String>,
    pub joining_date: Option<String>,
    pub blood_group: Option<String>,
    pub profile_picture: Option<String>,
    pub status: Option<String>,
    pub resignation_reason: Option<String>,
    pub termination_reason: Option<String>,
    pub quotes: Option<String>,
    pub emergency_phone: Option<String>,
}

impl TeamMemberInput {
    pub fn validate(&self) -> Result<(), ContentError> {
        let required = [
            &self.name,
            &self.role,
            &self.employee_id,
            &self.joining_date,
            &self.blood_group,
            &self.status,
        ];
        if !required.iter().all(|f| present(f)) {
            return Err(ContentError::Invalid("Missing required fields".to_string()));
        }
        match self.status.as_deref() {
            Some("Resigned") if !present(&self.resignation_reason) => {
                return Err(ContentError::Invalid("Resignation reason required".to_string()));
            }
            Some("Terminated") if !present(&self.termination_reason) => {
                return Err(ContentError::Invalid("Termination reason required".to_string()));
            }
            _ => {}
        }
        if let Some(phone) = self.emergency_phone.as_deref().filter(|p| !p.is_empty()) {
            if !valid_phone(phone) {
                return Err(ContentError::Invalid(
                    "Invalid emergency phone number format. Use format like +1234567890.".to_string(),
                ));
            }
        }
        Ok(())
    }

    fn into_body(self) -> Map<String, Value> {
        let skills = match self.skills {
            Some(Value::Null) | None => json!([]),
            Some(v) => v,
        };
        let body = json!({
            "name": self.name,
            "role": self.role,
            "shortBio": or_default(self.short_bio, ""),
            "fullBio": or_default(self.full_bio, ""),
            "skills": skills,
            "achievements": or_default(self.achievements, ""),
            "video": or_default(self.video, ""),
            "employeeId": self.employee_id,
            "joiningDate": self.joining_date,
            "bloodGroup": self.blood_group,
            "profilePicture": or_default(self.profile_picture, ""),
            "status": or_default(self.status, "Currently Working"),
            "resignationReason": or_default(self.resignation_reason, ""),
            "terminationReason": or_default(self.termination_reason, ""),
            "quotes": or_default(self.quotes, ""),
            "emergencyPhone": or_default(self.emergency_phone, ""),
        });
        match body {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }
}

/// Staff profiles shown on the public site
#[derive(Clone)]
pub struct TeamService {
    repo: ContentRepository,
    site_url: String,
}

impl TeamService {
    pub fn new(store: Arc<dyn DocumentStore>, blobs: Arc<dyn BlobStore>, site_url: impl Into<String>) -> Self {
        Self {
            repo: ContentRepository::new(TEAM, store, blobs),
            site_url: site_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub async fn list(&self) -> Result<Vec<Value>, ContentError> {
        self.repo.select_all(ListOrder::Oldest).await
    }

    pub async fn get(&self, id: &str) -> Result<Value, ContentError> {
        Ok(self.repo.select_404(id).await?.to_json())
    }

    /// Public profile page address printed on staff cards
    pub fn profile_url(&self, id: &str) -> String {
        format!("{}/staff/{}", self.site_url, id)
    }

    pub async fn create(&self, input: TeamMemberInput) -> Result<(String, String), ContentError> {
        input.validate()?;
        let label = input.employee_id.clone().unwrap_or_default();
        let mut body = input.into_body();
        self.repo.store_media(&mut body, &label, false).await?;

        let id = Uuid::new_v4().to_string();
        let profile_url = self.profile_url(&id);
        body.insert("profileUrl".to_string(), Value::String(profile_url.clone()));
        let id = self.repo.insert(Some(id), body).await?;
        Ok((id, profile_url))
    }

    pub async fn update(&self, id: &str, input: TeamMemberInput) -> Result<String, ContentError> {
        input.validate()?;
        let label = input.employee_id.clone().unwrap_or_default();
        let mut body = input.into_body();
        self.repo.store_media(&mut body, &label, true).await?;

        let profile_url = self.profile_url(id);
        body.insert("profileUrl".to_string(), Value::String(profile_url.clone()));
        self.repo.update(id, body, true).await?;
        Ok(profile_url)
    }

    pub async fn delete(&self, id: &str) -> Result<(), ContentError> {
        self.repo.delete(id).await
    }
}
