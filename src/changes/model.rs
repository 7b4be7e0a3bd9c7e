use chrono::{DateTime, Utc};
use rand::{rngs::OsRng, RngCore};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::identity::UserId;

/// Random bytes per token; rendered as twice as many hex characters
pub const TOKEN_BYTES: usize = 20;

/// Fresh single-use token: 160 bits from the OS RNG, lowercase hex
pub fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeType {
    Email,
    Password,
}

impl ChangeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeType::Email => "email",
            ChangeType::Password => "password",
        }
    }
}

impl fmt::Display for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChangeType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "email" => Ok(ChangeType::Email),
            "password" => Ok(ChangeType::Password),
            _ => Err(()),
        }
    }
}

/// Lifecycle of a change request. `Pending` is the only non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeStatus {
    Pending,
    Approved,
    Failed,
    Expired,
}

impl ChangeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeStatus::Pending => "pending",
            ChangeStatus::Approved => "approved",
            ChangeStatus::Failed => "failed",
            ChangeStatus::Expired => "expired",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, ChangeStatus::Pending)
    }

    /// Pending may move to any terminal state; terminal states never move
    pub fn can_transition_to(&self, next: ChangeStatus) -> bool {
        *self == ChangeStatus::Pending && next.is_terminal()
    }
}

/// The new credential value, tagged by kind so a request can never carry both
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangePayload {
    Email(String),
    Password(String),
}

impl ChangePayload {
    pub fn new(change_type: ChangeType, value: impl Into<String>) -> Self {
        match change_type {
            ChangeType::Email => ChangePayload::Email(value.into()),
            ChangeType::Password => ChangePayload::Password(value.into()),
        }
    }

    pub fn change_type(&self) -> ChangeType {
        match self {
            ChangePayload::Email(_) => ChangeType::Email,
            ChangePayload::Password(_) => ChangeType::Password,
        }
    }
}

/// One pending credential change, stored under its token.
///
/// Serialized field names are the persisted document layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeRequest {
    pub token: String,
    pub user_id: UserId,
    #[serde(rename = "type")]
    pub change_type: ChangeType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_email: Option<String>,
    /// Plain value while pending; a bcrypt hash once approved, absent after failure or expiry
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_password: Option<String>,
    pub original_email: String,
    pub created_at: DateTime<Utc>,
    pub status: ChangeStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<DateTime<Utc>>,
}

impl ChangeRequest {
    pub fn new(
        token: String,
        user_id: UserId,
        payload: ChangePayload,
        original_email: String,
        created_at: DateTime<Utc>,
    ) -> Self {
        let change_type = payload.change_type();
        let (new_email, new_password) = match payload {
            ChangePayload::Email(email) => (Some(email), None),
            ChangePayload::Password(password) => (None, Some(password)),
        };

        Self {
            token,
            user_id,
            change_type,
            new_email,
            new_password,
            original_email,
            created_at,
            status: ChangeStatus::Pending,
            resolved_at: None,
        }
    }

    /// The payload matching `change_type`, if it is present and non-empty
    pub fn payload(&self) -> Option<ChangePayload> {
        let value = match self.change_type {
            ChangeType::Email => self.new_email.as_ref(),
            ChangeType::Password => self.new_password.as_ref(),
        }?;
        if value.is_empty() {
            return None;
        }
        Some(ChangePayload::new(self.change_type, value.clone()))
    }

    /// True once more than `window` has passed since creation
    pub fn is_expired_at(&self, now: DateTime<Utc>, window: Duration) -> bool {
        // A store clock behind `created_at` counts as no time elapsed
        let elapsed = (now - self.created_at).to_std().unwrap_or_default();
        elapsed > window
    }

    pub fn is_actionable_at(&self, now: DateTime<Utc>, window: Duration) -> bool {
        self.status == ChangeStatus::Pending && !self.is_expired_at(now, window)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;

    const WINDOW: Duration = Duration::from_secs(3 * 60 * 60);

    fn request(payload: ChangePayload) -> ChangeRequest {
        ChangeRequest::new(
            generate_token(),
            "uid-1".to_string(),
            payload,
            "admin@x.com".to_string(),
            Utc::now(),
        )
    }

    #[test]
    fn tokens_are_40_hex_chars_and_distinct() {
        let a = generate_token();
        let b = generate_token();
        assert_eq!(a.len(), 40);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[test]
    fn only_pending_transitions() {
        use ChangeStatus::*;
        for next in [Approved, Failed, Expired] {
            assert!(Pending.can_transition_to(next));
        }
        assert!(!Pending.can_transition_to(Pending));
        for terminal in [Approved, Failed, Expired] {
            for next in [Pending, Approved, Failed, Expired] {
                assert!(!terminal.can_transition_to(next), "{:?} -> {:?}", terminal, next);
            }
        }
    }

    #[test]
    fn email_request_carries_only_email_payload() {
        let r = request(ChangePayload::Email("new@x.com".to_string()));
        assert_eq!(r.change_type, ChangeType::Email);
        assert_eq!(r.new_email.as_deref(), Some("new@x.com"));
        assert!(r.new_password.is_none());
        assert_eq!(r.payload(), Some(ChangePayload::Email("new@x.com".to_string())));
    }

    #[test]
    fn password_request_carries_only_password_payload() {
        let r = request(ChangePayload::Password("Secr3t!".to_string()));
        assert_eq!(r.change_type, ChangeType::Password);
        assert!(r.new_email.is_none());
        assert_eq!(r.payload(), Some(ChangePayload::Password("Secr3t!".to_string())));
    }

    #[test]
    fn payload_missing_for_mismatched_document() {
        let mut r = request(ChangePayload::Email("new@x.com".to_string()));
        r.change_type = ChangeType::Password;
        assert_eq!(r.payload(), None);
    }

    #[test]
    fn serializes_to_document_layout() {
        let r = request(ChangePayload::Email("new@x.com".to_string()));
        let doc = serde_json::to_value(&r).unwrap();
        assert_eq!(doc["type"], "email");
        assert_eq!(doc["status"], "pending");
        assert_eq!(doc["userId"], "uid-1");
        assert_eq!(doc["newEmail"], "new@x.com");
        assert_eq!(doc["originalEmail"], "admin@x.com");
        assert!(doc.get("newPassword").is_none());

        let back: ChangeRequest = serde_json::from_value(doc).unwrap();
        assert_eq!(back, r);
    }

    #[test]
    fn expiry_boundary() {
        let r = request(ChangePayload::Email("new@x.com".to_string()));
        let window = ChronoDuration::hours(3);
        assert!(!r.is_expired_at(r.created_at + window - ChronoDuration::seconds(1), WINDOW));
        assert!(!r.is_expired_at(r.created_at + window, WINDOW));
        assert!(r.is_expired_at(r.created_at + window + ChronoDuration::seconds(1), WINDOW));
        assert!(!r.is_expired_at(r.created_at - ChronoDuration::minutes(5), WINDOW));
    }

    #[test]
    fn terminal_requests_are_not_actionable() {
        let mut r = request(ChangePayload::Email("new@x.com".to_string()));
        assert!(r.is_actionable_at(r.created_at, WINDOW));
        r.status = ChangeStatus::Approved;
        assert!(!r.is_actionable_at(r.created_at, WINDOW));
    }
}
