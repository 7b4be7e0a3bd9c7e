use chrono::{DateTime, Utc};
use serde_json::{json, Map, Value};
use std::sync::Arc;

use super::model::{generate_token, ChangePayload, ChangeRequest, ChangeStatus, ChangeType};
use crate::database::{DatabaseError, DocumentStore};

/// Collection holding one document per token. Documents are never deleted.
pub const COLLECTION: &str = "pending_changes";

/// Fresh tokens tried before giving up on key collisions
const CREATE_ATTEMPTS: usize = 3;

/// State store for change requests.
///
/// Only `open` creates documents and only `transition` mutates them. Every
/// transition is a single conditional write guarded on `status == "pending"`,
/// so at most one caller ever moves a given token out of Pending.
#[derive(Clone)]
pub struct ChangeRequestLedger {
    store: Arc<dyn DocumentStore>,
}

impl ChangeRequestLedger {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub async fn now(&self) -> Result<DateTime<Utc>, DatabaseError> {
        self.store.server_time().await
    }

    /// Persist a new Pending request with a fresh token and a store-assigned `createdAt`
    pub async fn open(
        &self,
        user_id: &str,
        payload: ChangePayload,
        original_email: &str,
    ) -> Result<ChangeRequest, DatabaseError> {
        let mut last_err = None;
        for _ in 0..CREATE_ATTEMPTS {
            let created_at = self.store.server_time().await?;
            let request = ChangeRequest::new(
                generate_token(),
                user_id.to_string(),
                payload.clone(),
                original_email.to_string(),
                created_at,
            );
            let body = serde_json::to_value(&request)
                .map_err(|e| DatabaseError::InvalidDocument(e.to_string()))?;

            match self.store.create(COLLECTION, &request.token, body).await {
                Ok(()) => return Ok(request),
                Err(DatabaseError::Conflict(msg)) => {
                    tracing::warn!("Change request token collision, retrying: {}", msg);
                    last_err = Some(DatabaseError::Conflict(msg));
                }
                Err(other) => return Err(other),
            }
        }
        Err(last_err.unwrap_or_else(|| DatabaseError::Conflict("token collision".to_string())))
    }

    pub async fn load(&self, token: &str) -> Result<Option<ChangeRequest>, DatabaseError> {
        let Some(doc) = self.store.get(COLLECTION, token).await? else {
            return Ok(None);
        };
        serde_json::from_value(doc.body)
            .map(Some)
            .map_err(|e| DatabaseError::InvalidDocument(format!("change request {}: {}", token, e)))
    }

    /// Move `request` from Pending to the terminal state `next`, merging `extra` fields.
    ///
    /// A plaintext password never survives the move: unless `extra` supplies a
    /// replacement `newPassword`, the field is nulled out.
    ///
    /// Returns false when the stored document is no longer Pending (another
    /// caller got there first); nothing is written in that case.
    pub async fn transition(
        &self,
        request: &ChangeRequest,
        next: ChangeStatus,
        extra: Map<String, Value>,
    ) -> Result<bool, DatabaseError> {
        if !request.status.can_transition_to(next) {
            return Ok(false);
        }

        let resolved_at = self.store.server_time().await?;
        let mut partial = extra;
        partial.insert("status".to_string(), json!(next.as_str()));
        partial.insert("resolvedAt".to_string(), json!(resolved_at));
        if request.change_type == ChangeType::Password {
            partial.entry("newPassword").or_insert(Value::Null);
        }

        self.store
            .update_if(
                COLLECTION,
                &request.token,
                "status",
                &json!(ChangeStatus::Pending.as_str()),
                Value::Object(partial),
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MemoryDocumentStore;

    fn ledger() -> (Arc<MemoryDocumentStore>, ChangeRequestLedger) {
        let store = Arc::new(MemoryDocumentStore::new());
        (store.clone(), ChangeRequestLedger::new(store))
    }

    #[tokio::test]
    async fn open_persists_pending_request_under_token() {
        let (store, ledger) = ledger();
        let request = ledger
            .open("uid-1", ChangePayload::Email("new@x.com".to_string()), "admin@x.com")
            .await
            .unwrap();

        assert_eq!(request.status, ChangeStatus::Pending);
        assert_eq!(request.token.len(), 40);
        assert_eq!(store.count(COLLECTION).await, 1);
        assert_eq!(ledger.load(&request.token).await.unwrap(), Some(request));
    }

    #[tokio::test]
    async fn load_unknown_token_is_none() {
        let (_, ledger) = ledger();
        assert_eq!(ledger.load("deadbeef").await.unwrap(), None);
    }

    #[tokio::test]
    async fn transition_happens_once() {
        let (_, ledger) = ledger();
        let request = ledger
            .open("uid-1", ChangePayload::Email("new@x.com".to_string()), "admin@x.com")
            .await
            .unwrap();

        // Two holders of the same Pending snapshot race; only one wins
        let first = ledger.transition(&request, ChangeStatus::Approved, Map::new()).await.unwrap();
        let second = ledger.transition(&request, ChangeStatus::Failed, Map::new()).await.unwrap();
        assert!(first);
        assert!(!second);

        let stored = ledger.load(&request.token).await.unwrap().unwrap();
        assert_eq!(stored.status, ChangeStatus::Approved);
        assert!(stored.resolved_at.is_some());
    }

    #[tokio::test]
    async fn failed_and_expired_password_requests_drop_the_plaintext() {
        let (_, ledger) = ledger();
        for next in [ChangeStatus::Failed, ChangeStatus::Expired] {
            let request = ledger
                .open("uid-1", ChangePayload::Password("Secr3t!".to_string()), "admin@x.com")
                .await
                .unwrap();
            assert!(ledger.transition(&request, next, Map::new()).await.unwrap());

            let stored = ledger.load(&request.token).await.unwrap().unwrap();
            assert_eq!(stored.status, next);
            assert_eq!(stored.new_password, None);
        }
    }

    #[tokio::test]
    async fn supplied_password_replacement_is_kept() {
        let (_, ledger) = ledger();
        let request = ledger
            .open("uid-1", ChangePayload::Password("Secr3t!".to_string()), "admin@x.com")
            .await
            .unwrap();
        let mut extra = Map::new();
        extra.insert("newPassword".to_string(), json!("$2b$04$hash"));
        assert!(ledger.transition(&request, ChangeStatus::Approved, extra).await.unwrap());

        let stored = ledger.load(&request.token).await.unwrap().unwrap();
        assert_eq!(stored.new_password.as_deref(), Some("$2b$04$hash"));
    }

    #[tokio::test]
    async fn transition_from_terminal_snapshot_writes_nothing() {
        let (_, ledger) = ledger();
        let mut request = ledger
            .open("uid-1", ChangePayload::Password("pw".to_string()), "admin@x.com")
            .await
            .unwrap();
        request.status = ChangeStatus::Expired;

        let applied = ledger.transition(&request, ChangeStatus::Approved, Map::new()).await.unwrap();
        assert!(!applied);
        let stored = ledger.load(&request.token).await.unwrap().unwrap();
        assert_eq!(stored.status, ChangeStatus::Pending);
    }
}
