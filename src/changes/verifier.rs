use serde_json::{json, Map, Value};
use std::str::FromStr;
use std::sync::Arc;

use super::error::ChangeRequestError;
use super::initiator::describe_window;
use super::ledger::ChangeRequestLedger;
use super::model::{ChangePayload, ChangeRequest, ChangeStatus, ChangeType};
use super::ChangeRequestSettings;
use crate::auth::hash_password;
use crate::identity::CredentialStore;

pub const EMAIL_UPDATED_MESSAGE: &str = "Email updated successfully. You can now log in with your new email.";
pub const PASSWORD_UPDATED_MESSAGE: &str =
    "Password updated successfully. You can now log in with your new password.";

/// Consumes approval links and applies the approved change.
#[derive(Clone)]
pub struct ChangeRequestVerifier {
    credentials: Arc<dyn CredentialStore>,
    ledger: ChangeRequestLedger,
    settings: ChangeRequestSettings,
}

impl ChangeRequestVerifier {
    pub fn new(
        credentials: Arc<dyn CredentialStore>,
        ledger: ChangeRequestLedger,
        settings: ChangeRequestSettings,
    ) -> Self {
        Self {
            credentials,
            ledger,
            settings,
        }
    }

    pub async fn verify(
        &self,
        token: &str,
        user_id: &str,
        change_type: &str,
    ) -> Result<&'static str, ChangeRequestError> {
        if token.is_empty() || user_id.is_empty() || change_type.is_empty() {
            return Err(ChangeRequestError::MissingParameters);
        }

        // Unknown token, spent token and foreign owner all look the same to the caller
        let request = match self.ledger.load(token).await? {
            Some(r) if r.status == ChangeStatus::Pending && r.user_id == user_id => r,
            Some(r) => {
                tracing::warn!(status = r.status.as_str(), "Rejected verification for unusable change request");
                return Err(ChangeRequestError::InvalidOrExpiredLink);
            }
            None => {
                tracing::warn!("Rejected verification for unknown token");
                return Err(ChangeRequestError::InvalidOrExpiredLink);
            }
        };

        let now = self.ledger.now().await?;
        if request.is_expired_at(now, self.settings.validity_window) {
            self.resolve_best_effort(&request, ChangeStatus::Expired).await;
            return Err(ChangeRequestError::LinkExpired(describe_window(
                self.settings.validity_window,
            )));
        }

        let requested = ChangeType::from_str(change_type).ok();
        match (requested, request.payload()) {
            (Some(ChangeType::Email), Some(ChangePayload::Email(new_email))) => {
                self.apply_email(&request, &new_email).await
            }
            (Some(ChangeType::Password), Some(ChangePayload::Password(new_password))) => {
                self.apply_password(&request, &new_password).await
            }
            _ => Err(ChangeRequestError::InvalidChangeRequest),
        }
    }

    async fn apply_email(
        &self,
        request: &ChangeRequest,
        new_email: &str,
    ) -> Result<&'static str, ChangeRequestError> {
        if let Err(e) = self.credentials.set_email(&request.user_id, new_email).await {
            return Err(self.fail(request, e.to_string()).await);
        }

        self.approve(request, Map::new()).await?;
        tracing::info!(user_id = %request.user_id, "Approved email change");
        Ok(EMAIL_UPDATED_MESSAGE)
    }

    async fn apply_password(
        &self,
        request: &ChangeRequest,
        new_password: &str,
    ) -> Result<&'static str, ChangeRequestError> {
        // Audit copy only; the credential store keeps its own authentication hash
        let audit_hash = match hash_password(new_password, self.settings.bcrypt_cost).await {
            Ok(hash) => hash,
            Err(e) => return Err(self.fail(request, e.to_string()).await),
        };

        if let Err(e) = self.credentials.set_password(&request.user_id, new_password).await {
            return Err(self.fail(request, e.to_string()).await);
        }

        let mut extra = Map::new();
        extra.insert("newPassword".to_string(), json!(audit_hash));
        self.approve(request, extra).await?;
        tracing::info!(user_id = %request.user_id, "Approved password change");
        Ok(PASSWORD_UPDATED_MESSAGE)
    }

    /// Pending -> Approved, after the change has been applied.
    ///
    /// Losing the conditional write means a concurrent call already resolved
    /// this token, so this call reports the link as spent. A write error is
    /// retried once, then the token is marked Failed so the applied change
    /// cannot be replayed.
    async fn approve(
        &self,
        request: &ChangeRequest,
        extra: Map<String, Value>,
    ) -> Result<(), ChangeRequestError> {
        let written = match self
            .ledger
            .transition(request, ChangeStatus::Approved, extra.clone())
            .await
        {
            Err(e) => {
                tracing::warn!(user_id = %request.user_id, "Approval write failed, retrying: {}", e);
                self.ledger.transition(request, ChangeStatus::Approved, extra).await
            }
            other => other,
        };

        match written {
            Ok(true) => Ok(()),
            Ok(false) => {
                tracing::warn!("Change request was resolved concurrently; not approving twice");
                Err(ChangeRequestError::InvalidOrExpiredLink)
            }
            Err(e) => {
                tracing::error!(
                    user_id = %request.user_id,
                    "Change applied but approval not recorded: {}",
                    e
                );
                self.resolve_best_effort(request, ChangeStatus::Failed).await;
                Err(ChangeRequestError::Ledger(e))
            }
        }
    }

    async fn fail(&self, request: &ChangeRequest, cause: String) -> ChangeRequestError {
        tracing::error!(user_id = %request.user_id, "Verification error: {}", cause);
        self.resolve_best_effort(request, ChangeStatus::Failed).await;
        ChangeRequestError::CredentialUpdateFailed(cause)
    }

    /// Terminal write whose own failure is logged and otherwise ignored
    async fn resolve_best_effort(&self, request: &ChangeRequest, next: ChangeStatus) {
        match self.ledger.transition(request, next, Map::new()).await {
            Ok(true) => {}
            Ok(false) => tracing::warn!("Change request already resolved before marking {}", next.as_str()),
            Err(e) => tracing::error!("Failed to mark change request {}: {}", next.as_str(), e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::changes::initiator::ChangeRequestInitiator;
    use crate::changes::ledger::COLLECTION;
    use crate::database::{DocumentStore, MemoryDocumentStore};
    use crate::identity::MemoryCredentialStore;
    use crate::notify::RecordingNotifier;
    use chrono::Duration;

    struct Fixture {
        store: Arc<MemoryDocumentStore>,
        credentials: Arc<MemoryCredentialStore>,
        initiator: ChangeRequestInitiator,
        verifier: ChangeRequestVerifier,
        ledger: ChangeRequestLedger,
    }

    async fn fixture() -> Fixture {
        let settings = ChangeRequestSettings::for_tests();
        let store = Arc::new(MemoryDocumentStore::new());
        let credentials = Arc::new(MemoryCredentialStore::new(4));
        credentials.create_user("admin@x.com", "old-pw").await.unwrap();
        let ledger = ChangeRequestLedger::new(store.clone());
        let initiator = ChangeRequestInitiator::new(
            credentials.clone(),
            ledger.clone(),
            Arc::new(RecordingNotifier::new()),
            settings.clone(),
        );
        let verifier = ChangeRequestVerifier::new(credentials.clone(), ledger.clone(), settings);
        Fixture {
            store,
            credentials,
            initiator,
            verifier,
            ledger,
        }
    }

    impl Fixture {
        async fn open(&self, change_type: ChangeType, value: &str) -> ChangeRequest {
            self.initiator.initiate(change_type, "admin@x.com", value).await.unwrap();
            let docs = self.store.list(COLLECTION).await.unwrap();
            serde_json::from_value(docs.last().unwrap().body.clone()).unwrap()
        }

        async fn status(&self, token: &str) -> ChangeStatus {
            self.ledger.load(token).await.unwrap().unwrap().status
        }
    }

    #[tokio::test]
    async fn email_change_is_applied_and_approved() {
        let f = fixture().await;
        let r = f.open(ChangeType::Email, "new@x.com").await;

        let message = f.verifier.verify(&r.token, &r.user_id, "email").await.unwrap();
        assert_eq!(message, EMAIL_UPDATED_MESSAGE);
        assert_eq!(f.credentials.email_of(&r.user_id).await.as_deref(), Some("new@x.com"));
        assert_eq!(f.status(&r.token).await, ChangeStatus::Approved);
    }

    #[tokio::test]
    async fn password_change_is_applied_and_payload_hashed() {
        let f = fixture().await;
        let r = f.open(ChangeType::Password, "Secr3t!").await;

        let message = f.verifier.verify(&r.token, &r.user_id, "password").await.unwrap();
        assert_eq!(message, PASSWORD_UPDATED_MESSAGE);
        assert!(f.credentials.authenticate("admin@x.com", "Secr3t!").await.unwrap().is_some());

        let stored = f.ledger.load(&r.token).await.unwrap().unwrap();
        assert_eq!(stored.status, ChangeStatus::Approved);
        let audit = stored.new_password.unwrap();
        assert_ne!(audit, "Secr3t!");
        assert!(bcrypt::verify("Secr3t!", &audit).unwrap());
    }

    #[tokio::test]
    async fn missing_parameters() {
        let f = fixture().await;
        for (t, u, c) in [("", "u", "email"), ("t", "", "email"), ("t", "u", "")] {
            assert!(matches!(
                f.verifier.verify(t, u, c).await,
                Err(ChangeRequestError::MissingParameters)
            ));
        }
    }

    #[tokio::test]
    async fn never_issued_token_is_invalid_and_writes_nothing() {
        let f = fixture().await;
        let err = f
            .verifier
            .verify(&"ab".repeat(20), "uid", "email")
            .await
            .unwrap_err();
        assert!(matches!(err, ChangeRequestError::InvalidOrExpiredLink));
        assert_eq!(f.store.count(COLLECTION).await, 0);
    }

    #[tokio::test]
    async fn wrong_user_id_is_invalid_and_stays_pending() {
        let f = fixture().await;
        let r = f.open(ChangeType::Password, "Secr3t!").await;

        let err = f.verifier.verify(&r.token, "someone-else", "password").await.unwrap_err();
        assert!(matches!(err, ChangeRequestError::InvalidOrExpiredLink));
        assert_eq!(f.status(&r.token).await, ChangeStatus::Pending);
        assert!(f.credentials.authenticate("admin@x.com", "old-pw").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn approved_token_cannot_be_replayed() {
        let f = fixture().await;
        let r = f.open(ChangeType::Email, "new@x.com").await;
        f.verifier.verify(&r.token, &r.user_id, "email").await.unwrap();

        // Put the old address back; a replay must not touch it again
        f.credentials.set_email(&r.user_id, "admin@x.com").await.unwrap();
        for _ in 0..2 {
            let err = f.verifier.verify(&r.token, &r.user_id, "email").await.unwrap_err();
            assert!(matches!(err, ChangeRequestError::InvalidOrExpiredLink));
        }
        assert_eq!(f.credentials.email_of(&r.user_id).await.as_deref(), Some("admin@x.com"));
    }

    #[tokio::test]
    async fn verify_just_inside_window_succeeds() {
        let f = fixture().await;
        let r = f.open(ChangeType::Email, "new@x.com").await;
        f.store.advance_clock(Duration::hours(3) - Duration::seconds(1));

        assert!(f.verifier.verify(&r.token, &r.user_id, "email").await.is_ok());
        assert_eq!(f.status(&r.token).await, ChangeStatus::Approved);
    }

    #[tokio::test]
    async fn verify_past_window_expires_request() {
        let f = fixture().await;
        let r = f.open(ChangeType::Email, "new@x.com").await;
        f.store.advance_clock(Duration::hours(3) + Duration::seconds(1));

        let err = f.verifier.verify(&r.token, &r.user_id, "email").await.unwrap_err();
        assert!(matches!(err, ChangeRequestError::LinkExpired(ref w) if w == "3 hours"));
        assert_eq!(f.status(&r.token).await, ChangeStatus::Expired);
        assert_eq!(f.credentials.email_of(&r.user_id).await.as_deref(), Some("admin@x.com"));

        let again = f.verifier.verify(&r.token, &r.user_id, "email").await.unwrap_err();
        assert!(matches!(again, ChangeRequestError::InvalidOrExpiredLink));
    }

    #[tokio::test]
    async fn mismatched_type_is_rejected_without_transition() {
        let f = fixture().await;
        let r = f.open(ChangeType::Email, "new@x.com").await;

        for requested in ["password", "phone"] {
            let err = f.verifier.verify(&r.token, &r.user_id, requested).await.unwrap_err();
            assert!(matches!(err, ChangeRequestError::InvalidChangeRequest));
        }
        assert_eq!(f.status(&r.token).await, ChangeStatus::Pending);
    }

    #[tokio::test]
    async fn credential_failure_marks_request_failed() {
        let f = fixture().await;
        let r = f.open(ChangeType::Email, "new@x.com").await;
        f.credentials.fail_updates(true);

        let err = f.verifier.verify(&r.token, &r.user_id, "email").await.unwrap_err();
        assert!(matches!(err, ChangeRequestError::CredentialUpdateFailed(_)));
        assert_eq!(f.status(&r.token).await, ChangeStatus::Failed);

        f.credentials.fail_updates(false);
        let again = f.verifier.verify(&r.token, &r.user_id, "email").await.unwrap_err();
        assert!(matches!(again, ChangeRequestError::InvalidOrExpiredLink));
    }

    #[tokio::test]
    async fn email_already_in_use_fails_the_request() {
        let f = fixture().await;
        f.credentials.create_user("taken@x.com", "pw").await.unwrap();
        let r = f.open(ChangeType::Email, "taken@x.com").await;

        let err = f.verifier.verify(&r.token, &r.user_id, "email").await.unwrap_err();
        assert!(matches!(err, ChangeRequestError::CredentialUpdateFailed(_)));
        assert_eq!(f.status(&r.token).await, ChangeStatus::Failed);
    }

    #[tokio::test]
    async fn transient_approval_write_error_is_retried() {
        let f = fixture().await;
        let r = f.open(ChangeType::Email, "new@x.com").await;
        f.store.fail_conditional_updates(1);

        let message = f.verifier.verify(&r.token, &r.user_id, "email").await.unwrap();
        assert_eq!(message, EMAIL_UPDATED_MESSAGE);
        assert_eq!(f.status(&r.token).await, ChangeStatus::Approved);
    }

    #[tokio::test]
    async fn unrecorded_approval_cannot_be_replayed() {
        let f = fixture().await;
        let r = f.open(ChangeType::Email, "new@x.com").await;
        f.store.fail_conditional_updates(2);

        let err = f.verifier.verify(&r.token, &r.user_id, "email").await.unwrap_err();
        assert!(matches!(err, ChangeRequestError::Ledger(_)));
        assert_eq!(f.credentials.email_of(&r.user_id).await.as_deref(), Some("new@x.com"));
        assert_eq!(f.status(&r.token).await, ChangeStatus::Failed);

        // Put the old address back; clicking the link again must not re-apply
        f.credentials.set_email(&r.user_id, "admin@x.com").await.unwrap();
        let again = f.verifier.verify(&r.token, &r.user_id, "email").await.unwrap_err();
        assert!(matches!(again, ChangeRequestError::InvalidOrExpiredLink));
        assert_eq!(f.credentials.email_of(&r.user_id).await.as_deref(), Some("admin@x.com"));
    }

    #[tokio::test]
    async fn failed_password_request_keeps_no_plaintext() {
        let f = fixture().await;
        let r = f.open(ChangeType::Password, "Secr3t!").await;
        f.credentials.fail_updates(true);

        f.verifier.verify(&r.token, &r.user_id, "password").await.unwrap_err();
        let stored = f.ledger.load(&r.token).await.unwrap().unwrap();
        assert_eq!(stored.status, ChangeStatus::Failed);
        assert_eq!(stored.new_password, None);
    }

    #[tokio::test]
    async fn unrecorded_password_approval_keeps_no_plaintext() {
        let f = fixture().await;
        let r = f.open(ChangeType::Password, "Secr3t!").await;
        f.store.fail_conditional_updates(2);

        f.verifier.verify(&r.token, &r.user_id, "password").await.unwrap_err();
        let stored = f.ledger.load(&r.token).await.unwrap().unwrap();
        assert_eq!(stored.status, ChangeStatus::Failed);
        assert_eq!(stored.new_password, None);
    }

    #[tokio::test]
    async fn expired_password_request_keeps_no_plaintext() {
        let f = fixture().await;
        let r = f.open(ChangeType::Password, "Other9!").await;
        f.store.advance_clock(Duration::hours(3) + Duration::seconds(1));

        f.verifier.verify(&r.token, &r.user_id, "password").await.unwrap_err();
        let stored = f.ledger.load(&r.token).await.unwrap().unwrap();
        assert_eq!(stored.status, ChangeStatus::Expired);
        assert_eq!(stored.new_password, None);
        assert!(f.credentials.authenticate("admin@x.com", "old-pw").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn concurrent_verifications_approve_once() {
        let f = fixture().await;
        let r = f.open(ChangeType::Email, "new@x.com").await;

        let (a, b) = tokio::join!(
            f.verifier.verify(&r.token, &r.user_id, "email"),
            f.verifier.verify(&r.token, &r.user_id, "email"),
        );
        let successes = [a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count();
        assert_eq!(successes, 1);
        assert_eq!(f.status(&r.token).await, ChangeStatus::Approved);
    }
}
