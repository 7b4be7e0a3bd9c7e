use std::sync::Arc;
use std::time::Duration;

use super::error::ChangeRequestError;
use super::ledger::ChangeRequestLedger;
use super::model::{ChangePayload, ChangeRequest, ChangeType};
use super::ChangeRequestSettings;
use crate::identity::{CredentialStore, IdentityError};
use crate::notify::{Mail, Notifier};

pub const INITIATED_MESSAGE: &str =
    "Confirmation email sent to default master admin email for approval. Check your inbox.";

/// Opens change requests and mails the approval link to the approver mailbox.
///
/// The subject account is resolved once here; the verifier only ever trusts
/// the user id stored with the request.
#[derive(Clone)]
pub struct ChangeRequestInitiator {
    credentials: Arc<dyn CredentialStore>,
    ledger: ChangeRequestLedger,
    notifier: Arc<dyn Notifier>,
    settings: ChangeRequestSettings,
}

impl ChangeRequestInitiator {
    pub fn new(
        credentials: Arc<dyn CredentialStore>,
        ledger: ChangeRequestLedger,
        notifier: Arc<dyn Notifier>,
        settings: ChangeRequestSettings,
    ) -> Self {
        Self {
            credentials,
            ledger,
            notifier,
            settings,
        }
    }

    pub async fn initiate(
        &self,
        change_type: ChangeType,
        subject_email: &str,
        new_value: &str,
    ) -> Result<&'static str, ChangeRequestError> {
        let subject_email = subject_email.trim();
        let new_value = match change_type {
            ChangeType::Email => new_value.trim(),
            ChangeType::Password => new_value,
        };
        if subject_email.is_empty() || new_value.is_empty() {
            return Err(ChangeRequestError::MissingFields(change_type));
        }

        let account = match self.credentials.find_by_email(subject_email).await {
            Ok(account) => account,
            Err(IdentityError::NotFound(_)) if self.settings.conceal_unknown_accounts => {
                tracing::warn!("{} change requested for unknown account; answering generically", change_type);
                return Ok(INITIATED_MESSAGE);
            }
            Err(IdentityError::NotFound(_)) => {
                return Err(ChangeRequestError::SubjectNotFound(subject_email.to_string()));
            }
            Err(other) => {
                tracing::error!("Error fetching user by email for change request: {}", other);
                return Err(ChangeRequestError::IdentityLookupFailed(other.to_string()));
            }
        };

        let request = self
            .ledger
            .open(&account.id, ChangePayload::new(change_type, new_value), subject_email)
            .await?;
        tracing::info!(
            user_id = %request.user_id,
            change_type = %request.change_type,
            "Opened change request"
        );

        // The record stays Pending if this fails; it simply expires unused
        let mail = self.approval_mail(&request);
        self.notifier.send(mail).await.map_err(|e| {
            tracing::error!("Approval email for {} change failed: {}", change_type, e);
            ChangeRequestError::NotificationFailed(e.to_string())
        })?;

        Ok(INITIATED_MESSAGE)
    }

    /// `{base}/verify-change?token=..&userId=..&type=..`
    pub fn verification_url(&self, request: &ChangeRequest) -> String {
        let query = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("token", &request.token)
            .append_pair("userId", &request.user_id)
            .append_pair("type", request.change_type.as_str())
            .finish();
        format!(
            "{}/verify-change?{}",
            self.settings.verify_base_url.trim_end_matches('/'),
            query
        )
    }

    fn approval_mail(&self, request: &ChangeRequest) -> Mail {
        let url = self.verification_url(request);
        let validity = describe_window(self.settings.validity_window);
        let account = &request.original_email;

        let (subject, text, html) = match request.change_type {
            ChangeType::Email => {
                let new_email = request.new_email.as_deref().unwrap_or_default();
                (
                    "Approve Admin Login Email Change Request",
                    format!(
                        "An email change has been requested for the admin account: {}. \
                         Click here to confirm and approve the email change to {}: {}\n\
                         This link is valid for {} only.",
                        account, new_email, url, validity
                    ),
                    format!(
                        "<p>An email change has been requested for the admin login account: <b>{}</b>.</p>\
                         <p>Click here to confirm and approve the email change to <b>{}</b>: \
                         <a href=\"{}\">{}</a></p><p>This link is valid for {} only.</p>",
                        escape_html(account),
                        escape_html(new_email),
                        escape_html(&url),
                        escape_html(&url),
                        validity
                    ),
                )
            }
            ChangeType::Password => (
                "Approve Admin Login Password Change Request",
                format!(
                    "A password change has been requested for the admin account: {}. \
                     Click here to confirm and approve the password change: {}\n\
                     This link is valid for {} only.",
                    account, url, validity
                ),
                format!(
                    "<p>A password change has been requested for the admin login account: <b>{}</b>.</p>\
                     <p>Click here to confirm and approve the password change: \
                     <a href=\"{}\">{}</a></p><p>This link is valid for {} only.</p>",
                    escape_html(account),
                    escape_html(&url),
                    escape_html(&url),
                    validity
                ),
            ),
        };

        Mail {
            from: self.settings.sender_email.clone(),
            to: self.settings.approver_email.clone(),
            subject: subject.to_string(),
            text,
            html,
        }
    }
}

/// "3 hours", "90 minutes", "45 seconds"
pub(crate) fn describe_window(window: Duration) -> String {
    let secs = window.as_secs();
    let (n, unit) = if secs % 3600 == 0 && secs > 0 {
        (secs / 3600, "hour")
    } else if secs % 60 == 0 && secs > 0 {
        (secs / 60, "minute")
    } else {
        (secs, "second")
    };
    if n == 1 {
        format!("1 {}", unit)
    } else {
        format!("{} {}s", n, unit)
    }
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
