use thiserror::Error;

use super::model::ChangeType;
use crate::database::DatabaseError;

/// Failures of the credential-change workflow.
///
/// Display strings are written for end users except where noted; the
/// HTTP layer decides which of them are safe to expose.
#[derive(Debug, Error)]
pub enum ChangeRequestError {
    #[error("Email of account to change and new {} are required.", .0.as_str())]
    MissingFields(ChangeType),

    #[error("User with email '{0}' not found.")]
    SubjectNotFound(String),

    /// Detail is internal
    #[error("Failed to verify account to change: {0}")]
    IdentityLookupFailed(String),

    /// Detail is internal
    #[error("Change request storage failed: {0}")]
    Ledger(#[from] DatabaseError),

    /// Detail is internal
    #[error("Failed to send approval email: {0}")]
    NotificationFailed(String),

    #[error("Missing required parameters in verification link.")]
    MissingParameters,

    #[error("Invalid or expired verification link.")]
    InvalidOrExpiredLink,

    #[error("Verification link has expired (valid for {0}).")]
    LinkExpired(String),

    #[error("Invalid change type or missing data for the requested change.")]
    InvalidChangeRequest,

    /// Detail is internal
    #[error("Credential update failed: {0}")]
    CredentialUpdateFailed(String),
}
