//! Approval-gated credential changes.
//!
//! A change is requested for an account by email, parked in the ledger under a
//! random token, and applied only when the approver follows the emailed link
//! within the validity window. Each token resolves exactly once.

use std::time::Duration;

pub mod error;
pub mod initiator;
pub mod ledger;
pub mod model;
pub mod verifier;

pub use error::ChangeRequestError;
pub use initiator::ChangeRequestInitiator;
pub use ledger::ChangeRequestLedger;
pub use model::{ChangePayload, ChangeRequest, ChangeStatus, ChangeType};
pub use verifier::ChangeRequestVerifier;

/// Values the workflow needs at construction time
#[derive(Debug, Clone)]
pub struct ChangeRequestSettings {
    /// Fixed mailbox that receives every approval link
    pub approver_email: String,
    pub sender_email: String,
    /// Public base URL of this service; `/verify-change` is appended
    pub verify_base_url: String,
    pub validity_window: Duration,
    pub bcrypt_cost: u32,
    /// Answer unknown-account requests like successful ones
    pub conceal_unknown_accounts: bool,
}

#[cfg(test)]
impl ChangeRequestSettings {
    pub(crate) fn for_tests() -> Self {
        Self {
            approver_email: "approver@example.com".to_string(),
            sender_email: "no-reply@example.com".to_string(),
            verify_base_url: "https://api.example.com/".to_string(),
            validity_window: Duration::from_secs(3 * 60 * 60),
            bcrypt_cost: 4,
            conceal_unknown_accounts: false,
        }
    }
}
