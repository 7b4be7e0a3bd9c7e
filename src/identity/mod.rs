//! Credential store: the single authority for account emails and passwords.

use async_trait::async_trait;
use thiserror::Error;

pub mod memory;
pub mod postgres;

pub use memory::MemoryCredentialStore;
pub use postgres::PgCredentialStore;

/// Stable account identifier, independent of the (mutable) email address
pub type UserId = String;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub id: UserId,
    pub email: String,
}

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("No account with email '{0}'")]
    NotFound(String),

    #[error("Email '{0}' is already in use")]
    EmailTaken(String),

    #[error("Password hashing failed: {0}")]
    Hashing(String),

    #[error("Credential store error: {0}")]
    Backend(String),
}

impl From<sqlx::Error> for IdentityError {
    fn from(err: sqlx::Error) -> Self {
        IdentityError::Backend(err.to_string())
    }
}

impl From<bcrypt::BcryptError> for IdentityError {
    fn from(err: bcrypt::BcryptError) -> Self {
        IdentityError::Hashing(err.to_string())
    }
}

#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Resolve an account by email; `NotFound` when no account uses it
    async fn find_by_email(&self, email: &str) -> Result<Account, IdentityError>;

    /// Replace the email of an existing account
    async fn set_email(&self, id: &str, email: &str) -> Result<(), IdentityError>;

    /// Replace the password of an existing account
    async fn set_password(&self, id: &str, password: &str) -> Result<(), IdentityError>;

    /// Check a login attempt. `Ok(None)` for unknown email or wrong password.
    async fn authenticate(&self, email: &str, password: &str) -> Result<Option<Account>, IdentityError>;

    async fn create_user(&self, email: &str, password: &str) -> Result<Account, IdentityError>;
}
