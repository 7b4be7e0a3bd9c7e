use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{Account, CredentialStore, IdentityError};
use crate::auth::{hash_password, verify_password};

#[derive(Debug, Clone)]
struct StoredAccount {
    email: String,
    password_hash: String,
}

/// In-process credential store. `fail_updates` makes every mutation error out,
/// which is how callers exercise downstream failure handling.
pub struct MemoryCredentialStore {
    accounts: RwLock<HashMap<String, StoredAccount>>,
    bcrypt_cost: u32,
    fail_updates: AtomicBool,
}

impl MemoryCredentialStore {
    pub fn new(bcrypt_cost: u32) -> Self {
        Self {
            accounts: RwLock::new(HashMap::new()),
            bcrypt_cost,
            fail_updates: AtomicBool::new(false),
        }
    }

    pub fn fail_updates(&self, fail: bool) {
        self.fail_updates.store(fail, Ordering::SeqCst);
    }

    /// Current email of an account, if it exists
    pub async fn email_of(&self, id: &str) -> Option<String> {
        self.accounts.read().await.get(id).map(|a| a.email.clone())
    }

    fn check_failure(&self) -> Result<(), IdentityError> {
        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(IdentityError::Backend("credential store unavailable".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn find_by_email(&self, email: &str) -> Result<Account, IdentityError> {
        let accounts = self.accounts.read().await;
        accounts
            .iter()
            .find(|(_, a)| a.email.eq_ignore_ascii_case(email))
            .map(|(id, a)| Account {
                id: id.clone(),
                email: a.email.clone(),
            })
            .ok_or_else(|| IdentityError::NotFound(email.to_string()))
    }

    async fn set_email(&self, id: &str, email: &str) -> Result<(), IdentityError> {
        self.check_failure()?;
        let mut accounts = self.accounts.write().await;
        if accounts
            .iter()
            .any(|(other, a)| other != id && a.email.eq_ignore_ascii_case(email))
        {
            return Err(IdentityError::EmailTaken(email.to_string()));
        }
        let account = accounts
            .get_mut(id)
            .ok_or_else(|| IdentityError::NotFound(id.to_string()))?;
        account.email = email.to_string();
        Ok(())
    }

    async fn set_password(&self, id: &str, password: &str) -> Result<(), IdentityError> {
        self.check_failure()?;
        let hash = hash_password(password, self.bcrypt_cost).await?;
        let mut accounts = self.accounts.write().await;
        let account = accounts
            .get_mut(id)
            .ok_or_else(|| IdentityError::NotFound(id.to_string()))?;
        account.password_hash = hash;
        Ok(())
    }

    async fn authenticate(&self, email: &str, password: &str) -> Result<Option<Account>, IdentityError> {
        let found = {
            let accounts = self.accounts.read().await;
            accounts
                .iter()
                .find(|(_, a)| a.email.eq_ignore_ascii_case(email))
                .map(|(id, a)| (id.clone(), a.clone()))
        };
        let Some((id, stored)) = found else {
            return Ok(None);
        };
        if !verify_password(password, &stored.password_hash).await? {
            return Ok(None);
        }
        Ok(Some(Account { id, email: stored.email }))
    }

    async fn create_user(&self, email: &str, password: &str) -> Result<Account, IdentityError> {
        let hash = hash_password(password, self.bcrypt_cost).await?;
        let mut accounts = self.accounts.write().await;
        if accounts.values().any(|a| a.email.eq_ignore_ascii_case(email)) {
            return Err(IdentityError::EmailTaken(email.to_string()));
        }
        let id = Uuid::new_v4().to_string();
        accounts.insert(
            id.clone(),
            StoredAccount {
                email: email.to_string(),
                password_hash: hash,
            },
        );
        Ok(Account {
            id,
            email: email.to_string(),
        })
    }
}
