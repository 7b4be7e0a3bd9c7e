use async_trait::async_trait;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use super::{Account, CredentialStore, IdentityError};
use crate::auth::{hash_password, verify_password};

/// Accounts in the `admin_users` table; passwords are kept only as bcrypt hashes
#[derive(Clone)]
pub struct PgCredentialStore {
    pool: PgPool,
    bcrypt_cost: u32,
}

impl PgCredentialStore {
    pub fn new(pool: PgPool, bcrypt_cost: u32) -> Self {
        Self { pool, bcrypt_cost }
    }

    fn parse_id(id: &str) -> Result<Uuid, IdentityError> {
        Uuid::parse_str(id).map_err(|_| IdentityError::NotFound(id.to_string()))
    }

    fn map_unique_violation(err: sqlx::Error, email: &str) -> IdentityError {
        match &err {
            sqlx::Error::Database(db) if db.is_unique_violation() => IdentityError::EmailTaken(email.to_string()),
            _ => IdentityError::from(err),
        }
    }
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    async fn find_by_email(&self, email: &str) -> Result<Account, IdentityError> {
        let row = sqlx::query("SELECT id, email FROM admin_users WHERE lower(email) = lower($1)")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| IdentityError::NotFound(email.to_string()))?;

        let id: Uuid = row.try_get("id")?;
        Ok(Account {
            id: id.to_string(),
            email: row.try_get("email")?,
        })
    }

    async fn set_email(&self, id: &str, email: &str) -> Result<(), IdentityError> {
        let uuid = Self::parse_id(id)?;
        let result = sqlx::query("UPDATE admin_users SET email = $2, updated_at = now() WHERE id = $1")
            .bind(uuid)
            .bind(email)
            .execute(&self.pool)
            .await
            .map_err(|e| Self::map_unique_violation(e, email))?;

        if result.rows_affected() == 0 {
            return Err(IdentityError::NotFound(id.to_string()));
        }
        Ok(())
    }

    async fn set_password(&self, id: &str, password: &str) -> Result<(), IdentityError> {
        let uuid = Self::parse_id(id)?;
        let hash = hash_password(password, self.bcrypt_cost).await?;
        let result = sqlx::query("UPDATE admin_users SET password_hash = $2, updated_at = now() WHERE id = $1")
            .bind(uuid)
            .bind(hash)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(IdentityError::NotFound(id.to_string()));
        }
        Ok(())
    }

    async fn authenticate(&self, email: &str, password: &str) -> Result<Option<Account>, IdentityError> {
        let Some(row) = sqlx::query("SELECT id, email, password_hash FROM admin_users WHERE lower(email) = lower($1)")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?
        else {
            return Ok(None);
        };

        let hash: String = row.try_get("password_hash")?;
        if !verify_password(password, &hash).await? {
            return Ok(None);
        }

        let id: Uuid = row.try_get("id")?;
        Ok(Some(Account {
            id: id.to_string(),
            email: row.try_get("email")?,
        }))
    }

    async fn create_user(&self, email: &str, password: &str) -> Result<Account, IdentityError> {
        let id = Uuid::new_v4();
        let hash = hash_password(password, self.bcrypt_cost).await?;
        sqlx::query("INSERT INTO admin_users (id, email, password_hash) VALUES ($1, $2, $3)")
            .bind(id)
            .bind(email)
            .bind(hash)
            .execute(&self.pool)
            .await
            .map_err(|e| Self::map_unique_violation(e, email))?;

        Ok(Account {
            id: id.to_string(),
            email: email.to_string(),
        })
    }
}
