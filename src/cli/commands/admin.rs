use anyhow::{bail, Context};

use crate::config::{AppConfig, StoreBackend};
use crate::database::DatabaseManager;
use crate::identity::{CredentialStore, PgCredentialStore};

async fn connect(config: &AppConfig) -> anyhow::Result<DatabaseManager> {
    if config.database.backend != StoreBackend::Postgres {
        bail!("this command needs the Postgres backend (set DATABASE_URL)");
    }
    let manager = DatabaseManager::connect(&config.database)
        .await
        .context("failed to connect to database")?;
    Ok(manager)
}

pub async fn migrate(config: &AppConfig) -> anyhow::Result<()> {
    let manager = connect(config).await?;
    manager.migrate().await.context("migration failed")?;
    manager.close().await;
    println!("Database schema is up to date");
    Ok(())
}

pub async fn create_admin(config: &AppConfig, email: &str, password: &str) -> anyhow::Result<()> {
    if email.trim().is_empty() || password.is_empty() {
        bail!("email and password must not be empty");
    }
    let manager = connect(config).await?;
    manager.migrate().await.context("migration failed")?;

    let store = PgCredentialStore::new(manager.pool(), config.change_requests.bcrypt_cost);
    let account = store
        .create_user(email.trim(), password)
        .await
        .context("failed to create admin account")?;
    manager.close().await;

    println!("Created admin {} ({})", account.email, account.id);
    Ok(())
}
