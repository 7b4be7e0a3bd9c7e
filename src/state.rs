//! Application state shared by every handler

use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

use crate::changes::{ChangeRequestInitiator, ChangeRequestLedger, ChangeRequestSettings, ChangeRequestVerifier};
use crate::config::{AppConfig, StoreBackend};
use crate::database::{DatabaseError, DatabaseManager, DocumentStore, MemoryDocumentStore, PgDocumentStore};
use crate::identity::{CredentialStore, MemoryCredentialStore, PgCredentialStore};
use crate::media::{BlobStore, LocalBlobStore};
use crate::notify::{HttpMailer, LogNotifier, Notifier, NotifyError};
use crate::services::{AdvertisementService, ClientService, ContactService, InternshipService, TeamService};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error(transparent)]
    Notify(#[from] NotifyError),
}

/// HTTP-level settings that are not part of any single component
#[derive(Debug, Clone)]
pub struct ServiceOptions {
    pub jwt_secret: String,
    pub jwt_expiry_hours: u64,
    pub cors_origins: Vec<String>,
    pub max_request_size_bytes: usize,
    /// Directory served under `/media`; `None` when blobs live elsewhere
    pub media_dir: Option<PathBuf>,
    pub site_url: String,
}

impl ServiceOptions {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            jwt_secret: config.security.jwt_secret.clone(),
            jwt_expiry_hours: config.security.jwt_expiry_hours,
            cors_origins: config.security.cors_origins.clone(),
            max_request_size_bytes: config.api.max_request_size_bytes,
            media_dir: Some(PathBuf::from(&config.media.directory)),
            site_url: config.media.site_url.clone(),
        }
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DocumentStore>,
    pub credentials: Arc<dyn CredentialStore>,
    pub initiator: ChangeRequestInitiator,
    pub verifier: ChangeRequestVerifier,
    pub team: TeamService,
    pub clients: ClientService,
    pub advertisements: AdvertisementService,
    pub contacts: ContactService,
    pub internships: InternshipService,
    pub options: Arc<ServiceOptions>,
    pub started_at: chrono::DateTime<chrono::Utc>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        credentials: Arc<dyn CredentialStore>,
        blobs: Arc<dyn BlobStore>,
        notifier: Arc<dyn Notifier>,
        settings: ChangeRequestSettings,
        options: ServiceOptions,
    ) -> Self {
        let ledger = ChangeRequestLedger::new(store.clone());
        let initiator = ChangeRequestInitiator::new(credentials.clone(), ledger.clone(), notifier, settings.clone());
        let verifier = ChangeRequestVerifier::new(credentials.clone(), ledger, settings);

        Self {
            team: TeamService::new(store.clone(), blobs.clone(), options.site_url.clone()),
            clients: ClientService::new(store.clone(), blobs.clone()),
            advertisements: AdvertisementService::new(store.clone(), blobs.clone()),
            contacts: ContactService::new(store.clone(), blobs.clone()),
            internships: InternshipService::new(store.clone(), blobs),
            store,
            credentials,
            initiator,
            verifier,
            options: Arc::new(options),
            started_at: chrono::Utc::now(),
        }
    }

    /// Wire concrete stores from configuration.
    ///
    /// Returns the database manager as well when the Postgres backend is in use,
    /// so the caller can close the pool on shutdown.
    pub async fn from_config(config: &AppConfig) -> Result<(Self, Option<DatabaseManager>), StartupError> {
        let settings = config.change_requests.settings();

        let (store, credentials, manager): (Arc<dyn DocumentStore>, Arc<dyn CredentialStore>, _) =
            match config.database.backend {
                StoreBackend::Postgres => {
                    let manager = DatabaseManager::connect(&config.database).await?;
                    manager.migrate().await?;
                    let pool = manager.pool();
                    (
                        Arc::new(PgDocumentStore::new(pool.clone())),
                        Arc::new(PgCredentialStore::new(pool, settings.bcrypt_cost)),
                        Some(manager),
                    )
                }
                StoreBackend::Memory => {
                    tracing::warn!("Using in-memory stores; data is lost on restart");
                    (
                        Arc::new(MemoryDocumentStore::new()),
                        Arc::new(MemoryCredentialStore::new(settings.bcrypt_cost)),
                        None,
                    )
                }
            };

        let notifier: Arc<dyn Notifier> = match &config.mail.api_url {
            Some(url) => Arc::new(HttpMailer::new(url.clone(), config.mail.api_key.clone())?),
            None => {
                tracing::warn!("No mail API configured; approval emails will only be logged");
                Arc::new(LogNotifier)
            }
        };

        let blobs = Arc::new(LocalBlobStore::new(&config.media.directory, &config.media.public_base_url));

        let state = Self::new(
            store,
            credentials,
            blobs,
            notifier,
            settings,
            ServiceOptions::from_config(config),
        );
        Ok((state, manager))
    }
}
