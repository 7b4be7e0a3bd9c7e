#![allow(dead_code)]

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use reqwest::StatusCode;
use serde_json::{json, Value};

use site_api::changes::ChangeRequestSettings;
use site_api::database::MemoryDocumentStore;
use site_api::identity::{CredentialStore, MemoryCredentialStore};
use site_api::media::MemoryBlobStore;
use site_api::notify::RecordingNotifier;
use site_api::{app, AppState, ServiceOptions};

pub const ADMIN_EMAIL: &str = "admin@x.com";
pub const ADMIN_PASSWORD: &str = "initial-pass";
pub const JWT_SECRET: &str = "integration-test-secret";

/// One in-process server over fresh in-memory stores
pub struct TestServer {
    pub port: u16,
    pub base_url: String,
    pub client: reqwest::Client,
    pub store: Arc<MemoryDocumentStore>,
    pub credentials: Arc<MemoryCredentialStore>,
    pub notifier: Arc<RecordingNotifier>,
    pub blobs: Arc<MemoryBlobStore>,
    pub admin_id: String,
}

impl TestServer {
    pub async fn spawn() -> Result<Self> {
        Self::spawn_with(|_| {}).await
    }

    /// Start a server, letting the caller adjust the change-request settings
    pub async fn spawn_with(adjust: impl FnOnce(&mut ChangeRequestSettings)) -> Result<Self> {
        // Pick an unused port for isolation
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);

        let mut settings = ChangeRequestSettings {
            approver_email: "approver@x.com".to_string(),
            sender_email: "no-reply@x.com".to_string(),
            verify_base_url: base_url.clone(),
            validity_window: Duration::from_secs(3 * 60 * 60),
            bcrypt_cost: 4,
            conceal_unknown_accounts: false,
        };
        adjust(&mut settings);

        let store = Arc::new(MemoryDocumentStore::new());
        let credentials = Arc::new(MemoryCredentialStore::new(4));
        let notifier = Arc::new(RecordingNotifier::new());
        let blobs = Arc::new(MemoryBlobStore::new(format!("{}/media", base_url)));

        let admin = credentials
            .create_user(ADMIN_EMAIL, ADMIN_PASSWORD)
            .await
            .context("failed to seed admin account")?;

        let options = ServiceOptions {
            jwt_secret: JWT_SECRET.to_string(),
            jwt_expiry_hours: 1,
            cors_origins: vec!["http://localhost:3000".to_string()],
            max_request_size_bytes: 10 * 1024 * 1024,
            media_dir: None,
            site_url: "https://site.test".to_string(),
        };
        let state = AppState::new(
            store.clone(),
            credentials.clone(),
            blobs.clone(),
            notifier.clone(),
            settings,
            options,
        );

        let listener = tokio::net::TcpListener::bind(("127.0.0.1", port))
            .await
            .context("failed to bind test port")?;
        tokio::spawn(async move {
            let _ = axum::serve(listener, app(state)).await;
        });

        let server = Self {
            port,
            base_url,
            client: reqwest::Client::new(),
            store,
            credentials,
            notifier,
            blobs,
            admin_id: admin.id,
        };
        server.wait_ready(Duration::from_secs(10)).await?;
        Ok(server)
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        loop {
            if Instant::now() > deadline {
                break;
            }
            if let Ok(resp) = self.client.get(self.url("/health")).send().await {
                if resp.status() == StatusCode::OK {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Log in as the seeded administrator and return the bearer token
    pub async fn admin_token(&self) -> Result<String> {
        let resp = self
            .client
            .post(self.url("/auth/login"))
            .json(&json!({"email": ADMIN_EMAIL, "password": ADMIN_PASSWORD}))
            .send()
            .await?;
        anyhow::ensure!(resp.status() == StatusCode::OK, "login failed: {}", resp.status());
        let body: Value = resp.json().await?;
        body["data"]["token"]
            .as_str()
            .map(str::to_string)
            .context("login response has no token")
    }

    /// Verification link from the most recent approval email
    pub fn last_verification_link(&self) -> Option<String> {
        let mail = self.notifier.sent().pop()?;
        let marker = format!("{}/verify-change?", self.base_url);
        let start = mail.text.find(&marker)?;
        let link = mail.text[start..].split_whitespace().next()?;
        Some(link.to_string())
    }
}

/// Value of one query parameter of a link
pub fn query_param(link: &str, name: &str) -> Option<String> {
    let parsed = url::Url::parse(link).ok()?;
    let value = parsed.query_pairs().find(|(k, _)| k == name)?.1.into_owned();
    Some(value)
}
