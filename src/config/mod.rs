use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

use crate::changes::ChangeRequestSettings;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub api: ApiConfig,
    pub security: SecurityConfig,
    pub change_requests: ChangeRequestConfig,
    pub mail: MailConfig,
    pub media: MediaConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub backend: StoreBackend,
    pub url: Option<String>,
    pub max_connections: u32,
    pub connection_timeout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub max_request_size_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub jwt_secret: String,
    pub jwt_expiry_hours: u64,
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeRequestConfig {
    pub approver_email: String,
    pub sender_email: String,
    pub verify_base_url: String,
    pub validity_window_secs: u64,
    pub bcrypt_cost: u32,
    pub conceal_unknown_accounts: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailConfig {
    /// HTTP endpoint of the transactional mail API. `None` logs mail instead.
    pub api_url: Option<String>,
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    pub directory: String,
    pub public_base_url: String,
    pub site_url: String,
}

impl ChangeRequestConfig {
    pub fn settings(&self) -> ChangeRequestSettings {
        ChangeRequestSettings {
            approver_email: self.approver_email.clone(),
            sender_email: self.sender_email.clone(),
            verify_base_url: self.verify_base_url.clone(),
            validity_window: Duration::from_secs(self.validity_window_secs),
            bcrypt_cost: self.bcrypt_cost,
            conceal_unknown_accounts: self.conceal_unknown_accounts,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        if let Some(port) = env::var("SITE_API_PORT")
            .ok()
            .or_else(|| env::var("PORT").ok())
            .and_then(|s| s.parse().ok())
        {
            self.server.port = port;
        }

        // Database overrides
        if let Ok(v) = env::var("DATABASE_URL") {
            self.database.url = Some(v);
            self.database.backend = StoreBackend::Postgres;
        }
        if let Ok(v) = env::var("DATABASE_BACKEND") {
            match v.as_str() {
                "memory" => self.database.backend = StoreBackend::Memory,
                "postgres" => self.database.backend = StoreBackend::Postgres,
                other => tracing::warn!("Ignoring unknown DATABASE_BACKEND '{}'", other),
            }
        }
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout = v.parse().unwrap_or(self.database.connection_timeout);
        }

        // API overrides
        if let Ok(v) = env::var("API_MAX_REQUEST_SIZE_BYTES") {
            self.api.max_request_size_bytes = v.parse().unwrap_or(self.api.max_request_size_bytes);
        }

        // Security overrides
        if let Ok(v) = env::var("JWT_SECRET") {
            self.security.jwt_secret = v;
        }
        if let Ok(v) = env::var("SECURITY_JWT_EXPIRY_HOURS") {
            self.security.jwt_expiry_hours = v.parse().unwrap_or(self.security.jwt_expiry_hours);
        }
        if let Ok(v) = env::var("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = v.split(',').map(|s| s.trim().to_string()).collect();
        }

        // Change request overrides
        if let Ok(v) = env::var("CHANGE_APPROVER_EMAIL") {
            self.change_requests.approver_email = v;
        }
        if let Ok(v) = env::var("CHANGE_SENDER_EMAIL") {
            self.change_requests.sender_email = v;
        }
        if let Ok(v) = env::var("CHANGE_VERIFY_BASE_URL") {
            self.change_requests.verify_base_url = v;
        }
        if let Ok(v) = env::var("CHANGE_VALIDITY_WINDOW_SECS") {
            self.change_requests.validity_window_secs =
                v.parse().unwrap_or(self.change_requests.validity_window_secs);
        }
        if let Ok(v) = env::var("CHANGE_BCRYPT_COST") {
            self.change_requests.bcrypt_cost = v.parse().unwrap_or(self.change_requests.bcrypt_cost);
        }
        if let Ok(v) = env::var("CHANGE_CONCEAL_UNKNOWN_ACCOUNTS") {
            self.change_requests.conceal_unknown_accounts =
                v.parse().unwrap_or(self.change_requests.conceal_unknown_accounts);
        }

        // Mail overrides
        if let Ok(v) = env::var("MAIL_API_URL") {
            self.mail.api_url = Some(v);
        }
        if let Ok(v) = env::var("MAIL_API_KEY") {
            self.mail.api_key = Some(v);
        }

        // Media overrides
        if let Ok(v) = env::var("MEDIA_DIR") {
            self.media.directory = v;
        }
        if let Ok(v) = env::var("MEDIA_PUBLIC_BASE_URL") {
            self.media.public_base_url = v;
        }
        if let Ok(v) = env::var("SITE_URL") {
            self.media.site_url = v;
        }

        self
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            server: ServerConfig { port: 3000 },
            database: DatabaseConfig {
                backend: StoreBackend::Memory,
                url: None,
                max_connections: 5,
                connection_timeout: 30,
            },
            api: ApiConfig {
                max_request_size_bytes: 50 * 1024 * 1024, // 50MB, videos arrive as data URIs
            },
            security: SecurityConfig {
                jwt_secret: "development-secret".to_string(),
                jwt_expiry_hours: 24 * 7,
                cors_origins: vec!["http://localhost:3000".to_string(), "http://localhost:5173".to_string()],
            },
            change_requests: ChangeRequestConfig {
                approver_email: "approver@localhost".to_string(),
                sender_email: "no-reply@localhost".to_string(),
                verify_base_url: "http://localhost:3000".to_string(),
                validity_window_secs: 3 * 60 * 60,
                bcrypt_cost: 4,
                conceal_unknown_accounts: false,
            },
            mail: MailConfig { api_url: None, api_key: None },
            media: MediaConfig {
                directory: "./media".to_string(),
                public_base_url: "http://localhost:3000/media".to_string(),
                site_url: "http://localhost:5173".to_string(),
            },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            server: ServerConfig { port: 8080 },
            database: DatabaseConfig {
                backend: StoreBackend::Postgres,
                url: None,
                max_connections: 10,
                connection_timeout: 10,
            },
            api: ApiConfig {
                max_request_size_bytes: 50 * 1024 * 1024,
            },
            security: SecurityConfig {
                jwt_secret: String::new(),
                jwt_expiry_hours: 24,
                cors_origins: vec!["https://staging.example.com".to_string()],
            },
            change_requests: ChangeRequestConfig {
                approver_email: String::new(),
                sender_email: String::new(),
                verify_base_url: "https://staging-api.example.com".to_string(),
                validity_window_secs: 3 * 60 * 60,
                bcrypt_cost: bcrypt::DEFAULT_COST,
                conceal_unknown_accounts: false,
            },
            mail: MailConfig { api_url: None, api_key: None },
            media: MediaConfig {
                directory: "/var/lib/site-api/media".to_string(),
                public_base_url: "https://staging-api.example.com/media".to_string(),
                site_url: "https://staging.example.com".to_string(),
            },
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            server: ServerConfig { port: 8080 },
            database: DatabaseConfig {
                backend: StoreBackend::Postgres,
                url: None,
                max_connections: 20,
                connection_timeout: 5,
            },
            api: ApiConfig {
                max_request_size_bytes: 50 * 1024 * 1024,
            },
            security: SecurityConfig {
                jwt_secret: String::new(),
                jwt_expiry_hours: 4,
                cors_origins: vec!["https://example.com".to_string()],
            },
            change_requests: ChangeRequestConfig {
                approver_email: String::new(),
                sender_email: String::new(),
                verify_base_url: "https://api.example.com".to_string(),
                validity_window_secs: 3 * 60 * 60,
                bcrypt_cost: bcrypt::DEFAULT_COST,
                conceal_unknown_accounts: false,
            },
            mail: MailConfig { api_url: None, api_key: None },
            media: MediaConfig {
                directory: "/var/lib/site-api/media".to_string(),
                public_base_url: "https://api.example.com/media".to_string(),
                site_url: "https://example.com".to_string(),
            },
        }
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}
