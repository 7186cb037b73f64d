use anyhow::{bail, Result};
use serde::Deserialize;
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub run: RunConfig,
    pub clients: ClientSourceConfig,
    pub database: DatabaseConfig,
    pub api: ApiConfig,
    pub auth: AuthConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RunConfig {
    /// Days added to "today" when no explicit trigger date is given.
    pub date_offset_days: i64,
    /// Directory the run summary JSON is written to, when set.
    pub output_dir: Option<PathBuf>,
}

/// Where the client list comes from.
#[derive(Debug, Clone, Deserialize)]
pub enum ClientSourceConfig {
    /// SQL query against the relational store.
    Database,
    /// GET a JSON list of client descriptors.
    Http { url: String },
    /// Client descriptors from a local JSON file.
    File { path: PathBuf },
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub max_connections: u32,
    pub min_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the data-exchange API. Optional: clients may carry their
    /// own trigger URL override.
    pub base_url: Option<String>,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    pub token_url: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub scope: String,
}

impl AuthConfig {
    /// Global job credentials, when a complete set is configured.
    pub fn global_credentials(&self) -> Option<(&str, &str, &str)> {
        match (
            self.client_id.as_deref(),
            self.client_secret.as_deref(),
            self.token_url.as_deref(),
        ) {
            (Some(id), Some(secret), Some(url)) => Some((id, secret, url)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// S3 bucket name, or a filesystem path (starting with `/` or `.`) for
    /// local archival.
    pub bucket: String,
    pub prefix: String,
    pub region: String,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub endpoint: Option<String>,
}

impl StorageConfig {
    pub fn is_local(&self) -> bool {
        self.bucket.starts_with('/') || self.bucket.starts_with('.')
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let clients = if let Ok(url) = env::var("CLIENTS_API_URL") {
            ClientSourceConfig::Http { url }
        } else if let Ok(path) = env::var("CLIENTS_FILE") {
            ClientSourceConfig::File { path: path.into() }
        } else {
            ClientSourceConfig::Database
        };

        let config = Self {
            run: RunConfig {
                date_offset_days: env::var("TRIGGER_DATE_OFFSET_DAYS")
                    .unwrap_or_else(|_| "0".to_string())
                    .parse()?,
                output_dir: env::var("OUTPUT_DIR").ok().map(PathBuf::from),
            },
            clients,
            database: DatabaseConfig {
                url: env::var("DATABASE_URL").ok(),
                max_connections: env::var("DB_MAX_CONNECTIONS")
                    .unwrap_or_else(|_| "5".to_string())
                    .parse()?,
                min_connections: env::var("DB_MIN_CONNECTIONS")
                    .unwrap_or_else(|_| "1".to_string())
                    .parse()?,
            },
            api: ApiConfig {
                base_url: env::var("DEX_API_BASE_URL").ok(),
                timeout_secs: env::var("TRIGGER_TIMEOUT_SECS")
                    .unwrap_or_else(|_| "30".to_string())
                    .parse()?,
            },
            auth: AuthConfig {
                token_url: env::var("API_TOKEN_URL").ok(),
                client_id: env::var("API_CLIENT_ID").ok(),
                client_secret: env::var("API_CLIENT_SECRET").ok(),
                scope: env::var("TRIGGER_SCOPE")
                    .unwrap_or_else(|_| crate::trigger::TRIGGER_SCOPE.to_string()),
            },
            storage: StorageConfig {
                bucket: match env::var("S3_BUCKET") {
                    Ok(bucket) => bucket,
                    Err(_) => bail!("S3_BUCKET must be set"),
                },
                prefix: env::var("S3_PREFIX").unwrap_or_else(|_| "trigger".to_string()),
                region: env::var("S3_REGION").unwrap_or_else(|_| "us-east-1".to_string()),
                access_key_id: env::var("AWS_ACCESS_KEY_ID").ok(),
                secret_access_key: env::var("AWS_SECRET_ACCESS_KEY").ok(),
                endpoint: env::var("S3_ENDPOINT").ok(),
            },
        };

        if matches!(config.clients, ClientSourceConfig::Database) && config.database.url.is_none() {
            bail!("DATABASE_URL must be set when clients come from the database");
        }

        Ok(config)
    }
}
