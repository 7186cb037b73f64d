//! Object store writers.
//!
//! Two backends behind one trait: S3 for production, the local filesystem for
//! testing. The archive key layout is shared:
//! `{prefix}/{clientId}/{clientId}_trigger_{yyyyMMdd}.json`.

use crate::config::StorageConfig;
use crate::types::AppResult;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

pub mod local;
pub mod s3;

pub use local::LocalUploader;
pub use self::s3::S3Uploader;

/// Metadata recorded alongside each archived object.
#[derive(Debug, Clone)]
pub struct ObjectMeta {
    pub client_id: String,
    pub trigger_date: String,
    pub archived_at: DateTime<Utc>,
}

impl ObjectMeta {
    pub fn new(client_id: &str, trigger_date: NaiveDate) -> Self {
        Self {
            client_id: client_id.to_string(),
            trigger_date: trigger_date.format("%Y-%m-%d").to_string(),
            archived_at: Utc::now(),
        }
    }
}

#[async_trait]
pub trait Uploader: Send + Sync {
    /// Write `body` under `key`; returns the location of the stored object.
    async fn upload(&self, key: &str, body: &[u8], meta: &ObjectMeta) -> AppResult<String>;
}

/// Deterministic storage key for a client's trigger response on a date.
pub fn archive_key(prefix: &str, client_id: &str, trigger_date: NaiveDate) -> String {
    let date = trigger_date.format("%Y%m%d");
    let prefix = prefix.trim_matches('/');
    if prefix.is_empty() {
        format!("{client_id}/{client_id}_trigger_{date}.json")
    } else {
        format!("{prefix}/{client_id}/{client_id}_trigger_{date}.json")
    }
}

/// Build the uploader for the configured bucket. A bucket that looks like a
/// filesystem path selects the local backend.
pub fn from_config(config: &StorageConfig) -> AppResult<Box<dyn Uploader>> {
    if config.is_local() {
        Ok(Box::new(LocalUploader::new(config.bucket.clone().into())))
    } else {
        Ok(Box::new(S3Uploader::from_config(config)?))
    }
}
