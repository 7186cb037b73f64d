use crate::storage::{ObjectMeta, Uploader};
use crate::types::AppResult;
use async_trait::async_trait;
use std::path::PathBuf;
use tracing::info;

/// Filesystem stand-in for the S3 backend, selected when the configured
/// bucket is a local path. Keys become paths under the root directory.
pub struct LocalUploader {
    root: PathBuf,
}

impl LocalUploader {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }
}

#[async_trait]
impl Uploader for LocalUploader {
    async fn upload(&self, key: &str, body: &[u8], meta: &ObjectMeta) -> AppResult<String> {
        let path = self.root.join(key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, body).await?;

        let path = tokio::fs::canonicalize(&path).await?;
        info!(
            client_id = %meta.client_id,
            path = %path.display(),
            "Archived trigger data locally"
        );
        Ok(path.display().to_string())
    }
}
