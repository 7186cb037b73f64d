use crate::config::StorageConfig;
use crate::storage::{ObjectMeta, Uploader};
use crate::types::{AppError, AppResult};
use async_trait::async_trait;
use s3::creds::Credentials;
use s3::{Bucket, Region};
use tracing::info;

pub struct S3Uploader {
    bucket_name: String,
    region: Region,
    credentials: Credentials,
}

impl S3Uploader {
    pub fn from_config(config: &StorageConfig) -> AppResult<Self> {
        let region = match config.endpoint.clone() {
            Some(endpoint) => Region::Custom {
                region: config.region.clone(),
                endpoint,
            },
            None => config
                .region
                .parse()
                .map_err(|e| AppError::Storage(format!("invalid S3 region: {e}")))?,
        };

        let credentials = match (&config.access_key_id, &config.secret_access_key) {
            (Some(access_key), Some(secret_key)) => {
                Credentials::new(Some(access_key.as_str()), Some(secret_key.as_str()), None, None, None)
            }
            // Fall back to the ambient credential chain (env, profile, role)
            _ => Credentials::default(),
        }
        .map_err(|e| AppError::Storage(format!("S3 credentials: {e}")))?;

        Ok(Self {
            bucket_name: config.bucket.clone(),
            region,
            credentials,
        })
    }
}

#[async_trait]
impl Uploader for S3Uploader {
    async fn upload(&self, key: &str, body: &[u8], meta: &ObjectMeta) -> AppResult<String> {
        let mut bucket = Bucket::new(
            &self.bucket_name,
            self.region.clone(),
            self.credentials.clone(),
        )
        .map_err(|e| AppError::Storage(format!("S3 bucket {}: {e}", self.bucket_name)))?;

        bucket.add_header("x-amz-meta-client-id", &meta.client_id);
        bucket.add_header("x-amz-meta-trigger-date", &meta.trigger_date);
        bucket.add_header("x-amz-meta-archived-at", &meta.archived_at.to_rfc3339());

        let response = bucket
            .put_object_with_content_type(key, body, "application/json")
            .await
            .map_err(|e| AppError::Storage(format!("put s3://{}/{key}: {e}", self.bucket_name)))?;

        let status = response.status_code();
        if !(200..300).contains(&status) {
            return Err(AppError::Storage(format!(
                "put s3://{}/{key} returned status {status}",
                self.bucket_name
            )));
        }

        let location = format!("s3://{}/{key}", self.bucket_name);
        info!(client_id = %meta.client_id, %location, "Archived trigger data to S3");
        Ok(location)
    }
}
