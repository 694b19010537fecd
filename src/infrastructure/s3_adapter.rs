use std::path::Path;
use async_trait::async_trait;
use aws_sdk_s3::{error::DisplayErrorContext, primitives::ByteStream, Client};
use tracing::{debug, error};
use crate::domain::{error::IngestionError, ports::ObjectStore};

pub struct S3Adapter {
    client: Client,
}

impl S3Adapter {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ObjectStore for S3Adapter {
    async fn upload_file(&self, bucket: &str, key: &str, path: &Path) -> Result<(), IngestionError> {
        let upload_error = |message: String| IngestionError::StorageUpload {
            key: key.to_string(),
            uploaded: 0,
            message,
        };

        let body = ByteStream::from_path(path)
            .await
            .map_err(|e| {
                error!("Failed to open {} for upload: {}", path.display(), e);
                upload_error(e.to_string())
            })?;

        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(body)
            .send()
            .await
            .map_err(|e| {
                let message = DisplayErrorContext(&e).to_string();
                error!("put_object s3://{}/{} failed: {}", bucket, key, message);
                upload_error(message)
            })?;

        debug!("Uploaded {} to s3://{}/{}", path.display(), bucket, key);
        Ok(())
    }
}
