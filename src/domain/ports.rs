use std::path::Path;
use async_trait::async_trait;
use crate::domain::{error::IngestionError, models::ArchiveDownload};

#[async_trait]
pub trait ArchiveFetcher: Send + Sync {
    async fn fetch_archive(&self, url: &str) -> Result<ArchiveDownload, IngestionError>;
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn upload_file(&self, bucket: &str, key: &str, path: &Path) -> Result<(), IngestionError>;
}
