use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::{Builder, NamedTempFile, TempDir};
use tracing::{info, debug, error, warn};
use crate::config::IngesterConfig;
use crate::domain::{
    error::IngestionError,
    models::{ArchiveDownload, Quarter, QuarterOutcome},
    ports::{ArchiveFetcher, ObjectStore},
};
use crate::infrastructure::zip_archive;

/// Downloads one quarter's call-report archive and uploads the allowlisted
/// data files it contains.
pub struct QuarterIngester {
    archive_fetcher: Arc<dyn ArchiveFetcher>,
    object_store: Arc<dyn ObjectStore>,
    allowlist: HashSet<String>,
    config: IngesterConfig,
}

impl QuarterIngester {
    pub fn new(
        archive_fetcher: Arc<dyn ArchiveFetcher>,
        object_store: Arc<dyn ObjectStore>,
        config: IngesterConfig,
    ) -> Self {
        info!(
            "Created quarter ingester: bucket={}, namespace={}, {} allowlisted files",
            config.bucket, config.namespace, config.allowlist.len()
        );
        Self {
            archive_fetcher,
            object_store,
            allowlist: config.allowlist.iter().cloned().collect(),
            config,
        }
    }

    pub fn download_url(&self, quarter: Quarter) -> String {
        let template = if quarter >= self.config.cutover {
            &self.config.modern_url_template
        } else {
            &self.config.legacy_url_template
        };
        template
            .replace("{yyyy}", &quarter.yyyy())
            .replace("{mm}", &quarter.mm())
    }

    pub fn object_key(&self, quarter: Quarter, file_name: &str) -> String {
        format!("{}/{}/{}/{}", self.config.namespace, quarter.yyyy(), quarter.mm(), file_name)
    }

    pub async fn ingest_year_month(&self, year: u16, month: u8) -> Result<QuarterOutcome, IngestionError> {
        let quarter = Quarter::new(year, month)?;
        self.ingest(quarter).await
    }

    pub async fn ingest(&self, quarter: Quarter) -> Result<QuarterOutcome, IngestionError> {
        let url = self.download_url(quarter);

        // Step 1: Download
        info!("Attempting download for {} from {}", quarter, url);
        let body = match self.archive_fetcher.fetch_archive(&url).await? {
            ArchiveDownload::Found(body) => body,
            ArchiveDownload::Unavailable { status } => {
                warn!("Failed download from {}. Status code: {}. Skipping {}", url, status, quarter);
                return Ok(QuarterOutcome::Skipped { url, status });
            }
        };
        info!("Download successful, {} bytes", body.len());

        // Step 2: Persist and extract into scratch space owned by this call.
        // Both handles delete their backing storage when dropped, on every return path.
        let archive_file = self.scratch_file(quarter)?;
        tokio::fs::write(archive_file.path(), &body)
            .await
            .map_err(|e| IngestionError::filesystem(format!("writing {}", archive_file.path().display()), e))?;
        drop(body);
        debug!("Archive saved to {}", archive_file.path().display());

        let extract_dir = self.scratch_dir(quarter)?;
        debug!("Extracting into {}", extract_dir.path().display());
        let entries = extract(archive_file.path(), extract_dir.path(), &url).await?;
        debug!("Extracted files: {:?}", entries);

        // Step 3: Upload allowlisted files; the first failure aborts the quarter.
        info!("Starting upload of {} to bucket {}", quarter, self.config.bucket);
        let mut keys = Vec::new();
        for name in &entries {
            if !self.allowlist.contains(name) {
                debug!("Ignoring {}: not allowlisted", name);
                continue;
            }

            let key = self.object_key(quarter, name);
            let path = extract_dir.path().join(name);
            debug!("Uploading {} as {}", path.display(), key);

            if let Err(e) = self.object_store.upload_file(&self.config.bucket, &key, &path).await {
                error!("Upload of {} failed after {} uploads: {}", key, keys.len(), e);
                return Err(match e {
                    IngestionError::StorageUpload { key, message, .. } => IngestionError::StorageUpload {
                        key,
                        uploaded: keys.len(),
                        message,
                    },
                    other => other,
                });
            }
            debug!("Uploaded {} to bucket {}", key, self.config.bucket);
            keys.push(key);
        }

        extract_dir
            .close()
            .map_err(|e| IngestionError::filesystem("removing extraction directory", e))?;
        archive_file
            .close()
            .map_err(|e| IngestionError::filesystem("removing downloaded archive", e))?;

        info!("✅ {} complete: {} files uploaded", quarter, keys.len());
        Ok(QuarterOutcome::Uploaded { keys })
    }

    fn scratch_file(&self, quarter: Quarter) -> Result<NamedTempFile, IngestionError> {
        let prefix = format!("call-report-data-{}-", quarter);
        let mut builder = Builder::new();
        builder.prefix(&prefix).suffix(".zip");
        let created = match &self.config.scratch_dir {
            Some(dir) => builder.tempfile_in(dir),
            None => builder.tempfile(),
        };
        created.map_err(|e| IngestionError::filesystem("creating temporary archive file", e))
    }

    fn scratch_dir(&self, quarter: Quarter) -> Result<TempDir, IngestionError> {
        let prefix = format!("call-report-data-{}-", quarter);
        let mut builder = Builder::new();
        builder.prefix(&prefix);
        let created = match &self.config.scratch_dir {
            Some(dir) => builder.tempdir_in(dir),
            None => builder.tempdir(),
        };
        created.map_err(|e| IngestionError::filesystem("creating temporary extraction directory", e))
    }
}

async fn extract(archive_path: &Path, dest_dir: &Path, url: &str) -> Result<Vec<String>, IngestionError> {
    let archive_path: PathBuf = archive_path.to_path_buf();
    let dest_dir: PathBuf = dest_dir.to_path_buf();
    let url = url.to_string();

    tokio::task::spawn_blocking(move || {
        zip_archive::extract_zip(&archive_path, &dest_dir, &url)?;
        zip_archive::list_entries(&dest_dir)
    })
    .await
    .map_err(|e| {
        error!("Extraction task failed: {}", e);
        IngestionError::filesystem(
            "extracting archive",
            std::io::Error::new(std::io::ErrorKind::Other, e.to_string()),
        )
    })?
}
