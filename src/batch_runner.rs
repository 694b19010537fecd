use std::sync::Arc;
use serde::Serialize;
use tracing::{info, error, debug, warn, info_span, Instrument};
use uuid::Uuid;
use crate::{
    application::quarter_ingester::QuarterIngester,
    config::{IngesterConfig, CONNECT_TIMEOUT},
    domain::{error::IngestionError, models::{Quarter, QuarterOutcome}},
    infrastructure::{http_fetcher::HttpArchiveFetcher, s3_adapter::S3Adapter},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QuarterStatus {
    Succeeded,
    Skipped,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
pub struct QuarterReport {
    pub quarter: Quarter,
    pub status: QuarterStatus,
    pub uploaded: usize,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchSummary {
    pub run_id: String,
    pub reports: Vec<QuarterReport>,
}

impl BatchSummary {
    pub fn count(&self, status: QuarterStatus) -> usize {
        self.reports.iter().filter(|r| r.status == status).count()
    }

    pub fn has_failures(&self) -> bool {
        self.count(QuarterStatus::Failed) > 0
    }
}

/// Runs the quarter ingester over a list of quarters, one at a time.
pub struct BatchRunner {
    ingester: QuarterIngester,
}

impl BatchRunner {
    pub fn new(ingester: QuarterIngester) -> Self {
        Self { ingester }
    }

    /// Wires the HTTP fetcher and S3 adapter from the ambient AWS environment.
    pub async fn from_config(config: IngesterConfig) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        debug!("Initializing batch runner");
        config.validate()?;

        debug!("Loading AWS configuration");
        let mut aws_config_builder = aws_config::defaults(aws_config::BehaviorVersion::latest());

        // Configure endpoint for LocalStack if AWS_ENDPOINT_URL is set
        let endpoint_url = std::env::var("AWS_ENDPOINT_URL").ok();
        if let Some(endpoint_url) = &endpoint_url {
            info!("Using custom AWS endpoint: {}", endpoint_url);
            aws_config_builder = aws_config_builder.endpoint_url(endpoint_url);
        }

        let aws_config = aws_config_builder.load().await;
        debug!("AWS region: {:?}", aws_config.region());

        let mut s3_config = aws_sdk_s3::config::Builder::from(&aws_config);
        if endpoint_url.is_some() {
            s3_config = s3_config.force_path_style(true);
        }
        let s3_client = aws_sdk_s3::Client::from_conf(s3_config.build());

        let archive_fetcher = Arc::new(HttpArchiveFetcher::new(config.download_timeout, CONNECT_TIMEOUT)?);
        let object_store = Arc::new(S3Adapter::new(s3_client));
        debug!("HTTP fetcher and S3 adapter initialized");

        Ok(Self::new(QuarterIngester::new(archive_fetcher, object_store, config)))
    }

    /// Skips and failures never stop the batch unless `fail_fast` is set, in
    /// which case the first hard failure ends it.
    pub async fn run(&self, quarters: &[Quarter], fail_fast: bool) -> BatchSummary {
        let run_id = Uuid::new_v4().to_string();
        info!("Starting batch {} over {} quarters", run_id, quarters.len());

        let mut reports = Vec::with_capacity(quarters.len());
        for (i, quarter) in quarters.iter().enumerate() {
            let span = info_span!("quarter", run_id = %run_id, quarter = %quarter);
            debug!("Processing quarter {} of {}", i + 1, quarters.len());

            let result = self.ingester.ingest(*quarter).instrument(span).await;
            let report = match result {
                Ok(QuarterOutcome::Uploaded { keys }) => {
                    info!("Successfully ingested {} ({} files)", quarter, keys.len());
                    QuarterReport {
                        quarter: *quarter,
                        status: QuarterStatus::Succeeded,
                        uploaded: keys.len(),
                        reason: None,
                    }
                }
                Ok(QuarterOutcome::Skipped { url, status }) => {
                    warn!("Skipped {}: {} returned status {}", quarter, url, status);
                    QuarterReport {
                        quarter: *quarter,
                        status: QuarterStatus::Skipped,
                        uploaded: 0,
                        reason: Some(format!("{} returned HTTP {}", url, status)),
                    }
                }
                Err(e) => {
                    error!("Failed to ingest {}: {}", quarter, e);
                    let uploaded = match &e {
                        IngestionError::StorageUpload { uploaded, .. } => *uploaded,
                        _ => 0,
                    };
                    QuarterReport {
                        quarter: *quarter,
                        status: QuarterStatus::Failed,
                        uploaded,
                        reason: Some(e.to_string()),
                    }
                }
            };

            let failed = report.status == QuarterStatus::Failed;
            reports.push(report);
            if failed && fail_fast {
                warn!("Stopping batch after failure of {} (fail-fast)", quarter);
                break;
            }
        }

        let summary = BatchSummary { run_id, reports };
        info!(
            "Batch {} finished: {} succeeded, {} skipped, {} failed",
            summary.run_id,
            summary.count(QuarterStatus::Succeeded),
            summary.count(QuarterStatus::Skipped),
            summary.count(QuarterStatus::Failed)
        );
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::path::Path;
    use async_trait::async_trait;
    use crate::domain::{
        models::ArchiveDownload,
        ports::{ArchiveFetcher, ObjectStore},
    };

    /// Serves a valid archive for 2020 quarters, 404 for 2019, garbage otherwise.
    struct YearFetcher;

    #[async_trait]
    impl ArchiveFetcher for YearFetcher {
        async fn fetch_archive(&self, url: &str) -> Result<ArchiveDownload, IngestionError> {
            if url.contains("-2019-") {
                return Ok(ArchiveDownload::Unavailable { status: 404 });
            }
            if url.contains("-2020-") {
                let mut buffer = Vec::new();
                {
                    let mut zip = zip::ZipWriter::new(std::io::Cursor::new(&mut buffer));
                    zip.start_file("FOICU.txt", zip::write::FileOptions::default()).unwrap();
                    zip.write_all(b"CU_NUMBER").unwrap();
                    zip.finish().unwrap();
                }
                return Ok(ArchiveDownload::Found(buffer));
            }
            Ok(ArchiveDownload::Found(b"not a zip".to_vec()))
        }
    }

    struct AcceptAll;

    #[async_trait]
    impl ObjectStore for AcceptAll {
        async fn upload_file(&self, _bucket: &str, _key: &str, _path: &Path) -> Result<(), IngestionError> {
            Ok(())
        }
    }

    fn runner() -> BatchRunner {
        BatchRunner::new(QuarterIngester::new(
            Arc::new(YearFetcher),
            Arc::new(AcceptAll),
            IngesterConfig::default(),
        ))
    }

    fn q(value: &str) -> Quarter {
        Quarter::parse(value).unwrap()
    }

    #[tokio::test]
    async fn continues_past_skips_and_failures() {
        let quarters = [q("2019-12"), q("2021-03"), q("2020-03")];
        let summary = runner().run(&quarters, false).await;

        let statuses: Vec<QuarterStatus> = summary.reports.iter().map(|r| r.status).collect();
        assert_eq!(
            statuses,
            vec![QuarterStatus::Skipped, QuarterStatus::Failed, QuarterStatus::Succeeded]
        );
        assert_eq!(summary.reports[2].uploaded, 1);
        assert!(summary.has_failures());
    }

    #[tokio::test]
    async fn fail_fast_stops_at_first_hard_failure() {
        let quarters = [q("2019-12"), q("2021-03"), q("2020-03")];
        let summary = runner().run(&quarters, true).await;

        assert_eq!(summary.reports.len(), 2);
        assert_eq!(summary.count(QuarterStatus::Succeeded), 0);
        assert_eq!(summary.count(QuarterStatus::Failed), 1);
    }

    #[tokio::test]
    async fn summary_serializes_for_reporting() {
        let summary = runner().run(&[q("2019-12")], false).await;
        let json = serde_json::to_value(&summary).unwrap();

        assert_eq!(json["reports"][0]["quarter"], "2019-12");
        assert_eq!(json["reports"][0]["status"], "skipped");
        assert!(!summary.has_failures());
    }
}
