use std::time::Duration;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tracing::{debug, info, error};
use crate::domain::{error::IngestionError, models::ArchiveDownload, ports::ArchiveFetcher};

pub struct HttpArchiveFetcher {
    client: Client,
}

impl HttpArchiveFetcher {
    pub fn new(timeout: Duration, connect_timeout: Duration) -> Result<Self, IngestionError> {
        debug!("Building HTTP client: timeout={:?}, connect_timeout={:?}", timeout, connect_timeout);
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(connect_timeout)
            .build()
            .map_err(|e| {
                error!("Failed to build HTTP client: {}", e);
                IngestionError::Config(e.to_string())
            })?;
        Ok(Self { client })
    }
}

#[async_trait]
impl ArchiveFetcher for HttpArchiveFetcher {
    async fn fetch_archive(&self, url: &str) -> Result<ArchiveDownload, IngestionError> {
        debug!("GET {}", url);
        let response = self.client
            .get(url)
            .send()
            .await
            .map_err(|e| {
                error!("Request to {} failed: {}", url, e);
                IngestionError::Download { url: url.to_string(), message: e.to_string() }
            })?;

        let status = response.status();
        if status != StatusCode::OK {
            debug!("{} answered with status {}", url, status);
            return Ok(ArchiveDownload::Unavailable { status: status.as_u16() });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| {
                error!("Failed to read response body from {}: {}", url, e);
                IngestionError::Download { url: url.to_string(), message: e.to_string() }
            })?;

        info!("Downloaded {} bytes from {}", body.len(), url);
        Ok(ArchiveDownload::Found(body.to_vec()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fetcher() -> HttpArchiveFetcher {
        HttpArchiveFetcher::new(Duration::from_secs(10), Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn ok_response_returns_body() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/files/publications/analysis/call-report-data-2020-09.zip")
            .with_status(200)
            .with_header("content-type", "application/zip")
            .with_body(b"PK\x03\x04archive-bytes".to_vec())
            .create_async()
            .await;

        let url = format!("{}/files/publications/analysis/call-report-data-2020-09.zip", server.url());
        let download = fetcher().fetch_archive(&url).await.unwrap();

        assert_eq!(download, ArchiveDownload::Found(b"PK\x03\x04archive-bytes".to_vec()));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn non_ok_statuses_are_unavailable() {
        let mut server = mockito::Server::new_async().await;
        let _missing = server.mock("GET", "/QCR199403.zip").with_status(404).create_async().await;
        let _broken = server.mock("GET", "/QCR199406.zip").with_status(500).create_async().await;

        let fetcher = fetcher();
        let missing = fetcher.fetch_archive(&format!("{}/QCR199403.zip", server.url())).await.unwrap();
        let broken = fetcher.fetch_archive(&format!("{}/QCR199406.zip", server.url())).await.unwrap();

        assert_eq!(missing, ArchiveDownload::Unavailable { status: 404 });
        assert_eq!(broken, ArchiveDownload::Unavailable { status: 500 });
    }

    #[tokio::test]
    async fn refused_connection_is_a_download_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let url = format!("http://{}/QCR201503.zip", addr);
        let err = fetcher().fetch_archive(&url).await.unwrap_err();

        match err {
            IngestionError::Download { url: failed, .. } => assert_eq!(failed, url),
            other => panic!("expected Download, got {:?}", other),
        }
    }
}
