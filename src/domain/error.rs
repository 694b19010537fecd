use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestionError {
    #[error("Invalid quarter: {0}")]
    InvalidQuarter(String),

    #[error("Download from {url} failed: {message}")]
    Download { url: String, message: String },

    #[error("Archive from {url} is corrupt: {message}")]
    ArchiveCorrupt { url: String, message: String },

    /// `uploaded` counts objects of the same quarter written before the failure.
    #[error("Upload of {key} failed after {uploaded} successful uploads: {message}")]
    StorageUpload {
        key: String,
        uploaded: usize,
        message: String,
    },

    #[error("Filesystem error while {context}: {source}")]
    Filesystem {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl IngestionError {
    pub fn filesystem(context: impl Into<String>, source: std::io::Error) -> Self {
        IngestionError::Filesystem {
            context: context.into(),
            source,
        }
    }
}
