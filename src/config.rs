use std::path::{Path, PathBuf};
use std::time::Duration;
use serde::Deserialize;
use tracing::{debug, info, error};
use crate::domain::{error::IngestionError, models::{Quarter, MODERN_LAYOUT_START}};

pub const DEFAULT_BUCKET: &str = "call-reporter";
pub const DEFAULT_NAMESPACE: &str = "ncua";
pub const MODERN_URL_TEMPLATE: &str =
    "https://ncua.gov/files/publications/analysis/call-report-data-{yyyy}-{mm}.zip";
pub const LEGACY_URL_TEMPLATE: &str =
    "https://ncua.gov/files/publications/data-apps/QCR{yyyy}{mm}.zip";
pub const DEFAULT_DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(300);
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

pub const DEFAULT_DATA_FILES: [&str; 29] = [
    "AcctDesc.txt", "Acct-DescCUSO.txt", "Acct-DescGrants.txt", "Acct-DescTradeNames.txt", "ATM.txt",
    "Credit.txt", "FOICU.txt", "FOICUDES.txt", "FS220.txt", "FS220A.txt",
    "FS220B.txt", "FS220C.txt", "FS220CUSO.txt", "FS220D.txt", "FS220E.txt",
    "FS220G.txt", "FS220H.txt", "FS220I.txt", "FS220J.txt", "FS220K.txt",
    "FS220L.txt", "FS220M.txt", "FS220N.txt", "FS220P.txt", "FS220Q.txt",
    "FS220R.txt", "FS220S.txt", "Grants.txt", "TradeNames.txt",
];

/// Everything the quarter ingester needs, fixed at construction.
#[derive(Debug, Clone)]
pub struct IngesterConfig {
    pub bucket: String,
    pub namespace: String,
    pub allowlist: Vec<String>,
    pub modern_url_template: String,
    pub legacy_url_template: String,
    /// First quarter published under the modern URL layout.
    pub cutover: Quarter,
    pub download_timeout: Duration,
    pub scratch_dir: Option<PathBuf>,
}

impl Default for IngesterConfig {
    fn default() -> Self {
        Self {
            bucket: DEFAULT_BUCKET.to_string(),
            namespace: DEFAULT_NAMESPACE.to_string(),
            allowlist: DEFAULT_DATA_FILES.iter().map(|s| s.to_string()).collect(),
            modern_url_template: MODERN_URL_TEMPLATE.to_string(),
            legacy_url_template: LEGACY_URL_TEMPLATE.to_string(),
            cutover: MODERN_LAYOUT_START,
            download_timeout: DEFAULT_DOWNLOAD_TIMEOUT,
            scratch_dir: None,
        }
    }
}

/// On-disk overrides. Every field is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    pub bucket: Option<String>,
    pub namespace: Option<String>,
    pub allowlist: Option<Vec<String>>,
    pub modern_url_template: Option<String>,
    pub legacy_url_template: Option<String>,
    pub cutover: Option<Quarter>,
    pub download_timeout_secs: Option<u64>,
    pub scratch_dir: Option<PathBuf>,
}

impl IngesterConfig {
    pub fn from_yaml_str(contents: &str) -> Result<Self, IngestionError> {
        let file: ConfigFile = serde_yaml::from_str(contents)
            .map_err(|e| IngestionError::Config(e.to_string()))?;
        let mut config = Self::default();
        config.apply_file(file);
        Ok(config)
    }

    pub fn from_yaml_file(path: &Path) -> Result<Self, IngestionError> {
        debug!("Reading configuration file: {}", path.display());
        let contents = std::fs::read_to_string(path).map_err(|e| {
            error!("Failed to read config file {}: {}", path.display(), e);
            IngestionError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_yaml_str(&contents)
    }

    fn apply_file(&mut self, file: ConfigFile) {
        if let Some(bucket) = file.bucket {
            self.bucket = bucket;
        }
        if let Some(namespace) = file.namespace {
            self.namespace = namespace;
        }
        if let Some(allowlist) = file.allowlist {
            self.allowlist = allowlist;
        }
        if let Some(template) = file.modern_url_template {
            self.modern_url_template = template;
        }
        if let Some(template) = file.legacy_url_template {
            self.legacy_url_template = template;
        }
        if let Some(cutover) = file.cutover {
            self.cutover = cutover;
        }
        if let Some(secs) = file.download_timeout_secs {
            self.download_timeout = Duration::from_secs(secs);
        }
        if file.scratch_dir.is_some() {
            self.scratch_dir = file.scratch_dir;
        }
    }

    /// Applies `NCUA_*` environment overrides.
    pub fn apply_env(&mut self) -> Result<(), IngestionError> {
        self.apply_vars(|name| std::env::var(name).ok())
    }

    fn apply_vars(&mut self, var: impl Fn(&str) -> Option<String>) -> Result<(), IngestionError> {
        if let Some(bucket) = var("NCUA_BUCKET") {
            info!("Using bucket from NCUA_BUCKET: {}", bucket);
            self.bucket = bucket;
        }
        if let Some(namespace) = var("NCUA_NAMESPACE") {
            info!("Using namespace from NCUA_NAMESPACE: {}", namespace);
            self.namespace = namespace;
        }
        if let Some(secs) = var("NCUA_DOWNLOAD_TIMEOUT_SECS") {
            let secs = secs.trim().parse::<u64>().map_err(|_| {
                IngestionError::Config(format!("NCUA_DOWNLOAD_TIMEOUT_SECS must be a whole number of seconds, got '{}'", secs))
            })?;
            self.download_timeout = Duration::from_secs(secs);
        }
        if let Some(dir) = var("NCUA_SCRATCH_DIR") {
            self.scratch_dir = Some(PathBuf::from(dir));
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), IngestionError> {
        if self.bucket.trim().is_empty() {
            return Err(IngestionError::Config("bucket name must not be empty".to_string()));
        }
        if self.namespace.is_empty() || self.namespace.contains('/') {
            return Err(IngestionError::Config(format!(
                "namespace '{}' must be a single non-empty key segment",
                self.namespace
            )));
        }
        if self.allowlist.is_empty() {
            return Err(IngestionError::Config("allowlist must name at least one data file".to_string()));
        }
        for (name, template) in [
            ("modern_url_template", &self.modern_url_template),
            ("legacy_url_template", &self.legacy_url_template),
        ] {
            if !template.contains("{yyyy}") || !template.contains("{mm}") {
                return Err(IngestionError::Config(format!(
                    "{} must contain both {{yyyy}} and {{mm}}: {}",
                    name, template
                )));
            }
        }
        if self.download_timeout.is_zero() {
            return Err(IngestionError::Config("download timeout must be greater than zero".to_string()));
        }
        Ok(())
    }
}
