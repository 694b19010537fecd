use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;
use crate::domain::error::IngestionError;

/// Used when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str =
    "call_report_ingestion=debug,aws_sdk_s3=warn,aws_smithy_runtime=warn,hyper=warn";

/// `RUST_LOG` replaces the default filter entirely when present.
pub fn log_filter(rust_log: Option<&str>) -> Result<EnvFilter, IngestionError> {
    let directives = rust_log
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(DEFAULT_LOG_FILTER);
    EnvFilter::try_new(directives)
        .map_err(|e| IngestionError::Config(format!("invalid log filter '{}': {}", directives, e)))
}

/// Installs the global subscriber. Logs go to stderr, or are appended to
/// `log_file` when one is given.
pub fn init(log_file: Option<&Path>) -> Result<(), IngestionError> {
    let rust_log = std::env::var("RUST_LOG").ok();
    let filter = log_filter(rust_log.as_deref())?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_file(true)
        .with_line_number(true);

    match log_file {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)
                    .map_err(|e| IngestionError::filesystem(format!("creating {}", parent.display()), e))?;
            }
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|e| IngestionError::filesystem(format!("opening log file {}", path.display()), e))?;
            builder.with_ansi(false).with_writer(Mutex::new(file)).init();
        }
        None => builder.with_writer(std::io::stderr).init(),
    }
    Ok(())
}
