use std::path::PathBuf;
use clap::Parser;
use call_report_ingestion::{
    batch_runner::{BatchRunner, QuarterStatus},
    config::IngesterConfig,
    domain::models::Quarter,
    quarter_range::quarters_between,
    telemetry,
};
use tracing::{info, debug, error};

/// Ingests NCUA call report data into S3.
#[derive(Debug, Parser)]
#[command(name = "call-report-ingestion", version, about)]
struct Cli {
    /// First quarter to ingest, formatted yyyy-mm. Months accepted: 03, 06, 09, 12.
    #[arg(short, long, value_parser = parse_quarter)]
    start: Quarter,

    /// Last quarter to ingest (inclusive). Defaults to the start quarter.
    #[arg(short, long, value_parser = parse_quarter)]
    end: Option<Quarter>,

    /// YAML file overriding the built-in configuration.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Destination bucket.
    #[arg(long)]
    bucket: Option<String>,

    /// Leading key segment for uploaded objects.
    #[arg(long)]
    namespace: Option<String>,

    /// Stop at the first quarter that fails.
    #[arg(long)]
    fail_fast: bool,

    /// Append logs to this file instead of writing them to stderr.
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Print the batch summary as JSON on stdout.
    #[arg(long)]
    json: bool,
}

fn parse_quarter(value: &str) -> Result<Quarter, String> {
    Quarter::parse(value).map_err(|e| e.to_string())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let cli = Cli::parse();

    telemetry::init(cli.log_file.as_deref())?;

    info!("Starting call report ingestion");
    debug!("Arguments: {:?}", cli);

    let mut config = match &cli.config {
        Some(path) => IngesterConfig::from_yaml_file(path)?,
        None => IngesterConfig::default(),
    };
    config.apply_env()?;
    if let Some(bucket) = cli.bucket {
        config.bucket = bucket;
    }
    if let Some(namespace) = cli.namespace {
        config.namespace = namespace;
    }

    let quarters = quarters_between(cli.start, cli.end)?;
    debug!("Quarters to ingest: {:?}", quarters.iter().map(|q| q.to_string()).collect::<Vec<_>>());

    let runner = BatchRunner::from_config(config).await?;
    info!("Batch runner initialized successfully");

    let summary = runner.run(&quarters, cli.fail_fast).await;
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    }

    if summary.has_failures() {
        let failed: Vec<String> = summary
            .reports
            .iter()
            .filter(|r| r.status == QuarterStatus::Failed)
            .map(|r| r.quarter.to_string())
            .collect();
        error!("Quarters failed: {}", failed.join(", "));
        return Err(format!("{} quarter(s) failed: {}", failed.len(), failed.join(", ")).into());
    }

    Ok(())
}
