//! # csvpub - CSV to Kafka Batch Producer
//!
//! Reads a comma-delimited file of `name,type` rows and publishes each valid
//! row to a Kafka topic as `{"name": <string>, "type": <integer>}`. The run
//! ends when the file is exhausted and the producer has been flushed.
//!
//! ## Configuration
//!
//! The broker is configured through the environment:
//!
//! - `KAFKA_PRDCR_HOST` - broker host
//! - `KAFKA_PRDCR_PORT` - broker port
//! - `KAFKA_TOPIC` - target topic
//!
//! Messages are sent asynchronously, batched 500 at a time and gzip-compressed.
//!
//! ## Usage Examples
//!
//! ```bash
//! # Publish a file
//! KAFKA_PRDCR_HOST=localhost KAFKA_PRDCR_PORT=9092 KAFKA_TOPIC=instances \
//!     csvpub instances.csv
//!
//! # Validate the file and print the payloads without sending them
//! csvpub instances.csv --dry-run
//! ```
//!
//! ## Exit Codes
//!
//! - `0` - every record was read and the producer flushed
//! - `1` - usage error, missing configuration, unreadable input, or a broker
//!   failure at open or flush time

use anyhow::{Context, Result};
use clap::error::ErrorKind;
use clap::Parser;
use csvpub_core::{BrokerConfig, Publisher, RunSummary};
use csvpub_io::pipeline;
use csvpub_io::sink_kafka::KafkaPublisher;
use csvpub_io::sink_stdout::StdoutPublisher;
use csvpub_io::source_csv::RecordReader;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[clap(
    name = "csvpub",
    about = "Publish the records of a CSV file to a Kafka topic as JSON messages"
)]
struct Args {
    /// Path to the input CSV file (rows of `name,type`)
    input: PathBuf,

    /// Validate and print payloads to stdout instead of sending them
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    // Logs go to stderr; stdout carries the summary and dry-run payloads
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            let _ = e.print();
            return ExitCode::SUCCESS;
        }
        Err(e) => {
            let _ = e.print();
            eprintln!("(e.g. csvpub /path/to/instances.csv)");
            return ExitCode::FAILURE;
        }
    };

    match run(&args, env_var).await {
        Ok(summary) => {
            println!("{}", summary_line(&summary, args.dry_run));
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

/// Configuration first, then the input, then the broker: a failure at any
/// step leaves the later ones untouched.
async fn run<F>(args: &Args, lookup: F) -> Result<RunSummary>
where
    F: Fn(&str) -> Option<String>,
{
    let config = BrokerConfig::from_lookup(lookup).context("invalid broker configuration")?;
    info!(input = %args.input.display(), topic = config.topic(), "starting csvpub");

    let reader = RecordReader::open(&args.input)?;

    let publisher: Box<dyn Publisher> = if args.dry_run {
        Box::new(StdoutPublisher::new("dry-run"))
    } else {
        let kafka = KafkaPublisher::connect(&config)
            .await
            .context("failed to create Kafka producer")?;
        Box::new(kafka)
    };

    let summary = pipeline::run(reader, publisher, config.topic()).await?;
    Ok(summary)
}

fn summary_line(summary: &RunSummary, dry_run: bool) -> String {
    let outcome = if dry_run {
        format!("Validated {} messages successfully", summary.sent)
    } else {
        format!("Sent {} messages to Kafka successfully", summary.sent)
    };
    format!(
        "{} ({} records read, {} rejected)",
        outcome, summary.read, summary.rejected
    )
}
