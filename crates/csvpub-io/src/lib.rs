//! # csvpub I/O - Reader, Publishers and Pipeline
//!
//! This crate connects the input file to the broker.
//!
//! ## Features
//!
//! ### Source
//! - **CSV**: lazy, line-ordered [`RecordReader`](source_csv::RecordReader)
//!
//! ### Publishers
//! - **Kafka**: asynchronous, batched and compressed delivery via rdkafka
//! - **Stdout**: dry-run output, one payload per line
//! - **Memory**: records payloads in-process
//!
//! ### Pipeline
//! - [`pipeline::run`] drives read -> validate -> send and closes the publisher
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use csvpub_core::BrokerConfig;
//! use csvpub_io::{pipeline, sink_kafka::KafkaPublisher, source_csv::RecordReader};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = BrokerConfig::from_env()?;
//! let reader = RecordReader::open("instances.csv")?;
//! let publisher = KafkaPublisher::connect(&config).await?;
//!
//! let summary = pipeline::run(reader, Box::new(publisher), config.topic()).await?;
//! println!("read {} records", summary.read);
//! # Ok(())
//! # }
//! ```

/// Read -> validate -> send driver
pub mod pipeline;

/// Kafka publisher
pub mod sink_kafka;

/// In-memory publisher
pub mod sink_memory;

/// Standard output publisher for dry runs
pub mod sink_stdout;

/// CSV record reader
pub mod source_csv;
