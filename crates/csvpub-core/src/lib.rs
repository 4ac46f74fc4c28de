//! # csvpub Core - Types and Abstractions
//!
//! This crate provides the foundational types shared by the csvpub producer:
//! the record model flowing from the CSV reader to the broker, the broker
//! configuration, the error taxonomy and the [`Publisher`] trait implemented
//! by every message sink.
//!
//! ## Key Components
//!
//! - **Record Model**: [`RawRecord`] -> [`CanonicalRecord`] -> [`Payload`]
//! - **Configuration**: [`BrokerConfig`] resolved once at startup
//! - **Publisher Trait**: asynchronous send with a single consuming close
//! - **Error Handling**: configuration, input, record and broker errors
//!
//! ## Example Usage
//!
//! ```rust
//! use csvpub_core::{CanonicalRecord, RawRecord};
//!
//! let raw = RawRecord::new(1, vec!["alice".to_string(), "1".to_string()]);
//! assert_eq!(raw.len(), 2);
//!
//! let record = CanonicalRecord { name: "alice".to_string(), kind: 1 };
//! assert_eq!(record.name, "alice");
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::ParseIntError;
use std::path::PathBuf;

pub mod config;

pub use config::{BrokerConfig, Compression, ConfigError, DeliveryMode, Serialization};

/// Number of fields every input row must carry
pub const EXPECTED_FIELDS: usize = 2;

/// Position of the `name` field in a row
pub const FIELD_NAME: usize = 0;

/// Position of the `type` field in a row
pub const FIELD_TYPE: usize = 1;

/// Boxed error used where the underlying client error type must not leak
/// into this crate's public API.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// One unvalidated row of the input file
///
/// Holds the fields exactly as the CSV parser produced them, together with
/// the 1-based line the row started on so that rejections can be reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord {
    line: u64,
    fields: Vec<String>,
}

impl RawRecord {
    pub fn new(line: u64, fields: Vec<String>) -> Self {
        Self { line, fields }
    }

    /// Line in the source file this row started on
    pub fn line(&self) -> u64 {
        self.line
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.fields.get(index).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// A validated, typed record ready for serialization
///
/// Only produced from a [`RawRecord`] with exactly [`EXPECTED_FIELDS`] fields
/// whose `type` field parses as an integer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalRecord {
    /// Copied verbatim from field 0
    pub name: String,

    /// Parsed from field 1
    #[serde(rename = "type")]
    pub kind: i32,
}

/// Serialized message body handed to a [`Publisher`]
///
/// Always the JSON text of a [`CanonicalRecord`]: `{"name":...,"type":...}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Payload(String);

impl Payload {
    pub fn new(body: String) -> Self {
        Self(body)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Reasons a single row is rejected
///
/// These never abort a run: the row is logged and skipped.
#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error("record contains {found} fields instead of {expected}")]
    FieldCount { found: usize, expected: usize },

    #[error("type field {value:?} is not an integer: {source}")]
    InvalidType {
        value: String,
        #[source]
        source: ParseIntError,
    },

    #[error("failed to serialize record: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Fatal errors that terminate a run
///
/// Configuration and input errors happen before or while reading; broker
/// errors happen when the publisher is opened, when a payload cannot be
/// enqueued, or when the final flush cannot complete.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("'{}' is not a valid file path", .0.display())]
    MissingInput(PathBuf),

    #[error("failed to read {}: {source}", .path.display())]
    Input {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("broker {endpoint} is unavailable: {source}")]
    BrokerOpen {
        endpoint: String,
        #[source]
        source: BoxError,
    },

    #[error("failed to enqueue message for topic '{topic}': {source}")]
    Send {
        topic: String,
        #[source]
        source: BoxError,
    },

    #[error("failed to flush producer: {source}")]
    Close {
        #[source]
        source: BoxError,
    },

    #[error("{failed} message(s) were not delivered ({delivered} delivered)")]
    Undelivered { failed: u64, delivered: u64 },
}

/// Outcome of the final flush of a [`Publisher`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    /// Payloads accepted by `send`
    pub enqueued: u64,
    /// Payloads confirmed by the destination
    pub delivered: u64,
    /// Payloads the destination reported as failed
    pub failed: u64,
}

/// Counters of a completed run
///
/// `read` counts every row taken from the source, valid or not, so
/// `read == sent + rejected` always holds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub read: u64,
    pub sent: u64,
    pub rejected: u64,
    pub delivery: DeliveryReport,
}

/// Trait for message sinks
///
/// A publisher owns its connection to the destination. `send` only enqueues:
/// with asynchronous delivery the payload may still be buffered when it
/// returns. `close` is the single synchronization point that flushes what is
/// buffered and releases the connection; it consumes the publisher so it can
/// only be called once.
///
/// ## Examples
/// - Kafka producer
/// - Stdout printer for dry runs
/// - In-memory recorder for tests
#[async_trait]
pub trait Publisher: Send {
    /// Returns the name of this publisher, used for logging
    fn name(&self) -> &str;

    /// Enqueue one payload for delivery to `topic`
    async fn send(&mut self, topic: &str, payload: &Payload) -> Result<(), IngestError>;

    /// Flush buffered payloads and release the destination
    async fn close(self: Box<Self>) -> Result<DeliveryReport, IngestError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_record_accessors() {
        let raw = RawRecord::new(7, vec!["alice".to_string(), "1".to_string()]);
        assert_eq!(raw.line(), 7);
        assert_eq!(raw.len(), 2);
        assert!(!raw.is_empty());
        assert_eq!(raw.get(FIELD_NAME), Some("alice"));
        assert_eq!(raw.get(FIELD_TYPE), Some("1"));
        assert_eq!(raw.get(2), None);
    }

    #[test]
    fn test_canonical_record_uses_type_key() {
        let record = CanonicalRecord {
            name: "carol".to_string(),
            kind: 2,
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json, serde_json::json!({"name": "carol", "type": 2}));
    }

    #[test]
    fn test_payload_display_matches_body() {
        let payload = Payload::new(r#"{"name":"bob","type":3}"#.to_string());
        assert_eq!(payload.to_string(), payload.as_str());
        assert_eq!(payload.as_bytes(), payload.as_str().as_bytes());
        assert_eq!(payload.len(), 23);
    }

    #[test]
    fn test_missing_input_message() {
        let err = IngestError::MissingInput(PathBuf::from("/no/such.csv"));
        assert_eq!(err.to_string(), "'/no/such.csv' is not a valid file path");
    }

    #[test]
    fn test_field_count_message() {
        let err = RecordError::FieldCount {
            found: 3,
            expected: EXPECTED_FIELDS,
        };
        assert_eq!(err.to_string(), "record contains 3 fields instead of 2");
    }
}
