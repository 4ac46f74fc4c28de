//! Broker configuration
//!
//! [`BrokerConfig`] is resolved once at startup from the process environment
//! and passed to the publisher by reference. Only the endpoint and topic come
//! from outside; the batching, compression and delivery settings are fixed.

use std::fmt;
use std::num::ParseIntError;
use std::time::Duration;

/// Environment variable holding the broker host
pub const HOST_VAR: &str = "KAFKA_PRDCR_HOST";

/// Environment variable holding the broker port
pub const PORT_VAR: &str = "KAFKA_PRDCR_PORT";

/// Environment variable holding the target topic
pub const TOPIC_VAR: &str = "KAFKA_TOPIC";

/// Number of messages the client batches into one request
pub const DEFAULT_BATCH_SIZE: usize = 500;

pub const DEFAULT_CLIENT_ID: &str = "csvpub-producer";

pub const DEFAULT_MESSAGE_TIMEOUT: Duration = Duration::from_secs(30);

pub const DEFAULT_FLUSH_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} environment variable is not set")]
    Missing(&'static str),

    #[error("{0} environment variable is empty")]
    Empty(&'static str),

    #[error("{var} value {value:?} is not a valid port: {source}")]
    InvalidPort {
        var: &'static str,
        value: String,
        #[source]
        source: ParseIntError,
    },
}

/// How payloads are encoded on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Serialization {
    /// UTF-8 text of the JSON payload
    String,
}

/// Whether `send` waits for the broker acknowledgment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryMode {
    /// Every send is flushed before returning
    Sync,
    /// Sends enqueue; the client batches and delivers in the background
    Async,
}

/// Compression codec applied to message batches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    Gzip,
}

impl Compression {
    /// Codec name understood by librdkafka's `compression.codec`
    pub fn as_str(&self) -> &'static str {
        match self {
            Compression::Gzip => "gzip",
        }
    }
}

impl fmt::Display for Compression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable producer configuration
///
/// Built once before anything is read and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerConfig {
    host: String,
    port: u16,
    topic: String,
    serialization: Serialization,
    delivery_mode: DeliveryMode,
    batch_size: usize,
    compression: Compression,
    client_id: String,
    message_timeout: Duration,
    flush_timeout: Duration,
}

impl BrokerConfig {
    /// Build a configuration with the fixed producer settings
    pub fn new(host: impl Into<String>, port: u16, topic: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port,
            topic: topic.into(),
            serialization: Serialization::String,
            delivery_mode: DeliveryMode::Async,
            batch_size: DEFAULT_BATCH_SIZE,
            compression: Compression::Gzip,
            client_id: DEFAULT_CLIENT_ID.to_string(),
            message_timeout: DEFAULT_MESSAGE_TIMEOUT,
            flush_timeout: DEFAULT_FLUSH_TIMEOUT,
        }
    }

    /// Resolve the configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Resolve the configuration through an arbitrary variable lookup
    ///
    /// All three variables are checked before the port is parsed, in the
    /// order host, port, topic.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = required(&lookup, HOST_VAR)?;
        let port = required(&lookup, PORT_VAR)?;
        let topic = required(&lookup, TOPIC_VAR)?;

        let port = port.parse::<u16>().map_err(|source| ConfigError::InvalidPort {
            var: PORT_VAR,
            value: port.clone(),
            source,
        })?;

        Ok(Self::new(host, port, topic))
    }

    pub fn with_delivery_mode(mut self, mode: DeliveryMode) -> Self {
        self.delivery_mode = mode;
        self
    }

    pub fn with_message_timeout(mut self, timeout: Duration) -> Self {
        self.message_timeout = timeout;
        self
    }

    pub fn with_flush_timeout(mut self, timeout: Duration) -> Self {
        self.flush_timeout = timeout;
        self
    }

    /// `host:port` used as the bootstrap server
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn serialization(&self) -> Serialization {
        self.serialization
    }

    pub fn delivery_mode(&self) -> DeliveryMode {
        self.delivery_mode
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn compression(&self) -> Compression {
        self.compression
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn message_timeout(&self) -> Duration {
        self.message_timeout
    }

    pub fn flush_timeout(&self) -> Duration {
        self.flush_timeout
    }
}

fn required<F>(lookup: &F, name: &'static str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        None => Err(ConfigError::Missing(name)),
        Some(value) if value.is_empty() => Err(ConfigError::Empty(name)),
        Some(value) => Ok(value),
    }
}
