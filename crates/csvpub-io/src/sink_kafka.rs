use async_trait::async_trait;
use csvpub_core::{
    BoxError, BrokerConfig, DeliveryMode, DeliveryReport, IngestError, Payload, Publisher,
    Serialization,
};
use rdkafka::config::ClientConfig;
use rdkafka::error::{KafkaError, RDKafkaErrorCode};
use rdkafka::producer::{BaseRecord, DeliveryResult, Producer, ProducerContext, ThreadedProducer};
use rdkafka::ClientContext;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Wait before re-enqueueing when the local producer queue is full
const QUEUE_FULL_BACKOFF: Duration = Duration::from_millis(100);

/// Producer context counting delivery callbacks
///
/// librdkafka reports the outcome of every message from its background
/// thread; the counters are read once the producer has been flushed.
#[derive(Default)]
struct DeliveryTally {
    delivered: AtomicU64,
    failed: AtomicU64,
}

impl ClientContext for DeliveryTally {}

impl ProducerContext for DeliveryTally {
    type DeliveryOpaque = ();

    fn delivery(&self, result: &DeliveryResult<'_>, _opaque: Self::DeliveryOpaque) {
        match result {
            Ok(_) => {
                self.delivered.fetch_add(1, Ordering::Relaxed);
            }
            Err((e, _)) => {
                self.failed.fetch_add(1, Ordering::Relaxed);
                warn!(error = %e, "kafka message delivery failed");
            }
        }
    }
}

/// Publisher delivering payloads to Kafka
///
/// Sends are non-blocking enqueues into librdkafka; batching, compression and
/// network I/O happen on the client's own thread. Nothing is guaranteed to
/// have reached the broker until [`Publisher::close`] returns.
pub struct KafkaPublisher {
    id: String,
    producer: Arc<ThreadedProducer<DeliveryTally>>,
    serialization: Serialization,
    mode: DeliveryMode,
    flush_timeout: Duration,
    enqueued: u64,
}

impl KafkaPublisher {
    /// Resolve the broker endpoint and create the producer
    pub async fn connect(config: &BrokerConfig) -> Result<Self, IngestError> {
        let endpoint = config.endpoint();
        let broker_open = |source: BoxError| IngestError::BrokerOpen {
            endpoint: endpoint.clone(),
            source,
        };

        let mut addrs = tokio::net::lookup_host(endpoint.as_str())
            .await
            .map_err(|e| broker_open(e.into()))?;
        if addrs.next().is_none() {
            return Err(broker_open("endpoint resolved to no addresses".into()));
        }

        let producer: ThreadedProducer<DeliveryTally> = client_config(config)
            .create_with_context(DeliveryTally::default())
            .map_err(|e| broker_open(e.into()))?;

        info!(
            endpoint = %endpoint,
            topic = config.topic(),
            batch_size = config.batch_size(),
            compression = %config.compression(),
            mode = ?config.delivery_mode(),
            "kafka producer created"
        );

        Ok(Self {
            id: config.client_id().to_string(),
            producer: Arc::new(producer),
            serialization: config.serialization(),
            mode: config.delivery_mode(),
            flush_timeout: config.flush_timeout(),
            enqueued: 0,
        })
    }

    /// Flush on the blocking pool so the runtime keeps running
    async fn flush(&self, timeout: Duration) -> Result<(), IngestError> {
        let producer = Arc::clone(&self.producer);
        tokio::task::spawn_blocking(move || producer.flush(timeout))
            .await
            .map_err(|e| IngestError::Close { source: e.into() })?
            .map_err(|e| IngestError::Close { source: e.into() })
    }
}

/// librdkafka settings for a [`BrokerConfig`]
pub fn client_config(config: &BrokerConfig) -> ClientConfig {
    let mut client = ClientConfig::new();
    client
        .set("bootstrap.servers", config.endpoint())
        .set("client.id", config.client_id())
        .set("compression.codec", config.compression().as_str())
        .set("batch.num.messages", config.batch_size().to_string())
        .set(
            "message.timeout.ms",
            config.message_timeout().as_millis().to_string(),
        );
    if config.delivery_mode() == DeliveryMode::Sync {
        client.set("linger.ms", "0");
    }
    client
}

#[async_trait]
impl Publisher for KafkaPublisher {
    fn name(&self) -> &str {
        &self.id
    }

    async fn send(&mut self, topic: &str, payload: &Payload) -> Result<(), IngestError> {
        let body = match self.serialization {
            Serialization::String => payload.as_str(),
        };
        let mut record = BaseRecord::<(), str>::to(topic).payload(body);
        loop {
            match self.producer.send(record) {
                Ok(()) => break,
                Err((KafkaError::MessageProduction(RDKafkaErrorCode::QueueFull), returned)) => {
                    debug!("producer queue full, waiting for deliveries");
                    record = returned;
                    tokio::time::sleep(QUEUE_FULL_BACKOFF).await;
                }
                Err((e, _)) => {
                    return Err(IngestError::Send {
                        topic: topic.to_string(),
                        source: e.into(),
                    });
                }
            }
        }
        self.enqueued += 1;

        if self.mode == DeliveryMode::Sync {
            self.flush(self.flush_timeout).await?;
        }
        Ok(())
    }

    async fn close(self: Box<Self>) -> Result<DeliveryReport, IngestError> {
        debug!(in_flight = self.producer.in_flight_count(), "flushing kafka producer");
        self.flush(self.flush_timeout).await?;

        let tally = self.producer.context();
        let report = DeliveryReport {
            enqueued: self.enqueued,
            delivered: tally.delivered.load(Ordering::Relaxed),
            failed: tally.failed.load(Ordering::Relaxed),
        };

        if report.failed > 0 {
            return Err(IngestError::Undelivered {
                failed: report.failed,
                delivered: report.delivered,
            });
        }
        info!(delivered = report.delivered, "kafka producer flushed");
        Ok(report)
    }
}
