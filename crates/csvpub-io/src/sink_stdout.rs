use async_trait::async_trait;
use csvpub_core::{DeliveryReport, IngestError, Payload, Publisher};
use std::io::{self, Write};
use tracing::info;

/// Dry-run publisher printing one payload per line
///
/// Nothing is sent to the broker. The topic is only logged.
pub struct StdoutPublisher {
    id: String,
    out: io::BufWriter<io::Stdout>,
    written: u64,
}

impl StdoutPublisher {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            out: io::BufWriter::new(io::stdout()),
            written: 0,
        }
    }
}

#[async_trait]
impl Publisher for StdoutPublisher {
    fn name(&self) -> &str {
        &self.id
    }

    async fn send(&mut self, topic: &str, payload: &Payload) -> Result<(), IngestError> {
        if self.written == 0 {
            info!(topic, "dry run: printing payloads instead of sending them");
        }
        writeln!(self.out, "{payload}").map_err(|e| IngestError::Send {
            topic: topic.to_string(),
            source: e.into(),
        })?;
        self.written += 1;
        Ok(())
    }

    async fn close(self: Box<Self>) -> Result<DeliveryReport, IngestError> {
        let mut this = *self;
        this.out
            .flush()
            .map_err(|e| IngestError::Close { source: e.into() })?;
        Ok(DeliveryReport {
            enqueued: this.written,
            delivered: this.written,
            failed: 0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_report_counts_written_payloads() {
        let mut publisher = Box::new(StdoutPublisher::new("dry-run"));
        assert_eq!(publisher.name(), "dry-run");

        let payload = Payload::new(r#"{"name":"alice","type":1}"#.to_string());
        publisher.send("instances", &payload).await.unwrap();
        publisher.send("instances", &payload).await.unwrap();

        let report = publisher.close().await.unwrap();
        assert_eq!(report.enqueued, 2);
        assert_eq!(report.delivered, 2);
        assert_eq!(report.failed, 0);
    }
}
