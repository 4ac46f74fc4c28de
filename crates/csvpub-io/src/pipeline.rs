use csvpub_core::{IngestError, Publisher, RawRecord, RunSummary};
use csvpub_tx::canonicalize;
use tracing::{error, info, warn};

/// Log progress every this many records read
pub const PROGRESS_INTERVAL: u64 = 10_000;

#[derive(Debug, Default)]
struct Counts {
    read: u64,
    sent: u64,
    rejected: u64,
}

/// Publish every valid record to `topic`, then close the publisher
///
/// Invalid rows are logged and skipped. A fatal input or send error stops
/// reading, but the publisher is still closed exactly once so that what was
/// already enqueued gets flushed; the first error is returned.
pub async fn run<I>(
    records: I,
    mut publisher: Box<dyn Publisher>,
    topic: &str,
) -> Result<RunSummary, IngestError>
where
    I: IntoIterator<Item = Result<RawRecord, IngestError>>,
{
    info!(publisher = publisher.name(), topic, "pipeline started");

    let outcome = drive(records, publisher.as_mut(), topic).await;
    let closed = publisher.close().await;

    match (outcome, closed) {
        (Ok(counts), Ok(delivery)) => {
            info!(
                read = counts.read,
                sent = counts.sent,
                rejected = counts.rejected,
                "pipeline finished"
            );
            Ok(RunSummary {
                read: counts.read,
                sent: counts.sent,
                rejected: counts.rejected,
                delivery,
            })
        }
        (Ok(_), Err(e)) => Err(e),
        (Err(e), Ok(_)) => Err(e),
        (Err(e), Err(close_err)) => {
            error!(error = %close_err, "closing publisher after failure");
            Err(e)
        }
    }
}

async fn drive<I>(
    records: I,
    publisher: &mut dyn Publisher,
    topic: &str,
) -> Result<Counts, IngestError>
where
    I: IntoIterator<Item = Result<RawRecord, IngestError>>,
{
    let mut counts = Counts::default();

    for record in records {
        let record = record?;
        counts.read += 1;

        match canonicalize(&record) {
            Ok(payload) => {
                publisher.send(topic, &payload).await?;
                counts.sent += 1;
            }
            Err(e) => {
                counts.rejected += 1;
                warn!(line = record.line(), error = %e, "skipping invalid record");
            }
        }

        if counts.read % PROGRESS_INTERVAL == 0 {
            info!("Progress: {} records read", counts.read);
        }
    }

    Ok(counts)
}
