use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::error::{Result, TelemetryError};
use crate::service::allocator::next_id;
use crate::service::Deadline;
use crate::service::window::is_valid_timestamp;
use crate::storage::record::{FIELD_HUMIDITY, FIELD_LUMINOSITY, FIELD_TEMPERATURE, FIELD_TIMESTAMP};
use crate::storage::{Reading, Record, RecordStore};

const WRITE_QUEUE_DEPTH: usize = 64;

enum WriteCommand {
    Ingest {
        reading: Reading,
        reply: oneshot::Sender<Result<Record>>,
    },
    Flush {
        reply: oneshot::Sender<Result<()>>,
    },
}

/// Accepts readings and writes them to the store.
///
/// Id allocation and the write that follows it run on one writer task, fed
/// through a bounded queue, so two ingests in this process never read the same
/// key snapshot. Flushes go through the same queue.
#[derive(Clone)]
pub struct IngestService {
    tx: mpsc::Sender<WriteCommand>,
    shutdown: broadcast::Sender<()>,
    strict_timestamps: bool,
}

impl IngestService {
    /// Start the writer task on the current tokio runtime.
    pub fn spawn(store: Arc<dyn RecordStore>, store_timeout: Duration) -> Self {
        let (tx, rx) = mpsc::channel(WRITE_QUEUE_DEPTH);
        let (shutdown, shutdown_rx) = broadcast::channel(1);
        let writer = Writer {
            store,
            store_timeout,
        };
        tokio::spawn(writer.run(rx, shutdown_rx));
        Self {
            tx,
            shutdown,
            strict_timestamps: false,
        }
    }

    /// Reject readings whose timestamp is not `DD-MM-YYYY HH:MM:SS` at ingest
    /// time instead of letting window queries skip them later.
    pub fn with_strict_timestamps(mut self, strict: bool) -> Self {
        self.strict_timestamps = strict;
        self
    }

    /// Validate `payload`, assign it the next id and store it.
    pub async fn ingest(&self, payload: &Value) -> Result<Record> {
        let reading = parse_payload(payload, self.strict_timestamps)?;
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(WriteCommand::Ingest { reading, reply })
            .await
            .map_err(|_| writer_stopped())?;
        rx.await.map_err(|_| writer_stopped())?
    }

    /// Drop every record in the store.
    pub async fn flush_all(&self) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(WriteCommand::Flush { reply })
            .await
            .map_err(|_| writer_stopped())?;
        rx.await.map_err(|_| writer_stopped())?
    }

    /// Ask the writer to finish queued commands and exit.
    pub fn shutdown(&self) {
        let _ = self.shutdown.send(());
    }
}

fn writer_stopped() -> TelemetryError {
    TelemetryError::StoreUnavailable("ingest writer has stopped".to_string())
}

/// Turn an ingest payload into a [`Reading`].
///
/// Every required field must be present and non-null. Strings are kept as is,
/// any other JSON value is stored as its JSON text.
pub fn parse_payload(payload: &Value, strict_timestamps: bool) -> Result<Reading> {
    let object = payload
        .as_object()
        .ok_or_else(|| TelemetryError::InvalidPayload("expected a JSON object".to_string()))?;

    let field = |name: &str| -> Result<String> {
        match object.get(name) {
            None | Some(Value::Null) => Err(TelemetryError::InvalidPayload(format!(
                "missing field `{name}`"
            ))),
            Some(Value::String(s)) => Ok(s.clone()),
            Some(other) => Ok(other.to_string()),
        }
    };

    let reading = Reading {
        temperature: field(FIELD_TEMPERATURE)?,
        humidity: field(FIELD_HUMIDITY)?,
        luminosity: field(FIELD_LUMINOSITY)?,
        timestamp: field(FIELD_TIMESTAMP)?,
    };

    if strict_timestamps && !is_valid_timestamp(&reading.timestamp) {
        return Err(TelemetryError::InvalidPayload(format!(
            "timestamp `{}` is not DD-MM-YYYY HH:MM:SS",
            reading.timestamp
        )));
    }
    Ok(reading)
}

struct Writer {
    store: Arc<dyn RecordStore>,
    store_timeout: Duration,
}

impl Writer {
    async fn run(
        self,
        mut rx: mpsc::Receiver<WriteCommand>,
        mut shutdown: broadcast::Receiver<()>,
    ) {
        loop {
            tokio::select! {
                biased;
                _ = shutdown.recv() => {
                    // drain what is already queued, refuse anything newer
                    rx.close();
                    while let Some(cmd) = rx.recv().await {
                        self.apply(cmd).await;
                    }
                    break;
                }
                cmd = rx.recv() => match cmd {
                    Some(cmd) => self.apply(cmd).await,
                    None => break,
                },
            }
        }
        info!("ingest writer stopped");
    }

    async fn apply(&self, cmd: WriteCommand) {
        match cmd {
            WriteCommand::Ingest { reading, reply } => {
                let result = self.ingest(reading).await;
                if let Err(err) = &result {
                    warn!(error = %err, "ingest failed");
                }
                let _ = reply.send(result);
            }
            WriteCommand::Flush { reply } => {
                let result = Deadline::after(self.store_timeout)
                    .run("flush", self.store.clear())
                    .await;
                match &result {
                    Ok(()) => info!("store flushed"),
                    Err(err) => warn!(error = %err, "flush failed"),
                }
                let _ = reply.send(result);
            }
        }
    }

    async fn ingest(&self, reading: Reading) -> Result<Record> {
        // listing and writing share one budget
        let deadline = Deadline::after(self.store_timeout);
        let keys = deadline.run("listing keys", self.store.keys()).await?;
        let id = next_id(keys.iter().map(String::as_str));
        let record = reading.into_record(id);
        deadline
            .run("writing record", self.store.put_record(&record.id, &record))
            .await?;
        debug!(id = %record.id, "stored reading");
        Ok(record)
    }
}
