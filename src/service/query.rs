use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeZone};
use chrono_tz::Tz;
use tracing::warn;

use crate::clock::Clock;
use crate::error::{Result, TelemetryError};
use crate::service::allocator::descending_id_order;
use crate::service::Deadline;
use crate::service::window::{select_window, Window};
use crate::storage::{Record, RecordStore};

/// Read side of the service. Every call re-reads the store; nothing is cached
/// between requests.
#[derive(Clone)]
pub struct QueryService {
    store: Arc<dyn RecordStore>,
    clock: Arc<dyn Clock>,
    store_timeout: Duration,
}

impl QueryService {
    pub fn new(store: Arc<dyn RecordStore>, clock: Arc<dyn Clock>, store_timeout: Duration) -> Self {
        Self {
            store,
            clock,
            store_timeout,
        }
    }

    /// All records, highest id first.
    pub async fn get_all(&self) -> Result<Vec<Record>> {
        let mut records = self.scan(Deadline::after(self.store_timeout)).await?;
        sort_descending(&mut records);
        Ok(records)
    }

    /// The record stored under `id`. A key holding something other than a
    /// record reads as absent.
    pub async fn get_by_id(&self, id: &str) -> Result<Option<Record>> {
        let deadline = Deadline::after(self.store_timeout);
        match deadline.run("reading record", self.store.get_record(id)).await {
            Err(TelemetryError::NotARecord { key, reason }) => {
                warn!(%key, %reason, "key does not hold a record");
                Ok(None)
            }
            other => other,
        }
    }

    /// Records stamped within `window` of now, highest id first.
    pub async fn get_by_window(&self, window: Window) -> Result<Vec<Record>> {
        self.get_by_window_at(window, self.clock.now()).await
    }

    /// Records stamped within `window` before `reference`, highest id first.
    pub async fn get_by_window_at<Z: TimeZone>(
        &self,
        window: Window,
        reference: DateTime<Z>,
    ) -> Result<Vec<Record>> {
        // stored timestamps carry no offset; read them in the clock's zone
        let reference: DateTime<Tz> = reference.with_timezone(&self.clock.timezone());
        let records = self.scan(Deadline::after(self.store_timeout)).await?;
        let mut selected = select_window(records, reference, window.duration());
        sort_descending(&mut selected);
        Ok(selected)
    }

    /// Whether the store answers within the timeout.
    pub async fn store_health(&self) -> Result<()> {
        Deadline::after(self.store_timeout)
            .run("ping", self.store.ping())
            .await
    }

    /// Every record, one round trip per key, all under one `deadline`. Keys
    /// removed between listing and fetching are skipped, as are keys holding
    /// something other than a record.
    async fn scan(&self, deadline: Deadline) -> Result<Vec<Record>> {
        let keys = deadline.run("listing keys", self.store.keys()).await?;
        let mut records = Vec::with_capacity(keys.len());
        for key in keys {
            match deadline.run("reading record", self.store.get_record(&key)).await {
                Ok(Some(record)) => records.push(record),
                Ok(None) => {}
                Err(TelemetryError::NotARecord { key, reason }) => {
                    warn!(%key, %reason, "skipping key that does not hold a record");
                }
                Err(err) => return Err(err),
            }
        }
        Ok(records)
    }
}

fn sort_descending(records: &mut [Record]) {
    records.sort_by(|a, b| descending_id_order(&a.id, &b.id));
}
