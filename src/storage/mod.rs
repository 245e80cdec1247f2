pub mod record;
pub mod memory;
pub mod redis_store;

use async_trait::async_trait;

use crate::error::Result;

pub use memory::MemoryStore;
pub use record::{Reading, Record};
pub use redis_store::{RedisSettings, RedisStore};

/// Key-value persistence for sensor records.
///
/// One record per key, stored as a field map. Any connectivity failure is
/// reported as [`TelemetryError::StoreUnavailable`](crate::error::TelemetryError)
/// and callers must not assume a partial write happened.
#[async_trait]
pub trait RecordStore: Send + Sync + 'static {
    /// Every key currently stored, in no particular order.
    async fn keys(&self) -> Result<Vec<String>>;

    /// All fields of `key` in a single round trip, or `None` if it does not exist.
    async fn get_record(&self, key: &str) -> Result<Option<Record>>;

    /// Write every field of `record` under `key` with one store call.
    async fn put_record(&self, key: &str, record: &Record) -> Result<()>;

    /// Remove all keys.
    async fn clear(&self) -> Result<()>;

    async fn ping(&self) -> Result<()>;
}
