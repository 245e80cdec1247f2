use std::collections::HashMap;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, ConnectionAddr, ConnectionInfo, ErrorKind, RedisConnectionInfo, RedisError};
use tokio::sync::OnceCell;

use crate::error::{Result, TelemetryError};
use crate::storage::{Record, RecordStore};

/// Keys asked for per SCAN step.
const SCAN_BATCH: usize = 500;

/// Where to find the Redis database holding the records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedisSettings {
    pub host: String,
    pub port: u16,
    pub password: Option<String>,
    pub db: i64,
}

impl RedisSettings {
    fn connection_info(&self) -> ConnectionInfo {
        ConnectionInfo {
            addr: ConnectionAddr::Tcp(self.host.clone(), self.port),
            redis: RedisConnectionInfo {
                db: self.db,
                password: self.password.clone(),
                ..Default::default()
            },
        }
    }
}

/// Records stored as Redis hashes, one hash per id, in a dedicated database.
///
/// The connection is opened on first use and kept in a reconnecting
/// [`ConnectionManager`]. A failed connect is not remembered, so the next call
/// tries again; building the store never touches the network.
pub struct RedisStore {
    client: redis::Client,
    conn: OnceCell<ConnectionManager>,
}

impl RedisStore {
    pub fn new(settings: &RedisSettings) -> Result<Self> {
        let client = redis::Client::open(settings.connection_info())?;
        Ok(Self {
            client,
            conn: OnceCell::new(),
        })
    }

    async fn connection(&self) -> Result<ConnectionManager> {
        let conn = self
            .conn
            .get_or_try_init(|| ConnectionManager::new(self.client.clone()))
            .await?;
        Ok(conn.clone())
    }
}

#[async_trait]
impl RecordStore for RedisStore {
    /// Walks the keyspace with SCAN so a large database never blocks the
    /// server the way KEYS would. SCAN may repeat a key across steps.
    async fn keys(&self) -> Result<Vec<String>> {
        let mut conn = self.connection().await?;
        let mut keys = Vec::new();
        let mut cursor: u64 = 0;
        loop {
            let (next, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async(&mut conn)
                .await?;
            keys.extend(batch);
            if next == 0 {
                break;
            }
            cursor = next;
        }
        keys.sort_unstable();
        keys.dedup();
        Ok(keys)
    }

    async fn get_record(&self, key: &str) -> Result<Option<Record>> {
        let mut conn = self.connection().await?;
        // HGETALL answers an empty map for a missing key, saving an EXISTS round trip.
        let fields: HashMap<String, String> = match conn.hgetall(key).await {
            Ok(fields) => fields,
            Err(err) if holds_other_data(&err) => {
                return Err(TelemetryError::NotARecord {
                    key: key.to_string(),
                    reason: err.to_string(),
                })
            }
            Err(err) => return Err(err.into()),
        };
        if fields.is_empty() {
            return Ok(None);
        }
        Ok(Some(Record::from_fields(key, fields)))
    }

    async fn put_record(&self, key: &str, record: &Record) -> Result<()> {
        let mut conn = self.connection().await?;
        let fields = record.fields();
        conn.hset_multiple::<_, _, _, ()>(key, &fields[..]).await?;
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        let mut conn = self.connection().await?;
        redis::cmd("FLUSHDB").query_async::<_, ()>(&mut conn).await?;
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        let mut conn = self.connection().await?;
        redis::cmd("PING").query_async::<_, String>(&mut conn).await?;
        Ok(())
    }
}

/// A non-hash key (WRONGTYPE) or a hash whose values are not UTF-8 text.
fn holds_other_data(err: &RedisError) -> bool {
    err.kind() == ErrorKind::TypeError || err.code() == Some("WRONGTYPE")
}
