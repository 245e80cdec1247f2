use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TelemetryError {
    /// The key-value store could not be reached or did not answer in time.
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    /// The store answered but refused the request.
    #[error("store rejected request: {0}")]
    StoreRejected(String),

    /// A key in a shared store holds data that is not a record.
    #[error("key `{key}` does not hold a record: {reason}")]
    NotARecord { key: String, reason: String },

    /// Ingest payload is not an object or lacks a required field.
    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    #[error("unparseable timestamp `{value}`")]
    UnparseableTimestamp { value: String },
}

pub type Result<T> = std::result::Result<T, TelemetryError>;

/// Whether `err` means the store could not be talked to, as opposed to an
/// answer the store gave.
pub fn is_connectivity_error(err: &redis::RedisError) -> bool {
    err.is_io_error()
        || err.is_connection_refusal()
        || err.is_connection_dropped()
        || err.is_timeout()
}

impl From<redis::RedisError> for TelemetryError {
    fn from(err: redis::RedisError) -> Self {
        if is_connectivity_error(&err) {
            TelemetryError::StoreUnavailable(err.to_string())
        } else {
            TelemetryError::StoreRejected(err.to_string())
        }
    }
}
