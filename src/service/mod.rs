pub mod allocator;
pub mod window;
pub mod query;
pub mod ingest;

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;

use crate::error::{Result, TelemetryError};

pub use ingest::IngestService;
pub use query::QueryService;
pub use window::Window;

/// Time budget for one service operation. Every store call the operation makes
/// runs against the same instant, so a store that answers each call slowly
/// cannot stretch the operation past its budget.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Deadline {
    at: Instant,
    budget: Duration,
}

impl Deadline {
    pub(crate) fn after(budget: Duration) -> Self {
        Self {
            at: Instant::now() + budget,
            budget,
        }
    }

    /// Run one store call; running out of time counts as the store being
    /// unavailable.
    pub(crate) async fn run<T, F>(&self, operation: &'static str, call: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        match tokio::time::timeout_at(self.at, call).await {
            Ok(result) => result,
            Err(_) => Err(TelemetryError::StoreUnavailable(format!(
                "{operation} timed out after {} ms",
                self.budget.as_millis()
            ))),
        }
    }
}
