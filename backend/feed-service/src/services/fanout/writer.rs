use super::FanoutError;
use crate::db::FeedStore;
use crate::models::FeedEntry;
use std::sync::Arc;
use std::time::Duration;

/// Persists the aggregated entries of one fan-out as a single batch
#[derive(Clone)]
pub struct FeedWriter {
    store: Arc<dyn FeedStore>,
    write_timeout: Duration,
}

impl FeedWriter {
    pub fn new(store: Arc<dyn FeedStore>, write_timeout: Duration) -> Self {
        Self {
            store,
            write_timeout,
        }
    }

    /// Write every entry or none. No retry on failure.
    pub async fn write(&self, entries: &[FeedEntry]) -> Result<u64, FanoutError> {
        if entries.is_empty() {
            return Ok(0);
        }

        match tokio::time::timeout(self.write_timeout, self.store.insert_batch(entries)).await {
            Ok(Ok(written)) => Ok(written),
            Ok(Err(source)) => Err(FanoutError::BatchWrite {
                entries: entries.len(),
                source,
            }),
            Err(_) => Err(FanoutError::WriteTimedOut {
                entries: entries.len(),
                after: self.write_timeout,
            }),
        }
    }
}
