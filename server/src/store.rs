use async_trait::async_trait;

use crate::errors::StoreError;
use crate::model::{NewReading, Reading};

/// Readings for one device with a timestamp strictly between `after` and
/// `before`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowFilter {
    pub device_id: String,
    pub after: i64,
    pub before: i64,
}

impl WindowFilter {
    /// The window of length `window_secs` that ends at `now`.
    pub fn ending_at(device_id: &str, now: i64, window_secs: i64) -> Self {
        Self {
            device_id: device_id.to_string(),
            after: now.saturating_sub(window_secs),
            before: now,
        }
    }

    pub fn matches(&self, reading: &Reading) -> bool {
        reading.device_id == self.device_id
            && reading.timestamp > self.after
            && reading.timestamp < self.before
    }
}

/// Persistence for readings.
///
/// Implementations are shared across request tasks and must be safe for
/// concurrent use.
#[async_trait]
pub trait ReadingStore: Send + Sync {
    /// Opens a write transaction.
    async fn begin(&self) -> Result<Box<dyn ReadingTransaction>, StoreError>;

    /// Returns live readings matching `filter`, oldest first, ties by id.
    async fn query(&self, filter: &WindowFilter) -> Result<Vec<Reading>, StoreError>;
}

/// A batch of inserts that becomes visible all at once on [`commit`].
///
/// Dropping a transaction without committing discards everything staged in it.
///
/// [`commit`]: ReadingTransaction::commit
#[async_trait]
pub trait ReadingTransaction: Send {
    async fn create(&mut self, reading: NewReading) -> Result<(), StoreError>;

    async fn commit(self: Box<Self>) -> Result<(), StoreError>;
}
