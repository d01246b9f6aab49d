use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::errors::StoreError;
use crate::model::{NewReading, Reading};
use crate::store::{ReadingStore, ReadingTransaction, WindowFilter};
use crate::validate::check_row_constraints;

/// In-memory reading store. Suitable for development and testing.
///
/// Rows from one transaction are appended under a single write lock, so a
/// concurrent query sees either none or all of them.
#[derive(Clone, Default)]
pub struct MemoryReadingStore {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    rows: RwLock<Vec<Reading>>,
    last_id: AtomicI64,
}

impl MemoryReadingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of committed rows across all devices.
    pub async fn len(&self) -> usize {
        self.inner.rows.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl ReadingStore for MemoryReadingStore {
    async fn begin(&self) -> Result<Box<dyn ReadingTransaction>, StoreError> {
        Ok(Box::new(MemoryTransaction {
            inner: Arc::clone(&self.inner),
            staged: Vec::new(),
        }))
    }

    async fn query(&self, filter: &WindowFilter) -> Result<Vec<Reading>, StoreError> {
        let rows = self.inner.rows.read().await;
        let mut matching: Vec<Reading> = rows
            .iter()
            .filter(|r| r.deleted_at.is_none() && filter.matches(r))
            .cloned()
            .collect();
        drop(rows);

        matching.sort_by_key(|r| (r.timestamp, r.id));
        Ok(matching)
    }
}

struct MemoryTransaction {
    inner: Arc<Inner>,
    staged: Vec<NewReading>,
}

#[async_trait]
impl ReadingTransaction for MemoryTransaction {
    async fn create(&mut self, reading: NewReading) -> Result<(), StoreError> {
        check_row_constraints(&reading).map_err(StoreError::Constraint)?;
        self.staged.push(reading);
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let MemoryTransaction { inner, staged } = *self;
        if staged.is_empty() {
            return Ok(());
        }

        let now = Utc::now();
        let mut rows = inner.rows.write().await;
        rows.extend(staged.into_iter().map(|new| Reading {
            id: inner.last_id.fetch_add(1, Ordering::Relaxed) + 1,
            created_at: now,
            updated_at: now,
            deleted_at: None,
            timestamp: new.timestamp,
            blob: new.blob,
            device_id: new.device_id,
        }));

        Ok(())
    }
}
