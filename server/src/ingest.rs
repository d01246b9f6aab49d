use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, error, warn};

use crate::errors::{IngestError, StoreError};
use crate::metrics::{
    BATCH_SIZE, INSERT_LATENCY_SECONDS, INSERT_REQUESTS_TOTAL, INVALID_PAYLOADS_TOTAL,
    READINGS_INSERTED_TOTAL, STORE_FAILURES_TOTAL,
};
use crate::model::{InsertRequest, NewReading};
use crate::store::ReadingStore;
use crate::validate::validate_device_id;

/// Decodes insert bodies and persists each one as a single transaction.
pub struct IngestHandler {
    store: Arc<dyn ReadingStore>,
}

impl IngestHandler {
    pub fn new(store: Arc<dyn ReadingStore>) -> Self {
        Self { store }
    }

    /// Persists every reading in `raw_body` under `device_id`, or none of them.
    ///
    /// Returns the number of readings committed. An empty batch commits
    /// nothing and succeeds.
    pub async fn insert(&self, device_id: &str, raw_body: &[u8]) -> Result<usize, IngestError> {
        INSERT_REQUESTS_TOTAL.inc();

        validate_device_id(device_id).map_err(IngestError::InvalidDeviceId)?;

        let request = serde_json::from_slice::<InsertRequest>(raw_body).map_err(|e| {
            INVALID_PAYLOADS_TOTAL.inc();
            warn!("Rejecting insert for device {}: {}", device_id, e);
            IngestError::InvalidPayload(e)
        })?;

        let batch = request.into_batch(device_id);
        let batch_len = batch.len();
        BATCH_SIZE.observe(batch_len as f64);

        let start = Instant::now();
        if let Err(e) = self.persist(batch).await {
            STORE_FAILURES_TOTAL.inc();
            error!(
                "Failed to persist batch of {} readings for device {}: {}",
                batch_len, device_id, e
            );
            return Err(IngestError::StoreFailure(e));
        }

        let elapsed = start.elapsed().as_secs_f64();
        INSERT_LATENCY_SECONDS.observe(elapsed);
        READINGS_INSERTED_TOTAL.inc_by(batch_len as f64);
        debug!(
            "Committed {} readings for device {} in {:.3}s",
            batch_len, device_id, elapsed
        );

        Ok(batch_len)
    }

    async fn persist(&self, batch: Vec<NewReading>) -> Result<(), StoreError> {
        // An early return drops `tx`, which rolls the whole batch back.
        let mut tx = self.store.begin().await?;
        for reading in batch {
            tx.create(reading).await?;
        }
        tx.commit().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryReadingStore;
    use crate::store::{ReadingTransaction, WindowFilter};
    use async_trait::async_trait;

    fn everything(device_id: &str) -> WindowFilter {
        WindowFilter {
            device_id: device_id.to_string(),
            after: i64::MIN,
            before: i64::MAX,
        }
    }

    /// Wraps the memory store and fails every commit.
    struct FailingCommitStore {
        inner: MemoryReadingStore,
    }

    struct FailingCommit {
        inner: Box<dyn ReadingTransaction>,
    }

    #[async_trait]
    impl ReadingStore for FailingCommitStore {
        async fn begin(&self) -> Result<Box<dyn ReadingTransaction>, StoreError> {
            Ok(Box::new(FailingCommit {
                inner: self.inner.begin().await?,
            }))
        }

        async fn query(
            &self,
            filter: &WindowFilter,
        ) -> Result<Vec<crate::model::Reading>, StoreError> {
            self.inner.query(filter).await
        }
    }

    #[async_trait]
    impl ReadingTransaction for FailingCommit {
        async fn create(&mut self, reading: NewReading) -> Result<(), StoreError> {
            self.inner.create(reading).await
        }

        async fn commit(self: Box<Self>) -> Result<(), StoreError> {
            Err(StoreError::Database(sqlx::Error::PoolClosed))
        }
    }

    #[test]
    fn test_insert_overrides_device_id() {
        tokio_test::block_on(async {
            let store = MemoryReadingStore::new();
            let handler = IngestHandler::new(Arc::new(store.clone()));
            let body = br#"{"Readings":[{"Timestamp":1,"Blob":"a","DeviceID":"other"}]}"#;

            assert_eq!(handler.insert("d1", body).await.unwrap(), 1);

            let rows = store.query(&everything("d1")).await.unwrap();
            assert_eq!(rows.len(), 1);
            assert_eq!(rows[0].device_id, "d1");
            assert!(store.query(&everything("other")).await.unwrap().is_empty());
        });
    }

    #[test]
    fn test_empty_batch_is_noop() {
        tokio_test::block_on(async {
            let store = MemoryReadingStore::new();
            let handler = IngestHandler::new(Arc::new(store.clone()));

            assert_eq!(handler.insert("d1", br#"{"Readings":[]}"#).await.unwrap(), 0);
            assert!(store.is_empty().await);
        });
    }

    #[test]
    fn test_malformed_payload() {
        tokio_test::block_on(async {
            let store = MemoryReadingStore::new();
            let handler = IngestHandler::new(Arc::new(store.clone()));

            let err = handler.insert("d1", b"not json").await.unwrap_err();

            assert!(matches!(err, IngestError::InvalidPayload(_)));
            assert!(store.is_empty().await);
        });
    }

    #[test]
    fn test_empty_device_id() {
        tokio_test::block_on(async {
            let handler = IngestHandler::new(Arc::new(MemoryReadingStore::new()));

            let err = handler.insert("", br#"{"Readings":[]}"#).await.unwrap_err();

            assert!(matches!(err, IngestError::InvalidDeviceId(_)));
        });
    }

    #[test]
    fn test_constraint_violation_discards_whole_batch() {
        tokio_test::block_on(async {
            let store = MemoryReadingStore::new();
            let handler = IngestHandler::new(Arc::new(store.clone()));
            let body = br#"{"Readings":[
                {"Timestamp":1,"Blob":"ok"},
                {"Timestamp":2,"Blob":"bad\u0000"},
                {"Timestamp":3,"Blob":"ok"}
            ]}"#;

            let err = handler.insert("d1", body).await.unwrap_err();

            assert!(matches!(
                err,
                IngestError::StoreFailure(StoreError::Constraint(_))
            ));
            assert!(store.is_empty().await);
        });
    }

    #[test]
    fn test_commit_failure_discards_whole_batch() {
        tokio_test::block_on(async {
            let inner = MemoryReadingStore::new();
            let handler = IngestHandler::new(Arc::new(FailingCommitStore {
                inner: inner.clone(),
            }));
            let body = br#"{"Readings":[{"Timestamp":1,"Blob":"a"},{"Timestamp":2,"Blob":"b"}]}"#;

            let err = handler.insert("d1", body).await.unwrap_err();

            assert!(matches!(err, IngestError::StoreFailure(_)));
            assert!(inner.is_empty().await);
        });
    }
}
