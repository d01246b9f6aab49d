use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, error};

use crate::errors::QueryError;
use crate::metrics::{QUERY_LATENCY_SECONDS, RECENT_QUERIES_TOTAL, STORE_FAILURES_TOTAL};
use crate::model::Reading;
use crate::store::{ReadingStore, WindowFilter};
use crate::validate::validate_device_id;

/// Default recency window: four hours.
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(4 * 60 * 60);

/// Serves a device's readings from the window `(now - window, now)`.
pub struct WindowQueryHandler {
    store: Arc<dyn ReadingStore>,
    window_secs: i64,
}

impl WindowQueryHandler {
    pub fn new(store: Arc<dyn ReadingStore>, window: Duration) -> Self {
        Self {
            store,
            window_secs: i64::try_from(window.as_secs()).unwrap_or(i64::MAX),
        }
    }

    pub fn window_secs(&self) -> i64 {
        self.window_secs
    }

    /// Readings for `device_id` stamped strictly after `now - window` and
    /// strictly before `now`, oldest first.
    pub async fn get_recent(&self, device_id: &str, now: i64) -> Result<Vec<Reading>, QueryError> {
        validate_device_id(device_id).map_err(QueryError::InvalidDeviceId)?;
        RECENT_QUERIES_TOTAL.inc();

        let filter = WindowFilter::ending_at(device_id, now, self.window_secs);
        let start = Instant::now();
        let readings = self.store.query(&filter).await.map_err(|e| {
            STORE_FAILURES_TOTAL.inc();
            error!("Recent query failed for device {}: {}", device_id, e);
            QueryError::StoreFailure(e)
        })?;
        QUERY_LATENCY_SECONDS.observe(start.elapsed().as_secs_f64());

        debug!(
            "Found {} readings for device {} in ({}, {})",
            readings.len(),
            device_id,
            filter.after,
            filter.before
        );
        Ok(readings)
    }
}
