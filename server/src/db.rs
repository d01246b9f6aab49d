use crate::errors::{Result, StoreError};
use crate::model::{NewReading, Reading};
use crate::store::{ReadingStore, ReadingTransaction, WindowFilter};
use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{Postgres, Transaction};
use std::time::Duration;
use tracing::info;

pub async fn make_pool(
    database_url: &str,
    max_connections: u32,
    acquire_timeout: Duration,
) -> Result<PgPool> {
    info!("Connecting to database...");
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(acquire_timeout)
        .connect(database_url)
        .await?;

    info!("Database connection established");
    info!("Running database migrations...");
    sqlx::migrate!("./migrations").run(&pool).await?;
    info!("Migrations completed");

    Ok(pool)
}

/// Reading store backed by the PostgreSQL `readings` table.
#[derive(Debug, Clone)]
pub struct PgReadingStore {
    pool: PgPool,
}

impl PgReadingStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReadingStore for PgReadingStore {
    async fn begin(&self) -> std::result::Result<Box<dyn ReadingTransaction>, StoreError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgReadingTransaction { tx }))
    }

    async fn query(&self, filter: &WindowFilter) -> std::result::Result<Vec<Reading>, StoreError> {
        let query = r#"
            SELECT id, created_at, updated_at, deleted_at, "timestamp", blob, device_id
            FROM readings
            WHERE device_id = $1
              AND "timestamp" > $2
              AND "timestamp" < $3
              AND deleted_at IS NULL
            ORDER BY "timestamp", id
            "#;

        let readings = sqlx::query_as::<_, Reading>(query)
            .bind(&filter.device_id)
            .bind(filter.after)
            .bind(filter.before)
            .fetch_all(&self.pool)
            .await?;

        Ok(readings)
    }
}

/// Rolls back on drop unless committed.
struct PgReadingTransaction {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl ReadingTransaction for PgReadingTransaction {
    async fn create(&mut self, reading: NewReading) -> std::result::Result<(), StoreError> {
        sqlx::query(r#"INSERT INTO readings (device_id, "timestamp", blob) VALUES ($1, $2, $3)"#)
            .bind(&reading.device_id)
            .bind(reading.timestamp)
            .bind(&reading.blob)
            .execute(&mut *self.tx)
            .await
            .map_err(classify_insert_error)?;

        Ok(())
    }

    async fn commit(self: Box<Self>) -> std::result::Result<(), StoreError> {
        self.tx.commit().await?;
        Ok(())
    }
}

/// Integrity (class 23) and data (class 22, e.g. NUL in text) errors are
/// rejections of the row itself rather than of the connection.
fn classify_insert_error(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if let Some(code) = db_err.code() {
            if code.starts_with("23") || code.starts_with("22") {
                return StoreError::Constraint(db_err.message().to_string());
            }
        }
    }
    StoreError::Database(err)
}
