use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Database migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Failures raised by a [`ReadingStore`](crate::store::ReadingStore).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Constraint violation: {0}")]
    Constraint(String),
}

impl StoreError {
    /// Connection-class failures that may succeed if the caller tries again.
    pub fn is_transient(&self) -> bool {
        match self {
            StoreError::Database(err) => is_transient_error(err),
            StoreError::Constraint(_) => false,
        }
    }
}

fn is_transient_error(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) | sqlx::Error::PoolClosed => true,
        sqlx::Error::Database(db_err) => db_err.code().is_some_and(|code| {
            code == "08000" || // connection_exception
            code == "08003" || // connection_does_not_exist
            code == "08006" || // connection_failure
            code == "57P03" || // cannot_connect_now
            code == "53300" // too_many_connections
        }),
        _ => false,
    }
}

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Invalid device id: {0}")]
    InvalidDeviceId(String),

    #[error("Invalid payload: {0}")]
    InvalidPayload(#[source] serde_json::Error),

    #[error("Store failure: {0}")]
    StoreFailure(#[from] StoreError),
}

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("Invalid device id: {0}")]
    InvalidDeviceId(String),

    #[error("Store failure: {0}")]
    StoreFailure(#[from] StoreError),
}
