use crate::clock::Clock;
use crate::errors::{IngestError, QueryError, StoreError};
use crate::ingest::IngestHandler;
use crate::model::RecentResponse;
use crate::store::ReadingStore;
use crate::window::WindowQueryHandler;
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, warn};

#[derive(Clone)]
struct AppState {
    ingest: Arc<IngestHandler>,
    window: Arc<WindowQueryHandler>,
    clock: Arc<dyn Clock>,
}

pub fn create_router(
    store: Arc<dyn ReadingStore>,
    window: Duration,
    clock: Arc<dyn Clock>,
) -> Router {
    let state = AppState {
        ingest: Arc::new(IngestHandler::new(Arc::clone(&store))),
        window: Arc::new(WindowQueryHandler::new(store, window)),
        clock,
    };

    Router::new()
        .route("/devices/:device_id/insert", post(insert_readings))
        .route("/devices/:device_id/recent", get(get_recent))
        .with_state(state)
}

async fn insert_readings(
    State(state): State<AppState>,
    Path(device_id): Path<String>,
    body: Bytes,
) -> Result<StatusCode, AppError> {
    state.ingest.insert(&device_id, &body).await?;
    Ok(StatusCode::OK)
}

async fn get_recent(
    State(state): State<AppState>,
    Path(device_id): Path<String>,
) -> Result<Json<RecentResponse>, AppError> {
    let now = state.clock.now();
    let readings = state.window.get_recent(&device_id, now).await?;
    Ok(Json(RecentResponse { readings }))
}

enum AppError {
    Ingest(IngestError),
    Query(QueryError),
}

impl From<IngestError> for AppError {
    fn from(err: IngestError) -> Self {
        Self::Ingest(err)
    }
}

impl From<QueryError> for AppError {
    fn from(err: QueryError) -> Self {
        Self::Query(err)
    }
}

fn store_response(err: &StoreError) -> (StatusCode, &'static str) {
    match err {
        StoreError::Constraint(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Reading rejected by store"),
        e if e.is_transient() => (StatusCode::SERVICE_UNAVAILABLE, "Storage unavailable"),
        _ => (StatusCode::INTERNAL_SERVER_ERROR, "Storage error"),
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::Ingest(IngestError::InvalidDeviceId(_))
            | AppError::Ingest(IngestError::InvalidPayload(_))
            | AppError::Query(QueryError::InvalidDeviceId(_)) => {
                (StatusCode::BAD_REQUEST, self.to_string())
            }
            AppError::Ingest(IngestError::StoreFailure(e))
            | AppError::Query(QueryError::StoreFailure(e)) => {
                let (status, message) = store_response(e);
                (status, message.to_string())
            }
        };

        if status.is_server_error() {
            error!("API error ({}): {}", status, self);
        } else {
            warn!("API error ({}): {}", status, self);
        }

        (status, message).into_response()
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AppError::Ingest(e) => e.fmt(f),
            AppError::Query(e) => e.fmt(f),
        }
    }
}
