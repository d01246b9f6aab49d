use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A persisted sensor reading
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Reading {
    #[serde(rename = "ID")]
    pub id: i64,
    #[serde(rename = "CreatedAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "UpdatedAt")]
    pub updated_at: DateTime<Utc>,
    #[serde(rename = "DeletedAt")]
    pub deleted_at: Option<DateTime<Utc>>,
    #[serde(rename = "Timestamp")]
    pub timestamp: i64,
    #[serde(rename = "Blob")]
    pub blob: String,
    #[serde(rename = "DeviceID")]
    pub device_id: String,
}

/// A reading staged inside a transaction, before the store assigns its id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewReading {
    pub device_id: String,
    pub timestamp: i64,
    pub blob: String,
}

/// One entry of an insert request body. Any device or id field the client
/// sends is dropped during decoding.
#[derive(Debug, Clone, Deserialize)]
pub struct ReadingInput {
    #[serde(rename = "Timestamp", alias = "timestamp")]
    pub timestamp: i64,
    #[serde(rename = "Blob", alias = "blob")]
    pub blob: String,
}

/// Body of `POST /devices/{device_id}/insert`
#[derive(Debug, Clone, Deserialize)]
pub struct InsertRequest {
    #[serde(rename = "Readings", alias = "readings")]
    pub readings: Vec<ReadingInput>,
}

impl InsertRequest {
    /// Stamps every entry with `device_id`, keeping the order received.
    pub fn into_batch(self, device_id: &str) -> Vec<NewReading> {
        self.readings
            .into_iter()
            .map(|input| NewReading {
                device_id: device_id.to_string(),
                timestamp: input.timestamp,
                blob: input.blob,
            })
            .collect()
    }
}

/// Body of `GET /devices/{device_id}/recent`
#[derive(Debug, Serialize, Deserialize)]
pub struct RecentResponse {
    pub readings: Vec<Reading>,
}
