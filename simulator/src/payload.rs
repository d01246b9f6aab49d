use serde::{Deserialize, Serialize};

/// Sensor values carried as the opaque blob of a reading.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Measurement {
    pub temperature: f64,
    pub humidity: f64,
    pub battery: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReadingInput {
    #[serde(rename = "Timestamp")]
    pub timestamp: i64,
    #[serde(rename = "Blob")]
    pub blob: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct InsertRequest {
    #[serde(rename = "Readings")]
    pub readings: Vec<ReadingInput>,
}

#[derive(Debug, Deserialize)]
pub struct RecentResponse {
    pub readings: Vec<serde_json::Value>,
}
