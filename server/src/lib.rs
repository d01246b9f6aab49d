//! Stores time-stamped sensor readings per device and serves each device's
//! readings from a sliding recency window.

pub mod clock;
pub mod config;
pub mod db;
pub mod errors;
pub mod ingest;
pub mod memory;
pub mod metrics;
pub mod model;
pub mod rest;
pub mod store;
pub mod validate;
pub mod window;
