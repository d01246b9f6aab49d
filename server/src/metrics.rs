use lazy_static::lazy_static;
use prometheus::{Counter, Encoder, Histogram, HistogramOpts, Opts, Registry, TextEncoder};

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();
    pub static ref INSERT_REQUESTS_TOTAL: Counter = Counter::with_opts(Opts::new(
        "reading_server_insert_requests_total",
        "Total insert requests received"
    ))
    .unwrap();
    pub static ref READINGS_INSERTED_TOTAL: Counter = Counter::with_opts(Opts::new(
        "reading_server_readings_inserted_total",
        "Total readings committed to the store"
    ))
    .unwrap();
    pub static ref INVALID_PAYLOADS_TOTAL: Counter = Counter::with_opts(Opts::new(
        "reading_server_invalid_payloads_total",
        "Total insert requests rejected for a malformed body"
    ))
    .unwrap();
    pub static ref STORE_FAILURES_TOTAL: Counter = Counter::with_opts(Opts::new(
        "reading_server_store_failures_total",
        "Total store operations that failed"
    ))
    .unwrap();
    pub static ref RECENT_QUERIES_TOTAL: Counter = Counter::with_opts(Opts::new(
        "reading_server_recent_queries_total",
        "Total recent-window queries served"
    ))
    .unwrap();
    pub static ref BATCH_SIZE: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "reading_server_batch_size",
            "Number of readings per insert request"
        )
        .buckets(vec![0.0, 1.0, 10.0, 50.0, 100.0, 500.0, 1000.0, 5000.0])
    )
    .unwrap();
    pub static ref INSERT_LATENCY_SECONDS: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "reading_server_insert_latency_seconds",
            "Time taken to commit one batch"
        )
        .buckets(vec![
            0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0
        ])
    )
    .unwrap();
    pub static ref QUERY_LATENCY_SECONDS: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "reading_server_query_latency_seconds",
            "Time taken to run one recent-window query"
        )
        .buckets(vec![
            0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0
        ])
    )
    .unwrap();
}

pub fn init_metrics() -> prometheus::Result<()> {
    REGISTRY.register(Box::new(INSERT_REQUESTS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(READINGS_INSERTED_TOTAL.clone()))?;
    REGISTRY.register(Box::new(INVALID_PAYLOADS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(STORE_FAILURES_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RECENT_QUERIES_TOTAL.clone()))?;
    REGISTRY.register(Box::new(BATCH_SIZE.clone()))?;
    REGISTRY.register(Box::new(INSERT_LATENCY_SECONDS.clone()))?;
    REGISTRY.register(Box::new(QUERY_LATENCY_SECONDS.clone()))?;
    Ok(())
}

pub fn gather_metrics() -> prometheus::Result<String> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
}
