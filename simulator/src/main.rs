mod payload;

use chrono::Utc;
use clap::Parser;
use payload::{InsertRequest, Measurement, ReadingInput, RecentResponse};
use rand::Rng;
use std::time::Duration;
use tracing::{error, info, warn};

#[derive(Debug, Parser)]
#[command(name = "simulator", about = "Posts random sensor readings to a reading server")]
struct Args {
    #[arg(long, env = "SERVER_URL", default_value = "http://localhost:8080")]
    server_url: String,

    /// Number of simulated devices
    #[arg(long, env = "DEVICES", default_value_t = 100)]
    devices: usize,

    /// Readings per insert request
    #[arg(long, env = "BATCH_SIZE", default_value_t = 50)]
    batch_size: usize,

    /// Insert requests per second
    #[arg(long, env = "RATE", default_value_t = 20)]
    rate: u64,

    /// Query a device's recent window every N batches (0 disables)
    #[arg(long, env = "QUERY_EVERY", default_value_t = 100)]
    query_every: u64,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Initialize logging
    tracing_subscriber::fmt::init();

    info!("Starting reading simulator");
    info!(
        "Server: {}, Rate: {} batches/s of {}, Devices: {}",
        args.server_url, args.rate, args.batch_size, args.devices
    );

    if args.rate == 0 || args.devices == 0 {
        error!("Rate and device count must be positive");
        std::process::exit(1);
    }

    let client = reqwest::Client::new();
    let run_id = uuid::Uuid::new_v4().simple().to_string();
    let device_ids: Vec<String> = (0..args.devices)
        .map(|i| format!("sim-{}-dev-{}", &run_id[..8], i))
        .collect();

    let mut rng = rand::thread_rng();
    let mut batches = 0u64;
    let mut readings_sent = 0u64;
    let batch_interval = Duration::from_millis(1000 / args.rate).max(Duration::from_millis(1));

    loop {
        let batch_start = std::time::Instant::now();
        let device_id = &device_ids[(batches % args.devices as u64) as usize];
        let request = generate_batch(&mut rng, args.batch_size);

        let url = format!("{}/devices/{}/insert", args.server_url, device_id);
        match client.post(&url).json(&request).send().await {
            Ok(response) if response.status().is_success() => {
                readings_sent += request.readings.len() as u64;
            }
            Ok(response) => {
                warn!("Insert for {} rejected: {}", device_id, response.status());
            }
            Err(e) => {
                warn!("Failed to post batch: {}", e);
            }
        }
        batches += 1;

        if args.query_every > 0 && batches % args.query_every == 0 {
            query_recent(&client, &args.server_url, device_id).await;
            info!("Sent {} batches, {} readings", batches, readings_sent);
        }

        let elapsed = batch_start.elapsed();
        if elapsed < batch_interval {
            tokio::time::sleep(batch_interval - elapsed).await;
        } else if elapsed > batch_interval * 2 {
            warn!(
                "Batch took {:?}, target was {:?} - server may be overloaded",
                elapsed, batch_interval
            );
        }
    }
}

async fn query_recent(client: &reqwest::Client, server_url: &str, device_id: &str) {
    let url = format!("{}/devices/{}/recent", server_url, device_id);
    let response = match client.get(&url).send().await {
        Ok(response) => response,
        Err(e) => {
            warn!("Recent query failed: {}", e);
            return;
        }
    };

    if !response.status().is_success() {
        warn!("Recent query for {} returned {}", device_id, response.status());
        return;
    }

    match response.json::<RecentResponse>().await {
        Ok(body) => info!("Device {} has {} recent readings", device_id, body.readings.len()),
        Err(e) => error!("Failed to decode recent response: {}", e),
    }
}

fn generate_batch(rng: &mut impl Rng, size: usize) -> InsertRequest {
    let now = Utc::now().timestamp();
    let readings = (0..size)
        .filter_map(|_| {
            // Stamp slightly in the past so the reading lands inside the window.
            let timestamp = now - rng.gen_range(1..300);
            match serde_json::to_string(&generate_measurement(&mut *rng)) {
                Ok(blob) => Some(ReadingInput { timestamp, blob }),
                Err(e) => {
                    error!("Failed to serialize measurement: {}", e);
                    None
                }
            }
        })
        .collect();

    InsertRequest { readings }
}

fn generate_measurement(rng: &mut impl Rng) -> Measurement {
    let temperature = if rng.gen_bool(0.05) {
        rng.gen_range(-50.0..100.0) // 5% outliers
    } else {
        rng.gen_range(15.0..35.0)
    };

    let humidity = if rng.gen_bool(0.05) {
        rng.gen_range(0.0..100.0) // 5% outliers
    } else {
        rng.gen_range(30.0..80.0)
    };

    let battery = if rng.gen_bool(0.02) {
        rng.gen_range(0.0..20.0) // 2% low battery
    } else {
        rng.gen_range(20.0..100.0)
    };

    Measurement {
        temperature,
        humidity,
        battery,
    }
}
