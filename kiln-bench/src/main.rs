//! Load test for the default adapter: concurrent counter updates plus bulk
//! write/read/delete rounds, verified at the end.

use kiln::domain::AdapterConfig;
use kiln::expiry::Expiry;
use kiln::planes::control::AdapterRegistry;
use kiln::planes::data::{CacheOperations, CacheService, FilterChain, TracingFilter};
use rand::Rng;
use serde_json::json;
use shared::Entries;
use shared::config::Config;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use storage_engine::UnifiedAdapterFactory;
use tokio::task::JoinSet;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const WORKERS: usize = 32;
const OPS_PER_WORKER: usize = 1_000;
const BATCH_SIZE: usize = 16;
const COUNTER_KEY: &str = "bench:counter";

#[derive(Debug)]
struct LoadTestStats {
    total_ops: u64,
    failed: u64,
    duration_ms: u64,
    expected_counter: i64,
    final_counter: Option<i64>,
}

impl LoadTestStats {
    fn print_summary(&self) {
        println!("\n=== Load Test Results ===");
        println!(
            "Duration:          {} ms ({:.2} seconds)",
            self.duration_ms,
            self.duration_ms as f64 / 1000.0
        );
        println!("Total operations:  {}", self.total_ops);
        println!("Failed:            {}", self.failed);

        let seconds = (self.duration_ms.max(1)) as f64 / 1000.0;
        println!(
            "Throughput:        {} ops/sec",
            (self.total_ops as f64 / seconds) as u64
        );
        println!("Expected counter:  {}", self.expected_counter);
        println!("Final counter:     {:?}", self.final_counter);
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    match dotenvy::dotenv() {
        Ok(_) => info!("Loaded environment variables from .env file"),
        Err(_) => info!("No .env file found, using system environment variables"),
    }

    let config = Config::from_env();
    let adapter_config = AdapterConfig::from_config(&config)?;
    let adapter_name = adapter_config.name.clone();
    info!(
        "Benchmarking adapter '{}' ({}) with {} workers x {} ops",
        adapter_name,
        config.backend.as_str(),
        WORKERS,
        OPS_PER_WORKER
    );

    let registry =
        AdapterRegistry::from_configs(Arc::new(UnifiedAdapterFactory), [adapter_config]).await?;
    let service = Arc::new(
        CacheService::new(registry).with_filters(FilterChain::new().with(TracingFilter)),
    );

    service.clear(&adapter_name).await?;
    let mut seed = Entries::new();
    seed.insert(COUNTER_KEY.to_string(), json!(0));
    service.write(&adapter_name, seed, Some(Expiry::Never)).await?;

    // ThreadRng is not Send, so every worker's steps are drawn up front.
    let mut rng = rand::rng();
    let plans: Vec<Vec<i64>> = (0..WORKERS)
        .map(|_| {
            (0..OPS_PER_WORKER)
                .map(|_| rng.random_range(1..=5))
                .collect()
        })
        .collect();
    let expected_counter: i64 = plans.iter().flatten().sum();

    let total_ops = Arc::new(AtomicU64::new(0));
    let failed = Arc::new(AtomicU64::new(0));
    let start = Instant::now();

    let mut tasks = JoinSet::new();
    for (worker_id, steps) in plans.into_iter().enumerate() {
        let service = service.clone();
        let adapter_name = adapter_name.clone();
        let total_ops = total_ops.clone();
        let failed = failed.clone();

        tasks.spawn(async move {
            for (i, step) in steps.into_iter().enumerate() {
                match service.increment(&adapter_name, COUNTER_KEY, step).await {
                    Ok(Some(_)) => {}
                    _ => {
                        failed.fetch_add(1, Ordering::Relaxed);
                    }
                }
                total_ops.fetch_add(1, Ordering::Relaxed);

                if i % BATCH_SIZE == 0 {
                    let batch: Entries = (0..BATCH_SIZE)
                        .map(|n| (format!("bench:{}:{}:{}", worker_id, i, n), json!(n)))
                        .collect();
                    let keys: Vec<String> = batch.keys().cloned().collect();

                    let round = async {
                        let written = service
                            .write(&adapter_name, batch, Some(Expiry::Ttl(60)))
                            .await?;
                        let read = service.read(&adapter_name, keys.clone()).await?;
                        let deleted = service.delete(&adapter_name, keys).await?;
                        Ok::<bool, shared::Error>(
                            written && read.len() == BATCH_SIZE && deleted,
                        )
                    };
                    match round.await {
                        Ok(true) => {}
                        Ok(false) => {
                            failed.fetch_add(1, Ordering::Relaxed);
                        }
                        Err(e) => {
                            error!("Batch round failed: {}", e);
                            failed.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                    total_ops.fetch_add(3, Ordering::Relaxed);
                }
            }
        });
    }

    while let Some(joined) = tasks.join_next().await {
        joined?;
    }
    let duration = start.elapsed();

    let final_counter = service
        .read(&adapter_name, vec![COUNTER_KEY.to_string()])
        .await?
        .get(COUNTER_KEY)
        .and_then(|value| value.as_i64());

    let stats = LoadTestStats {
        total_ops: total_ops.load(Ordering::Relaxed),
        failed: failed.load(Ordering::Relaxed),
        duration_ms: duration.as_millis() as u64,
        expected_counter,
        final_counter,
    };
    stats.print_summary();

    if stats.final_counter != Some(stats.expected_counter) {
        error!("Counter mismatch: lost updates detected");
        std::process::exit(1);
    }
    Ok(())
}
