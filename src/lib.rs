//! Shioaji-to-Kafka market-data bridge: resilience supervisor library.
//!
//! Maintains a live vendor quote subscription for a single futures
//! instrument and republishes every tick onto a durable Kafka log, tracking
//! the trading-session schedule and recovering from disconnects and silent
//! link failures.

pub mod cli;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod kafka;
pub mod monotonic;
pub mod probe;
pub mod schedule;
pub mod supervisor;
pub mod tick;
pub mod upstream;

use anyhow::Result;

/// Application result type for consistent error handling.
pub type AppResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Initialize the tracing subscriber. `level` is the fallback filter
/// directive used when `RUST_LOG` is unset.
pub fn init_logging(level: &str) -> Result<()> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("shioaji_kafka_bridge={level}").into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    Ok(())
}
