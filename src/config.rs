use std::net::SocketAddr;
use std::time::Duration;

use chrono_tz::Tz;
use clap::Parser;

use crate::clock::parse_timezone;
use crate::storage::RedisSettings;

/// Runtime configuration. Each flag may also be given through the environment;
/// the Redis variables keep the names deployments already set.
#[derive(Debug, Clone, Parser)]
#[command(name = "sensorpulse")]
#[command(about = "Sensor reading ingestion and query service")]
pub struct Config {
    #[arg(long, env = "SENSORPULSE_BIND", default_value = "0.0.0.0:5000")]
    pub bind: SocketAddr,

    #[arg(long, env = "REDIS_HOST", default_value = "127.0.0.1")]
    pub redis_host: String,

    #[arg(long, env = "REDIS_PORT", default_value_t = 6379)]
    pub redis_port: u16,

    #[arg(long, env = "REDIS_PASSWORD")]
    pub redis_password: Option<String>,

    #[arg(long, env = "REDIS_DB", default_value_t = 0)]
    pub redis_db: i64,

    /// IANA zone stored timestamps are read in, e.g. `Europe/Paris`.
    #[arg(long, env = "SENSORPULSE_TIMEZONE", default_value = "Europe/Paris", value_parser = parse_timezone)]
    pub timezone: Tz,

    /// Upper bound on all store calls made by one request.
    #[arg(long, env = "SENSORPULSE_STORE_TIMEOUT_MS", default_value_t = 2500)]
    pub store_timeout_ms: u64,

    /// Reject malformed timestamps at ingest instead of skipping them at query time.
    #[arg(long, env = "SENSORPULSE_STRICT_TIMESTAMPS")]
    pub strict_timestamps: bool,
}

impl Config {
    pub fn redis(&self) -> RedisSettings {
        RedisSettings {
            host: self.redis_host.clone(),
            port: self.redis_port,
            password: self.redis_password.clone().filter(|p| !p.is_empty()),
            db: self.redis_db,
        }
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }
}
