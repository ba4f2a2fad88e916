pub mod config;

use std::env;

pub use config::{ConfigError, CounterMode, Environment, PipelineConfig, ReportFormat};

pub const DEFAULT_ITEM_COUNT: u64 = 50;
pub const DEFAULT_QUEUE_CAPACITY: usize = 10;
pub const DEFAULT_GENERATOR_MAX_DELAY_MS: u64 = 200;
pub const DEFAULT_PROCESSOR_MAX_DELAY_MS: u64 = 500;
pub const DEFAULT_FAILURE_PROBABILITY: f64 = 0.1;

/// Loads environment variables from `.env` when available.
///
/// Missing files are ignored so the function is safe in production builds
/// where dotenv files are not deployed.
pub fn load_env_file() {
    let _ = dotenvy::dotenv();
}

/// Returns the trimmed value of `key`, treating empty values as unset.
pub fn env_value(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
