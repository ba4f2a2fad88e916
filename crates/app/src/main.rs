mod coordinator;
mod generator;
mod latency;
mod processor;
mod queue;
mod report;
mod sink;
mod telemetry;

use std::sync::Arc;

use tracing::{debug, info};
use workline_util::{load_env_file, PipelineConfig};

use crate::coordinator::Coordinator;
use crate::latency::SleepLatency;
use crate::report::StdoutReporter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    load_env_file();
    let config = PipelineConfig::from_env()?;

    telemetry::init_tracing(&config)?;
    let metrics = telemetry::init_metrics()?;

    let reporter = Arc::new(StdoutReporter::new(config.report_format));
    let coordinator = Coordinator::new(config, Arc::new(SleepLatency), reporter);
    info!(stage = "app", seed = coordinator.seed(), "pipeline configured");

    coordinator.run().await?;

    debug!(stage = "app", metrics = %telemetry::render_metrics(&metrics), "final metrics snapshot");
    Ok(())
}
