use std::{
    io,
    sync::{Mutex, OnceLock, PoisonError},
};

use metrics::{describe_counter, describe_gauge, describe_histogram};
use metrics_exporter_prometheus::{
    BuildError as PrometheusBuildError, PrometheusBuilder, PrometheusHandle,
};
use thiserror::Error;
use tracing_subscriber::{
    fmt::{self as tracing_fmt, time::UtcTime},
    layer::SubscriberExt,
    util::{SubscriberInitExt, TryInitError},
    EnvFilter, Layer,
};

use workline_util::{Environment, PipelineConfig};

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("failed to initialize tracing: {0}")]
    Tracing(#[from] TryInitError),
    #[error("failed to initialize prometheus recorder: {0}")]
    Metrics(#[from] PrometheusBuildError),
}

static TRACING_INIT: OnceLock<()> = OnceLock::new();
static METRICS_HANDLE: Mutex<Option<PrometheusHandle>> = Mutex::new(None);

const BUILD_VERSION: &str = env!("CARGO_PKG_VERSION");

fn build_git_sha() -> &'static str {
    option_env!("GIT_SHA").unwrap_or("unknown")
}

/// Installs the global subscriber: pretty output outside production, JSON in production.
///
/// Everything is written to stderr; stdout is reserved for report lines.
pub fn init_tracing(config: &PipelineConfig) -> Result<(), TelemetryError> {
    if TRACING_INIT.get().is_some() {
        return Ok(());
    }

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let base = tracing_fmt::layer()
        .with_writer(io::stderr)
        .with_target(false)
        .with_level(true)
        .with_timer(UtcTime::rfc_3339());
    let fmt_layer = match config.environment {
        Environment::Production => base.json().boxed(),
        Environment::Development | Environment::Test => base.pretty().boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()?;

    TRACING_INIT.set(()).ok();
    tracing::info!(
        stage = "telemetry",
        env = %config.environment.as_str(),
        version = BUILD_VERSION,
        git_sha = build_git_sha(),
        "tracing initialized"
    );
    Ok(())
}

/// Installs the process-wide prometheus recorder once and returns its handle.
pub fn init_metrics() -> Result<PrometheusHandle, TelemetryError> {
    let mut slot = METRICS_HANDLE
        .lock()
        .unwrap_or_else(PoisonError::into_inner);
    if let Some(handle) = slot.as_ref() {
        return Ok(handle.clone());
    }

    let handle = PrometheusBuilder::new().install_recorder()?;
    describe_pipeline_metrics();
    *slot = Some(handle.clone());
    Ok(handle)
}

fn describe_pipeline_metrics() {
    describe_gauge!("app_build_info", "Build metadata for the running binary");
    describe_counter!(
        "pipeline_items_generated_total",
        "Count of work items emitted by the generator"
    );
    describe_counter!(
        "pipeline_results_total",
        "Count of results produced by the processor, labelled by outcome"
    );
    describe_histogram!(
        "pipeline_processing_seconds",
        "Time in seconds the processor spent on a single work item"
    );
    describe_counter!(
        "pipeline_items_reported_total",
        "Count of results reported by the sink, labelled by outcome"
    );
    describe_gauge!(
        "pipeline_shared_counter",
        "Run-wide item counter of the last completed run"
    );
}

/// Prometheus exposition of everything recorded so far, plus build metadata.
pub fn render_metrics(handle: &PrometheusHandle) -> String {
    let mut body = handle.render();
    if !body.is_empty() && !body.ends_with('\n') {
        body.push('\n');
    }
    body.push_str("# TYPE app_build_info gauge\n");
    body.push_str(&format!(
        "app_build_info{{version=\"{BUILD_VERSION}\",git=\"{}\"}} 1\n",
        build_git_sha()
    ));
    body
}
