use std::{
    sync::Arc,
    time::{SystemTime, UNIX_EPOCH},
};

use metrics::gauge;
use thiserror::Error;
use tokio::task::JoinError;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use workline_core::{
    tally_total, FailureInjector, InjectorError, RandomSource, RunSummary, SeededRandom,
    SharedCounter, StageKind, StageReport, Tally,
};
use workline_util::{CounterMode, PipelineConfig};

use crate::generator::Generator;
use crate::latency::Latency;
use crate::processor::Processor;
use crate::queue::{self, QueueError};
use crate::report::{ReportLine, Reporter};
use crate::sink::Sink;

pub const WORK_QUEUE: &str = "work";
pub const RESULT_QUEUE: &str = "results";

/// Randomness overrides for the two stages that draw.
pub struct StageSources {
    pub generator: Box<dyn RandomSource>,
    pub processor: Box<dyn RandomSource>,
}

/// Starts the three stages, waits for all of them, then reports the run total.
pub struct Coordinator {
    config: PipelineConfig,
    seed: u64,
    latency: Arc<dyn Latency>,
    reporter: Arc<dyn Reporter>,
    sources: Option<StageSources>,
}

impl Coordinator {
    /// Uses `config.seed`, falling back to a wall-clock seed.
    pub fn new(
        config: PipelineConfig,
        latency: Arc<dyn Latency>,
        reporter: Arc<dyn Reporter>,
    ) -> Self {
        let seed = config.seed.unwrap_or_else(wall_clock_seed);
        Self {
            config,
            seed,
            latency,
            reporter,
            sources: None,
        }
    }

    /// Replaces the seeded per-stage sources with caller supplied ones.
    #[cfg(test)]
    pub fn with_sources(mut self, sources: StageSources) -> Self {
        self.sources = Some(sources);
        self
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub async fn run(self) -> Result<RunSummary, PipelineError> {
        let run_id = Uuid::new_v4();
        let span = info_span!("pipeline_run", %run_id, seed = self.seed);
        self.run_inner().instrument(span).await
    }

    async fn run_inner(self) -> Result<RunSummary, PipelineError> {
        let Self {
            config,
            seed,
            latency,
            reporter,
            sources,
        } = self;

        let injector = FailureInjector::new(config.failure_probability)?;
        let (work_tx, work_rx) = queue::bounded(WORK_QUEUE, config.queue_capacity)?;
        let (result_tx, result_rx) = queue::bounded(RESULT_QUEUE, config.queue_capacity)?;

        let shared = match config.counter_mode {
            CounterMode::Tally => None,
            CounterMode::Atomic => Some(SharedCounter::new()),
        };
        let new_tally = || shared.clone().map(Tally::shared).unwrap_or_default();

        let StageSources {
            generator: generator_rng,
            processor: processor_rng,
        } = sources.unwrap_or_else(|| StageSources {
            generator: Box::new(SeededRandom::for_stage(seed, StageKind::Generator)),
            processor: Box::new(SeededRandom::for_stage(seed, StageKind::Processor)),
        });

        info!(
            stage = "coordinator",
            items = config.item_count,
            capacity = config.queue_capacity,
            failure_probability = injector.probability(),
            counter_mode = config.counter_mode.as_str(),
            "starting pipeline"
        );

        let generator = Generator::new(
            config.item_count,
            config.generator_max_delay,
            generator_rng,
            latency.clone(),
            new_tally(),
        );
        let processor = Processor::new(
            injector,
            config.processor_max_delay,
            processor_rng,
            latency,
            new_tally(),
        );
        let sink = Sink::new(reporter.clone(), new_tally());

        let generator = tokio::spawn(generator.run(work_tx).in_current_span());
        let processor = tokio::spawn(processor.run(work_rx, result_tx).in_current_span());
        let sink = tokio::spawn(sink.run(result_rx).in_current_span());

        // Completion barrier: every stage is awaited even when an earlier one failed.
        let (generator, processor, sink) = tokio::join!(generator, processor, sink);

        let generator = stage_result(StageKind::Generator, generator)?;
        let processor = stage_result(StageKind::Processor, processor)?;
        let sink = sink.map_err(|source| PipelineError::Panicked {
            stage: StageKind::Sink,
            source,
        })?;

        let counter = resolve_counter(shared.as_ref(), [&generator, &processor, &sink]);
        gauge!("pipeline_shared_counter").set(counter as f64);

        reporter.report(&ReportLine::Finished);
        reporter.report(&ReportLine::Counter(counter));

        let summary = RunSummary::from_reports(&generator, &processor, &sink, counter);
        info!(
            stage = "coordinator",
            generated = summary.generated,
            succeeded = summary.succeeded,
            failed = summary.failed,
            reported = summary.reported,
            counter = summary.counter,
            "pipeline finished"
        );
        Ok(summary)
    }
}

fn stage_result(
    stage: StageKind,
    joined: Result<Result<StageReport, QueueError>, JoinError>,
) -> Result<StageReport, PipelineError> {
    match joined {
        Ok(Ok(report)) => Ok(report),
        Ok(Err(source)) => Err(PipelineError::Protocol { stage, source }),
        Err(source) => Err(PipelineError::Panicked { stage, source }),
    }
}

fn resolve_counter<'a>(
    shared: Option<&SharedCounter>,
    reports: impl IntoIterator<Item = &'a StageReport>,
) -> u64 {
    let tallied = tally_total(reports);
    match shared {
        Some(cell) => {
            let value = cell.value();
            if value != tallied {
                warn!(
                    stage = "coordinator",
                    shared = value,
                    tallied,
                    "shared counter diverged from stage tallies"
                );
            }
            value
        }
        None => tallied,
    }
}

fn wall_clock_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_nanos() as u64)
        .unwrap_or_default()
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid failure injector settings: {0}")]
    Injector(#[from] InjectorError),
    #[error("failed to build queue: {0}")]
    Queue(#[from] QueueError),
    #[error("{stage} stage violated the queue protocol: {source}")]
    Protocol {
        stage: StageKind,
        #[source]
        source: QueueError,
    },
    #[error("{stage} stage panicked")]
    Panicked {
        stage: StageKind,
        #[source]
        source: JoinError,
    },
}
