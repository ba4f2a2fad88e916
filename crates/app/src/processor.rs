use std::{sync::Arc, time::Duration};

use metrics::{counter, histogram};
use tokio::time::Instant;
use tracing::{debug, trace};

use workline_core::{FailureInjector, RandomSource, ResultItem, StageKind, StageReport, Tally, WorkItem};

use crate::latency::Latency;
use crate::queue::{QueueError, QueueReader, QueueWriter, Received};

/// Transform stage: turns each work item into exactly one result.
///
/// Items are handled one at a time, so results leave in the order work
/// arrived. Only successful transformations are counted; failures pass
/// through to the sink uncounted here.
pub struct Processor {
    injector: FailureInjector,
    max_delay: Duration,
    rng: Box<dyn RandomSource>,
    latency: Arc<dyn Latency>,
    tally: Tally,
}

impl Processor {
    pub fn new(
        injector: FailureInjector,
        max_delay: Duration,
        rng: Box<dyn RandomSource>,
        latency: Arc<dyn Latency>,
        tally: Tally,
    ) -> Self {
        Self {
            injector,
            max_delay,
            rng,
            latency,
            tally,
        }
    }

    pub async fn run(
        mut self,
        mut input: QueueReader<WorkItem>,
        mut output: QueueWriter<ResultItem>,
    ) -> Result<StageReport, QueueError> {
        let mut report = StageReport::new(StageKind::Processor);

        while let Received::Item(item) = input.receive().await {
            report.handled += 1;
            let started = Instant::now();

            let delay = self.rng.delay_up_to(self.max_delay);
            self.latency.pause(delay).await;
            let result = self.injector.apply(item, self.rng.as_mut());

            counter!("pipeline_results_total", "outcome" => result.outcome_str()).increment(1);
            histogram!("pipeline_processing_seconds").record(started.elapsed().as_secs_f64());
            trace!(stage = "processor", seq = item.seq, outcome = result.outcome_str(), "work item processed");

            let success = result.is_success();
            output.send(result).await?;
            if success {
                report.successes += 1;
                self.tally.increment();
            } else {
                report.failures += 1;
            }
        }

        debug!(
            stage = "processor",
            input = input.name(),
            output = output.name(),
            processed = report.handled,
            failures = report.failures,
            "input drained; closing result queue"
        );
        output.close()?;
        report.counted = self.tally.count();
        Ok(report)
    }
}
