use std::{sync::Arc, time::Duration};

use metrics::counter;
use tracing::{debug, trace};

use workline_core::{RandomSource, StageKind, StageReport, Tally, WorkItem, WORK_VALUE_BOUND};

use crate::latency::Latency;
use crate::queue::{QueueError, QueueWriter};

/// Source stage: emits a fixed number of work items, then closes the work queue.
pub struct Generator {
    item_count: u64,
    max_delay: Duration,
    rng: Box<dyn RandomSource>,
    latency: Arc<dyn Latency>,
    tally: Tally,
}

impl Generator {
    pub fn new(
        item_count: u64,
        max_delay: Duration,
        rng: Box<dyn RandomSource>,
        latency: Arc<dyn Latency>,
        tally: Tally,
    ) -> Self {
        Self {
            item_count,
            max_delay,
            rng,
            latency,
            tally,
        }
    }

    pub async fn run(mut self, mut output: QueueWriter<WorkItem>) -> Result<StageReport, QueueError> {
        let mut report = StageReport::new(StageKind::Generator);

        for seq in 0..self.item_count {
            let delay = self.rng.delay_up_to(self.max_delay);
            self.latency.pause(delay).await;

            let item = WorkItem {
                seq,
                value: self.rng.below(WORK_VALUE_BOUND),
            };
            output.send(item).await?;
            self.tally.increment();
            report.handled += 1;
            counter!("pipeline_items_generated_total").increment(1);
            trace!(stage = "generator", seq, value = item.value, delay_ms = delay.as_millis() as u64, "work item sent");
        }

        output.close()?;
        report.counted = self.tally.count();
        debug!(
            stage = "generator",
            queue = output.name(),
            generated = report.handled,
            "work queue closed"
        );
        Ok(report)
    }
}
