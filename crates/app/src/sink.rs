use std::sync::Arc;

use metrics::counter;
use tracing::{debug, warn};

use workline_core::{ResultItem, StageKind, StageReport, Tally};

use crate::queue::{QueueReader, Received};
use crate::report::{ReportLine, Reporter};

/// Terminal stage: reports every result until the result queue is closed and drained.
pub struct Sink {
    reporter: Arc<dyn Reporter>,
    tally: Tally,
}

impl Sink {
    pub fn new(reporter: Arc<dyn Reporter>, tally: Tally) -> Self {
        Self { reporter, tally }
    }

    pub async fn run(mut self, mut input: QueueReader<ResultItem>) -> StageReport {
        let mut report = StageReport::new(StageKind::Sink);
        let mut expected_seq = 0u64;

        while let Received::Item(result) = input.receive().await {
            if result.seq() != expected_seq {
                warn!(
                    stage = "sink",
                    expected = expected_seq,
                    got = result.seq(),
                    "result arrived out of order"
                );
            }
            expected_seq = result.seq() + 1;

            self.reporter.report(&ReportLine::from(&result));
            if result.is_success() {
                report.successes += 1;
            } else {
                report.failures += 1;
            }
            report.handled += 1;
            self.tally.increment();
            counter!("pipeline_items_reported_total", "outcome" => result.outcome_str())
                .increment(1);
        }

        report.counted = self.tally.count();
        debug!(
            stage = "sink",
            queue = input.name(),
            reported = report.handled,
            "result queue drained"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use workline_core::{SharedCounter, FAILURE_REASON};

    use crate::queue::bounded;
    use crate::report::testing::MemoryReporter;

    #[tokio::test]
    async fn reports_every_result_and_counts_each_one() {
        let (mut tx, rx) = bounded("results", 4).expect("queue");
        tx.send(ResultItem::Success { seq: 0, value: 36 })
            .await
            .expect("send");
        tx.send(ResultItem::Failure {
            seq: 1,
            reason: FAILURE_REASON.to_string(),
        })
        .await
        .expect("send");
        tx.close().expect("close");

        let reporter = Arc::new(MemoryReporter::default());
        let counter = SharedCounter::new();
        let report = Sink::new(reporter.clone(), Tally::shared(counter.clone()))
            .run(rx)
            .await;

        assert_eq!(report.stage, StageKind::Sink);
        assert_eq!(report.handled, 2);
        assert_eq!(report.successes, 1);
        assert_eq!(report.failures, 1);
        assert_eq!(report.counted, 2);
        assert_eq!(counter.value(), 2);
        assert_eq!(
            reporter.rendered(),
            vec!["Result: 36", "Error: random processing error"]
        );
    }

    #[tokio::test]
    async fn terminates_on_closed_empty_queue() {
        let (mut tx, rx) = bounded::<ResultItem>("results", 1).expect("queue");
        tx.close().expect("close");

        let reporter = Arc::new(MemoryReporter::default());
        let report = Sink::new(reporter.clone(), Tally::local()).run(rx).await;

        assert_eq!(report.handled, 0);
        assert_eq!(report.counted, 0);
        assert!(reporter.lines().is_empty());
    }
}
