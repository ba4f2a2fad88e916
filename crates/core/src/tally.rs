use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use serde::Serialize;

use crate::types::StageKind;

/// Run-wide counter cell shared by every stage.
#[derive(Debug, Clone, Default)]
pub struct SharedCounter {
    cell: Arc<AtomicU64>,
}

impl SharedCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment(&self) {
        // Relaxed is enough: the value is only read after every writer has been joined.
        self.cell.fetch_add(1, Ordering::Relaxed);
    }

    pub fn value(&self) -> u64 {
        self.cell.load(Ordering::Acquire)
    }
}

/// Per-stage counter owned exclusively by one lane.
///
/// The local count is always kept so the coordinator can sum tallies after the
/// join; when constructed with [`Tally::shared`] every increment is mirrored
/// into the shared cell as well.
#[derive(Debug, Default)]
pub struct Tally {
    local: u64,
    shared: Option<SharedCounter>,
}

impl Tally {
    pub fn local() -> Self {
        Self::default()
    }

    pub fn shared(counter: SharedCounter) -> Self {
        Self {
            local: 0,
            shared: Some(counter),
        }
    }

    pub fn increment(&mut self) {
        self.local += 1;
        if let Some(shared) = &self.shared {
            shared.increment();
        }
    }

    pub fn count(&self) -> u64 {
        self.local
    }
}

/// What a stage hands back to the coordinator once it has terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StageReport {
    pub stage: StageKind,
    /// Items received (processor, sink) or emitted (generator).
    pub handled: u64,
    pub successes: u64,
    pub failures: u64,
    /// Counter increments made by this stage.
    pub counted: u64,
}

impl StageReport {
    pub fn new(stage: StageKind) -> Self {
        Self {
            stage,
            handled: 0,
            successes: 0,
            failures: 0,
            counted: 0,
        }
    }
}

/// Final accounting of a completed run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub generated: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub reported: u64,
    pub counter: u64,
}

impl RunSummary {
    /// Combines the three stage reports with the resolved counter value.
    pub fn from_reports(
        generator: &StageReport,
        processor: &StageReport,
        sink: &StageReport,
        counter: u64,
    ) -> Self {
        Self {
            generated: generator.handled,
            succeeded: processor.successes,
            failed: processor.failures,
            reported: sink.handled,
            counter,
        }
    }
}

/// Sum of the local tallies of all stage reports.
pub fn tally_total<'a>(reports: impl IntoIterator<Item = &'a StageReport>) -> u64 {
    reports.into_iter().map(|report| report.counted).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn local_tally_does_not_touch_shared_state() {
        let mut tally = Tally::local();
        tally.increment();
        tally.increment();
        assert_eq!(tally.count(), 2);
    }

    #[test]
    fn shared_tally_mirrors_increments() {
        let counter = SharedCounter::new();
        let mut first = Tally::shared(counter.clone());
        let mut second = Tally::shared(counter.clone());

        first.increment();
        second.increment();
        second.increment();

        assert_eq!(first.count(), 1);
        assert_eq!(second.count(), 2);
        assert_eq!(counter.value(), 3);
    }

    #[test]
    fn concurrent_increments_are_not_lost() {
        let counter = SharedCounter::new();
        let handles: Vec<_> = (0..3)
            .map(|_| {
                let counter = counter.clone();
                thread::spawn(move || {
                    let mut tally = Tally::shared(counter);
                    for _ in 0..10_000 {
                        tally.increment();
                    }
                    tally.count()
                })
            })
            .collect();

        let locals: u64 = handles
            .into_iter()
            .map(|handle| handle.join().expect("worker thread"))
            .sum();

        assert_eq!(locals, 30_000);
        assert_eq!(counter.value(), 30_000);
    }

    #[test]
    fn summary_and_total_combine_reports() {
        let generator = StageReport {
            handled: 5,
            counted: 5,
            ..StageReport::new(StageKind::Generator)
        };
        let processor = StageReport {
            handled: 5,
            successes: 4,
            failures: 1,
            counted: 4,
            ..StageReport::new(StageKind::Processor)
        };
        let sink = StageReport {
            handled: 5,
            successes: 4,
            failures: 1,
            counted: 5,
            ..StageReport::new(StageKind::Sink)
        };

        let total = tally_total([&generator, &processor, &sink]);
        assert_eq!(total, 14);

        let summary = RunSummary::from_reports(&generator, &processor, &sink, total);
        assert_eq!(
            summary,
            RunSummary {
                generated: 5,
                succeeded: 4,
                failed: 1,
                reported: 5,
                counter: 14,
            }
        );
    }
}
