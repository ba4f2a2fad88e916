use thiserror::Error;

use crate::random::RandomSource;
use crate::types::{ResultItem, WorkItem};

/// Reason carried by every injected processing failure.
pub const FAILURE_REASON: &str = "random processing error";

/// Exclusive upper bound of the success multiplier.
pub const MULTIPLIER_BOUND: u32 = 10;

#[derive(Debug, Error, PartialEq)]
pub enum InjectorError {
    #[error("failure probability must be within [0, 1] (got {0})")]
    ProbabilityOutOfRange(f64),
}

/// Pure transformation applied by the processor to each work item.
///
/// A uniform draw below `probability` yields [`ResultItem::Failure`]; otherwise a
/// multiplier in `[0, 10)` is drawn and the item value is scaled by it. The
/// multiplier is only drawn on the success branch.
#[derive(Debug, Clone, Copy)]
pub struct FailureInjector {
    probability: f64,
}

impl FailureInjector {
    pub fn new(probability: f64) -> Result<Self, InjectorError> {
        if !(0.0..=1.0).contains(&probability) {
            return Err(InjectorError::ProbabilityOutOfRange(probability));
        }
        Ok(Self { probability })
    }

    pub fn probability(&self) -> f64 {
        self.probability
    }

    pub fn apply(&self, item: WorkItem, rng: &mut dyn RandomSource) -> ResultItem {
        if rng.unit() < self.probability {
            return ResultItem::Failure {
                seq: item.seq,
                reason: FAILURE_REASON.to_string(),
            };
        }

        let multiplier = rng.below(MULTIPLIER_BOUND);
        ResultItem::Success {
            seq: item.seq,
            value: item.value * multiplier,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::{ScriptedRandom, SeededRandom};

    fn item(seq: u64, value: u32) -> WorkItem {
        WorkItem { seq, value }
    }

    #[test]
    fn rejects_probability_outside_unit_interval() {
        assert_eq!(
            FailureInjector::new(-0.1).unwrap_err(),
            InjectorError::ProbabilityOutOfRange(-0.1)
        );
        assert!(FailureInjector::new(1.01).is_err());
        assert!(FailureInjector::new(f64::NAN).is_err());
        assert!(FailureInjector::new(0.0).is_ok());
        assert!(FailureInjector::new(1.0).is_ok());
    }

    #[test]
    fn scripted_draws_produce_expected_outcomes() {
        let injector = FailureInjector::new(0.1).expect("injector");
        let mut rng = ScriptedRandom::new()
            .with_failures([false, false, true, false, false])
            .int_fallback(3);

        let outcomes: Vec<ResultItem> = [12, 40, 7, 99, 0]
            .into_iter()
            .enumerate()
            .map(|(seq, value)| injector.apply(item(seq as u64, value), &mut rng))
            .collect();

        assert_eq!(
            outcomes,
            vec![
                ResultItem::Success { seq: 0, value: 36 },
                ResultItem::Success { seq: 1, value: 120 },
                ResultItem::Failure {
                    seq: 2,
                    reason: FAILURE_REASON.to_string()
                },
                ResultItem::Success { seq: 3, value: 297 },
                ResultItem::Success { seq: 4, value: 0 },
            ]
        );
    }

    #[test]
    fn failure_branch_does_not_consume_a_multiplier() {
        let injector = FailureInjector::new(0.5).expect("injector");
        let mut rng = ScriptedRandom::new()
            .with_failures([true, false])
            .with_ints([4]);

        assert!(!injector.apply(item(0, 10), &mut rng).is_success());
        assert_eq!(
            injector.apply(item(1, 10), &mut rng),
            ResultItem::Success { seq: 1, value: 40 }
        );
    }

    #[test]
    fn probability_bounds_are_absolute() {
        let never = FailureInjector::new(0.0).expect("injector");
        let always = FailureInjector::new(1.0).expect("injector");
        let mut rng = SeededRandom::new(11);

        for seq in 0..1_000 {
            assert!(never.apply(item(seq, 50), &mut rng).is_success());
            assert!(!always.apply(item(seq, 50), &mut rng).is_success());
        }
    }

    #[test]
    fn failure_rate_converges_to_probability() {
        let injector = FailureInjector::new(0.1).expect("injector");
        let mut rng = SeededRandom::new(0x5eed);

        let failures = (0..100_000u64)
            .map(|seq| injector.apply(item(seq, 42), &mut rng))
            .filter(|result| !result.is_success())
            .count();

        assert!(
            (8_000..=12_000).contains(&failures),
            "failure count {failures} outside tolerance band"
        );
    }
}
