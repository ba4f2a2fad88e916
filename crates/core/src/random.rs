use std::{collections::VecDeque, time::Duration};

use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::types::StageKind;

/// Source of the random draws a stage makes.
///
/// Stages receive their own boxed source so runs are reproducible from a
/// seed and tests can script exact draw sequences.
pub trait RandomSource: Send {
    /// Uniform integer in `[0, bound)`. `bound` is non-zero.
    fn below(&mut self, bound: u32) -> u32;

    /// Uniform sample in `[0, 1)`.
    fn unit(&mut self) -> f64;

    /// Uniform whole-millisecond delay in `[0, max)`; zero without drawing when `max` is
    /// shorter than a millisecond.
    fn delay_up_to(&mut self, max: Duration) -> Duration {
        let millis = u32::try_from(max.as_millis()).unwrap_or(u32::MAX);
        if millis == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(u64::from(self.below(millis)))
    }
}

/// [`RandomSource`] backed by a seeded [`StdRng`].
#[derive(Debug, Clone)]
pub struct SeededRandom {
    rng: StdRng,
}

impl SeededRandom {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Derives an independent stream for `stage` from the run seed.
    pub fn for_stage(seed: u64, stage: StageKind) -> Self {
        Self::new(seed ^ stage.seed_salt())
    }
}

impl RandomSource for SeededRandom {
    fn below(&mut self, bound: u32) -> u32 {
        self.rng.gen_range(0..bound)
    }

    fn unit(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }
}

/// Deterministic [`RandomSource`] replaying scripted draws.
///
/// Once a script is exhausted the matching fallback is returned forever.
/// Integer draws are clamped below their bound.
#[derive(Debug, Clone, Default)]
pub struct ScriptedRandom {
    ints: VecDeque<u32>,
    units: VecDeque<f64>,
    int_fallback: u32,
    unit_fallback: f64,
}

impl ScriptedRandom {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ints(mut self, ints: impl IntoIterator<Item = u32>) -> Self {
        self.ints.extend(ints);
        self
    }

    pub fn with_units(mut self, units: impl IntoIterator<Item = f64>) -> Self {
        self.units.extend(units);
        self
    }

    /// Scripts the processor's failure decisions: `true` draws `0.0`, `false` draws just below one.
    pub fn with_failures(self, failures: impl IntoIterator<Item = bool>) -> Self {
        self.with_units(
            failures
                .into_iter()
                .map(|fail| if fail { 0.0 } else { NEVER_FAILS }),
        )
    }

    pub fn int_fallback(mut self, value: u32) -> Self {
        self.int_fallback = value;
        self
    }

    pub fn unit_fallback(mut self, value: f64) -> Self {
        self.unit_fallback = value;
        self
    }
}

const NEVER_FAILS: f64 = 1.0 - f64::EPSILON;

impl RandomSource for ScriptedRandom {
    fn below(&mut self, bound: u32) -> u32 {
        let value = self.ints.pop_front().unwrap_or(self.int_fallback);
        value.min(bound.saturating_sub(1))
    }

    fn unit(&mut self) -> f64 {
        self.units.pop_front().unwrap_or(self.unit_fallback)
    }
}
