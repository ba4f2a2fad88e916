//! Domain layer for the work pipeline.
//!
//! Everything here is runtime-agnostic: item types, injectable randomness,
//! the processor's failure injection and the counter bookkeeping shared by
//! the stages. The async plumbing lives in the app crate.

pub mod injector;
pub mod random;
pub mod tally;
pub mod types;

pub use injector::{FailureInjector, InjectorError, FAILURE_REASON, MULTIPLIER_BOUND};
pub use random::{RandomSource, ScriptedRandom, SeededRandom};
pub use tally::{tally_total, RunSummary, SharedCounter, StageReport, Tally};
pub use types::{ResultItem, StageKind, WorkItem, WORK_VALUE_BOUND};
