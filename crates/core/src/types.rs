use std::fmt;

use serde::{Deserialize, Serialize};

/// Exclusive upper bound for generated work values.
pub const WORK_VALUE_BOUND: u32 = 100;

/// Synthetic unit of work emitted by the generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkItem {
    /// Zero-based position in generation order.
    pub seq: u64,
    pub value: u32,
}

/// Outcome of processing exactly one [`WorkItem`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ResultItem {
    Success { seq: u64, value: u32 },
    Failure { seq: u64, reason: String },
}

impl ResultItem {
    /// Sequence number of the work item this result was produced from.
    pub fn seq(&self) -> u64 {
        match self {
            Self::Success { seq, .. } | Self::Failure { seq, .. } => *seq,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Canonical label used for metrics and logs.
    pub fn outcome_str(&self) -> &'static str {
        match self {
            Self::Success { .. } => "success",
            Self::Failure { .. } => "failure",
        }
    }
}

/// The three concurrently scheduled lanes of a pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageKind {
    Generator,
    Processor,
    Sink,
}

impl StageKind {
    pub const ALL: [StageKind; 3] = [StageKind::Generator, StageKind::Processor, StageKind::Sink];

    pub fn as_str(self) -> &'static str {
        match self {
            StageKind::Generator => "generator",
            StageKind::Processor => "processor",
            StageKind::Sink => "sink",
        }
    }

    /// Stable per-stage salt mixed into the run seed so each lane draws from its own stream.
    pub fn seed_salt(self) -> u64 {
        match self {
            StageKind::Generator => 0x9e37_79b9_7f4a_7c15,
            StageKind::Processor => 0xbf58_476d_1ce4_e5b9,
            StageKind::Sink => 0x94d0_49bb_1331_11eb,
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
