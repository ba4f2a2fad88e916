use std::{
    fmt,
    io::{self, Write},
    sync::Arc,
};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::warn;

use workline_core::ResultItem;
use workline_util::ReportFormat;

/// One observable output line of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportLine {
    Success { seq: u64, value: u32 },
    Failure { seq: u64, reason: String },
    Finished,
    Counter(u64),
}

impl ReportLine {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Success { .. } => "result",
            Self::Failure { .. } => "error",
            Self::Finished => "finished",
            Self::Counter(_) => "counter",
        }
    }
}

impl From<&ResultItem> for ReportLine {
    fn from(result: &ResultItem) -> Self {
        match result {
            ResultItem::Success { seq, value } => Self::Success {
                seq: *seq,
                value: *value,
            },
            ResultItem::Failure { seq, reason } => Self::Failure {
                seq: *seq,
                reason: reason.clone(),
            },
        }
    }
}

impl fmt::Display for ReportLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success { value, .. } => write!(f, "Result: {value}"),
            Self::Failure { reason, .. } => write!(f, "Error: {reason}"),
            Self::Finished => f.write_str("Program finished."),
            Self::Counter(value) => write!(f, "Shared Counter: {value}"),
        }
    }
}

#[derive(Debug, Serialize)]
struct ReportRecord<'a> {
    ts: DateTime<Utc>,
    kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    seq: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    value: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    counter: Option<u64>,
}

impl<'a> ReportRecord<'a> {
    fn new(line: &'a ReportLine, ts: DateTime<Utc>) -> Self {
        let mut record = Self {
            ts,
            kind: line.kind(),
            seq: None,
            value: None,
            reason: None,
            counter: None,
        };
        match line {
            ReportLine::Success { seq, value } => {
                record.seq = Some(*seq);
                record.value = Some(*value);
            }
            ReportLine::Failure { seq, reason } => {
                record.seq = Some(*seq);
                record.reason = Some(reason.as_str());
            }
            ReportLine::Finished => {}
            ReportLine::Counter(value) => record.counter = Some(*value),
        }
        record
    }
}

/// Destination for report lines emitted by the sink and the coordinator.
pub trait Reporter: Send + Sync {
    fn report(&self, line: &ReportLine);
}

/// Writes report lines to stdout in the configured format.
#[derive(Clone)]
pub struct StdoutReporter {
    format: ReportFormat,
    clock: Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>,
}

impl StdoutReporter {
    pub fn new(format: ReportFormat) -> Self {
        Self {
            format,
            clock: Arc::new(Utc::now),
        }
    }

    #[cfg(test)]
    pub fn with_clock(mut self, clock: Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>) -> Self {
        self.clock = clock;
        self
    }

    pub fn render(&self, line: &ReportLine) -> Result<String, serde_json::Error> {
        match self.format {
            ReportFormat::Text => Ok(line.to_string()),
            ReportFormat::Json => serde_json::to_string(&ReportRecord::new(line, (self.clock)())),
        }
    }
}

impl Reporter for StdoutReporter {
    fn report(&self, line: &ReportLine) {
        let rendered = match self.render(line) {
            Ok(rendered) => rendered,
            Err(err) => {
                warn!(stage = "report", error = %err, "failed to render report line");
                return;
            }
        };
        if let Err(err) = writeln!(io::stdout().lock(), "{rendered}") {
            warn!(stage = "report", error = %err, "failed to write report line");
        }
    }
}
