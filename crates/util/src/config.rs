use std::{fmt, str::FromStr, time::Duration};

use super::{
    env_value, DEFAULT_FAILURE_PROBABILITY, DEFAULT_GENERATOR_MAX_DELAY_MS, DEFAULT_ITEM_COUNT,
    DEFAULT_PROCESSOR_MAX_DELAY_MS, DEFAULT_QUEUE_CAPACITY,
};

/// Application runtime environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
    Test,
}

impl Environment {
    fn from_str(value: &str) -> Result<Self, ConfigError> {
        match value {
            "development" | "dev" => Ok(Self::Development),
            "production" | "prod" => Ok(Self::Production),
            "test" => Ok(Self::Test),
            other => Err(ConfigError::InvalidEnvironment(other.to_string())),
        }
    }

    /// Returns the canonical name used for logging labels.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
            Self::Test => "test",
        }
    }
}

/// How the run-wide item counter is maintained across the three stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterMode {
    /// Each stage keeps a local tally; the coordinator sums them after the join.
    Tally,
    /// Stages also increment one shared atomic cell.
    Atomic,
}

impl CounterMode {
    fn from_str(value: &str) -> Result<Self, ConfigError> {
        match value {
            "tally" => Ok(Self::Tally),
            "atomic" => Ok(Self::Atomic),
            other => Err(ConfigError::InvalidCounterMode(other.to_string())),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Tally => "tally",
            Self::Atomic => "atomic",
        }
    }
}

/// Rendering used for report lines written to stdout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Text,
    Json,
}

impl ReportFormat {
    fn from_str(value: &str) -> Result<Self, ConfigError> {
        match value {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::InvalidReportFormat(other.to_string())),
        }
    }
}

/// Pipeline run parameters resolved from environment variables.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub environment: Environment,
    pub item_count: u64,
    pub queue_capacity: usize,
    pub generator_max_delay: Duration,
    pub processor_max_delay: Duration,
    pub failure_probability: f64,
    /// `None` means the caller seeds from the wall clock.
    pub seed: Option<u64>,
    pub counter_mode: CounterMode,
    pub report_format: ReportFormat,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            environment: Environment::Development,
            item_count: DEFAULT_ITEM_COUNT,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            generator_max_delay: Duration::from_millis(DEFAULT_GENERATOR_MAX_DELAY_MS),
            processor_max_delay: Duration::from_millis(DEFAULT_PROCESSOR_MAX_DELAY_MS),
            failure_probability: DEFAULT_FAILURE_PROBABILITY,
            seed: None,
            counter_mode: CounterMode::Tally,
            report_format: ReportFormat::Text,
        }
    }
}

impl PipelineConfig {
    /// Constructs the configuration by reading and validating environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let environment = match env_value("APP_ENV") {
            Some(value) => Environment::from_str(&value)?,
            None => defaults.environment,
        };
        let item_count = parse_var("PIPELINE_ITEM_COUNT")?.unwrap_or(defaults.item_count);
        let queue_capacity =
            parse_var("PIPELINE_QUEUE_CAPACITY")?.unwrap_or(defaults.queue_capacity);
        let generator_max_delay = parse_var::<u64>("PIPELINE_GENERATOR_MAX_DELAY_MS")?
            .map(Duration::from_millis)
            .unwrap_or(defaults.generator_max_delay);
        let processor_max_delay = parse_var::<u64>("PIPELINE_PROCESSOR_MAX_DELAY_MS")?
            .map(Duration::from_millis)
            .unwrap_or(defaults.processor_max_delay);
        let failure_probability =
            parse_var("PIPELINE_FAILURE_PROBABILITY")?.unwrap_or(defaults.failure_probability);
        let seed = parse_var("PIPELINE_SEED")?;
        let counter_mode = match env_value("PIPELINE_COUNTER_MODE") {
            Some(value) => CounterMode::from_str(&value)?,
            None => defaults.counter_mode,
        };
        let report_format = match env_value("PIPELINE_REPORT_FORMAT") {
            Some(value) => ReportFormat::from_str(&value)?,
            None => defaults.report_format,
        };

        let config = Self {
            environment,
            item_count,
            queue_capacity,
            generator_max_delay,
            processor_max_delay,
            failure_probability,
            seed,
            counter_mode,
            report_format,
        };
        config.validate()?;
        Ok(config)
    }

    /// Checks the invariants the pipeline relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.queue_capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        if !(0.0..=1.0).contains(&self.failure_probability) {
            return Err(ConfigError::ProbabilityOutOfRange(self.failure_probability));
        }
        Ok(())
    }
}

fn parse_var<T: FromStr>(key: &'static str) -> Result<Option<T>, ConfigError> {
    match env_value(key) {
        Some(value) => value
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue { key, value }),
        None => Ok(None),
    }
}

/// Errors that can occur during configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    InvalidEnvironment(String),
    InvalidValue { key: &'static str, value: String },
    ZeroCapacity,
    ProbabilityOutOfRange(f64),
    InvalidCounterMode(String),
    InvalidReportFormat(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidEnvironment(value) => write!(
                f,
                "APP_ENV must be one of 'development', 'production', or 'test' (got {value})"
            ),
            Self::InvalidValue { key, value } => write!(f, "invalid {key} value: {value}"),
            Self::ZeroCapacity => write!(f, "PIPELINE_QUEUE_CAPACITY must be at least 1"),
            Self::ProbabilityOutOfRange(value) => write!(
                f,
                "PIPELINE_FAILURE_PROBABILITY must be within [0, 1] (got {value})"
            ),
            Self::InvalidCounterMode(value) => write!(
                f,
                "PIPELINE_COUNTER_MODE must be 'tally' or 'atomic' (got {value})"
            ),
            Self::InvalidReportFormat(value) => write!(
                f,
                "PIPELINE_REPORT_FORMAT must be 'text' or 'json' (got {value})"
            ),
        }
    }
}

impl std::error::Error for ConfigError {}
