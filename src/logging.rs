/// Structured logging for the shift statistics service
///
/// Thin layer over `tracing` that tags every event with the data source it
/// concerns and an optional context (date range, file path), and classifies
/// upstream fetch failures so that an empty window is not reported like a
/// rejected key. The pipeline stages themselves never log; callers around
/// them (session, CLI) do.

use std::fmt;
use std::path::Path;

use tracing_subscriber::EnvFilter;

use crate::model::{DateRange, FetchFailure, ScheduleError};

// ---------------------------------------------------------------------------
// Log Levels
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

impl LogLevel {
    fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warning => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warning),
            "error" => Ok(LogLevel::Error),
            other => Err(format!("unknown log level {:?}", other)),
        }
    }
}

// ---------------------------------------------------------------------------
// Data Source Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataSource {
    ShiftAdmin,
    Reference,
    Pipeline,
    System,
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataSource::ShiftAdmin => write!(f, "SHIFTADMIN"),
            DataSource::Reference => write!(f, "REF"),
            DataSource::Pipeline => write!(f, "PIPELINE"),
            DataSource::System => write!(f, "SYS"),
        }
    }
}

// ---------------------------------------------------------------------------
// Failure Classification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureType {
    /// Expected failure - the window simply has no scheduled shifts
    Expected,
    /// Unexpected failure - transport, HTTP, or payload problem
    Unexpected,
    /// Unknown - the API refused the request without saying why
    Unknown,
}

impl fmt::Display for FailureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureType::Expected => write!(f, "EXPECTED"),
            FailureType::Unexpected => write!(f, "UNEXPECTED"),
            FailureType::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

/// Classify an upstream fetch failure.
pub fn classify_fetch_failure(failure: &FetchFailure) -> FailureType {
    match failure {
        FetchFailure::EmptyShiftList => FailureType::Expected,
        // A non-success status covers both a bad key and other refusals.
        FetchFailure::StatusNotSuccess(_) => FailureType::Unknown,
        FetchFailure::Transport(_)
        | FetchFailure::HttpStatus(_)
        | FetchFailure::MalformedPayload(_) => FailureType::Unexpected,
    }
}

// ---------------------------------------------------------------------------
// Subscriber setup
// ---------------------------------------------------------------------------

/// Install the global subscriber. `RUST_LOG` takes precedence over
/// `min_level` when set. Calling this more than once is harmless.
pub fn init_logger(min_level: LogLevel, json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(min_level.as_filter()));

    let result = if json {
        tracing_subscriber::fmt().json().with_env_filter(filter).try_init()
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).try_init()
    };

    if result.is_err() {
        tracing::debug!("logger already initialized");
    }
}

// ---------------------------------------------------------------------------
// Public Logging Functions
// ---------------------------------------------------------------------------

/// Log a general informational message
pub fn info(source: DataSource, context: Option<&str>, message: &str) {
    tracing::info!(source = %source, context = context.unwrap_or("-"), "{}", message);
}

/// Log a warning message
pub fn warn(source: DataSource, context: Option<&str>, message: &str) {
    tracing::warn!(source = %source, context = context.unwrap_or("-"), "{}", message);
}

/// Log an error message
pub fn error(source: DataSource, context: Option<&str>, message: &str) {
    tracing::error!(source = %source, context = context.unwrap_or("-"), "{}", message);
}

/// Log a debug message
pub fn debug(source: DataSource, context: Option<&str>, message: &str) {
    tracing::debug!(source = %source, context = context.unwrap_or("-"), "{}", message);
}

// ---------------------------------------------------------------------------
// Structured Failure Logging
// ---------------------------------------------------------------------------

/// Log a failed schedule load at the level its cause deserves.
pub fn log_schedule_failure(range: &DateRange, err: &ScheduleError) {
    let context = range.to_string();
    match err {
        ScheduleError::InvalidRange { .. } => {
            debug(DataSource::Pipeline, Some(&context), &err.to_string());
        }
        ScheduleError::UpstreamFetch { failure, raw_response } => {
            let failure_type = classify_fetch_failure(failure);
            let message = format!("fetch failed [{}]: {}", failure_type, failure);
            match failure_type {
                FailureType::Expected => debug(DataSource::ShiftAdmin, Some(&context), &message),
                FailureType::Unexpected => error(DataSource::ShiftAdmin, Some(&context), &message),
                FailureType::Unknown => warn(DataSource::ShiftAdmin, Some(&context), &message),
            }
            tracing::debug!(source = %DataSource::ShiftAdmin, raw_response = %raw_response, "raw response");
        }
        ScheduleError::MalformedRecord { .. } => {
            error(DataSource::ShiftAdmin, Some(&context), &err.to_string());
        }
    }
}

/// Log a reference file that failed to load.
pub fn log_reference_failure(path: &Path, err: &dyn std::error::Error) {
    error(DataSource::Reference, Some(&path.display().to_string()), &err.to_string());
}

// ---------------------------------------------------------------------------
// Load Summary Logging
// ---------------------------------------------------------------------------

/// Log how many loaded shifts matched the roster.
pub fn log_load_summary(range: &DateRange, total: usize, matched: usize, unmatched: usize) {
    let message = format!(
        "Schedule loaded: {} shifts, {} on roster, {} off-service",
        total,
        matched,
        unmatched
    );
    let context = range.to_string();

    if total > 0 && matched == 0 {
        warn(DataSource::Pipeline, Some(&context), &message);
    } else {
        info(DataSource::Pipeline, Some(&context), &message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_ordering() {
        assert!(LogLevel::Debug < LogLevel::Info);
        assert!(LogLevel::Info < LogLevel::Warning);
        assert!(LogLevel::Warning < LogLevel::Error);
    }

    #[test]
    fn test_log_level_parsing() {
        assert_eq!("WARN".parse::<LogLevel>(), Ok(LogLevel::Warning));
        assert_eq!("debug".parse::<LogLevel>(), Ok(LogLevel::Debug));
        assert!("loud".parse::<LogLevel>().is_err());
    }

    #[test]
    fn test_failure_classification() {
        assert_eq!(classify_fetch_failure(&FetchFailure::EmptyShiftList), FailureType::Expected);
        assert_eq!(
            classify_fetch_failure(&FetchFailure::StatusNotSuccess("error".to_string())),
            FailureType::Unknown
        );
        assert_eq!(classify_fetch_failure(&FetchFailure::HttpStatus(500)), FailureType::Unexpected);
        assert_eq!(
            classify_fetch_failure(&FetchFailure::MalformedPayload("eof".to_string())),
            FailureType::Unexpected
        );
    }

    #[test]
    fn test_init_logger_twice_does_not_panic() {
        init_logger(LogLevel::Info, false);
        init_logger(LogLevel::Debug, true);
    }
}
