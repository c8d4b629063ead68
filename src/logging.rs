/// Structured logging for the charging station monitor
///
/// Provides context-rich logging with component and tier identifiers,
/// timestamps, and severity levels. Supports both console output
/// and file-based logging for daemon operations.

use chrono::Utc;
use serde::Deserialize;
use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::model::{CycleError, NetworkError, StorageError};

// ---------------------------------------------------------------------------
// Log Levels
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    #[serde(alias = "warning")]
    Warn,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Debug => write!(f, "DEBUG"),
            LogLevel::Info => write!(f, "INFO"),
            LogLevel::Warn => write!(f, "WARN"),
            LogLevel::Error => write!(f, "ERROR"),
        }
    }
}

// ---------------------------------------------------------------------------
// Components
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Component {
    Fetch,
    Parse,
    Store,
    Change,
    System,
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Component::Fetch => write!(f, "FETCH"),
            Component::Parse => write!(f, "PARSE"),
            Component::Store => write!(f, "STORE"),
            Component::Change => write!(f, "CHANGE"),
            Component::System => write!(f, "SYS"),
        }
    }
}

// ---------------------------------------------------------------------------
// Failure Classification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureType {
    /// Expected failure - the public page is briefly unreachable
    Expected,
    /// Unexpected failure - page moved, blocked us, or local storage is broken
    Unexpected,
    /// Unknown - cannot determine if this is expected or not
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

// ---------------------------------------------------------------------------
// Logger Configuration
// ---------------------------------------------------------------------------

/// Global logger instance
static LOGGER: Mutex<Option<Logger>> = Mutex::new(None);

pub struct Logger {
    /// Minimum log level to display
    min_level: LogLevel,
    /// Optional file path for logging
    log_file: Option<PathBuf>,
    /// Whether to include timestamps in console output
    console_timestamps: bool,
}

impl Logger {
    fn format_entry(
        level: LogLevel,
        component: Component,
        tier: Option<&str>,
        message: &str,
    ) -> String {
        let timestamp = Utc::now().format("%Y-%m-%d %H:%M:%S UTC");
        let tier_part = tier.map(|t| format!(" [{}]", t)).unwrap_or_default();
        format!(
            "{} {} {}{}: {}",
            timestamp, level, component, tier_part, message
        )
    }

    fn log(&self, level: LogLevel, component: Component, tier: Option<&str>, message: &str) {
        if level < self.min_level {
            return;
        }

        let log_entry = Self::format_entry(level, component, tier, message);
        let tier_part = tier.map(|t| format!(" [{}]", t)).unwrap_or_default();

        // Console output
        if self.console_timestamps {
            match level {
                LogLevel::Error | LogLevel::Warn => eprintln!("{}", log_entry),
                LogLevel::Info | LogLevel::Debug => println!("{}", log_entry),
            }
        } else {
            match level {
                LogLevel::Error => eprintln!("❌ {}{}: {}", component, tier_part, message),
                LogLevel::Warn => eprintln!("⚠ {}{}: {}", component, tier_part, message),
                LogLevel::Info => println!("{}", message),
                LogLevel::Debug => println!("   [DEBUG] {}", message),
            }
        }

        // File output
        if let Some(ref path) = self.log_file {
            if let Err(e) = Self::append_to_file(path, &log_entry) {
                eprintln!("Failed to write to log file {}: {}", path.display(), e);
            }
        }
    }

    fn append_to_file(path: &Path, entry: &str) -> std::io::Result<()> {
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        writeln!(file, "{}", entry)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Public Logging Functions
// ---------------------------------------------------------------------------

/// Initialize the global logger. Calling it again replaces the settings.
pub fn init_logger(min_level: LogLevel, log_file: Option<&Path>, console_timestamps: bool) {
    let logger = Logger {
        min_level,
        log_file: log_file.map(Path::to_path_buf),
        console_timestamps,
    };
    if let Ok(mut slot) = LOGGER.lock() {
        *slot = Some(logger);
    }
}

fn emit(level: LogLevel, component: Component, tier: Option<&str>, message: &str) {
    if let Ok(guard) = LOGGER.lock() {
        if let Some(logger) = guard.as_ref() {
            logger.log(level, component, tier, message);
        }
    }
}

/// Log a general informational message
pub fn info(component: Component, tier: Option<&str>, message: &str) {
    emit(LogLevel::Info, component, tier, message);
}

/// Log a warning message
pub fn warn(component: Component, tier: Option<&str>, message: &str) {
    emit(LogLevel::Warn, component, tier, message);
}

/// Log an error message
pub fn error(component: Component, tier: Option<&str>, message: &str) {
    emit(LogLevel::Error, component, tier, message);
}

/// Log a debug message
pub fn debug(component: Component, tier: Option<&str>, message: &str) {
    emit(LogLevel::Debug, component, tier, message);
}

// ---------------------------------------------------------------------------
// Failure Classification Helpers
// ---------------------------------------------------------------------------

/// Classify a fetch failure of the station page.
pub fn classify_fetch_failure(err: &NetworkError) -> FailureType {
    match err {
        // The page host is a small public site; short outages are routine.
        NetworkError::Timeout(_) | NetworkError::Connect(_) => FailureType::Expected,
        NetworkError::HttpStatus(code) if *code >= 500 => FailureType::Unknown,
        // 4xx means the URL moved or we are being refused.
        NetworkError::HttpStatus(_) => FailureType::Unexpected,
        NetworkError::Body(_) => FailureType::Unexpected,
        NetworkError::Request(_) => FailureType::Unknown,
    }
}

/// Storage failures are always local problems that need attention.
pub fn classify_storage_failure(_err: &StorageError) -> FailureType {
    FailureType::Unexpected
}

// ---------------------------------------------------------------------------
// Structured Failure Logging
// ---------------------------------------------------------------------------

/// Log a failed cycle with automatic classification
pub fn log_cycle_failure(err: &CycleError) {
    let (component, failure_type, detail) = match err {
        CycleError::Network(e) => (Component::Fetch, classify_fetch_failure(e), e.to_string()),
        CycleError::Storage(e) => (Component::Store, classify_storage_failure(e), e.to_string()),
    };

    let message = format!("Cycle aborted [{}]: {}", failure_type, detail);

    match failure_type {
        FailureType::Expected | FailureType::Unknown => warn(component, None, &message),
        FailureType::Unexpected => error(component, None, &message),
    }
}

// ---------------------------------------------------------------------------
// Cycle Summary Logging
// ---------------------------------------------------------------------------

/// Log how many tiers were parsed out of the page this cycle.
///
/// A page with no recognizable tier at all usually means the markup
/// changed, so that case is a warning rather than a quiet info line.
pub fn log_parse_summary(parsed: usize, expected: usize) {
    let message = format!("Parsed {}/{} tiers from page", parsed, expected);

    if parsed == expected {
        debug(Component::Parse, None, &message);
    } else if parsed == 0 {
        warn(Component::Parse, None, &message);
    } else {
        info(Component::Parse, None, &message);
    }
}
