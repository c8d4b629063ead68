/// Monitor configuration.
///
/// Built-in defaults, optionally overridden by a TOML file, optionally
/// overridden again by environment variables (which may come from `.env`).

use serde::Deserialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::logging::LogLevel;

pub const DEFAULT_SOURCE_URL: &str = "https://evcs.vn/tram-sac-vinfast-cong-ty-tnhh-ha-tang-tram-sac-xanh-45-doan-khue-p-hoa-cuong-da-nang-c.dna0204.html";
pub const DEFAULT_LOG_DIR: &str = "./logs";
pub const DEFAULT_CONFIG_PATH: &str = "./evcs_monitor.toml";

pub const STATE_FILE_NAME: &str = "prev_data.json";
pub const TABULAR_LOG_FILE_NAME: &str = "evcs_log.csv";
pub const TEXT_LOG_FILE_NAME: &str = "evcs_log.txt";

pub const ENV_CONFIG_PATH: &str = "EVCS_MONITOR_CONFIG";
pub const ENV_SOURCE_URL: &str = "EVCS_SOURCE_URL";
pub const ENV_POLL_INTERVAL: &str = "EVCS_POLL_INTERVAL_SECS";
pub const ENV_LOG_DIR: &str = "EVCS_LOG_DIR";

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    Read { path: String, message: String },
    Parse { path: String, message: String },
    Invalid(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Read { path, message } => {
                write!(f, "Cannot read config {}: {}", path, message)
            }
            ConfigError::Parse { path, message } => {
                write!(f, "Invalid config {}: {}", path, message)
            }
            ConfigError::Invalid(msg) => write!(f, "Invalid configuration: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

// ---------------------------------------------------------------------------
// Resolved configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct LoggingConfig {
    pub level: LogLevel,
    /// Service log file; console only when `None`.
    pub file: Option<PathBuf>,
    pub console_timestamps: bool,
}

/// Everything one monitor needs, passed in at construction time.
#[derive(Debug, Clone, PartialEq)]
pub struct MonitorConfig {
    pub source_url: String,
    pub request_timeout: Duration,
    pub state_path: PathBuf,
    pub tabular_log_path: PathBuf,
    pub text_log_path: PathBuf,
    pub poll_interval: Duration,
    pub log: LoggingConfig,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self::in_log_dir(DEFAULT_LOG_DIR)
    }
}

impl MonitorConfig {
    /// Defaults with all three data files placed in `dir`.
    pub fn in_log_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            source_url: DEFAULT_SOURCE_URL.to_string(),
            request_timeout: Duration::from_secs(15),
            state_path: dir.join(STATE_FILE_NAME),
            tabular_log_path: dir.join(TABULAR_LOG_FILE_NAME),
            text_log_path: dir.join(TEXT_LOG_FILE_NAME),
            poll_interval: Duration::from_secs(60),
            log: LoggingConfig {
                level: LogLevel::Info,
                file: None,
                console_timestamps: false,
            },
        }
    }

    /// Resolve the configuration from the process environment.
    ///
    /// The TOML file named by `EVCS_MONITOR_CONFIG` must exist; the default
    /// `./evcs_monitor.toml` is optional.
    pub fn load() -> Result<Self, ConfigError> {
        let env = |key: &str| std::env::var(key).ok();
        let (path, required) = match env(ENV_CONFIG_PATH) {
            Some(p) => (PathBuf::from(p), true),
            None => (PathBuf::from(DEFAULT_CONFIG_PATH), false),
        };

        let file = match fs::read_to_string(&path) {
            Ok(text) => Some(parse_file(&text, &path)?),
            Err(e) if !required && e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => {
                return Err(ConfigError::Read {
                    path: path.display().to_string(),
                    message: e.to_string(),
                });
            }
        };

        Self::resolve(file, env)
    }

    /// Layer a parsed file and an environment lookup over the defaults.
    pub fn resolve(
        file: Option<FileConfig>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(file) = file {
            config.apply_file(file);
        }

        // Environment wins over the file.
        if let Some(dir) = env(ENV_LOG_DIR) {
            let dir = PathBuf::from(dir);
            config.state_path = dir.join(STATE_FILE_NAME);
            config.tabular_log_path = dir.join(TABULAR_LOG_FILE_NAME);
            config.text_log_path = dir.join(TEXT_LOG_FILE_NAME);
        }
        if let Some(url) = env(ENV_SOURCE_URL) {
            config.source_url = url;
        }
        if let Some(secs) = env(ENV_POLL_INTERVAL) {
            let secs: u64 = secs.trim().parse().map_err(|_| {
                ConfigError::Invalid(format!(
                    "{} must be a whole number of seconds, got '{}'",
                    ENV_POLL_INTERVAL, secs
                ))
            })?;
            config.poll_interval = Duration::from_secs(secs);
        }

        config.validate()?;
        Ok(config)
    }

    fn apply_file(&mut self, file: FileConfig) {
        if let Some(url) = file.source.url {
            self.source_url = url;
        }
        if let Some(secs) = file.source.timeout_secs {
            self.request_timeout = Duration::from_secs(secs);
        }
        if let Some(p) = file.storage.state_path {
            self.state_path = p;
        }
        if let Some(p) = file.storage.tabular_log_path {
            self.tabular_log_path = p;
        }
        if let Some(p) = file.storage.text_log_path {
            self.text_log_path = p;
        }
        if let Some(secs) = file.schedule.poll_interval_secs {
            self.poll_interval = Duration::from_secs(secs);
        }
        if let Some(level) = file.logging.level {
            self.log.level = level;
        }
        if file.logging.file.is_some() {
            self.log.file = file.logging.file;
        }
        if let Some(ts) = file.logging.console_timestamps {
            self.log.console_timestamps = ts;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = self.source_url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::Invalid(format!(
                "source url must be http(s), got '{}'",
                self.source_url
            )));
        }
        if self.request_timeout.is_zero() {
            return Err(ConfigError::Invalid("timeout_secs must be > 0".to_string()));
        }
        if self.poll_interval.is_zero() {
            return Err(ConfigError::Invalid(
                "poll_interval_secs must be > 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Create the parent folders of every data file.
    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        let paths = [
            Some(&self.state_path),
            Some(&self.tabular_log_path),
            Some(&self.text_log_path),
            self.log.file.as_ref(),
        ];
        for path in paths.into_iter().flatten() {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    fs::create_dir_all(parent)?;
                }
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// File format
// ---------------------------------------------------------------------------

/// `evcs_monitor.toml` as written on disk. Every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub source: SourceSection,
    pub storage: StorageSection,
    pub schedule: ScheduleSection,
    pub logging: LoggingSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SourceSection {
    pub url: Option<String>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageSection {
    pub state_path: Option<PathBuf>,
    pub tabular_log_path: Option<PathBuf>,
    pub text_log_path: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScheduleSection {
    pub poll_interval_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingSection {
    pub level: Option<LogLevel>,
    pub file: Option<PathBuf>,
    pub console_timestamps: Option<bool>,
}

pub fn parse_file(text: &str, path: &Path) -> Result<FileConfig, ConfigError> {
    toml::from_str(text).map_err(|e| ConfigError::Parse {
        path: path.display().to_string(),
        message: e.to_string(),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
