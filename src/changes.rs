/// Change detection and the append-only change logs.
///
/// A tier is logged when it is present in the current snapshot and either
/// absent from the previous one or different from it. Tiers that vanish
/// from the page are never reported. Every entry goes to every sink
/// before the next tier is looked at.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;

use crate::model::{LogEntry, StationSnapshot, StorageError, Tier, TierReading};

/// Header row of the tabular log.
pub const TABULAR_HEADER: [&str; 5] = [
    "Time",
    "Tier",
    "Free Ports",
    "Total Ports",
    "Vehicles Charging",
];

// ---------------------------------------------------------------------------
// Change detection
// ---------------------------------------------------------------------------

/// A tier whose reading is new or differs from the persisted one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TierChange {
    pub tier: Tier,
    pub previous: Option<TierReading>,
    pub current: TierReading,
}

/// Tiers of `current` that must be logged, in page order.
///
/// With no history every present tier counts as changed.
pub fn diff(current: &StationSnapshot, previous: Option<&StationSnapshot>) -> Vec<TierChange> {
    current
        .iter()
        .filter_map(|(tier, reading)| {
            let old = previous.and_then(|p| p.get(tier)).copied();
            (old != Some(*reading)).then_some(TierChange {
                tier,
                previous: old,
                current: *reading,
            })
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Sinks
// ---------------------------------------------------------------------------

/// An append-only destination for change records.
pub trait LogSink {
    fn append(&mut self, entry: &LogEntry) -> Result<(), StorageError>;
}

fn ensure_parent(path: &Path) -> std::io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent),
        _ => Ok(()),
    }
}

fn write_error(path: &Path, e: impl std::fmt::Display) -> StorageError {
    StorageError::Write {
        path: path.display().to_string(),
        message: e.to_string(),
    }
}

/// Spreadsheet-style log: one CSV sheet, header row first, one row per entry.
pub struct TabularLog {
    path: PathBuf,
}

impl TabularLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn row(entry: &LogEntry) -> [String; 5] {
        [
            entry.timestamp_text(),
            entry.tier.label().to_string(),
            entry.reading.free().to_string(),
            entry.reading.total().to_string(),
            entry.reading.charging().to_string(),
        ]
    }
}

impl LogSink for TabularLog {
    fn append(&mut self, entry: &LogEntry) -> Result<(), StorageError> {
        ensure_parent(&self.path).map_err(|e| write_error(&self.path, e))?;

        let needs_header = fs::metadata(&self.path)
            .map(|m| m.len() == 0)
            .unwrap_or(true);

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| write_error(&self.path, e))?;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);

        if needs_header {
            writer
                .write_record(TABULAR_HEADER)
                .map_err(|e| write_error(&self.path, e))?;
        }
        writer
            .write_record(Self::row(entry))
            .map_err(|e| write_error(&self.path, e))?;
        writer.flush().map_err(|e| write_error(&self.path, e))?;

        Ok(())
    }
}

/// Human-readable log: one line per entry.
pub struct TextLog {
    path: PathBuf,
}

impl TextLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn line(entry: &LogEntry) -> String {
        format!(
            "[{}] {}: Free {}/{} | Charging {}",
            entry.timestamp_text(),
            entry.tier,
            entry.reading.free(),
            entry.reading.total(),
            entry.reading.charging()
        )
    }
}

impl LogSink for TextLog {
    fn append(&mut self, entry: &LogEntry) -> Result<(), StorageError> {
        ensure_parent(&self.path).map_err(|e| write_error(&self.path, e))?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| write_error(&self.path, e))?;
        writeln!(file, "{}", Self::line(entry)).map_err(|e| write_error(&self.path, e))?;

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Logger
// ---------------------------------------------------------------------------

/// Writes change entries to every configured sink.
pub struct ChangeLogger {
    sinks: Vec<Box<dyn LogSink>>,
}

impl ChangeLogger {
    pub fn new(sinks: Vec<Box<dyn LogSink>>) -> Self {
        Self { sinks }
    }

    /// The standard pair of sinks: CSV sheet and text file.
    pub fn with_files(tabular_path: impl Into<PathBuf>, text_path: impl Into<PathBuf>) -> Self {
        Self::new(vec![
            Box::new(TabularLog::new(tabular_path)),
            Box::new(TextLog::new(text_path)),
        ])
    }

    /// Record each change, stopping at the first sink failure.
    pub fn record(
        &mut self,
        timestamp: NaiveDateTime,
        changes: &[TierChange],
    ) -> Result<Vec<LogEntry>, StorageError> {
        let mut written = Vec::with_capacity(changes.len());
        for change in changes {
            let entry = LogEntry {
                timestamp,
                tier: change.tier,
                reading: change.current,
            };
            for sink in self.sinks.iter_mut() {
                sink.append(&entry)?;
            }
            written.push(entry);
        }
        Ok(written)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
