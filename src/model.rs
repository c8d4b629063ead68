/// Tier, TierReading, StationSnapshot, LogEntry
/// core data structures and error handling
///
/// Core data types for the charging station monitor.
///
/// This module defines the shared domain model imported by all other modules.
/// It performs no I/O. Besides the types it only carries their on-disk
/// (serde) shape and the error taxonomy used by the polling cycle.

use chrono::NaiveDateTime;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// Timestamp format shared by both change log sinks and the console.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

// ---------------------------------------------------------------------------
// Tiers
// ---------------------------------------------------------------------------

/// A charging-power category offered by the station.
///
/// Declaration order is the order tiers appear on the page and in every
/// persisted or logged output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Tier {
    Kw150,
    Kw120,
    Kw60,
    Kw3_5,
}

impl Tier {
    pub const ALL: [Tier; 4] = [Tier::Kw150, Tier::Kw120, Tier::Kw60, Tier::Kw3_5];

    /// Label used on the page, in the state file and in the logs.
    pub fn label(self) -> &'static str {
        match self {
            Tier::Kw150 => "150kW",
            Tier::Kw120 => "120kW",
            Tier::Kw60 => "60kW",
            Tier::Kw3_5 => "3.5kW",
        }
    }

    pub fn from_label(label: &str) -> Option<Tier> {
        Tier::ALL.into_iter().find(|t| t.label() == label)
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// Reading types
// ---------------------------------------------------------------------------

/// Port status of one tier at one point in time.
///
/// Only `free` and `total` are held; `charging` is always derived. The
/// constructor enforces `free <= total`, so `charging` cannot underflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "StoredReading", try_from = "StoredReading")]
pub struct TierReading {
    free: u32,
    total: u32,
}

impl TierReading {
    pub fn new(free: u32, total: u32) -> Result<Self, InvalidReading> {
        if free > total {
            return Err(InvalidReading { free, total });
        }
        Ok(Self { free, total })
    }

    pub fn free(&self) -> u32 {
        self.free
    }

    pub fn total(&self) -> u32 {
        self.total
    }

    /// Ports currently occupied by a vehicle.
    pub fn charging(&self) -> u32 {
        self.total - self.free
    }
}

impl fmt::Display for TierReading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "free {}/{}, charging {}",
            self.free,
            self.total,
            self.charging()
        )
    }
}

/// On-disk shape of a reading. The stored `charging` value is written for
/// readers of the file but ignored on load.
#[derive(Serialize, Deserialize)]
struct StoredReading {
    free: u32,
    total: u32,
    #[serde(default)]
    charging: u32,
}

impl From<TierReading> for StoredReading {
    fn from(r: TierReading) -> Self {
        StoredReading {
            free: r.free,
            total: r.total,
            charging: r.charging(),
        }
    }
}

impl TryFrom<StoredReading> for TierReading {
    type Error = InvalidReading;

    fn try_from(stored: StoredReading) -> Result<Self, Self::Error> {
        TierReading::new(stored.free, stored.total)
    }
}

/// A reading whose free port count exceeds its total.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidReading {
    pub free: u32,
    pub total: u32,
}

impl fmt::Display for InvalidReading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "free ports ({}) exceed total ports ({})",
            self.free, self.total
        )
    }
}

impl std::error::Error for InvalidReading {}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// Every tier reading observed in one fetch.
///
/// Tiers whose pattern did not match are simply absent. On disk the
/// snapshot is a JSON object with one key per tier, absent tiers as `null`:
///
/// ```json
/// { "150kW": {"free": 2, "total": 4, "charging": 2}, "120kW": null, ... }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(try_from = "BTreeMap<String, serde_json::Value>")]
pub struct StationSnapshot {
    readings: BTreeMap<Tier, TierReading>,
}

impl StationSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, tier: Tier, reading: TierReading) {
        self.readings.insert(tier, reading);
    }

    pub fn get(&self, tier: Tier) -> Option<&TierReading> {
        self.readings.get(&tier)
    }

    /// Present tiers, in page order.
    pub fn iter(&self) -> impl Iterator<Item = (Tier, &TierReading)> {
        self.readings.iter().map(|(tier, reading)| (*tier, reading))
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }
}

impl FromIterator<(Tier, TierReading)> for StationSnapshot {
    fn from_iter<I: IntoIterator<Item = (Tier, TierReading)>>(iter: I) -> Self {
        Self {
            readings: iter.into_iter().collect(),
        }
    }
}

impl TryFrom<BTreeMap<String, serde_json::Value>> for StationSnapshot {
    type Error = String;

    /// Keys that are not tier labels are skipped whatever they hold; only a
    /// tier's own value has to be a valid reading (or `null`).
    fn try_from(raw: BTreeMap<String, serde_json::Value>) -> Result<Self, Self::Error> {
        let mut snapshot = StationSnapshot::new();
        for (label, value) in raw {
            let Some(tier) = Tier::from_label(&label) else {
                continue;
            };
            let reading: Option<TierReading> =
                serde_json::from_value(value).map_err(|e| format!("tier {}: {}", label, e))?;
            if let Some(reading) = reading {
                snapshot.insert(tier, reading);
            }
        }
        Ok(snapshot)
    }
}

impl Serialize for StationSnapshot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(Tier::ALL.len()))?;
        for tier in Tier::ALL {
            map.serialize_entry(tier.label(), &self.readings.get(&tier))?;
        }
        map.end()
    }
}

impl fmt::Display for StationSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, tier) in Tier::ALL.into_iter().enumerate() {
            if i > 0 {
                f.write_str(" | ")?;
            }
            match self.readings.get(&tier) {
                Some(r) => write!(f, "{}: {}", tier, r)?,
                None => write!(f, "{}: n/a", tier)?,
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Log entries
// ---------------------------------------------------------------------------

/// One append-only change record, written to every log sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub timestamp: NaiveDateTime,
    pub tier: Tier,
    pub reading: TierReading,
}

impl LogEntry {
    pub fn timestamp_text(&self) -> String {
        self.timestamp.format(TIMESTAMP_FORMAT).to_string()
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can arise when fetching the station page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetworkError {
    /// The request did not complete within the configured timeout.
    Timeout(String),
    /// The connection could not be established (DNS, refused, TLS).
    Connect(String),
    /// Any other transport-level failure.
    Request(String),
    /// Non-2xx HTTP response from the page host.
    HttpStatus(u16),
    /// The response body could not be read as text.
    Body(String),
}

impl fmt::Display for NetworkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetworkError::Timeout(msg) => write!(f, "Request timed out: {}", msg),
            NetworkError::Connect(msg) => write!(f, "Connection failed: {}", msg),
            NetworkError::Request(msg) => write!(f, "Request failed: {}", msg),
            NetworkError::HttpStatus(code) => write!(f, "HTTP error: {}", code),
            NetworkError::Body(msg) => write!(f, "Could not read response body: {}", msg),
        }
    }
}

impl std::error::Error for NetworkError {}

/// Errors from the state file or the change log sinks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// The file exists but could not be read.
    Read { path: String, message: String },
    /// The file was read but its content is not a valid snapshot.
    Corrupt { path: String, message: String },
    /// The file could not be created, appended to, or replaced.
    Write { path: String, message: String },
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::Read { path, message } => {
                write!(f, "Cannot read {}: {}", path, message)
            }
            StorageError::Corrupt { path, message } => {
                write!(f, "Corrupt state file {}: {}", path, message)
            }
            StorageError::Write { path, message } => {
                write!(f, "Cannot write {}: {}", path, message)
            }
        }
    }
}

impl std::error::Error for StorageError {}

/// Why a single polling cycle was abandoned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleError {
    Network(NetworkError),
    Storage(StorageError),
}

impl fmt::Display for CycleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CycleError::Network(e) => write!(f, "fetch failed: {}", e),
            CycleError::Storage(e) => write!(f, "storage failed: {}", e),
        }
    }
}

impl std::error::Error for CycleError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CycleError::Network(e) => Some(e),
            CycleError::Storage(e) => Some(e),
        }
    }
}

impl From<NetworkError> for CycleError {
    fn from(e: NetworkError) -> Self {
        CycleError::Network(e)
    }
}

impl From<StorageError> for CycleError {
    fn from(e: StorageError) -> Self {
        CycleError::Storage(e)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
